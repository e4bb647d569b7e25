use crate::template::ContractKind;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Contract period applied when no end date was entered.
pub const DEFAULT_PERIOD_MONTHS: i64 = 3;

/// Transient per-rendering contract record, produced by the contract form
/// collaborator. Never persisted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractTerms {
    #[serde(rename = "customerId")]
    pub customer_id: String,
    #[serde(rename = "contractType")]
    pub kind: ContractKind,
    #[serde(rename = "startDate")]
    pub start_date: NaiveDate,
    #[serde(rename = "endDate")]
    pub end_date: Option<NaiveDate>,
    pub amount: Option<i64>,
    #[serde(rename = "paymentMethod")]
    pub payment_method: Option<String>,
    #[serde(rename = "specialNotes")]
    pub special_notes: Option<String>,
}

impl ContractTerms {
    /// ceil((end - start) in days / 30) when an end date is present,
    /// following the 30-day month approximation used across the stored
    /// history's YYYY-MM grouping, else the fixed default.
    pub fn period_months(&self) -> i64 {
        match self.end_date {
            Some(end) => {
                let days = (end - self.start_date).num_days();
                days.div_euclid(30) + i64::from(days.rem_euclid(30) != 0)
            }
            None => DEFAULT_PERIOD_MONTHS,
        }
    }
}

/// Name/representative/address triple for either contracting party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyProfile {
    pub name: String,
    pub representative: String,
    pub address: String,
}

/// Localized long date, e.g. 2026年8月24日.
pub fn format_date_jp(date: NaiveDate) -> String {
    format!("{}年{}月{}日", date.year(), date.month(), date.day())
}

/// Integer with comma grouping, e.g. 1,234,567.
pub fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Substitution context for one rendering request. Customer identity fields
/// substitute literally; company fields fall back to explicit placeholders
/// when no profile is configured.
pub struct VarContext<'a> {
    pub customer: &'a PartyProfile,
    pub company: Option<&'a PartyProfile>,
    pub terms: &'a ContractTerms,
}

impl VarContext<'_> {
    pub fn company_name(&self) -> String {
        self.company
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "〇〇".to_string())
    }

    pub fn company_address(&self) -> String {
        self.company.map(|c| c.address.clone()).unwrap_or_default()
    }

    pub fn company_representative(&self) -> String {
        self.company
            .map(|c| c.representative.clone())
            .unwrap_or_default()
    }

    fn end_date_text(&self) -> String {
        match self.terms.end_date {
            Some(end) => format_date_jp(end),
            None => format!(
                "{}から{}カ月後",
                format_date_jp(self.terms.start_date),
                self.terms.period_months()
            ),
        }
    }

    /// Literal substring replacement over the closed token set. Pure and
    /// total; tokens outside the set are left verbatim. Token syntax is
    /// non-overlapping and does not nest, so replacement order does not
    /// matter.
    pub fn render(&self, text: &str) -> String {
        text.replace("{customerName}", &self.customer.name)
            .replace("{companyName}", &self.company_name())
            .replace("{startDate}", &format_date_jp(self.terms.start_date))
            .replace("{endDate}", &self.end_date_text())
            .replace("{period}", &self.terms.period_months().to_string())
            .replace("{amount}", &format_amount(self.terms.amount.unwrap_or(0)))
            .replace("{customerAddress}", &self.customer.address)
            .replace("{customerRepresentative}", &self.customer.representative)
            .replace("{companyAddress}", &self.company_address())
            .replace("{companyRepresentative}", &self.company_representative())
    }
}
