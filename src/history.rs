use crate::error::EngrossError;
use crate::store::{Observers, StoragePort, Subscription};
use crate::template::ContractKind;
use crate::vars::ContractTerms;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const HISTORY_KEY: &str = "contract_history";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Draft,
    Finalized,
}

impl ContractStatus {
    pub fn label(self) -> &'static str {
        match self {
            ContractStatus::Draft => "下書き",
            ContractStatus::Finalized => "確定",
        }
    }
}

/// One generated contract, as remembered for the monthly ledger view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(rename = "customerId")]
    pub customer_id: String,
    #[serde(rename = "customerName")]
    pub customer_name: String,
    #[serde(rename = "contractType")]
    pub kind: ContractKind,
    pub amount: i64,
    #[serde(rename = "startDate")]
    pub start_date: NaiveDate,
    #[serde(rename = "endDate")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Grouping key, always `YYYY-MM` of the creation moment.
    #[serde(rename = "yearMonth")]
    pub year_month: String,
    pub status: ContractStatus,
}

impl HistoryEntry {
    /// Records the terms of a just-generated contract with a fresh id. The
    /// ledger buckets by when the contract was created, not when its term
    /// starts.
    pub fn from_terms(terms: &ContractTerms, customer_name: &str, status: ContractStatus) -> Self {
        let created_at = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            customer_id: terms.customer_id.clone(),
            customer_name: customer_name.to_string(),
            kind: terms.kind,
            amount: terms.amount.unwrap_or(0),
            start_date: terms.start_date,
            end_date: terms.end_date,
            created_at,
            year_month: year_month_of(created_at.date_naive()),
            status,
        }
    }
}

pub fn year_month_of(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// All entries for one `YYYY-MM` bucket, in stored order.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyGroup {
    pub year_month: String,
    pub entries: Vec<HistoryEntry>,
    pub total_amount: i64,
    pub count: usize,
}

/// Persisted contract ledger over the same injected storage boundary the
/// template store uses.
pub struct HistoryStore {
    storage: Box<dyn StoragePort>,
    observers: Observers,
}

impl HistoryStore {
    pub fn new(storage: Box<dyn StoragePort>) -> Self {
        Self {
            storage,
            observers: Observers::new(),
        }
    }

    /// Fired after every save and delete.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.observers.subscribe(callback)
    }

    fn notify(&self) {
        self.observers.notify();
    }

    /// Missing or corrupt history reads as empty; the ledger has no seeded
    /// defaults to regenerate.
    pub fn get_all(&self) -> Vec<HistoryEntry> {
        let raw = match self.storage.read(HISTORY_KEY) {
            Ok(Some(raw)) => raw,
            _ => return Vec::new(),
        };
        serde_json::from_str(&raw).unwrap_or_default()
    }

    /// Upserts by id.
    pub fn save(&self, entry: &HistoryEntry) -> Result<(), EngrossError> {
        let mut entries = self.get_all();
        match entries.iter().position(|e| e.id == entry.id) {
            Some(index) => entries[index] = entry.clone(),
            None => entries.push(entry.clone()),
        }
        self.persist(&entries)?;
        self.notify();
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<(), EngrossError> {
        let mut entries = self.get_all();
        entries.retain(|e| e.id != id);
        self.persist(&entries)?;
        self.notify();
        Ok(())
    }

    /// Buckets the ledger by `year_month`, newest month first; entries
    /// within a month keep their stored order.
    pub fn monthly_groups(&self) -> Vec<MonthlyGroup> {
        let entries = self.get_all();

        let mut groups: Vec<MonthlyGroup> = Vec::new();
        for entry in entries {
            let index = match groups.iter().position(|g| g.year_month == entry.year_month) {
                Some(index) => index,
                None => {
                    groups.push(MonthlyGroup {
                        year_month: entry.year_month.clone(),
                        entries: Vec::new(),
                        total_amount: 0,
                        count: 0,
                    });
                    groups.len() - 1
                }
            };
            let group = &mut groups[index];
            group.total_amount += entry.amount;
            group.count += 1;
            group.entries.push(entry);
        }
        groups.sort_by(|a, b| b.year_month.cmp(&a.year_month));
        groups
    }

    fn persist(&self, entries: &[HistoryEntry]) -> Result<(), EngrossError> {
        let raw = serde_json::to_string(entries)
            .map_err(|err| EngrossError::Storage(format!("serialize history: {}", err)))?;
        self.storage.write(HISTORY_KEY, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store() -> HistoryStore {
        HistoryStore::new(Box::new(MemoryStorage::new()))
    }

    fn entry(year_month: &str, amount: i64) -> HistoryEntry {
        HistoryEntry {
            id: Uuid::new_v4().to_string(),
            customer_id: "c-1".to_string(),
            customer_name: "株式会社テスト商事".to_string(),
            kind: ContractKind::Advertising,
            amount,
            start_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            end_date: None,
            created_at: Utc::now(),
            year_month: year_month.to_string(),
            status: ContractStatus::Draft,
        }
    }

    #[test]
    fn corrupt_history_reads_as_empty() {
        let storage = MemoryStorage::new();
        storage.write(HISTORY_KEY, "[{broken").unwrap();
        let store = HistoryStore::new(Box::new(storage));
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn save_upserts_by_id() {
        let store = store();
        let mut record = entry("2026-03", 100_000);
        store.save(&record).unwrap();
        record.status = ContractStatus::Finalized;
        record.amount = 120_000;
        store.save(&record).unwrap();

        let all = store.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, ContractStatus::Finalized);
        assert_eq!(all[0].amount, 120_000);
    }

    #[test]
    fn monthly_groups_are_newest_first_with_totals() {
        let store = store();
        let first_march = entry("2026-03", 100_000);
        store.save(&first_march).unwrap();
        store.save(&entry("2026-03", 50_000)).unwrap();
        store.save(&entry("2026-04", 300_000)).unwrap();
        store.save(&entry("2025-12", 80_000)).unwrap();

        let groups = store.monthly_groups();
        let keys: Vec<&str> = groups.iter().map(|g| g.year_month.as_str()).collect();
        assert_eq!(keys, vec!["2026-04", "2026-03", "2025-12"]);

        let march = &groups[1];
        assert_eq!(march.count, 2);
        assert_eq!(march.total_amount, 150_000);
        // Within the month, entries keep their stored order.
        assert_eq!(march.entries[0].id, first_march.id);
    }

    #[test]
    fn from_terms_buckets_by_creation_month_not_start_date() {
        let terms = ContractTerms {
            customer_id: "c-9".to_string(),
            kind: ContractKind::Consulting,
            start_date: NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(),
            end_date: None,
            amount: Some(250_000),
            payment_method: None,
            special_notes: None,
        };
        let record = HistoryEntry::from_terms(&terms, "株式会社テスト商事", ContractStatus::Draft);
        assert_eq!(
            record.year_month,
            year_month_of(record.created_at.date_naive())
        );
        assert_ne!(record.year_month, year_month_of(terms.start_date));
        assert_eq!(record.amount, 250_000);
        assert_eq!(record.kind, ContractKind::Consulting);
    }

    #[test]
    fn delete_removes_and_notifies() {
        let store = store();
        static FIRED: AtomicUsize = AtomicUsize::new(0);
        FIRED.store(0, Ordering::SeqCst);
        let record = entry("2026-05", 10_000);
        store.save(&record).unwrap();

        let subscription = store.subscribe(|| {
            FIRED.fetch_add(1, Ordering::SeqCst);
        });
        store.delete(&record.id).unwrap();
        assert!(store.get_all().is_empty());
        assert_eq!(FIRED.load(Ordering::SeqCst), 1);
        drop(subscription);
    }

    #[test]
    fn status_round_trips_as_lowercase() {
        let raw = serde_json::to_string(&ContractStatus::Finalized).unwrap();
        assert_eq!(raw, "\"finalized\"");
        let parsed: ContractStatus = serde_json::from_str("\"draft\"").unwrap();
        assert_eq!(parsed, ContractStatus::Draft);
    }
}
