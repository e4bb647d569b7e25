mod compose;
mod debug;
mod error;
mod history;
mod paginate;
mod pdf;
mod raster;
mod sanitize;
mod store;
mod template;
mod types;
mod vars;

pub use compose::{CONTRACT_ROOT_ID, DomTree, Node, NodeId, SECTION_CLASS, compose};
pub use debug::EventLog;
pub use error::{EngrossError, categorize_raster_error};
pub use history::{
    ContractStatus, HISTORY_KEY, HistoryEntry, HistoryStore, MonthlyGroup, year_month_of,
};
pub use paginate::PdfGenerator;
pub use pdf::{DocumentSink, PdfWriter};
pub use raster::{Bitmap, RasterOptions, Rasterizer};
pub use sanitize::{PropertySet, StyleBackup, restore, sanitize};
pub use store::{MemoryStorage, StoragePort, Subscription, TEMPLATES_KEY, TemplateStore};
pub use template::{
    ContractKind, ContractSection, ContractTemplate, MoveDirection, default_section_count,
    default_template, section_number,
};
pub use types::{Color, Margins, Mm, PageGeometry, Size};
pub use vars::{
    ContractTerms, DEFAULT_PERIOD_MONTHS, PartyProfile, VarContext, format_amount, format_date_jp,
};

/// Front desk tying the stores to document composition: the shell keeps one
/// of these and drives everything else through it.
pub struct ContractDesk {
    templates: TemplateStore,
    history: HistoryStore,
}

impl ContractDesk {
    pub fn new(template_storage: Box<dyn StoragePort>, history_storage: Box<dyn StoragePort>) -> Self {
        Self {
            templates: TemplateStore::new(template_storage),
            history: HistoryStore::new(history_storage),
        }
    }

    /// Volatile desk for tests and demos.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()), Box::new(MemoryStorage::new()))
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Composes the active template for the terms' contract kind with every
    /// variable substituted.
    pub fn compose_active(
        &self,
        terms: &ContractTerms,
        customer: &PartyProfile,
        company: Option<&PartyProfile>,
    ) -> (DomTree, NodeId) {
        let template = self.templates.get_active(terms.kind);
        let ctx = VarContext {
            customer,
            company,
            terms,
        };
        compose(&template, &ctx)
    }

    /// Appends the generated contract to the ledger and returns the entry.
    pub fn record(
        &self,
        terms: &ContractTerms,
        customer_name: &str,
        status: ContractStatus,
    ) -> Result<HistoryEntry, EngrossError> {
        let entry = HistoryEntry::from_terms(terms, customer_name, status);
        self.history.save(&entry)?;
        Ok(entry)
    }
}

/// Download name offered for a finished PDF, e.g.
/// `広告運用代行契約書_株式会社テスト商事_2026-08-24.pdf`.
pub fn suggest_filename(terms: &ContractTerms, customer_name: &str) -> String {
    format!(
        "{}_{}_{}.pdf",
        terms.kind.label(),
        customer_name,
        terms.start_date.format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct UniformRasterizer;

    impl Rasterizer for UniformRasterizer {
        fn rasterize(
            &mut self,
            _tree: &DomTree,
            _node: NodeId,
            options: &RasterOptions,
        ) -> Result<Bitmap, String> {
            // 60mm of placed height at the 180mm content width.
            Ok(Bitmap::solid(1800, 600, options.background))
        }
    }

    fn fixtures() -> (PartyProfile, ContractTerms) {
        let customer = PartyProfile {
            name: "株式会社テスト商事".to_string(),
            representative: "山田太郎".to_string(),
            address: "東京都千代田区1-2-3".to_string(),
        };
        let terms = ContractTerms {
            customer_id: "c-1".to_string(),
            kind: ContractKind::Advertising,
            start_date: NaiveDate::from_ymd_opt(2026, 8, 24).unwrap(),
            end_date: None,
            amount: Some(250_000),
            payment_method: None,
            special_notes: None,
        };
        (customer, terms)
    }

    fn temp_pdf(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("engross_desk_{tag}_{}.pdf", std::process::id()))
    }

    #[test]
    fn desk_composes_generates_and_records_end_to_end() {
        let desk = ContractDesk::in_memory();
        let (customer, terms) = fixtures();
        let (mut tree, _root) = desk.compose_active(&terms, &customer, None);

        let geometry = PageGeometry::a4_portrait();
        let mut generator =
            PdfGenerator::new(UniformRasterizer, PdfWriter::new(geometry));
        let path = temp_pdf("pipeline");
        generator
            .generate(&mut tree, CONTRACT_ROOT_ID, &path)
            .unwrap();

        // 13 units of 60mm with a 5mm gap pack four to an A4 page.
        let bytes = std::fs::read(&path).unwrap();
        let parsed = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 4);
        let _ = std::fs::remove_file(&path);

        let entry = desk
            .record(&terms, &customer.name, ContractStatus::Finalized)
            .unwrap();
        let groups = desk.history().monthly_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].year_month, entry.year_month);
        assert_eq!(groups[0].entries[0].id, entry.id);
    }

    #[test]
    fn suggested_filename_carries_kind_customer_and_date() {
        let (customer, terms) = fixtures();
        assert_eq!(
            suggest_filename(&terms, &customer.name),
            "広告運用代行契約書_株式会社テスト商事_2026-08-24.pdf"
        );
    }

    #[test]
    fn template_edits_flow_into_composition() {
        let desk = ContractDesk::in_memory();
        let (customer, terms) = fixtures();
        let mut template = desk.templates().get_active(ContractKind::Advertising);
        template.sections[0].content = "委託金額は金{amount}円とする。".to_string();
        desk.templates().save(&template).unwrap();

        let (tree, root) = desk.compose_active(&terms, &customer, None);
        let text = tree.text_content(root);
        assert!(text.contains("金250,000円"));
    }
}
