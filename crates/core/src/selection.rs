use indexmap::IndexSet;
use rust_decimal::Decimal;

use crate::domain::invoice::{InvoiceId, InvoiceRecord};
use crate::domain::submission::ConfirmationSummary;

/// Invoice identifiers marked for the next submission cycle, kept in the
/// order they were selected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: IndexSet<InvoiceId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `id` if absent, removes it otherwise. Returns whether it is now selected.
    pub fn toggle(&mut self, id: InvoiceId) -> bool {
        if self.ids.shift_remove(&id) {
            return false;
        }
        self.ids.insert(id);
        true
    }

    pub fn select(&mut self, id: InvoiceId) {
        self.ids.insert(id);
    }

    pub fn select_all(&mut self, records: &[InvoiceRecord]) {
        self.ids = records.iter().map(InvoiceRecord::invoice_id).collect();
    }

    pub fn clear_all(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: InvoiceId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = InvoiceId> + '_ {
        self.ids.iter().copied()
    }

    /// True when `records` is non-empty and every one of them is selected.
    pub fn all_selected(&self, records: &[InvoiceRecord]) -> bool {
        !records.is_empty() && records.iter().all(|record| self.contains(record.invoice_id()))
    }

    pub fn selected_records<'a>(
        &'a self,
        records: &'a [InvoiceRecord],
    ) -> impl Iterator<Item = &'a InvoiceRecord> + 'a {
        records.iter().filter(move |record| self.contains(record.invoice_id()))
    }

    pub fn selected_total(&self, records: &[InvoiceRecord]) -> Decimal {
        self.selected_records(records)
            .fold(Decimal::ZERO, |total, record| total.saturating_add(record.line_total()))
    }

    pub fn summary(&self, records: &[InvoiceRecord]) -> ConfirmationSummary {
        ConfirmationSummary { count: self.len(), total: self.selected_total(records) }
    }

    /// Drops identifiers that no longer appear in `records`. Returns how many were removed.
    pub fn prune(&mut self, records: &[InvoiceRecord]) -> usize {
        let before = self.ids.len();
        let present: IndexSet<InvoiceId> = records.iter().map(InvoiceRecord::invoice_id).collect();
        self.ids.retain(|id| present.contains(id));
        before - self.ids.len()
    }
}
