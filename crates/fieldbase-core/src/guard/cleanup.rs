//! Stale-value cleanup after a confirmed structural change.

use crate::deal::DealValueStore;
use crate::entry::EntryStore;
use tracing::info;

/// What a cleanup pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// The field whose values were removed. Counts also cover catalog
    /// columns sourced from it.
    pub field_id: String,
    /// Reference entries that held the field.
    pub reference_entries: usize,
    /// Catalog entries that held the field.
    pub catalog_entries: usize,
    /// Deal value maps that held the field.
    pub deals: usize,
    /// Malformed deal value maps that were left alone.
    pub skipped_deals: usize,
}

impl CleanupReport {
    /// Total records rewritten.
    pub fn total(&self) -> usize {
        self.reference_entries + self.catalog_entries + self.deals
    }

    /// Add the counts of a pass over a related field. Malformed deal maps
    /// are skipped by every pass, so they are counted once.
    pub(crate) fn absorb(&mut self, other: CleanupReport) {
        self.reference_entries += other.reference_entries;
        self.catalog_entries += other.catalog_entries;
        self.deals += other.deals;
        self.skipped_deals = self.skipped_deals.max(other.skipped_deals);
    }
}

/// Remove every value stored under `field_id`, in entries and deal value maps.
///
/// Best effort: a malformed deal map is skipped and counted, not fatal.
pub(crate) fn purge_field_values(
    field_id: &str,
    entries: &mut EntryStore,
    deal_values: &DealValueStore,
) -> CleanupReport {
    let (reference_entries, catalog_entries) = entries.remove_field_values(field_id);
    let purge = deal_values.remove_field(field_id);

    let report = CleanupReport {
        field_id: field_id.to_string(),
        reference_entries,
        catalog_entries,
        deals: purge.updated,
        skipped_deals: purge.skipped,
    };
    info!(
        field_id,
        reference_entries,
        catalog_entries,
        deals = report.deals,
        skipped_deals = report.skipped_deals,
        "purged stale field values"
    );
    report
}
