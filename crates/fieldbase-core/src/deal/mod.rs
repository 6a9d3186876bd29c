//! Deals: an external entity whose ad-hoc value maps may reference entries.

mod directory;
mod scanner;
mod values;

pub use directory::{DealDirectory, DealRecord, PersistedDeals};
pub use scanner::DealLinkageScanner;
pub use values::{parse_value_map, DealValueSource, DealValueStore, DealValues, FieldPurge};
