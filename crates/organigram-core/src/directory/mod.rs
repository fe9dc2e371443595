mod aggregate;
mod classify;
mod pattern;

pub use aggregate::{aggregate_locations, Aggregation};
pub use classify::{classify, classify_entity, ClassificationConfig, ClassificationRule};
pub use pattern::{extract_branch, strip_branch, BranchMatch};
