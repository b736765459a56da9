pub mod cohort;
pub mod diagnostics;
pub mod events;
pub mod genotype;
pub mod store;
pub mod table;

pub use cohort::{Cohort, CohortCounts};
pub use store::{Store, SubjectId};
pub use table::{Column, Table};

#[cfg(test)]
#[path = "../../tests/src_inline/model/tests.rs"]
mod tests;
