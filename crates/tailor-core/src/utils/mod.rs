//! Helpers shared by the workflow components.

pub mod pagination;
pub mod retry;

pub use pagination::normalize_page;
pub use retry::{retry_on_conflict, Contention};
pub use tailor_types::truncate_id;
