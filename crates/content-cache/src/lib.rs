//! In-memory content cache for uploaded files
//!
//! Maps storage names to file bytes. The cache has no capacity bound and no
//! expiry: entries leave only through an explicit `remove` or `clear`.

mod cache;
mod types;

pub use cache::{ContentCache, FillTicket};
pub use types::CacheStats;
