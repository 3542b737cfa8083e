//! SQLite-backed storage implementation.

mod config;
mod facts;
pub mod fact_index;
mod log;
pub mod schema;
mod store;

pub use fact_index::{get_relevant_fact_count_on_conn, get_relevant_facts_on_conn};
pub use store::SqliteStore;
