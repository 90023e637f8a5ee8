pub mod config;
pub mod constants;
pub mod core;
pub mod infrastructure;
pub mod visualization;

pub use crate::core::errors::TrackerError;
pub use crate::core::shell::ExpenseTracker;
pub use infrastructure::auth::in_memory::InMemoryAuth;
pub use infrastructure::logging::in_memory::InMemoryActivityLog;
pub use infrastructure::store::in_memory::InMemoryDocumentStore;
pub use visualization::Visualization;

#[cfg(test)]
mod tests;
