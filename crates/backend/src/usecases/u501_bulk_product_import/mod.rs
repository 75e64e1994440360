pub mod commerce_api_client;
pub mod executor;
pub mod field_mapper;
pub mod filter_selector;
pub mod markup_engine;
pub mod progress_tracker;
pub mod reconciliation;
pub mod run_lock;
pub mod session_repository;
pub mod source_adapter;

#[cfg(test)]
pub mod test_support;

pub use executor::{DbConnectionDirectory, ImportExecutor, ImportSettings};
