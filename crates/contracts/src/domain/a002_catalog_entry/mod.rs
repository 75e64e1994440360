pub mod aggregate;

pub use aggregate::{CatalogEntry, CatalogEntryId};
