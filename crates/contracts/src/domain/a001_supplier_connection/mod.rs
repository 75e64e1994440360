pub mod aggregate;

pub use aggregate::{ConnectionKey, SourceKind, SupplierConnection, SupplierConnectionDto, SupplierConnectionId};
