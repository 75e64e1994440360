pub mod common;

pub mod a001_supplier_connection;
pub mod a002_catalog_entry;
