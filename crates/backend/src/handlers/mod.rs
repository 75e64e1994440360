pub mod a001_supplier_connection;
pub mod usecases;
