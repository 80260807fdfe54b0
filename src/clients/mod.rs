pub mod line_client;
pub mod sqlite_store;
