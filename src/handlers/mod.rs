pub mod registration;
pub mod routes;
pub mod webhook;
