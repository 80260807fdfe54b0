pub mod eat_out;
pub mod message;
pub mod time_spec;
