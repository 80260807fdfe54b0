pub mod notifier;
pub mod reminder_service;
pub mod routing;
pub mod status_resolver;
pub mod status_store;
