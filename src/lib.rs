pub mod api;
pub mod config;
pub mod device_client;
pub mod form;
pub mod settings;
