pub mod loader;
pub mod proc_validator;
pub mod secret;
pub mod settings;
