pub mod app_config;
pub mod security_config;
pub mod swagger_config;
