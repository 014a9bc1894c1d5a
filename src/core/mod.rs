mod config;
pub use config::{AppConfig, completion_url};
