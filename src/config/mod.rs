//! Configuration module for the RegTrack backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Directory holding uploaded regulation documents
    pub upload_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Base URL of the external change-analysis service, if deployed
    pub analyzer_url: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("REGTRACK_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let upload_dir = env::var("REGTRACK_UPLOAD_DIR")
            .unwrap_or_else(|_| "./data/uploads".to_string())
            .into();

        let bind_addr = env::var("REGTRACK_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:9000".to_string())
            .parse()
            .expect("Invalid REGTRACK_BIND_ADDR format");

        let analyzer_url = env::var("REGTRACK_ANALYZER_URL").ok();

        let log_level = env::var("REGTRACK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            db_path,
            upload_dir,
            bind_addr,
            analyzer_url,
            log_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("REGTRACK_DB_PATH");
        env::remove_var("REGTRACK_UPLOAD_DIR");
        env::remove_var("REGTRACK_BIND_ADDR");
        env::remove_var("REGTRACK_ANALYZER_URL");
        env::remove_var("REGTRACK_LOG_LEVEL");

        let config = Config::from_env();

        assert_eq!(config.db_path, PathBuf::from("./data/app.sqlite"));
        assert_eq!(config.upload_dir, PathBuf::from("./data/uploads"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9000");
        assert!(config.analyzer_url.is_none());
        assert_eq!(config.log_level, "info");
    }
}
