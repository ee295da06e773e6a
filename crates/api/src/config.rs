use std::path::PathBuf;

use siglabel_store::StoreLayout;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for the final buffer flush (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Period of the background buffer flush (default: `10`).
    pub flush_interval_secs: u64,
    /// Where signals, annotation tables, and registries live.
    pub storage: StoreLayout,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn env_secs(name: &str, default: &str) -> u64 {
    env_or(name, default)
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid u64"))
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `8000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `FLUSH_INTERVAL_SECS`  | `10`                       |
    /// | `SIGNAL_DIR`           | `signals`                  |
    /// | `ANNOTATION_DIR`       | `annotations`              |
    /// | `COMPILED_DIR`         | `compiled`                 |
    /// | `SIGNAL_REGISTRY_FILE` | `signal_registry.json`     |
    /// | `ANNOTATORS_FILE`      | `annotators.json`          |
    pub fn from_env() -> Self {
        let host = env_or("HOST", "0.0.0.0");

        let port: u16 = env_or("PORT", "8000")
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = env_secs("REQUEST_TIMEOUT_SECS", "30");
        let shutdown_timeout_secs = env_secs("SHUTDOWN_TIMEOUT_SECS", "30");

        let flush_interval_secs = env_secs("FLUSH_INTERVAL_SECS", "10");
        assert!(flush_interval_secs > 0, "FLUSH_INTERVAL_SECS must be positive");

        let storage = StoreLayout {
            signal_dir: PathBuf::from(env_or("SIGNAL_DIR", "signals")),
            annotation_dir: PathBuf::from(env_or("ANNOTATION_DIR", "annotations")),
            compiled_dir: PathBuf::from(env_or("COMPILED_DIR", "compiled")),
            signal_registry: PathBuf::from(env_or("SIGNAL_REGISTRY_FILE", "signal_registry.json")),
            annotators_file: PathBuf::from(env_or("ANNOTATORS_FILE", "annotators.json")),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            flush_interval_secs,
            storage,
        }
    }
}
