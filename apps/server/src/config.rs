// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use bim45d_processing::validation::ValidatorConfig;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on.
    pub port: u16,
    /// Directory for uploaded model storage.
    pub cache_dir: String,
    /// Maximum upload size in MB.
    pub max_file_size_mb: usize,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Number of worker threads for table extraction.
    pub worker_threads: usize,
    /// Idle time after which a session is dropped.
    pub session_ttl_secs: u64,
    /// Interpreter for the external validators.
    pub validator_python: String,
    pub schema_timeout_secs: u64,
    pub gherkin_timeout_secs: u64,
    /// Allowed CORS origins (comma-separated, or "*" for all).
    pub cors_origins: Vec<String>,
    /// CreationAuthor written into BCF topics.
    pub report_author: String,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", 8080),
            cache_dir: std::env::var("CACHE_DIR").unwrap_or_else(|_| {
                if std::path::Path::new("/.dockerenv").exists() {
                    "/app/cache".into()
                } else {
                    std::env::current_dir()
                        .ok()
                        .and_then(|dir| dir.join(".cache").to_str().map(|s| s.to_string()))
                        .unwrap_or_else(|| "./.cache".into())
                }
            }),
            max_file_size_mb: env_or("MAX_FILE_SIZE_MB", 200),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 300),
            worker_threads: env_or("WORKER_THREADS", num_cpus::get()),
            session_ttl_secs: env_or("SESSION_TTL_SECS", 4 * 60 * 60),
            validator_python: std::env::var("VALIDATOR_PYTHON").unwrap_or_else(|_| "python".into()),
            schema_timeout_secs: env_or("SCHEMA_TIMEOUT_SECS", 60),
            gherkin_timeout_secs: env_or("GHERKIN_TIMEOUT_SECS", 120),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            report_author: std::env::var("REPORT_AUTHOR").unwrap_or_else(|_| "bim45d@localhost".into()),
        }
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Validator settings with the default rule types
    pub fn validator(&self) -> ValidatorConfig {
        ValidatorConfig {
            python: self.validator_python.clone(),
            schema_timeout: Duration::from_secs(self.schema_timeout_secs),
            gherkin_timeout: Duration::from_secs(self.gherkin_timeout_secs),
            ..ValidatorConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
