//! Configuration management

use std::env;
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Where uploaded PDFs land
    pub upload_dir: PathBuf,
    /// Where converted artifacts (`<job_id>.html` / `<job_id>.json`) go
    pub output_dir: PathBuf,
}

/// Admission ceilings checked before a job is created
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    pub max_file_size_mb: u64,
    pub max_page_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    /// Wall-clock budget per conversion, checked between pages
    pub timeout_secs: u64,
    /// Terminal jobs older than this are swept from the registry
    pub cleanup_after_hours: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("uploads"),
                output_dir: PathBuf::from("output"),
            },
            limits: LimitsConfig {
                max_file_size_mb: 100,
                max_page_count: 51,
            },
            jobs: JobsConfig {
                timeout_secs: 600,
                cleanup_after_hours: 24,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parsed(env::var("SERVER_PORT"), defaults.server.port),
            },
            storage: StorageConfig {
                upload_dir: env::var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.upload_dir),
                output_dir: env::var("OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.output_dir),
            },
            limits: LimitsConfig {
                max_file_size_mb: parsed(
                    env::var("MAX_FILE_SIZE_MB"),
                    defaults.limits.max_file_size_mb,
                ),
                max_page_count: parsed(
                    env::var("MAX_PAGE_COUNT"),
                    defaults.limits.max_page_count,
                ),
            },
            jobs: JobsConfig {
                timeout_secs: parsed(env::var("JOB_TIMEOUT_SECS"), defaults.jobs.timeout_secs),
                cleanup_after_hours: parsed(
                    env::var("JOB_CLEANUP_HOURS"),
                    defaults.jobs.cleanup_after_hours,
                ),
            },
        }
    }
}

fn parsed<T: std::str::FromStr>(value: Result<String, env::VarError>, default: T) -> T {
    value
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_admission_contract() {
        let config = Config::default();
        assert_eq!(config.limits.max_file_size_mb, 100);
        assert_eq!(config.limits.max_page_count, 51);
        assert_eq!(config.server.port, 3000);
    }
}
