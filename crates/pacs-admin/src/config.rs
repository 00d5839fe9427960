//! Configuration for the archive admin tool.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PACS_DATABASE_URL` | archive.db | SQLite database path, or `:memory:` |
//! | `PACS_LOG_LEVEL` | warn | Log level |
//! | `PACS_MAX_CONNECTIONS` | 4 | Connection pool size |
//! | `PACS_DEFAULT_PAGE_SIZE` | 20 | Page size when `--limit` is not given |
//! | `PACS_MAX_PAGE_SIZE` | 1000 | Largest accepted `--limit` |

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pacs_persistence::QueryLevel;

/// Admin tool configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "pacs-admin")]
#[command(about = "Operator tool for the PACS object archive")]
pub struct AdminConfig {
    /// Database path.
    #[arg(long, env = "PACS_DATABASE_URL", default_value = "archive.db", global = true)]
    pub database_url: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "PACS_LOG_LEVEL", default_value = "warn", global = true)]
    pub log_level: String,

    /// Maximum number of pooled connections.
    #[arg(long, env = "PACS_MAX_CONNECTIONS", default_value = "4", global = true)]
    pub max_connections: u32,

    /// Page size used when a search does not give `--limit`.
    #[arg(long, env = "PACS_DEFAULT_PAGE_SIZE", default_value = "20", global = true)]
    pub default_page_size: u32,

    /// Largest accepted page size.
    #[arg(long, env = "PACS_MAX_PAGE_SIZE", default_value = "1000", global = true)]
    pub max_page_size: u32,

    /// The operation to run.
    #[command(subcommand)]
    pub command: AdminCommand,
}

/// Admin operations.
#[derive(Debug, Clone, Subcommand)]
pub enum AdminCommand {
    /// Create the archive schema.
    Init,

    /// Store an instance described by a JSON file.
    Store {
        /// Path of the store request.
        file: PathBuf,
    },

    /// Search the archive.
    Search {
        /// Query level (study, series, instance).
        #[arg(long, default_value = "study")]
        level: QueryLevel,

        /// Page size.
        #[arg(long)]
        limit: Option<u32>,

        /// Number of matches to skip.
        #[arg(long, default_value = "0")]
        offset: u32,

        /// Return every match without paging.
        #[arg(long, conflicts_with_all = ["limit", "offset"])]
        all: bool,

        /// Add modalities and related series/instance counts.
        #[arg(long)]
        aggregates: bool,

        /// Matching keys as KEYWORD=VALUE, e.g. PatientID=PAT-1 or StudyDate=20240101-.
        filters: Vec<String>,
    },

    /// Check whether an instance is stored.
    Exists {
        /// Study Instance UID.
        study: String,
        /// Series Instance UID.
        series: String,
        /// SOP Instance UID.
        instance: String,
    },

    /// Print stored metadata of a study, series or instance.
    Metadata {
        /// Study Instance UID.
        study: String,
        /// Series Instance UID.
        series: Option<String>,
        /// SOP Instance UID.
        instance: Option<String>,
    },

    /// Delete a study with its series and instances.
    DeleteStudy {
        /// Study Instance UID.
        study: String,
    },

    /// Delete a series with its instances.
    DeleteSeries {
        /// Study Instance UID.
        study: String,
        /// Series Instance UID.
        series: String,
    },

    /// Delete one instance.
    DeleteInstance {
        /// Study Instance UID.
        study: String,
        /// Series Instance UID.
        series: String,
        /// SOP Instance UID.
        instance: String,
    },
}

impl AdminConfig {
    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.database_url.trim().is_empty() {
            errors.push("Database URL cannot be empty".to_string());
        }

        if self.max_connections == 0 {
            errors.push("Max connections cannot be 0".to_string());
        }

        if self.default_page_size == 0 {
            errors.push("Default page size cannot be 0".to_string());
        }

        if self.default_page_size > self.max_page_size {
            errors.push("Default page size cannot exceed max page size".to_string());
        }

        if let AdminCommand::Search {
            limit: Some(limit), ..
        } = &self.command
        {
            if *limit > self.max_page_size {
                errors.push(format!(
                    "Limit {} exceeds max page size {}",
                    limit, self.max_page_size
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AdminConfig {
        let mut argv = vec!["pacs-admin", "--database-url", "test.db"];
        argv.extend_from_slice(args);
        AdminConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_search() {
        let config = parse(&["search", "--level", "series", "--limit", "5", "Modality=CT"]);
        match &config.command {
            AdminCommand::Search {
                level,
                limit,
                offset,
                filters,
                ..
            } => {
                assert_eq!(*level, QueryLevel::Series);
                assert_eq!(*limit, Some(5));
                assert_eq!(*offset, 0);
                assert_eq!(filters, &vec!["Modality=CT".to_string()]);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_all_conflicts_with_paging() {
        let base = ["pacs-admin", "--database-url", "test.db", "search", "--all"];
        for extra in [["--offset", "5"], ["--limit", "5"]] {
            let argv = base.iter().chain(extra.iter());
            assert!(AdminConfig::try_parse_from(argv).is_err());
        }
        assert!(AdminConfig::try_parse_from(base).is_ok());
    }

    #[test]
    fn test_validate_page_sizes() {
        let mut config = parse(&["init"]);
        config.default_page_size = 0;
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("Default page size")));
    }

    #[test]
    fn test_validate_limit_above_max() {
        let config = parse(&["--max-page-size", "10", "search", "--limit", "50"]);
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("exceeds max page size")));
    }
}
