//! DCK-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, DashError>;

/// Top-level error type for dashclock.
#[derive(Debug, Error)]
pub enum DashError {
    #[error("[DCK-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[DCK-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[DCK-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[DCK-1004] no datasources configured in {path}")]
    EmptyDatasources { path: PathBuf },

    #[error("[DCK-1005] unknown timezone {name:?}: {details}")]
    InvalidTimezone { name: String, details: String },

    #[error("[DCK-2001] cannot create backend client for {endpoint:?}: {details}")]
    InvalidEndpoint { endpoint: String, details: String },

    #[error("[DCK-2002] query {query:?} returned unsupported result shape: {shape}")]
    UnsupportedResultShape { query: String, shape: String },

    #[error("[DCK-2003] backend request to {endpoint} failed: {details}")]
    Backend { endpoint: String, details: String },

    #[error("[DCK-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[DCK-3001] terminal failure during {context}: {source}")]
    Terminal {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("[DCK-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[DCK-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[DCK-3004] no scheduled task named {name:?}")]
    UnknownTask { name: String },

    #[error("[DCK-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl DashError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "DCK-1001",
            Self::MissingConfig { .. } => "DCK-1002",
            Self::ConfigParse { .. } => "DCK-1003",
            Self::EmptyDatasources { .. } => "DCK-1004",
            Self::InvalidTimezone { .. } => "DCK-1005",
            Self::InvalidEndpoint { .. } => "DCK-2001",
            Self::UnsupportedResultShape { .. } => "DCK-2002",
            Self::Backend { .. } => "DCK-2003",
            Self::Serialization { .. } => "DCK-2101",
            Self::Terminal { .. } => "DCK-3001",
            Self::Io { .. } => "DCK-3002",
            Self::ChannelClosed { .. } => "DCK-3003",
            Self::UnknownTask { .. } => "DCK-3004",
            Self::Runtime { .. } => "DCK-3900",
        }
    }

    /// Whether retrying on the next refresh might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend { .. } | Self::Io { .. })
    }

    /// Whether the failure must terminate the process.
    ///
    /// Misconfiguration and display failures are fatal; transient backend
    /// failures are rendered as a per-source error panel instead.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::ConfigParse { .. }
                | Self::EmptyDatasources { .. }
                | Self::InvalidTimezone { .. }
                | Self::InvalidEndpoint { .. }
                | Self::UnsupportedResultShape { .. }
                | Self::Terminal { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for terminal setup/draw failures.
    #[must_use]
    pub const fn terminal(context: &'static str, source: std::io::Error) -> Self {
        Self::Terminal { context, source }
    }
}

impl From<serde_json::Error> for DashError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<DashError> {
        vec![
            DashError::InvalidConfig {
                details: String::new(),
            },
            DashError::MissingConfig {
                path: PathBuf::new(),
            },
            DashError::ConfigParse {
                context: "",
                details: String::new(),
            },
            DashError::EmptyDatasources {
                path: PathBuf::new(),
            },
            DashError::InvalidTimezone {
                name: String::new(),
                details: String::new(),
            },
            DashError::InvalidEndpoint {
                endpoint: String::new(),
                details: String::new(),
            },
            DashError::UnsupportedResultShape {
                query: String::new(),
                shape: String::new(),
            },
            DashError::Backend {
                endpoint: String::new(),
                details: String::new(),
            },
            DashError::Serialization {
                context: "",
                details: String::new(),
            },
            DashError::Terminal {
                context: "",
                source: std::io::Error::other("test"),
            },
            DashError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            DashError::ChannelClosed { component: "" },
            DashError::UnknownTask {
                name: String::new(),
            },
            DashError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_variants();
        let codes: Vec<&str> = errors.iter().map(DashError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn display_carries_code_prefix() {
        for err in all_variants() {
            let rendered = err.to_string();
            assert!(
                rendered.starts_with(&format!("[{}]", err.code())),
                "{rendered} should start with its code"
            );
        }
    }

    #[test]
    fn backend_failures_are_retryable_not_fatal() {
        let err = DashError::Backend {
            endpoint: "http://prom:9090".to_string(),
            details: "connection refused".to_string(),
        };
        assert!(err.is_retryable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn misconfiguration_is_fatal() {
        let shape = DashError::UnsupportedResultShape {
            query: "up".to_string(),
            shape: "vector".to_string(),
        };
        let endpoint = DashError::InvalidEndpoint {
            endpoint: "::".to_string(),
            details: "relative URL without a base".to_string(),
        };
        assert!(shape.is_fatal());
        assert!(endpoint.is_fatal());
        assert!(!shape.is_retryable());
    }

    #[test]
    fn serde_error_converts() {
        let err: DashError = serde_json::from_str::<Vec<u8>>("{")
            .map_err(DashError::from)
            .unwrap_err();
        assert_eq!(err.code(), "DCK-2101");
    }
}
