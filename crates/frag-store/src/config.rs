//! Environment-driven configuration for remote backends.
//!
//! The S3 backend reads its endpoints and credentials from the environment:
//! `S3_SRC`, `S3_SRC_ACCESS_KEY` and `S3_SRC_SECRET_KEY` are mandatory; the
//! `S3_DST*` counterparts each fall back to their src value, so a single set
//! of variables covers the common same-store case. `S3_REGION` defaults to
//! `us-east-1` (S3-compatible stores such as MinIO still require one).

use crate::error::{StoreError, StoreResult};

/// Default region when `S3_REGION` is not set.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Connection parameters for one S3-compatible endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct S3Config {
    /// Endpoint URL (e.g. `http://localhost:9000`).
    pub host: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

/// Source and destination endpoints for a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteConfig {
    pub src: S3Config,
    pub dst: S3Config,
}

impl RemoteConfig {
    /// Load from the process environment.
    pub fn from_env() -> StoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup.
    ///
    /// Factored out so tests can supply variables without mutating the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StoreResult<Self> {
        let mandatory = |key: &'static str| -> StoreResult<String> {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or(StoreError::MissingConfig(key))
        };

        let region = lookup("S3_REGION")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let src = S3Config {
            host: mandatory("S3_SRC")?,
            access_key: mandatory("S3_SRC_ACCESS_KEY")?,
            secret_key: mandatory("S3_SRC_SECRET_KEY")?,
            region: region.clone(),
        };
        let fallback = |key: &str, or: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| or.to_string())
        };
        let dst = S3Config {
            host: fallback("S3_DST", &src.host),
            access_key: fallback("S3_DST_ACCESS_KEY", &src.access_key),
            secret_key: fallback("S3_DST_SECRET_KEY", &src.secret_key),
            region,
        };

        Ok(Self { src, dst })
    }

    /// Whether src and dst point at the same endpoint.
    pub fn same_endpoint(&self) -> bool {
        self.src.host == self.dst.host
    }
}
