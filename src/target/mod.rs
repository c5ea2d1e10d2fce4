//! Target resolution subsystem.
//!
//! # Data Flow
//! ```text
//! every inbound webhook
//!     → TargetResolver::resolve()
//!         static:    configured default URL
//!         persisted: store.rs record if usable, else default URL
//!
//! POST /admin/config (action=update_url)
//!     → TargetResolver::update()
//!     → store.rs validates, writes temp file, renames over the record
//! ```
//!
//! # Design Decisions
//! - The record is re-read for every dispatch; there is no in-memory cache
//! - A missing or corrupt record is never an error for the webhook path
//! - Only the persisted strategy accepts updates

pub mod store;

use serde::Serialize;
use thiserror::Error;

use crate::config::{TargetSettings, TargetStrategy};

pub use store::{TargetRecord, TargetStore};

/// Errors surfaced by target updates.
#[derive(Debug, Error)]
pub enum TargetError {
    /// The proposed URL is missing or malformed.
    #[error("invalid target URL: {0}")]
    InvalidConfig(String),

    /// The deployment uses a static target.
    #[error("target is static and cannot be updated")]
    ReadOnly,

    #[error("failed to persist target record: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode target record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Where a resolved URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSource {
    Static,
    Persisted,
    Default,
}

/// A resolved target with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    pub url: String,
    pub source: TargetSource,
    pub updated_at: Option<String>,
}

/// Determines the current upstream base URL.
#[derive(Debug)]
pub enum TargetResolver {
    Static { url: String },
    Persisted { store: TargetStore, default_url: String },
}

impl TargetResolver {
    pub fn from_settings(settings: &TargetSettings) -> Self {
        let default_url = settings.default_url.trim().to_string();
        match settings.strategy {
            TargetStrategy::Static => TargetResolver::Static { url: default_url },
            TargetStrategy::Persisted => TargetResolver::Persisted {
                store: TargetStore::new(&settings.state_path),
                default_url,
            },
        }
    }

    /// Current target base URL. Never fails.
    pub async fn resolve(&self) -> String {
        self.resolve_detailed().await.url
    }

    pub async fn resolve_detailed(&self) -> ResolvedTarget {
        match self {
            TargetResolver::Static { url } => ResolvedTarget {
                url: url.clone(),
                source: TargetSource::Static,
                updated_at: None,
            },
            TargetResolver::Persisted { store, default_url } => match store.load().await {
                Some(record) => ResolvedTarget {
                    url: record.url,
                    source: TargetSource::Persisted,
                    updated_at: record.updated_at,
                },
                None => ResolvedTarget {
                    url: default_url.clone(),
                    source: TargetSource::Default,
                    updated_at: None,
                },
            },
        }
    }

    /// Persist a new target URL.
    pub async fn update(&self, new_url: &str) -> Result<TargetRecord, TargetError> {
        match self {
            TargetResolver::Static { .. } => Err(TargetError::ReadOnly),
            TargetResolver::Persisted { store, .. } => store.update(new_url).await,
        }
    }
}
