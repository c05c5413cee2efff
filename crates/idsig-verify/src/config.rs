//! Verifier configuration.

use serde::{Deserialize, Serialize};

use crate::types::MAX_SIGNATURE_SIZE;

/// Extension of sidecar signature files (`base.apk` -> `base.apk.idsig`).
pub const DEFAULT_SIDECAR_EXTENSION: &str = "idsig";

/// Verifier configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Cap on `hashingInfo` + `signingInfos` inside one envelope.
    #[serde(default = "default_max_signature_size")]
    pub max_signature_size: usize,

    /// Extension used by [`crate::SidecarFileSource`].
    #[serde(default = "default_sidecar_extension")]
    pub sidecar_extension: String,
}

fn default_max_signature_size() -> usize {
    MAX_SIGNATURE_SIZE
}

fn default_sidecar_extension() -> String {
    DEFAULT_SIDECAR_EXTENSION.to_string()
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_signature_size: default_max_signature_size(),
            sidecar_extension: default_sidecar_extension(),
        }
    }
}

impl VerifierConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `IDSIG_MAX_SIGNATURE_SIZE` | Envelope payload cap in bytes (default: 8096) |
    /// | `IDSIG_SIDECAR_EXTENSION` | Sidecar file extension (default: `idsig`) |
    ///
    /// Unparsable or empty values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            max_signature_size: lookup("IDSIG_MAX_SIGNATURE_SIZE")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or_else(default_max_signature_size),
            sidecar_extension: lookup("IDSIG_SIDECAR_EXTENSION")
                .map(|v| v.trim().trim_start_matches('.').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_sidecar_extension),
        }
    }

    /// Set the envelope payload cap.
    pub fn with_max_signature_size(mut self, max: usize) -> Self {
        self.max_signature_size = max;
        self
    }

    /// Set the sidecar extension.
    pub fn with_sidecar_extension(mut self, extension: impl Into<String>) -> Self {
        self.sidecar_extension = extension.into();
        self
    }
}
