//! Origin restriction for edit requests
//!
//! Browser extensions identify themselves through the `Origin` header. When
//! restriction is enabled, only requests whose origin starts with the
//! configured scheme prefix may reach the editor.

use serde::{Deserialize, Serialize};

use crate::errors::OriginError;
use crate::DEFAULT_ORIGIN_PREFIX;

/// Policy applied to the `Origin` header of POST requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginPolicy {
    /// Whether an origin with the expected prefix is required.
    pub require_origin: bool,
    /// Prefix the origin must start with.
    pub prefix: String,
}

impl Default for OriginPolicy {
    fn default() -> Self {
        Self {
            require_origin: true,
            prefix: DEFAULT_ORIGIN_PREFIX.to_string(),
        }
    }
}

impl OriginPolicy {
    /// Policy that lets every request through.
    pub fn allow_any() -> Self {
        Self {
            require_origin: false,
            ..Self::default()
        }
    }

    /// Policy requiring the given origin prefix.
    pub fn require_prefix(prefix: impl Into<String>) -> Self {
        Self {
            require_origin: true,
            prefix: prefix.into(),
        }
    }

    /// Check the raw `Origin` header value, if any.
    pub fn authorize(&self, origin: Option<&[u8]>) -> Result<(), OriginError> {
        if !self.require_origin {
            return Ok(());
        }

        let raw = origin.ok_or(OriginError::Missing)?;
        let origin = std::str::from_utf8(raw).map_err(|_| OriginError::NotUtf8)?;

        if origin.starts_with(&self.prefix) {
            Ok(())
        } else {
            Err(OriginError::Disallowed {
                origin: origin.to_string(),
            })
        }
    }
}
