//! Resource limits for serving requests.
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::MAX_HEADERS;

pub const KIBIBYTE: usize = 1024;
pub const MEBIBYTE: usize = KIBIBYTE * KIBIBYTE;
pub const GIGABYTE: usize = 1_000_000_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[cfg(feature = "json")]
    #[error("invalid limits: {0}")]
    Json(#[from] serde_json::Error),
    #[error("receive buffer of {receive_buffer} bytes does not fit in a {arena_capacity} byte arena")]
    ReceiveBufferTooLarge {
        receive_buffer: usize,
        arena_capacity: usize,
    },
}

/// How much memory one connection may use.
///
/// The receive buffer is carved out of the arena, so whatever is left after
/// it bounds the path rewrites and request body.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(default))]
pub struct Limits {
    pub arena_capacity: usize,
    pub receive_buffer: usize,
    pub max_headers: usize,
    pub max_body: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            arena_capacity: MEBIBYTE,
            receive_buffer: 8 * KIBIBYTE,
            max_headers: MAX_HEADERS,
            max_body: GIGABYTE,
        }
    }
}

impl Limits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.receive_buffer > self.arena_capacity {
            return Err(ConfigError::ReceiveBufferTooLarge {
                receive_buffer: self.receive_buffer,
                arena_capacity: self.arena_capacity,
            });
        }
        Ok(())
    }

    /// Read limits from JSON. Missing fields keep their defaults.
    ///
    /// ```
    /// use crvr::config::Limits;
    ///
    /// let limits = Limits::from_json(r#"{"max_headers": 4}"#).unwrap();
    /// assert_eq!(limits.max_headers, 4);
    /// assert_eq!(limits.receive_buffer, Limits::default().receive_buffer);
    /// ```
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let limits: Limits = serde_json::from_str(json)?;
        limits.validate()?;
        Ok(limits)
    }
}
