//! Tags correlate dispatched commands with their completion notifications.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::errors::ConvoyError;

/// Reserved tag for blocking single-command execution outside any batch.
pub const SENTINEL_TAG: &str = "seq";

/// Identifies one dispatched command instance.
///
/// Batched commands are tagged `{request}:{index}` with `index` relative to
/// the command's stage. Uniqueness holds among currently running commands,
/// which is what completion routing relies on.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Command `index` of the active stage of request `request`
    Batch { request: String, index: usize },
    /// Fire-and-forget synchronous command outside any coordinator
    Sentinel,
}

impl Tag {
    /// Create a batch tag
    pub fn batch(request: impl Into<String>, index: usize) -> Self {
        Tag::Batch {
            request: request.into(),
            index,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Tag::Sentinel)
    }

    /// Request id this tag belongs to, if batched
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Tag::Batch { request, .. } => Some(request),
            Tag::Sentinel => None,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Batch { request, index } => write!(f, "{}:{}", request, index),
            Tag::Sentinel => f.write_str(SENTINEL_TAG),
        }
    }
}

impl FromStr for Tag {
    type Err = ConvoyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == SENTINEL_TAG {
            return Ok(Tag::Sentinel);
        }
        let Some((request, index)) = s.rsplit_once(':') else {
            return Err(ConvoyError::malformed_tag(s));
        };
        if request.is_empty() {
            return Err(ConvoyError::malformed_tag(s));
        }
        let index = index.parse().map_err(|_| ConvoyError::malformed_tag(s))?;
        Ok(Tag::Batch {
            request: request.to_string(),
            index,
        })
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
