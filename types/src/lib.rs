//! Core domain types for Retro.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer: the future cell, the transport, the
//! channel registry, and configuration.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod error;
mod form;
mod ids;
mod key;
mod state;

pub use error::{ChannelError, ErrorCode};
pub use form::{FormParams, FormParseError};
pub use ids::RequestId;
pub use key::{KeyError, RequestKey, ResourceName};
pub use state::FutureState;

use serde::{Deserialize, Serialize};

// ============================================================================
// Channel Policy Types
// ============================================================================

/// How an `AsyncChannel` treats a second `get` for a key whose first request
/// is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupPolicy {
    /// Reuse the pending future. One request on the wire per key at a time.
    #[default]
    Share,
    /// Issue a new request for every call.
    Independent,
}

impl DedupPolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DedupPolicy::Share => "share",
            DedupPolicy::Independent => "independent",
        }
    }

    #[must_use]
    pub const fn shares_inflight(self) -> bool {
        matches!(self, DedupPolicy::Share)
    }
}

impl std::fmt::Display for DedupPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
