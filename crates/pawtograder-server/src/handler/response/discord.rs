//! Discord response types.

use serde::{Deserialize, Serialize};

/// Acknowledgment for payloads that were verified but not acted on.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Received {
    pub received: bool,
}

impl Default for Received {
    fn default() -> Self {
        Self { received: true }
    }
}
