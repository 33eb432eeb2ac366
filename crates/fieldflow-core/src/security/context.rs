//! Access context threaded through every store call.
//!
//! Computed attributes are derived data, so getters and setters run with an
//! elevated copy of the caller's context. The context is passed explicitly;
//! there is no ambient global switch.

use crate::error::{Error, Result};

/// Whether access checks apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Normal permission checks.
    #[default]
    Normal,
    /// Internal access bypassing permission checks.
    Elevated,
}

/// The caller's identity, access mode and transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessContext {
    /// User on whose behalf the call runs.
    pub user: String,
    /// Access mode for this call.
    pub mode: AccessMode,
    /// Transaction the store should run the call in, if it tracks one.
    pub transaction: Option<u64>,
}

impl AccessContext {
    /// Create a normal-access context for a user.
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            mode: AccessMode::Normal,
            transaction: None,
        }
    }

    /// Create an elevated context for internal callers.
    pub fn root() -> Self {
        Self {
            user: "root".to_string(),
            mode: AccessMode::Elevated,
            transaction: None,
        }
    }

    /// Attach a transaction id.
    pub fn with_transaction(mut self, transaction: u64) -> Self {
        self.transaction = Some(transaction);
        self
    }

    /// Elevated copy of this context, keeping user and transaction.
    pub fn elevated(&self) -> Self {
        Self {
            mode: AccessMode::Elevated,
            ..self.clone()
        }
    }

    /// Check if permission checks are bypassed.
    pub fn is_elevated(&self) -> bool {
        self.mode == AccessMode::Elevated
    }

    /// Require elevated access or return an error.
    pub fn require_elevated(&self, what: &str) -> Result<()> {
        if self.is_elevated() {
            Ok(())
        } else {
            Err(Error::PermissionDenied(format!(
                "user '{}' needs elevated access to {}",
                self.user, what
            )))
        }
    }
}

impl Default for AccessContext {
    fn default() -> Self {
        Self::new("anonymous")
    }
}
