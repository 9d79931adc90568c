//! The local account: registration and login against the stored credential pair.

use thiserror::Error;

use crate::models::Identity;
use crate::store::{keys, Documents, StoreError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0} must not be empty")]
    InvalidInput(&'static str),

    #[error("No account has been registered")]
    NoAccount,

    #[error("Email or password is incorrect")]
    Mismatch,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct SessionManager {
    docs: Documents,
}

impl SessionManager {
    pub fn new(docs: Documents) -> Self {
        Self { docs }
    }

    /// Store a new identity, replacing any previous one.
    pub fn register(&self, email: &str, password: &str) -> Result<Identity, SessionError> {
        if email.is_empty() {
            return Err(SessionError::InvalidInput("email"));
        }
        if password.is_empty() {
            return Err(SessionError::InvalidInput("password"));
        }

        let identity = Identity::new(email, password);
        let guard = self.docs.lock()?;
        if guard.read::<Identity>(keys::IDENTITY)?.is_some() {
            tracing::info!("Replacing existing local account");
        }
        guard.write(keys::IDENTITY, &identity)?;
        tracing::info!("Registered account {}", identity.email);
        Ok(identity)
    }

    pub fn authenticate(&self, email: &str, password: &str) -> Result<Identity, SessionError> {
        let stored = self
            .docs
            .lock()?
            .read::<Identity>(keys::IDENTITY)?
            .ok_or(SessionError::NoAccount)?;

        if stored.matches(email, password) {
            tracing::debug!("Authenticated {}", stored.email);
            Ok(stored)
        } else {
            tracing::warn!("Rejected login attempt for {}", email);
            Err(SessionError::Mismatch)
        }
    }

    pub fn current_identity(&self) -> Result<Option<Identity>, SessionError> {
        Ok(self.docs.lock()?.read(keys::IDENTITY)?)
    }
}
