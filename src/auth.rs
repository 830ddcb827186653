//! Credentials → identity → profile role.

use log::{info, warn};
use secrecy::SecretString;

use crate::backend::{Backend, BackendError, select_as};
use crate::models::{Identity, ProfileRow, Role, UserId};
use crate::query::{Filter, Query};
use crate::session::Session;

pub const PROFILES_TABLE: &str = "profiles";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Shown to the user without saying which field was wrong.
    #[error("Incorrect email or password. Please try again.")]
    InvalidCredentials,

    #[error("No profile found for user ID: {0}")]
    ProfileMissing(UserId),

    #[error("Account {} was created but setting the name failed: {source}", .identity.id)]
    ProvisioningPartialFailure {
        identity: Identity,
        #[source]
        source: BackendError,
    },

    #[error("{0}")]
    Backend(BackendError),
}

impl From<BackendError> for AuthError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::InvalidCredentials => AuthError::InvalidCredentials,
            other => AuthError::Backend(other),
        }
    }
}

/// Stateless between calls; everything lives in the backend.
pub struct AuthResolver<'a> {
    backend: &'a dyn Backend,
}

impl<'a> AuthResolver<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self {
        AuthResolver { backend }
    }

    pub fn authenticate(&self, email: &str, password: &SecretString) -> Result<Session, AuthError> {
        let identity = self.backend.sign_in_with_password(email.trim(), password)?;
        let profile = match self.lookup_profile(identity.id) {
            Ok(Some(p)) => p,
            Ok(None) => {
                warn!("User {} authenticated but has no profile row", identity.id);
                self.backend.sign_out();
                return Err(AuthError::ProfileMissing(identity.id));
            }
            Err(e) => {
                self.backend.sign_out();
                return Err(e.into());
            }
        };

        let role = Role::from_column(profile.role.as_deref());
        info!("User {} signed in with role {}", identity.id, role.label());
        Ok(Session::new(identity, role, profile.full_name.unwrap_or_default()))
    }

    fn lookup_profile(&self, id: UserId) -> Result<Option<ProfileRow>, BackendError> {
        let query = Query::select("role,full_name").eq("id", id).limit(1);
        Ok(select_as::<ProfileRow>(self.backend, PROFILES_TABLE, &query)?.into_iter().next())
    }

    /// Sign-up, then name the profile row the backend trigger created.
    ///
    /// The two steps are not atomic: if naming fails the account still exists
    /// and [`AuthError::ProvisioningPartialFailure`] carries its identity so the
    /// caller can retry [`AuthResolver::set_full_name`] alone.
    pub fn create_farmer_account(&self, email: &str, password: &SecretString, full_name: &str) -> Result<Identity, AuthError> {
        let identity = self.backend.sign_up(email.trim(), password)?;
        info!("Created account {}", identity.id);

        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Ok(identity);
        }
        match self.set_full_name(identity.id, full_name) {
            Ok(()) => Ok(identity),
            Err(source) => {
                warn!("Account {} created but profile name update failed: {}", identity.id, source);
                Err(AuthError::ProvisioningPartialFailure { identity, source })
            }
        }
    }

    pub fn set_full_name(&self, id: UserId, full_name: &str) -> Result<(), BackendError> {
        let updated = self.backend.update(
            PROFILES_TABLE,
            &[Filter::eq("id", id)],
            serde_json::json!({ "full_name": full_name }),
        )?;
        if updated.is_empty() {
            return Err(BackendError::NotFound(format!("profile row for {}", id)));
        }
        Ok(())
    }
}
