//! Which screen to show, derived from the session store on every render.

use log::info;
use secrecy::SecretString;

use crate::auth::{AuthError, AuthResolver};
use crate::backend::Backend;
use crate::models::Role;
use crate::session::{Session, SessionStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    LoggedOut,
    Admin,
    Farmer,
    /// Signed in, but the profile role is not one we render. Only logout is
    /// offered.
    UnknownRole(Option<String>),
}

impl ViewState {
    pub fn from_session(session: Option<&Session>) -> Self {
        match session.map(|s| &s.role) {
            None => ViewState::LoggedOut,
            Some(Role::Admin) => ViewState::Admin,
            Some(Role::Farmer) => ViewState::Farmer,
            Some(Role::Unrecognized(raw)) => ViewState::UnknownRole(raw.clone()),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        !matches!(self, ViewState::LoggedOut)
    }
}

pub struct Dispatcher<S: SessionStore> {
    store: S,
}

impl<S: SessionStore> Dispatcher<S> {
    pub fn new(store: S) -> Self {
        Dispatcher { store }
    }

    /// Re-reads the store; the decision is never cached.
    pub fn current(&self) -> ViewState {
        ViewState::from_session(self.store.get().as_ref())
    }

    pub fn session(&self) -> Option<Session> {
        self.store.get()
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Only a successful authentication touches the store.
    pub fn login(&mut self, resolver: &AuthResolver<'_>, email: &str, password: &SecretString) -> Result<ViewState, AuthError> {
        let session = resolver.authenticate(email, password)?;
        self.store.set(session);
        Ok(self.current())
    }

    pub fn logout(&mut self, backend: &dyn Backend) -> ViewState {
        if let Some(session) = self.store.get() {
            info!("User {} signed out", session.identity.id);
        }
        backend.sign_out();
        self.store.clear();
        self.current()
    }
}
