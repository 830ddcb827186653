//! Per-user session state.
//!
//! A [`Session`] is only ever built whole (identity, role, display name and UI
//! flags together) and stores swap it in or out as one value, so a reader can
//! never observe a half-filled session.

use std::collections::BTreeSet;

use crate::models::{Identity, Role};

/// Transient UI toggles that survive across renders but not across logins.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UiFlag {
    ShowGapReport,
    ShowSoilTests,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub identity: Identity,
    pub role: Role,
    pub full_name: String,
    pub flags: BTreeSet<UiFlag>,
    /// Year selected for the GAP report, if one was chosen.
    pub report_year: Option<i32>,
}

impl Session {
    pub fn new(identity: Identity, role: Role, full_name: impl Into<String>) -> Self {
        Session {
            identity,
            role,
            full_name: full_name.into(),
            flags: BTreeSet::new(),
            report_year: None,
        }
    }

    pub fn has_flag(&self, flag: UiFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Name shown in the sidebar; falls back to the email when the profile has
    /// no name yet.
    pub fn display_name(&self) -> &str {
        if !self.full_name.trim().is_empty() {
            &self.full_name
        } else {
            self.identity.email.as_deref().unwrap_or("-")
        }
    }
}

pub trait SessionStore {
    fn get(&self) -> Option<Session>;
    fn set(&mut self, session: Session);
    fn clear(&mut self);

    /// Apply `f` to the stored session, if any, and store the result.
    fn update(&mut self, f: impl FnOnce(&mut Session)) -> bool
    where
        Self: Sized,
    {
        match self.get() {
            Some(mut session) => {
                f(&mut session);
                self.set(session);
                true
            }
            None => false,
        }
    }
}

/// Store for one interactive console session.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    current: Option<Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        MemorySessionStore::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<Session> {
        self.current.clone()
    }

    fn set(&mut self, session: Session) {
        self.current = Some(session);
    }

    fn clear(&mut self) {
        self.current = None;
    }
}
