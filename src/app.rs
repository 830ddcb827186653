//! One interaction = apply one [`Action`], then re-fetch and render the page.
//!
//! Every backend call is guarded where it happens: a failure becomes an error
//! notice on the page and rendering carries on with what is available.

use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};

use crate::auth::{AuthError, AuthResolver};
use crate::backend::{Backend, BackendError};
use crate::dispatch::{Dispatcher, ViewState};
use crate::render::{self, FarmerData, Notice};
use crate::repository::activities::{ActivityForm, create_activity, list_activities};
use crate::repository::farms::{FarmForm, FarmerScope, create_farm};
use crate::repository::harvests::{HarvestForm, create_harvest, list_harvests, list_varieties};
use crate::repository::profiles::list_farmers;
use crate::repository::soil::{SoilTestForm, create_soil_test, list_soil_tests};
use crate::session::{Session, SessionStore, UiFlag};

#[derive(Debug)]
pub enum Action {
    Refresh,
    Login { email: String, password: SecretString },
    Logout,
    CreateFarmer { email: String, password: SecretString, full_name: String },
    AddFarm(FarmForm),
    AddHarvest(HarvestForm),
    AddSoilTest(SoilTestForm),
    AddActivity(ActivityForm),
    ShowGapReport { year: Option<i32> },
    HideGapReport,
    ToggleSoilTests,
}

impl Action {
    /// Name for logs; the payload may hold a password.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Refresh => "refresh",
            Action::Login { .. } => "login",
            Action::Logout => "logout",
            Action::CreateFarmer { .. } => "add-farmer",
            Action::AddFarm(_) => "add-farm",
            Action::AddHarvest(_) => "add-harvest",
            Action::AddSoilTest(_) => "add-soil-test",
            Action::AddActivity(_) => "add-activity",
            Action::ShowGapReport { .. } => "gap-report",
            Action::HideGapReport => "hide-report",
            Action::ToggleSoilTests => "soil-tests",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    AdminDashboard,
    FarmerFirstFarm,
    FarmerDashboard,
    /// Farmer whose farm list could not be loaded.
    FarmerUnavailable,
    UnknownRole,
}

#[derive(Debug, Clone)]
pub struct Page {
    pub view: ViewState,
    pub screen: Screen,
    pub sidebar: Option<String>,
    pub notices: Vec<Notice>,
    pub body: String,
}

impl Page {
    pub fn to_text(&self) -> String {
        let mut parts = vec![render::APP_TITLE.to_string()];
        if let Some(sidebar) = &self.sidebar {
            parts.push(sidebar.clone());
        }
        parts.extend(self.notices.iter().map(render::notice_line));
        parts.push(self.body.clone());
        parts.join("\n\n")
    }

    pub fn has_error(&self) -> bool {
        self.notices.iter().any(Notice::is_error)
    }
}

pub struct App<'a, S: SessionStore> {
    backend: &'a dyn Backend,
    dispatcher: Dispatcher<S>,
}

impl<'a, S: SessionStore> App<'a, S> {
    pub fn new(backend: &'a dyn Backend, store: S) -> Self {
        App {
            backend,
            dispatcher: Dispatcher::new(store),
        }
    }

    pub fn view(&self) -> ViewState {
        self.dispatcher.current()
    }

    pub fn handle(&mut self, action: Action) -> Page {
        let mut notices = Vec::new();
        self.apply(action, &mut notices);
        self.render(notices)
    }

    fn apply(&mut self, action: Action, notices: &mut Vec<Notice>) {
        let view = self.dispatcher.current();
        match (action, view) {
            (Action::Refresh, _) => {}
            (Action::Login { email, password }, ViewState::LoggedOut) => {
                let resolver = AuthResolver::new(self.backend);
                if let Err(e) = self.dispatcher.login(&resolver, &email, &password) {
                    notices.push(login_notice(&e));
                }
            }
            (Action::Login { .. }, _) => notices.push(Notice::warning("Already logged in; log out first.")),
            (Action::Logout, ViewState::LoggedOut) => {}
            (Action::Logout, _) => {
                self.dispatcher.logout(self.backend);
            }
            (_, ViewState::LoggedOut) => notices.push(Notice::error("Please log in first.")),
            (_, ViewState::UnknownRole(_)) => notices.push(Notice::error("Only logout is available for this account.")),
            (
                Action::CreateFarmer {
                    email,
                    password,
                    full_name,
                },
                ViewState::Admin,
            ) => self.create_farmer(&email, &password, &full_name, notices),
            (action, ViewState::Farmer) => self.apply_farmer(action, notices),
            (_, ViewState::Admin) => notices.push(Notice::error("That action is only available to farmers.")),
        }
    }

    fn create_farmer(&self, email: &str, password: &SecretString, full_name: &str, notices: &mut Vec<Notice>) {
        if email.trim().is_empty() || password.expose_secret().is_empty() {
            notices.push(Notice::error("Email and initial password are required."));
            return;
        }
        match AuthResolver::new(self.backend).create_farmer_account(email, password, full_name) {
            Ok(identity) => {
                let label = if full_name.trim().is_empty() { email.trim() } else { full_name.trim() };
                notices.push(Notice::success(format!("Farmer '{}' added ({}).", label, identity.id)));
            }
            Err(e @ AuthError::ProvisioningPartialFailure { .. }) => {
                notices.push(Notice::warning(format!("{} The account exists; set the name again later.", e)));
            }
            Err(e) => notices.push(Notice::error(format!("Could not add farmer: {}", e))),
        }
    }

    fn apply_farmer(&mut self, action: Action, notices: &mut Vec<Notice>) {
        let Some(session) = self.dispatcher.session() else {
            return;
        };
        let owner = session.identity.id;
        match action {
            Action::ShowGapReport { year } => {
                self.dispatcher.store_mut().update(|s| {
                    s.flags.insert(UiFlag::ShowGapReport);
                    s.report_year = year;
                });
                return;
            }
            Action::HideGapReport => {
                self.dispatcher.store_mut().update(|s| {
                    s.flags.remove(&UiFlag::ShowGapReport);
                    s.report_year = None;
                });
                return;
            }
            Action::ToggleSoilTests => {
                self.dispatcher.store_mut().update(|s| {
                    if !s.flags.remove(&UiFlag::ShowSoilTests) {
                        s.flags.insert(UiFlag::ShowSoilTests);
                    }
                });
                return;
            }
            Action::AddFarm(form) => {
                match create_farm(self.backend, owner, &form) {
                    Ok(farm) => notices.push(Notice::success(format!("Farm '{}' added.", farm.farm_name))),
                    Err(e) => notices.push(Notice::error(format!("Could not add farm: {}", e))),
                }
                return;
            }
            _ => {}
        }

        if !matches!(action, Action::AddHarvest(_) | Action::AddSoilTest(_) | Action::AddActivity(_)) {
            debug!("Refusing {} on farmer dashboard", action.name());
            notices.push(Notice::error("That action is not available on the farmer dashboard."));
            return;
        }

        // Remaining writes target one of the farmer's own farms.
        let scope = match FarmerScope::load(self.backend, owner) {
            Ok(scope) => scope,
            Err(e) => {
                notices.push(Notice::error(format!("Could not load your farms: {}", e)));
                return;
            }
        };
        if scope.is_empty() {
            notices.push(Notice::warning("Add a farm before recording farm data."));
            return;
        }
        let outcome = match action {
            Action::AddHarvest(form) => match list_varieties(self.backend) {
                Ok(varieties) => create_harvest(self.backend, &scope, &varieties, &form).map(|_| "Harvest recorded."),
                Err(e) => Err(e.into()),
            },
            Action::AddSoilTest(form) => create_soil_test(self.backend, &scope, &form).map(|_| "Soil test recorded."),
            Action::AddActivity(form) => create_activity(self.backend, &scope, &form).map(|_| "Activity recorded."),
            _ => return,
        };
        match outcome {
            Ok(message) => notices.push(Notice::success(message)),
            Err(e) => notices.push(Notice::error(format!("Not saved: {}", e))),
        }
    }

    /// Builds the page for the current store contents, fetching fresh rows.
    pub fn render(&self, mut notices: Vec<Notice>) -> Page {
        let view = self.dispatcher.current();
        let session = self.dispatcher.session();
        let (screen, body) = match (&view, &session) {
            (ViewState::Admin, Some(s)) => (Screen::AdminDashboard, self.admin_body(s, &mut notices)),
            (ViewState::Farmer, Some(s)) => self.farmer_body(s, &mut notices),
            (ViewState::UnknownRole(_), Some(_)) => {
                notices.push(Notice::error("Unknown user role."));
                (Screen::UnknownRole, render::unknown_role_page())
            }
            _ => (Screen::Login, render::login_page()),
        };
        Page {
            view,
            screen,
            sidebar: session.as_ref().map(render::sidebar),
            notices,
            body,
        }
    }

    fn admin_body(&self, session: &Session, notices: &mut Vec<Notice>) -> String {
        let farmers = match list_farmers(self.backend) {
            Ok(f) => {
                if f.is_empty() {
                    notices.push(Notice::info("No farmers registered yet."));
                }
                Some(f)
            }
            Err(e) => {
                notices.push(Notice::error(format!("Could not load farmers: {}", e)));
                None
            }
        };
        render::admin_dashboard(session, farmers.as_deref())
    }

    fn farmer_body(&self, session: &Session, notices: &mut Vec<Notice>) -> (Screen, String) {
        let scope = match FarmerScope::load(self.backend, session.identity.id) {
            Ok(scope) => scope,
            Err(e) => {
                notices.push(Notice::error(format!("Could not load your farms: {}", e)));
                return (Screen::FarmerUnavailable, String::new());
            }
        };
        if scope.is_empty() {
            return (Screen::FarmerFirstFarm, render::first_farm_page(session));
        }

        let varieties = guarded(notices, "varieties", list_varieties(self.backend));
        let harvests = guarded(notices, "harvest history", list_harvests(self.backend, &scope));
        let soil_tests = if session.has_flag(UiFlag::ShowSoilTests) {
            guarded(notices, "soil tests", list_soil_tests(self.backend, &scope))
        } else {
            None
        };
        let activities = guarded(notices, "farm activities", list_activities(self.backend, &scope, None));
        let gap_report_year = session.has_flag(UiFlag::ShowGapReport).then_some(session.report_year);
        let gap_activities = match gap_report_year {
            Some(Some(year)) => guarded(notices, "GAP report", list_activities(self.backend, &scope, Some(year))),
            _ => None,
        };
        let data = FarmerData {
            varieties,
            harvests,
            soil_tests,
            activities,
            gap_report_year,
            gap_activities,
        };
        (Screen::FarmerDashboard, render::farmer_dashboard(session, &scope, &data))
    }
}

fn guarded<T>(notices: &mut Vec<Notice>, what: &str, result: Result<T, BackendError>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Loading {} failed: {}", what, e);
            notices.push(Notice::error(format!("Could not load {}: {}", what, e)));
            None
        }
    }
}

fn login_notice(e: &AuthError) -> Notice {
    match e {
        AuthError::InvalidCredentials | AuthError::ProfileMissing(_) => Notice::error(e.to_string()),
        other => Notice::error(format!("Login failed: {}", other)),
    }
}
