use crate::backend::{Backend, BackendError, select_as};
use crate::models::{FarmerSummary, Role};
use crate::query::Query;

pub const PROFILES_WITH_EMAIL_VIEW: &str = "profiles_with_email";

/// Every FARMER profile, with the login email joined in by the view.
pub fn list_farmers(backend: &dyn Backend) -> Result<Vec<FarmerSummary>, BackendError> {
    let query = Query::select("*").eq("role", Role::FARMER).order_asc("full_name");
    select_as(backend, PROFILES_WITH_EMAIL_VIEW, &query)
}
