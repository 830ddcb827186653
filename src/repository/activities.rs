//! Farm activity log (the GAP record).

use chrono::NaiveDate;
use log::info;

use crate::backend::{Backend, BackendError, insert_as, select_as};
use crate::models::{ActivityCategory, FarmActivity, FarmId, NewFarmActivity};
use crate::query::{Filter, Query};
use crate::repository::farms::FarmerScope;
use crate::repository::validate::{DashboardError, present, required};

pub const FARM_ACTIVITIES_TABLE: &str = "farm_activities";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityForm {
    pub farm_id: Option<FarmId>,
    pub activity_date: Option<NaiveDate>,
    pub activity_category: Option<ActivityCategory>,
    pub activity_type: String,
    pub description: String,
}

/// Activities of all owned farms, newest first; `year` narrows to one
/// calendar year.
pub fn list_activities(backend: &dyn Backend, scope: &FarmerScope, year: Option<i32>) -> Result<Vec<FarmActivity>, BackendError> {
    if scope.is_empty() {
        return Ok(Vec::new());
    }
    let mut query = Query::select("*").filter(Filter::is_in("farm_id", scope.farm_ids().iter().map(|id| id.0)));
    if let Some(y) = year {
        query = query
            .filter(Filter::gte("activity_date", format!("{:04}-01-01", y)))
            .filter(Filter::lte("activity_date", format!("{:04}-12-31", y)));
    }
    let mut activities: Vec<FarmActivity> = select_as(backend, FARM_ACTIVITIES_TABLE, &query.order_desc("activity_date"))?;
    scope.retain_owned(&mut activities, |a| a.farm_id);
    Ok(activities)
}

pub fn create_activity(backend: &dyn Backend, scope: &FarmerScope, form: &ActivityForm) -> Result<FarmActivity, DashboardError> {
    let farm_id = present("farm", form.farm_id)?;
    scope.ensure_owned(farm_id)?;
    let category = present("category", form.activity_category)?;
    let activity_type = required("activity type", &form.activity_type)?.to_ascii_uppercase();
    if !category.allows(&activity_type) {
        return Err(DashboardError::InvalidActivityType { category, activity_type });
    }
    let row = NewFarmActivity {
        farm_id,
        activity_date: present("activity date", form.activity_date)?,
        activity_category: category,
        activity_type,
        description: required("description", &form.description)?,
    };
    let activity: FarmActivity = insert_as(backend, FARM_ACTIVITIES_TABLE, &row)?;
    info!("Activity {} ({}) recorded for farm {}", activity.id.0, category, farm_id);
    Ok(activity)
}
