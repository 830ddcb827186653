//! Farms and the set of farms a farmer session owns.

use log::info;

use crate::backend::{Backend, BackendError, insert_as, select_as};
use crate::models::{Farm, FarmId, NewFarm, UserId};
use crate::query::Query;
use crate::repository::validate::{DashboardError, required};

pub const FARMS_TABLE: &str = "farms";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FarmForm {
    pub farm_name: String,
    pub location: String,
}

/// Farms owned by one identity, fetched fresh for each render. Every
/// farmer-side read and write is checked against it.
#[derive(Debug, Clone)]
pub struct FarmerScope {
    pub owner: UserId,
    pub farms: Vec<Farm>,
}

impl FarmerScope {
    pub fn load(backend: &dyn Backend, owner: UserId) -> Result<Self, BackendError> {
        let query = Query::select("*").eq("owner_id", owner).order_asc("farm_name");
        let farms: Vec<Farm> = select_as(backend, FARMS_TABLE, &query)?;
        Ok(FarmerScope {
            owner,
            farms: farms.into_iter().filter(|f| f.owner_id == owner).collect(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.farms.is_empty()
    }

    pub fn farm_ids(&self) -> Vec<FarmId> {
        self.farms.iter().map(|f| f.id).collect()
    }

    pub fn owns(&self, id: FarmId) -> bool {
        self.farms.iter().any(|f| f.id == id)
    }

    pub fn ensure_owned(&self, id: FarmId) -> Result<(), DashboardError> {
        if self.owns(id) { Ok(()) } else { Err(DashboardError::FarmNotOwned(id)) }
    }

    pub fn farm_name(&self, id: FarmId) -> Option<&str> {
        self.farms.iter().find(|f| f.id == id).map(|f| f.farm_name.as_str())
    }

    /// Drop rows whose farm is outside the scope.
    pub fn retain_owned<T>(&self, rows: &mut Vec<T>, farm_of: impl Fn(&T) -> FarmId) {
        rows.retain(|r| self.owns(farm_of(r)));
    }
}

pub fn create_farm(backend: &dyn Backend, owner: UserId, form: &FarmForm) -> Result<Farm, DashboardError> {
    let row = NewFarm {
        owner_id: owner,
        farm_name: required("farm name", &form.farm_name)?,
        location: required("location", &form.location)?,
    };
    let farm: Farm = insert_as(backend, FARMS_TABLE, &row)?;
    info!("Farm {} ({}) created for {}", farm.id, farm.farm_name, owner);
    Ok(farm)
}
