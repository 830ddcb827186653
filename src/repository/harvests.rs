//! Harvest lots and the variety reference list.

use chrono::NaiveDate;
use log::info;

use crate::backend::{Backend, BackendError, insert_as, select_as};
use crate::models::{FarmId, HarvestLot, NewHarvestLot, Variety, VarietyId};
use crate::query::{Filter, Query};
use crate::repository::farms::FarmerScope;
use crate::repository::validate::{DashboardError, non_negative, present, required};

pub const HARVEST_LOTS_TABLE: &str = "harvest_lots";
pub const VARIETIES_TABLE: &str = "varieties";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarvestForm {
    pub farm_id: Option<FarmId>,
    pub harvest_date: Option<NaiveDate>,
    pub cherry_weight_kg: Option<f64>,
    pub variety_id: Option<VarietyId>,
    pub harvester_name: String,
}

pub fn list_varieties(backend: &dyn Backend) -> Result<Vec<Variety>, BackendError> {
    select_as(backend, VARIETIES_TABLE, &Query::select("id,name").order_asc("name"))
}

/// Lots of every owned farm, newest first, with farm and variety names.
pub fn list_harvests(backend: &dyn Backend, scope: &FarmerScope) -> Result<Vec<HarvestLot>, BackendError> {
    if scope.is_empty() {
        return Ok(Vec::new());
    }
    let query = Query::select("*,farms(farm_name),varieties(name)")
        .filter(Filter::is_in("farm_id", scope.farm_ids().iter().map(|id| id.0)))
        .order_desc("harvest_date");
    let mut lots: Vec<HarvestLot> = select_as(backend, HARVEST_LOTS_TABLE, &query)?;
    scope.retain_owned(&mut lots, |l| l.farm_id);
    Ok(lots)
}

pub fn create_harvest(
    backend: &dyn Backend,
    scope: &FarmerScope,
    varieties: &[Variety],
    form: &HarvestForm,
) -> Result<HarvestLot, DashboardError> {
    let farm_id = present("farm", form.farm_id)?;
    scope.ensure_owned(farm_id)?;
    let variety_id = present("variety", form.variety_id)?;
    if !varieties.iter().any(|v| v.id == variety_id) {
        return Err(DashboardError::InvalidValue {
            field: "variety",
            reason: format!("unknown variety id {}", variety_id.0),
        });
    }
    let row = NewHarvestLot {
        farm_id,
        harvest_date: present("harvest date", form.harvest_date)?,
        cherry_weight_kg: non_negative("cherry weight (kg)", present("cherry weight (kg)", form.cherry_weight_kg)?)?,
        variety_id,
        harvester_name: required("harvester name", &form.harvester_name)?,
    };
    let lot: HarvestLot = insert_as(backend, HARVEST_LOTS_TABLE, &row)?;
    info!("Harvest lot {} recorded for farm {}", lot.id.0, farm_id);
    Ok(lot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::farms::FARMS_TABLE;
    use crate::testing::FakeBackend;
    use serde_json::json;

    struct Fixture {
        backend: FakeBackend,
        scope: FarmerScope,
        mine: FarmId,
        theirs: FarmId,
        varieties: Vec<Variety>,
    }

    fn fixture() -> Fixture {
        let backend = FakeBackend::new();
        let me = backend.add_user("me@example.com", "pw", Some("FARMER"), Some("Somchai"));
        let other = backend.add_user("other@example.com", "pw", Some("FARMER"), None);
        let mine = backend.push_row(FARMS_TABLE, json!({ "owner_id": me, "farm_name": "Doi Chang", "location": "Chiang Rai" }));
        let theirs = backend.push_row(FARMS_TABLE, json!({ "owner_id": other, "farm_name": "Mae Lao", "location": "Chiang Rai" }));
        backend.push_row(VARIETIES_TABLE, json!({ "name": "Typica" }));
        backend.push_row(VARIETIES_TABLE, json!({ "name": "Catimor" }));
        for (farm, date, kg) in [(&mine, "2024-11-21", 96.0), (&mine, "2024-12-03", 182.5), (&theirs, "2024-12-04", 50.0)] {
            backend.push_row(
                HARVEST_LOTS_TABLE,
                json!({ "farm_id": farm["id"], "harvest_date": date, "cherry_weight_kg": kg, "variety_id": null, "harvester_name": "Ajaa" }),
            );
        }
        let scope = FarmerScope::load(&backend, me).unwrap();
        let varieties = list_varieties(&backend).unwrap();
        Fixture {
            mine: FarmId(mine["id"].as_i64().unwrap()),
            theirs: FarmId(theirs["id"].as_i64().unwrap()),
            backend,
            scope,
            varieties,
        }
    }

    #[test]
    fn varieties_sorted_by_name() {
        let f = fixture();
        let names: Vec<_> = f.varieties.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Catimor", "Typica"]);
    }

    #[test]
    fn history_is_scoped_and_newest_first() {
        let f = fixture();
        let lots = list_harvests(&f.backend, &f.scope).unwrap();
        assert_eq!(lots.len(), 2);
        assert!(lots.iter().all(|l| l.farm_id == f.mine));
        assert_eq!(lots[0].harvest_date.to_string(), "2024-12-03");
        assert_eq!(lots[0].farms.as_ref().unwrap().farm_name, "Doi Chang");
    }

    #[test]
    fn empty_scope_makes_no_request() {
        let f = fixture();
        let empty = FarmerScope {
            owner: f.scope.owner,
            farms: Vec::new(),
        };
        let before = f.backend.calls().len();
        assert!(list_harvests(&f.backend, &empty).unwrap().is_empty());
        assert_eq!(f.backend.calls().len(), before);
    }

    fn valid_form(f: &Fixture) -> HarvestForm {
        HarvestForm {
            farm_id: Some(f.mine),
            harvest_date: NaiveDate::from_ymd_opt(2025, 1, 10),
            cherry_weight_kg: Some(120.25),
            variety_id: Some(f.varieties[0].id),
            harvester_name: "Ajaa".into(),
        }
    }

    #[test]
    fn records_lot_for_owned_farm() {
        let f = fixture();
        let lot = create_harvest(&f.backend, &f.scope, &f.varieties, &valid_form(&f)).unwrap();
        assert_eq!(lot.farm_id, f.mine);
        assert_eq!(lot.cherry_weight_kg, 120.25);
        assert_eq!(list_harvests(&f.backend, &f.scope).unwrap().len(), 3);
    }

    #[test]
    fn rejects_foreign_farm_and_bad_input() {
        let f = fixture();
        let inserts_before = f.backend.rows(HARVEST_LOTS_TABLE).len();

        let mut form = valid_form(&f);
        form.farm_id = Some(f.theirs);
        assert!(matches!(
            create_harvest(&f.backend, &f.scope, &f.varieties, &form),
            Err(DashboardError::FarmNotOwned(_))
        ));

        let mut form = valid_form(&f);
        form.cherry_weight_kg = Some(-1.0);
        assert!(matches!(
            create_harvest(&f.backend, &f.scope, &f.varieties, &form),
            Err(DashboardError::InvalidValue { .. })
        ));

        let mut form = valid_form(&f);
        form.harvester_name.clear();
        assert!(matches!(
            create_harvest(&f.backend, &f.scope, &f.varieties, &form),
            Err(DashboardError::MissingField("harvester name"))
        ));

        let mut form = valid_form(&f);
        form.variety_id = Some(VarietyId(9_999));
        assert!(create_harvest(&f.backend, &f.scope, &f.varieties, &form).is_err());

        assert_eq!(f.backend.rows(HARVEST_LOTS_TABLE).len(), inserts_before);
    }

    #[test]
    fn failed_insert_is_reported_not_retried() {
        let f = fixture();
        f.backend.fail_inserts_on(HARVEST_LOTS_TABLE);
        let err = create_harvest(&f.backend, &f.scope, &f.varieties, &valid_form(&f)).unwrap_err();
        assert!(matches!(err, DashboardError::Backend(_)));
        let attempts = f.backend.calls().iter().filter(|c| *c == "insert harvest_lots").count();
        assert_eq!(attempts, 1);
    }
}
