use chrono::NaiveDate;
use log::info;

use crate::backend::{Backend, BackendError, insert_as, select_as};
use crate::models::{FarmId, NewSoilTest, SoilTest};
use crate::query::{Filter, Query};
use crate::repository::farms::FarmerScope;
use crate::repository::validate::{DashboardError, non_negative, optional_text, present};

pub const SOIL_TESTS_TABLE: &str = "soil_tests";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoilTestForm {
    pub farm_id: Option<FarmId>,
    pub test_date: Option<NaiveDate>,
    pub ph_level: Option<f64>,
    pub nitrogen_ppm: Option<f64>,
    pub phosphorus_ppm: Option<f64>,
    pub potassium_ppm: Option<f64>,
    pub organic_matter_percent: Option<f64>,
    pub recommendations: String,
}

pub fn list_soil_tests(backend: &dyn Backend, scope: &FarmerScope) -> Result<Vec<SoilTest>, BackendError> {
    if scope.is_empty() {
        return Ok(Vec::new());
    }
    let query = Query::select("*")
        .filter(Filter::is_in("farm_id", scope.farm_ids().iter().map(|id| id.0)))
        .order_desc("test_date");
    let mut tests: Vec<SoilTest> = select_as(backend, SOIL_TESTS_TABLE, &query)?;
    scope.retain_owned(&mut tests, |t| t.farm_id);
    Ok(tests)
}

pub fn create_soil_test(backend: &dyn Backend, scope: &FarmerScope, form: &SoilTestForm) -> Result<SoilTest, DashboardError> {
    let farm_id = present("farm", form.farm_id)?;
    scope.ensure_owned(farm_id)?;

    let ph_level = present("pH", form.ph_level)?;
    if !(0.0..=14.0).contains(&ph_level) {
        return Err(DashboardError::InvalidValue {
            field: "pH",
            reason: format!("must be between 0 and 14, got {}", ph_level),
        });
    }
    let row = NewSoilTest {
        farm_id,
        test_date: present("test date", form.test_date)?,
        ph_level,
        nitrogen_ppm: non_negative("nitrogen (ppm)", present("nitrogen (ppm)", form.nitrogen_ppm)?)?,
        phosphorus_ppm: non_negative("phosphorus (ppm)", present("phosphorus (ppm)", form.phosphorus_ppm)?)?,
        potassium_ppm: non_negative("potassium (ppm)", present("potassium (ppm)", form.potassium_ppm)?)?,
        organic_matter_percent: non_negative(
            "organic matter (%)",
            present("organic matter (%)", form.organic_matter_percent)?,
        )?,
        recommendations: optional_text(&form.recommendations),
    };
    let test: SoilTest = insert_as(backend, SOIL_TESTS_TABLE, &row)?;
    info!("Soil test {} recorded for farm {}", test.id.0, farm_id);
    Ok(test)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::farms::FARMS_TABLE;
    use crate::testing::FakeBackend;
    use serde_json::json;

    fn setup() -> (FakeBackend, FarmerScope, FarmId) {
        let backend = FakeBackend::new();
        let me = backend.add_user("me@example.com", "pw", Some("FARMER"), None);
        let farm = backend.push_row(FARMS_TABLE, json!({ "owner_id": me, "farm_name": "Doi Chang", "location": "Chiang Rai" }));
        let scope = FarmerScope::load(&backend, me).unwrap();
        (backend, scope, FarmId(farm["id"].as_i64().unwrap()))
    }

    fn form(farm: FarmId) -> SoilTestForm {
        SoilTestForm {
            farm_id: Some(farm),
            test_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            ph_level: Some(5.6),
            nitrogen_ppm: Some(42.0),
            phosphorus_ppm: Some(18.0),
            potassium_ppm: Some(130.0),
            organic_matter_percent: Some(4.2),
            recommendations: "  ".into(),
        }
    }

    #[test]
    fn records_and_lists_soil_tests() {
        let (backend, scope, farm) = setup();
        let saved = create_soil_test(&backend, &scope, &form(farm)).unwrap();
        assert_eq!(saved.recommendations, None);
        assert_eq!(saved.ph_level, Some(5.6));

        let mut later = form(farm);
        later.test_date = NaiveDate::from_ymd_opt(2025, 1, 15);
        later.recommendations = "Apply dolomite lime".into();
        create_soil_test(&backend, &scope, &later).unwrap();

        let tests = list_soil_tests(&backend, &scope).unwrap();
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].recommendations.as_deref(), Some("Apply dolomite lime"));
    }

    #[test]
    fn rejects_out_of_range_ph() {
        let (backend, scope, farm) = setup();
        let mut f = form(farm);
        f.ph_level = Some(15.0);
        assert!(matches!(
            create_soil_test(&backend, &scope, &f),
            Err(DashboardError::InvalidValue { field: "pH", .. })
        ));
        f.ph_level = None;
        assert!(matches!(create_soil_test(&backend, &scope, &f), Err(DashboardError::MissingField("pH"))));
        assert!(backend.rows(SOIL_TESTS_TABLE).is_empty());
    }
}
