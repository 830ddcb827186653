//! Client-side summaries over rows already fetched for the page.

use chrono::Datelike;
use std::collections::BTreeMap;

use crate::models::{ActivityCategory, FarmActivity, HarvestLot};

/// Activities grouped by calendar year, then by category. Within a group the
/// input order is kept.
pub type GapReport<'a> = BTreeMap<i32, BTreeMap<ActivityCategory, Vec<&'a FarmActivity>>>;

pub fn gap_report(activities: &[FarmActivity]) -> GapReport<'_> {
    let mut report = GapReport::new();
    for a in activities {
        report
            .entry(a.activity_date.year())
            .or_default()
            .entry(a.activity_category)
            .or_default()
            .push(a);
    }
    report
}

/// Years present in the activity log, newest first.
pub fn report_years(activities: &[FarmActivity]) -> Vec<i32> {
    let mut years: Vec<i32> = activities.iter().map(|a| a.activity_date.year()).collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct YearTotal {
    pub lots: usize,
    pub cherry_weight_kg: f64,
}

pub fn harvest_totals_by_year(lots: &[HarvestLot]) -> BTreeMap<i32, YearTotal> {
    let mut totals: BTreeMap<i32, YearTotal> = BTreeMap::new();
    for lot in lots {
        let t = totals.entry(lot.harvest_date.year()).or_default();
        t.lots += 1;
        t.cherry_weight_kg += lot.cherry_weight_kg;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityId, FarmId, HarvestLotId};
    use chrono::NaiveDate;

    fn activity(id: i64, date: &str, category: ActivityCategory, kind: &str) -> FarmActivity {
        FarmActivity {
            id: ActivityId(id),
            farm_id: FarmId(1),
            activity_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            activity_category: category,
            activity_type: kind.to_string(),
            description: None,
        }
    }

    #[test]
    fn groups_by_year_then_category() {
        let rows = vec![
            activity(1, "2024-09-01", ActivityCategory::Pruning, "MAINTENANCE"),
            activity(2, "2024-03-10", ActivityCategory::Fertilization, "ORGANIC_FERTILIZER"),
            activity(3, "2024-02-01", ActivityCategory::Pruning, "STUMPING"),
            activity(4, "2023-11-20", ActivityCategory::Harvest, "SELECTIVE_PICKING"),
        ];
        let report = gap_report(&rows);

        assert_eq!(report.keys().copied().collect::<Vec<_>>(), vec![2023, 2024]);
        let y2024 = &report[&2024];
        assert_eq!(
            y2024.keys().copied().collect::<Vec<_>>(),
            vec![ActivityCategory::Fertilization, ActivityCategory::Pruning]
        );
        let pruning: Vec<_> = y2024[&ActivityCategory::Pruning].iter().map(|a| a.id.0).collect();
        assert_eq!(pruning, vec![1, 3]);
        assert_eq!(report_years(&rows), vec![2024, 2023]);
    }

    #[test]
    fn totals_per_year() {
        let lot = |id: i64, date: &str, kg: f64| HarvestLot {
            id: HarvestLotId(id),
            farm_id: FarmId(1),
            harvest_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            cherry_weight_kg: kg,
            variety_id: None,
            harvester_name: None,
            farms: None,
            varieties: None,
        };
        let totals = harvest_totals_by_year(&[lot(1, "2024-12-03", 182.5), lot(2, "2024-11-21", 96.0), lot(3, "2025-01-05", 10.0)]);
        assert_eq!(totals[&2024], YearTotal { lots: 2, cherry_weight_kg: 278.5 });
        assert_eq!(totals[&2025].lots, 1);
    }

    #[test]
    fn empty_log_gives_empty_report() {
        assert!(gap_report(&[]).is_empty());
        assert!(report_years(&[]).is_empty());
    }
}
