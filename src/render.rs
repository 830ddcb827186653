//! Plain-text rendering of each screen.

use std::fmt::Write as _;

use crate::models::{FarmActivity, FarmerSummary, HarvestLot, SoilTest, Variety};
use crate::report::{gap_report, harvest_totals_by_year, report_years};
use crate::repository::farms::FarmerScope;
use crate::session::Session;

pub const APP_TITLE: &str = "Welcome to The Coffee Lab ☕";
const RULE: &str = "----------------------------------------";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Notice { level: NoticeLevel::Success, text: text.into() }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Notice { level: NoticeLevel::Info, text: text.into() }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Notice { level: NoticeLevel::Warning, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Notice { level: NoticeLevel::Error, text: text.into() }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

pub fn notice_line(n: &Notice) -> String {
    let tag = match n.level {
        NoticeLevel::Success => "[ok]",
        NoticeLevel::Info => "[info]",
        NoticeLevel::Warning => "[warn]",
        NoticeLevel::Error => "[error]",
    };
    format!("{} {}", tag, n.text)
}

/// Left-aligned columns sized to the widest cell.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }
    let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

    let mut out = padded_line(headers.iter().copied(), &widths);
    out.push('\n');
    out.push_str(&padded_line(dashes.iter().map(String::as_str), &widths));
    for row in rows {
        out.push('\n');
        out.push_str(&padded_line(row.iter().map(String::as_str), &widths));
    }
    out
}

fn padded_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(c, w)| format!("{}{}", c, " ".repeat(w.saturating_sub(c.chars().count()))))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn opt(v: Option<&str>) -> String {
    v.filter(|s| !s.is_empty()).unwrap_or("-").to_string()
}

fn num(v: Option<f64>) -> String {
    v.map(|x| format!("{:.2}", x)).unwrap_or_else(|| "-".to_string())
}

pub fn login_page() -> String {
    [
        "Log in",
        "  login <email> <password>",
        "",
        "Type `help` for all commands.",
    ]
    .join("\n")
}

pub fn sidebar(session: &Session) -> String {
    format!(
        "Logged in as: **{}**\nRole: **{}**\n(logout)",
        session.display_name(),
        session.role.label()
    )
}

pub fn unknown_role_page() -> String {
    "This account's role is not recognised. Log out and sign in with another account.".to_string()
}

pub fn admin_dashboard(session: &Session, farmers: Option<&[FarmerSummary]>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Administrator: {}", session.display_name());
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "Manage farmers");
    let _ = writeln!(out, "  add-farmer email=<email> password=<initial password> name=\"<full name>\"");
    let _ = writeln!(out);
    let _ = writeln!(out, "Farmers");
    match farmers {
        Some([]) => {
            let _ = writeln!(out, "(none)");
        }
        Some(list) => {
            let rows: Vec<Vec<String>> = list
                .iter()
                .map(|f| vec![opt(f.full_name.as_deref()), opt(f.email.as_deref()), f.id.to_string()])
                .collect();
            let _ = writeln!(out, "{}", table(&["Name", "Email", "ID"], &rows));
        }
        None => {
            let _ = writeln!(out, "Farmer list unavailable.");
        }
    }
    out.trim_end().to_string()
}

pub fn first_farm_page(session: &Session) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Farmer: {}", session.display_name());
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "You have no farms yet. Create your first farm to get started:");
    let _ = write!(out, "  add-farm name=\"<farm name>\" location=\"<sub-district>\"");
    out
}

/// Everything the farmer main screen shows, already fetched. `None` marks a
/// section whose fetch failed or is hidden.
#[derive(Debug, Default)]
pub struct FarmerData {
    pub varieties: Option<Vec<Variety>>,
    pub harvests: Option<Vec<HarvestLot>>,
    pub soil_tests: Option<Vec<SoilTest>>,
    pub activities: Option<Vec<FarmActivity>>,
    /// Set when the GAP report is open: the chosen year, or latest.
    pub gap_report_year: Option<Option<i32>>,
    /// Rows fetched for a chosen report year; the full log is used otherwise.
    pub gap_activities: Option<Vec<FarmActivity>>,
}

pub fn farmer_dashboard(session: &Session, scope: &FarmerScope, data: &FarmerData) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Farmer: {}", session.display_name());
    let _ = writeln!(out, "{}", RULE);

    let _ = writeln!(out, "Your farms");
    let farm_rows: Vec<Vec<String>> = scope
        .farms
        .iter()
        .map(|f| vec![f.id.to_string(), f.farm_name.clone(), opt(f.location.as_deref())])
        .collect();
    let _ = writeln!(out, "{}", table(&["ID", "Farm", "Location"], &farm_rows));
    let _ = writeln!(out, "  add-farm name=\"<farm name>\" location=\"<sub-district>\"");
    let _ = writeln!(out);

    let _ = writeln!(out, "Record a harvest");
    let _ = writeln!(
        out,
        "  add-harvest farm=<farm id> date=YYYY-MM-DD weight=<kg> variety=<variety id> harvester=\"<name>\""
    );
    if let Some(varieties) = &data.varieties {
        let list = varieties
            .iter()
            .map(|v| format!("{}={}", v.id.0, v.name))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "  varieties: {}", if list.is_empty() { "-".to_string() } else { list });
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Harvest history");
    match &data.harvests {
        Some(lots) if lots.is_empty() => {
            let _ = writeln!(out, "No harvests recorded yet.");
        }
        Some(lots) => {
            let rows: Vec<Vec<String>> = lots
                .iter()
                .map(|l| {
                    vec![
                        l.harvest_date.to_string(),
                        l.farms
                            .as_ref()
                            .map(|f| f.farm_name.clone())
                            .or_else(|| scope.farm_name(l.farm_id).map(str::to_string))
                            .unwrap_or_else(|| l.farm_id.to_string()),
                        format!("{:.2}", l.cherry_weight_kg),
                        opt(l.varieties.as_ref().map(|v| v.name.as_str())),
                        opt(l.harvester_name.as_deref()),
                    ]
                })
                .collect();
            let _ = writeln!(out, "{}", table(&["Date", "Farm", "Cherry (kg)", "Variety", "Harvester"], &rows));
            let totals: Vec<Vec<String>> = harvest_totals_by_year(lots)
                .into_iter()
                .rev()
                .map(|(year, t)| vec![year.to_string(), t.lots.to_string(), format!("{:.2}", t.cherry_weight_kg)])
                .collect();
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", table(&["Year", "Lots", "Cherry (kg)"], &totals));
        }
        None => {
            let _ = writeln!(out, "Harvest history unavailable.");
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Soil tests");
    match &data.soil_tests {
        Some(tests) if tests.is_empty() => {
            let _ = writeln!(out, "No soil tests recorded yet.");
        }
        Some(tests) => {
            let rows: Vec<Vec<String>> = tests
                .iter()
                .map(|t| {
                    vec![
                        t.test_date.to_string(),
                        scope.farm_name(t.farm_id).unwrap_or("-").to_string(),
                        num(t.ph_level),
                        num(t.nitrogen_ppm),
                        num(t.phosphorus_ppm),
                        num(t.potassium_ppm),
                        num(t.organic_matter_percent),
                        opt(t.recommendations.as_deref()),
                    ]
                })
                .collect();
            let _ = writeln!(out, "{}", table(&["Date", "Farm", "pH", "N", "P", "K", "OM %", "Recommendations"], &rows));
        }
        None => {
            let _ = writeln!(out, "(hidden; `soil-tests` to show)");
        }
    }
    let _ = writeln!(
        out,
        "  add-soil-test farm=<farm id> date=YYYY-MM-DD ph=<pH> n=<ppm> p=<ppm> k=<ppm> om=<%> notes=\"<recommendations>\""
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Farm activities");
    match &data.activities {
        Some(activities) if activities.is_empty() => {
            let _ = writeln!(out, "No activities recorded yet.");
        }
        Some(activities) => {
            let rows: Vec<Vec<String>> = activities
                .iter()
                .map(|a| {
                    vec![
                        a.activity_date.to_string(),
                        scope.farm_name(a.farm_id).unwrap_or("-").to_string(),
                        a.activity_category.to_string(),
                        a.activity_type.clone(),
                        opt(a.description.as_deref()),
                    ]
                })
                .collect();
            let _ = writeln!(out, "{}", table(&["Date", "Farm", "Category", "Type", "Description"], &rows));
        }
        None => {
            let _ = writeln!(out, "Activity log unavailable.");
        }
    }
    let _ = writeln!(
        out,
        "  add-activity farm=<farm id> date=YYYY-MM-DD category=<category> type=<type> description=\"<text>\""
    );
    let _ = writeln!(out, "  gap-report [year]");

    if let Some(requested) = data.gap_report_year
        && let Some(activities) = data.gap_activities.as_ref().or(data.activities.as_ref())
    {
        let _ = writeln!(out);
        out.push_str(&gap_report_section(activities, requested));
    }
    out.trim_end().to_string()
}

fn gap_report_section(activities: &[FarmActivity], requested: Option<i32>) -> String {
    let mut out = String::new();
    let years = report_years(activities);
    let Some(year) = requested.or_else(|| years.first().copied()) else {
        let _ = writeln!(out, "GAP report: no activities recorded.");
        return out;
    };
    let _ = writeln!(out, "GAP report {}", year);
    let _ = writeln!(out, "{}", RULE);
    let report = gap_report(activities);
    match report.get(&year) {
        None => {
            let _ = writeln!(out, "No activities in {}.", year);
        }
        Some(by_category) => {
            for (category, items) in by_category {
                let _ = writeln!(out, "{} ({})", category, items.len());
                for a in items {
                    let _ = writeln!(
                        out,
                        "  {}  {}  {}",
                        a.activity_date,
                        a.activity_type,
                        a.description.as_deref().unwrap_or("")
                    );
                }
            }
        }
    }
    if !years.is_empty() {
        let _ = writeln!(
            out,
            "Years on record: {}",
            years.iter().map(|y| y.to_string()).collect::<Vec<_>>().join(", ")
        );
    }
    let _ = write!(out, "  hide-report");
    out
}
