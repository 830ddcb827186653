//! Row types for the hosted tables the dashboards read and write.
//!
//! Notes
//! - `New*` structs are insert payloads; the backend assigns `id`.
//! - Dates are calendar dates (`NaiveDate`), serialized as `YYYY-MM-DD`.
//! - `profiles.role` is kept as raw text on the wire and interpreted via [`Role`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =====================
// Scalar ID newtype wrappers
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FarmId(pub i64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HarvestLotId(pub i64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarietyId(pub i64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoilTestId(pub i64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub i64);

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl core::fmt::Display for FarmId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =====================
// Identity / profile
// =====================

/// An authenticated principal as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Authorization level stored in `profiles.role`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Farmer,
    /// Any other value, including a NULL column.
    Unrecognized(Option<String>),
}

impl Role {
    pub const ADMIN: &'static str = "ADMIN";
    pub const FARMER: &'static str = "FARMER";

    pub fn from_column(value: Option<&str>) -> Self {
        match value {
            Some(Self::ADMIN) => Role::Admin,
            Some(Self::FARMER) => Role::Farmer,
            other => Role::Unrecognized(other.map(str::to_string)),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Role::Admin => Self::ADMIN,
            Role::Farmer => Self::FARMER,
            Role::Unrecognized(Some(s)) => s.as_str(),
            Role::Unrecognized(None) => "-",
        }
    }
}

/// Row of `profiles` as selected by the role lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Row of the `profiles_with_email` view shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmerSummary {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

// =====================
// Farm data
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Farm {
    pub id: FarmId,
    pub owner_id: UserId,
    pub farm_name: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFarm {
    pub owner_id: UserId,
    pub farm_name: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variety {
    pub id: VarietyId,
    pub name: String,
}

/// `farms(farm_name)` foreign-key expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmNameRef {
    pub farm_name: String,
}

/// `varieties(name)` foreign-key expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarietyNameRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestLot {
    pub id: HarvestLotId,
    pub farm_id: FarmId,
    pub harvest_date: NaiveDate,
    pub cherry_weight_kg: f64,
    #[serde(default)]
    pub variety_id: Option<VarietyId>,
    #[serde(default)]
    pub harvester_name: Option<String>,
    #[serde(default)]
    pub farms: Option<FarmNameRef>,
    #[serde(default)]
    pub varieties: Option<VarietyNameRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHarvestLot {
    pub farm_id: FarmId,
    pub harvest_date: NaiveDate,
    pub cherry_weight_kg: f64,
    pub variety_id: VarietyId,
    pub harvester_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilTest {
    pub id: SoilTestId,
    pub farm_id: FarmId,
    pub test_date: NaiveDate,
    #[serde(default)]
    pub ph_level: Option<f64>,
    #[serde(default)]
    pub nitrogen_ppm: Option<f64>,
    #[serde(default)]
    pub phosphorus_ppm: Option<f64>,
    #[serde(default)]
    pub potassium_ppm: Option<f64>,
    #[serde(default)]
    pub organic_matter_percent: Option<f64>,
    #[serde(default)]
    pub recommendations: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSoilTest {
    pub farm_id: FarmId,
    pub test_date: NaiveDate,
    pub ph_level: f64,
    pub nitrogen_ppm: f64,
    pub phosphorus_ppm: f64,
    pub potassium_ppm: f64,
    pub organic_matter_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<String>,
}

// =====================
// Farm activities (GAP log)
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityCategory {
    Fertilization,
    PestControl,
    WeedControl,
    Pruning,
    Irrigation,
    Harvest,
}

impl ActivityCategory {
    pub const ALL: [ActivityCategory; 6] = [
        ActivityCategory::Fertilization,
        ActivityCategory::PestControl,
        ActivityCategory::WeedControl,
        ActivityCategory::Pruning,
        ActivityCategory::Irrigation,
        ActivityCategory::Harvest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityCategory::Fertilization => "FERTILIZATION",
            ActivityCategory::PestControl => "PEST_CONTROL",
            ActivityCategory::WeedControl => "WEED_CONTROL",
            ActivityCategory::Pruning => "PRUNING",
            ActivityCategory::Irrigation => "IRRIGATION",
            ActivityCategory::Harvest => "HARVEST",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let wanted = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Self::ALL.into_iter().find(|c| c.as_str() == wanted)
    }

    /// Fixed activity types allowed for this category.
    pub fn subtypes(self) -> &'static [&'static str] {
        match self {
            ActivityCategory::Fertilization => &["ORGANIC_FERTILIZER", "CHEMICAL_FERTILIZER", "FOLIAR_SPRAY"],
            ActivityCategory::PestControl => &["BIOLOGICAL", "CHEMICAL", "MANUAL_REMOVAL"],
            ActivityCategory::WeedControl => &["MOWING", "HAND_WEEDING", "HERBICIDE"],
            ActivityCategory::Pruning => &["MAINTENANCE", "STUMPING", "SHADE_TREE"],
            ActivityCategory::Irrigation => &["DRIP", "SPRINKLER", "MANUAL"],
            ActivityCategory::Harvest => &["SELECTIVE_PICKING", "STRIP_PICKING"],
        }
    }

    pub fn allows(self, activity_type: &str) -> bool {
        self.subtypes().contains(&activity_type)
    }
}

impl core::fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmActivity {
    pub id: ActivityId,
    pub farm_id: FarmId,
    pub activity_date: NaiveDate,
    pub activity_category: ActivityCategory,
    pub activity_type: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFarmActivity {
    pub farm_id: FarmId,
    pub activity_date: NaiveDate,
    pub activity_category: ActivityCategory,
    pub activity_type: String,
    pub description: String,
}
