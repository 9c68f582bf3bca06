use serde::{Deserialize, Serialize};

use crate::classify::CRITICAL_THRESHOLD;

/// Normalised homepage report, cached for a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonReport {
    pub is_green: bool,
    pub bytes: u64,
    pub cleaner_than: f64,
    pub co2_grid_grams: f64,
    pub co2_renewable_grams: f64,
}

impl CarbonReport {
    /// Grams of CO2 per pageview for the energy the host actually uses.
    pub fn carbon_emission(&self) -> f64 {
        if self.is_green {
            self.co2_renewable_grams
        } else {
            self.co2_grid_grams
        }
    }
}

/// The part of a bad report that outlives the cache, driving the dashboard alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedAlertData {
    pub cleaner_than: f64,
    pub carbon_emission: f64,
    pub homepage_size: u64,
}

impl DerivedAlertData {
    /// `None` when the homepage scores better than the worst decile.
    pub fn from_report(report: &CarbonReport) -> Option<Self> {
        (report.cleaner_than <= CRITICAL_THRESHOLD).then(|| Self {
            cleaner_than: report.cleaner_than,
            carbon_emission: report.carbon_emission(),
            homepage_size: report.bytes,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReport {
    pub green: GreenFlag,
    pub bytes: u64,
    pub cleaner_than: f64,
    pub statistics: ApiStatistics,
}

/// The API sends `"true"`/`"false"` (or `"unknown"`), older responses a plain boolean.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GreenFlag {
    Bool(bool),
    Text(String),
}

impl GreenFlag {
    pub fn is_green(&self) -> bool {
        match self {
            GreenFlag::Bool(green) => *green,
            GreenFlag::Text(green) => green.eq_ignore_ascii_case("true"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiStatistics {
    pub co2: ApiCo2,
}

#[derive(Debug, Deserialize)]
pub struct ApiCo2 {
    pub grid: ApiGrams,
    pub renewable: ApiGrams,
}

#[derive(Debug, Deserialize)]
pub struct ApiGrams {
    pub grams: f64,
}

impl From<ApiReport> for CarbonReport {
    fn from(report: ApiReport) -> Self {
        CarbonReport {
            is_green: report.green.is_green(),
            bytes: report.bytes,
            cleaner_than: report.cleaner_than.clamp(0.0, 1.0),
            co2_grid_grams: report.statistics.co2.grid.grams,
            co2_renewable_grams: report.statistics.co2.renewable.grams,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct TransientModel {
    pub name: String,
    pub value: serde_json::Value,
    pub expires_at: time::OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct OptionModel {
    pub name: String,
    pub value: serde_json::Value,
}
