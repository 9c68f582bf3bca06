//! Maps a report onto the status badges shown in the diagnostics panel.

use serde::Serialize;

/// At or below this ratio a homepage is in the worst decile and gets a dashboard alert.
pub const CRITICAL_THRESHOLD: f64 = 0.1;
pub const POOR_THRESHOLD: f64 = 0.5;
pub const EXCELLENT_THRESHOLD: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Good,
    Recommended,
    Critical,
}

impl Status {
    pub fn badge_color(self) -> &'static str {
        match self {
            Status::Good => "green",
            Status::Recommended => "orange",
            Status::Critical => "red",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Unknown,
    Excellent,
    Good,
    Poor,
    VeryPoor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FootprintClass {
    pub status: Status,
    pub tier: Tier,
    pub message_key: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HostingClass {
    pub status: Status,
    pub message_key: &'static str,
}

/// `None` means the report could not be fetched.
///
/// `cleaner_than` is expected in `[0, 1]`; band boundaries belong to the lower band.
pub fn classify_footprint(cleaner_than: Option<f64>) -> FootprintClass {
    let (status, tier, message_key) = match cleaner_than {
        None => (Status::Recommended, Tier::Unknown, "footprint_unknown"),
        Some(ratio) if ratio > EXCELLENT_THRESHOLD => {
            (Status::Good, Tier::Excellent, "footprint_excellent")
        }
        Some(ratio) if ratio > POOR_THRESHOLD => (Status::Good, Tier::Good, "footprint_good"),
        Some(ratio) if ratio > CRITICAL_THRESHOLD => {
            (Status::Recommended, Tier::Poor, "footprint_poor")
        }
        Some(_) => (Status::Critical, Tier::VeryPoor, "footprint_very_poor"),
    };
    FootprintClass {
        status,
        tier,
        message_key,
    }
}

pub fn classify_hosting(is_green: Option<bool>) -> HostingClass {
    let (status, message_key) = match is_green {
        None => (Status::Recommended, "hosting_unknown"),
        Some(true) => (Status::Good, "hosting_green"),
        Some(false) => (Status::Recommended, "hosting_grey"),
    };
    HostingClass {
        status,
        message_key,
    }
}
