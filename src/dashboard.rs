use std::time::Duration;

use log::info;

use crate::format::format_number;
use crate::store::TransientStore;
use crate::structures::{config::SiteConfig, errors::CarbonError, model::DerivedAlertData};

pub const ACTIVATION_TRANSIENT: &str = "carbonfootprint_activated";
pub const ACTIVATION_TTL: Duration = Duration::from_secs(5);

const AVERAGE_PAGE_GRAMS: f64 = 0.5;
const MONTHLY_PAGE_VIEWS: f64 = 10_000.0;

/// Shown once on the dashboard after activation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationNotice {
    pub local: bool,
}

/// The large-footprint warning, all figures already formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertWidget {
    pub emission: String,
    pub times_average: String,
    pub monthly_views: String,
    pub yearly_kg: String,
    pub size_mb: String,
}

impl AlertWidget {
    pub fn from_alert(alert: &DerivedAlertData) -> Option<Self> {
        if alert.cleaner_than == 0.0 {
            return None;
        }
        let emission = alert.carbon_emission;
        Some(AlertWidget {
            emission: format_number(emission, 2),
            times_average: format_number((emission / AVERAGE_PAGE_GRAMS).floor(), 0),
            monthly_views: format_number(MONTHLY_PAGE_VIEWS, 0),
            yearly_kg: format_number(emission * MONTHLY_PAGE_VIEWS * 12.0 / 1000.0, 2),
            size_mb: format_number(alert.homepage_size as f64 / 1_000_000.0, 2),
        })
    }
}

pub async fn activate<S: TransientStore>(store: &S) -> Result<(), CarbonError> {
    info!("Carbon footprint activated");
    store
        .set_transient(ACTIVATION_TRANSIENT, &1, ACTIVATION_TTL)
        .await
}

/// Returns the activation notice once, then forgets it.
pub async fn take_activation_notice<S: TransientStore>(
    store: &S,
    site: &SiteConfig,
) -> Result<Option<ActivationNotice>, CarbonError> {
    if store
        .get_transient::<u8>(ACTIVATION_TRANSIENT)
        .await?
        .is_none()
    {
        return Ok(None);
    }
    store.delete_transient(ACTIVATION_TRANSIENT).await?;
    Ok(Some(ActivationNotice {
        local: site.is_local(),
    }))
}
