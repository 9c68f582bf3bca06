use std::time::Duration;

use log::{debug, info, warn};

use crate::client::CarbonClient;
use crate::store::{OptionStore, TransientStore};
use crate::structures::{
    config::SiteConfig,
    errors::CarbonError,
    model::{CarbonReport, DerivedAlertData},
};

pub const REPORT_TRANSIENT: &str = "carbonfootprint_test";
pub const ALERT_OPTION: &str = "carbonfootprint_data";
/// The API caches a tested url for a day as well.
pub const REPORT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Day-long cache in front of [`CarbonClient`], plus the alert data that outlives it.
///
/// Every failure collapses into `None`: a report is either there or it is not, and
/// failures are never cached so the next caller tries again.
#[derive(Debug, Clone)]
pub struct ReportCache<S> {
    client: CarbonClient,
    store: S,
    site: SiteConfig,
}

impl<S: TransientStore + OptionStore> ReportCache<S> {
    pub fn new(client: CarbonClient, store: S, site: SiteConfig) -> Self {
        Self {
            client,
            store,
            site,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    pub async fn get_report(&self) -> Option<CarbonReport> {
        // the measurement service cannot reach a local site
        if self.site.is_local() {
            debug!("Local environment, not requesting a carbon report");
            return None;
        }

        match self.store.get_transient::<CarbonReport>(REPORT_TRANSIENT).await {
            Ok(Some(report)) => {
                debug!("Using cached carbon report");
                return Some(report);
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to read cached carbon report: {}", e),
        }

        let Some(home_url) = self.site.home_url() else {
            warn!("No home url configured, cannot request a carbon report");
            return None;
        };

        let report = match self.client.fetch_report(home_url).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Carbon report for {} unavailable: {}", home_url, e);
                return None;
            }
        };
        info!(
            "Carbon report for {}: cleaner than {:.2}, green: {}",
            home_url, report.cleaner_than, report.is_green
        );

        if let Err(e) = self
            .store
            .set_transient(REPORT_TRANSIENT, &report, REPORT_TTL)
            .await
        {
            warn!("Failed to cache carbon report: {}", e);
        }
        if let Err(e) = self.record_alert(&report).await {
            warn!("Failed to update carbon alert data: {}", e);
        }

        Some(report)
    }

    /// Only called after a fresh fetch, so the alert is recomputed once per cache period.
    async fn record_alert(&self, report: &CarbonReport) -> Result<(), CarbonError> {
        match DerivedAlertData::from_report(report) {
            Some(alert) => self.store.update_option(ALERT_OPTION, &alert).await,
            None => self.store.delete_option(ALERT_OPTION).await,
        }
    }

    pub async fn alert_data(&self) -> Option<DerivedAlertData> {
        self.store
            .get_option(ALERT_OPTION)
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to read carbon alert data: {}", e);
                None
            })
    }

    /// Drops the cached report and the alert data.
    pub async fn invalidate(&self) -> Result<(), CarbonError> {
        self.store.delete_transient(REPORT_TRANSIENT).await?;
        self.store.delete_option(ALERT_OPTION).await
    }
}
