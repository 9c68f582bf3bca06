use std::time::Duration;

use log::{info, warn};
use reqwest::Client;
use serde_json::Value;

use crate::structures::{
    errors::CarbonError,
    model::{ApiReport, CarbonReport},
};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Talks to the Website Carbon Calculator API. Caching is up to the caller.
#[derive(Debug, Clone)]
pub struct CarbonClient {
    client: Client,
    api_url: String,
}

impl CarbonClient {
    pub fn new(client: Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }

    pub async fn fetch_report(&self, home_url: &str) -> Result<CarbonReport, CarbonError> {
        info!("Requesting carbon report for {}", home_url);
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("url", home_url)])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!("Carbon API answered {} for {}", status, home_url);
        }
        parse_report(&body)
    }
}

fn parse_report(body: &str) -> Result<CarbonReport, CarbonError> {
    if body.trim().is_empty() {
        return Err(CarbonError::EmptyReport);
    }
    let value: Value = serde_json::from_str(body)?;
    let fields = match value.as_object() {
        Some(fields) if !fields.is_empty() => fields,
        _ => return Err(CarbonError::EmptyReport),
    };
    if let Some(error) = fields.get("error") {
        return Err(CarbonError::Api(match error {
            Value::String(message) => message.clone(),
            other => other.to_string(),
        }));
    }
    Ok(serde_json::from_value::<ApiReport>(value)?.into())
}
