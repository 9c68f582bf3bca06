use serde::Deserialize;

pub const DEFAULT_API_URL: &str = "https://api.websitecarbon.com/site";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentType {
    Local,
    Development,
    Staging,
    #[default]
    Production,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// public homepage, the one the measurement service will load
    #[serde(default)]
    pub home_url: Option<String>,
    #[serde(default)]
    pub environment: EnvironmentType,
}

impl SiteConfig {
    pub fn environment_type(&self) -> EnvironmentType {
        self.environment
    }

    pub fn is_local(&self) -> bool {
        self.environment == EnvironmentType::Local
    }

    pub fn home_url(&self) -> Option<&str> {
        self.home_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}
