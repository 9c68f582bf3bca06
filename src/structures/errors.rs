use thiserror::Error;

#[derive(Error, Debug)]
pub enum CarbonError {
    #[error("IO error\n{0}")]
    Read(#[from] std::io::Error),

    #[error("askama templating error\n{0}")]
    Askama(#[from] askama::Error),

    #[error("reqwest error\n{0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("sqlx error\n{0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("sqlx migrate error\n{0}")]
    SqlxMigrate(#[from] sqlx::migrate::MigrateError),

    #[error("serde_yaml error\n{0}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("serde_json error\n{0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("website carbon api error\n{0}")]
    Api(String),

    #[error("website carbon api returned an empty report")]
    EmptyReport,
}

impl actix_web::error::ResponseError for CarbonError {}
