mod cache;
mod classify;
mod client;
mod dashboard;
mod format;
mod site_health;
mod store;
mod structures;

use std::{fs::File, io::BufReader};

use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use askama::Template;
use clap::{command, Parser};
use log::{info, warn};
use reqwest::Client;
use serde::Serialize;

use crate::cache::ReportCache;
use crate::client::CarbonClient;
use crate::dashboard::{activate, take_activation_notice, ActivationNotice, AlertWidget};
use crate::site_health::{
    debug_information, footprint_test, hosting_test, InfoSection, TestResult, REGISTERED_TESTS,
};
use crate::store::{MemoryStore, PgStore, Store};
use crate::structures::{config::Config, errors::CarbonError};

#[cfg(all(target_env = "musl", target_pointer_width = "64"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[derive(Debug, Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    notice: Option<ActivationNotice>,
    widget: Option<AlertWidget>,
}

#[derive(Debug, Template)]
#[template(path = "site_health.html")]
struct SiteHealthTemplate {
    tests: Vec<TestResult>,
    sections: Vec<InfoSection>,
}

/// Envelope the diagnostics panel expects from its async checks.
#[derive(Debug, Serialize)]
struct AjaxResponse<T> {
    success: bool,
    data: T,
}

impl<T: Serialize> AjaxResponse<T> {
    fn ok(data: T) -> HttpResponse {
        HttpResponse::Ok().json(AjaxResponse {
            success: true,
            data,
        })
    }
}

async fn dashboard_handler<S: Store>(
    cache: web::Data<ReportCache<S>>,
) -> Result<HttpResponse, CarbonError> {
    // refreshes the alert data once the cached report has expired
    cache.get_report().await;
    let notice = take_activation_notice(cache.store(), cache.site()).await?;
    let widget = cache
        .alert_data()
        .await
        .as_ref()
        .and_then(AlertWidget::from_alert);
    let dashboard = DashboardTemplate { notice, widget };
    Ok(HttpResponse::Ok()
        .content_type("text/html")
        .body(dashboard.render()?))
}

async fn site_health_handler<S: Store>(
    cache: web::Data<ReportCache<S>>,
) -> Result<HttpResponse, CarbonError> {
    let report = cache.get_report().await;
    let page = SiteHealthTemplate {
        tests: vec![
            hosting_test(report.as_ref()),
            footprint_test(report.as_ref()),
        ],
        sections: debug_information(report.as_ref()),
    };
    Ok(HttpResponse::Ok()
        .content_type("text/html")
        .body(page.render()?))
}

async fn registered_tests_handler() -> HttpResponse {
    HttpResponse::Ok().json(REGISTERED_TESTS)
}

async fn hosting_test_handler<S: Store>(cache: web::Data<ReportCache<S>>) -> HttpResponse {
    let report = cache.get_report().await;
    AjaxResponse::ok(hosting_test(report.as_ref()))
}

async fn footprint_test_handler<S: Store>(cache: web::Data<ReportCache<S>>) -> HttpResponse {
    let report = cache.get_report().await;
    AjaxResponse::ok(footprint_test(report.as_ref()))
}

async fn info_handler<S: Store>(cache: web::Data<ReportCache<S>>) -> HttpResponse {
    let report = cache.get_report().await;
    HttpResponse::Ok().json(debug_information(report.as_ref()))
}

async fn activate_handler<S: Store>(
    cache: web::Data<ReportCache<S>>,
) -> Result<HttpResponse, CarbonError> {
    activate(cache.store()).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn deactivate_handler<S: Store>(
    cache: web::Data<ReportCache<S>>,
) -> Result<HttpResponse, CarbonError> {
    info!("Carbon footprint deactivated, clearing report data");
    cache.invalidate().await?;
    Ok(HttpResponse::NoContent().finish())
}

fn routes<S: Store>(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(dashboard_handler::<S>))
        .route("/site-health", web::get().to(site_health_handler::<S>))
        .route("/site-health/tests", web::get().to(registered_tests_handler))
        .route(
            "/site-health/tests/hosting",
            web::get().to(hosting_test_handler::<S>),
        )
        .route(
            "/site-health/tests/footprint",
            web::get().to(footprint_test_handler::<S>),
        )
        .route("/site-health/info", web::get().to(info_handler::<S>))
        .route("/plugin/activate", web::post().to(activate_handler::<S>))
        .route("/plugin/deactivate", web::post().to(deactivate_handler::<S>));
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// path to config file
    #[arg(long, env, default_value = "./config.yaml")]
    config_path: String,
}

async fn serve<S: Store>(
    config: Config,
    client: CarbonClient,
    store: S,
) -> Result<(), CarbonError> {
    info!(
        "Measuring {} ({:?} environment)",
        config.site.home_url().unwrap_or("<no home url>"),
        config.site.environment_type()
    );
    let cache = web::Data::new(ReportCache::new(client, store, config.site));
    info!("Listening on {}:{}", config.listen, config.port);

    Ok(HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(cache.clone())
            .configure(routes::<S>)
    })
    .bind((config.listen.as_str(), config.port))?
    .run()
    .await?)
}

#[actix_web::main]
async fn main() -> Result<(), CarbonError> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Args::parse();
    info!("Started with args: {:?}", args);

    info!("Reading config from {}", args.config_path);
    let config: Config = serde_yaml::from_reader(BufReader::new(File::open(&args.config_path)?))?;

    let client = CarbonClient::new(Client::new(), config.api_url.clone());

    match config.database_url.clone() {
        Some(database_url) => {
            let store = PgStore::connect(&database_url).await?;
            serve(config, client, store).await
        }
        None => {
            warn!("No database_url configured, carbon data will not survive a restart");
            serve(config, client, MemoryStore::default()).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::cache_for;
    use crate::client::tests::api_body;
    use crate::structures::config::EnvironmentType;
    use actix_web::test;
    use serde_json::Value;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_api(body: Value, calls: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(calls)
            .mount(&server)
            .await;
        server
    }

    macro_rules! admin {
        ($server:expr, $environment:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(cache_for(&$server, $environment)))
                    .configure(routes::<MemoryStore>),
            )
            .await
        };
    }

    async fn body_text(response: actix_web::dev::ServiceResponse) -> String {
        String::from_utf8(test::read_body(response).await.to_vec()).unwrap()
    }

    #[actix_web::test]
    async fn dashboard_shows_alert_for_heavy_homepage() {
        let server = mock_api(api_body("false", 0.05, 2.0, 1.8), 1).await;
        let app = admin!(server, EnvironmentType::Production);

        let response = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(response.status().is_success());
        let body = body_text(response).await;
        assert!(body.contains("Your homepage has a large carbon footprint"));
        assert!(body.contains("<strong>2.00 grams of CO<sub>2</sub>"));
        assert!(body.contains("2.50 MB!"));

        // second render is served from the cache
        let response = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(body_text(response).await.contains("2.00 grams"));
    }

    #[actix_web::test]
    async fn dashboard_has_no_alert_for_light_homepage() {
        let server = mock_api(api_body("true", 0.95, 0.1, 0.09), 1).await;
        let app = admin!(server, EnvironmentType::Production);

        let response = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(!body_text(response).await.contains("dashboard_carbonfootprint"));
    }

    #[actix_web::test]
    async fn activation_notice_appears_once() {
        let server = mock_api(api_body("true", 0.95, 0.1, 0.09), 1).await;
        let app = admin!(server, EnvironmentType::Production);

        let response = test::call_service(
            &app,
            test::TestRequest::post().uri("/plugin/activate").to_request(),
        )
        .await;
        assert_eq!(response.status(), actix_web::http::StatusCode::NO_CONTENT);

        let response = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(body_text(response).await.contains("Test your site using Site Health"));
        let response = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(!body_text(response).await.contains("Test your site using Site Health"));
    }

    #[actix_web::test]
    async fn local_site_is_never_measured() {
        let server = mock_api(api_body("true", 0.95, 0.1, 0.09), 0).await;
        let app = admin!(server, EnvironmentType::Local);

        test::call_service(
            &app,
            test::TestRequest::post().uri("/plugin/activate").to_request(),
        )
        .await;
        let response = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(body_text(response).await.contains("your website is a local site"));

        let result: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/site-health/tests/footprint")
                .to_request(),
        )
        .await;
        assert_eq!(result["success"], true);
        assert_eq!(result["data"]["status"], "recommended");
        assert_eq!(result["data"]["message_key"], "footprint_unknown");
    }

    #[actix_web::test]
    async fn hosting_test_reports_green_energy() {
        let server = mock_api(api_body("true", 0.7, 0.3, 0.25), 1).await;
        let app = admin!(server, EnvironmentType::Production);

        let result: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/site-health/tests/hosting")
                .to_request(),
        )
        .await;
        assert_eq!(result["data"]["status"], "good");
        assert_eq!(result["data"]["badge"]["color"], "green");
        assert_eq!(result["data"]["test"], "carbonfootprint_hosting");
    }

    #[actix_web::test]
    async fn info_omits_carbon_section_when_unavailable() {
        let server = mock_api(serde_json::json!({ "error": "Timeout" }), 1).await;
        let app = admin!(server, EnvironmentType::Production);

        let sections: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/site-health/info").to_request(),
        )
        .await;
        let sections = sections.as_array().unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0]["key"], "wp-server");
    }

    #[actix_web::test]
    async fn site_health_page_renders_from_one_fetch() {
        let server = mock_api(api_body("false", 0.3, 0.8, 0.7), 1).await;
        let app = admin!(server, EnvironmentType::Production);

        let response = test::call_service(
            &app,
            test::TestRequest::get().uri("/site-health").to_request(),
        )
        .await;
        let body = body_text(response).await;
        assert!(body.contains("Your website runs on bog standard energy"));
        assert!(body.contains("Your homepage is dirtier than 70% of web pages tested"));
        assert!(body.contains("0.80 g (grams) of CO2 per pageview"));
    }

    #[actix_web::test]
    async fn deactivate_forces_fresh_report() {
        let server = mock_api(api_body("false", 0.05, 2.0, 1.8), 2).await;
        let app = admin!(server, EnvironmentType::Production);

        test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        let response = test::call_service(
            &app,
            test::TestRequest::post().uri("/plugin/deactivate").to_request(),
        )
        .await;
        assert_eq!(response.status(), actix_web::http::StatusCode::NO_CONTENT);
        test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    }

    #[actix_web::test]
    async fn registered_tests_are_listed() {
        let server = mock_api(api_body("true", 0.95, 0.1, 0.09), 0).await;
        let app = admin!(server, EnvironmentType::Production);

        let tests: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/site-health/tests").to_request(),
        )
        .await;
        assert_eq!(tests[0]["test"], "carbonfootprint_hosting");
        assert_eq!(tests[1]["endpoint"], "/site-health/tests/footprint");
    }
}
