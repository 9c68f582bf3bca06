//! Diagnostics panel: the hosting and footprint checks and the info sections.

use serde::Serialize;

use crate::classify::{classify_footprint, classify_hosting, Status, Tier};
use crate::format::format_number;
use crate::structures::model::CarbonReport;

pub const HOSTING_TEST: &str = "carbonfootprint_hosting";
pub const FOOTPRINT_TEST: &str = "carbonfootprint_footprint";

const WEBSITE_CARBON_URL: &str = "https://www.websitecarbon.com";
const GREEN_DIRECTORY_URL: &str = "https://www.thegreenwebfoundation.org/directory/";
const STRATEGIES_URL: &str = "https://sustainablewebdesign.org/strategies/";

const FOOTPRINT_BASE: &str = "Websites have an actual carbon footprint, because the energy needed to power them often comes from fossil fuels. ";
const ENERGY_UNKNOWN: &str =
    "The type of energy used to run your website could not be determined";

#[derive(Debug, Clone, Serialize)]
pub struct RegisteredTest {
    pub label: &'static str,
    pub test: &'static str,
    pub endpoint: &'static str,
}

/// Async checks the diagnostics panel runs, in display order.
pub const REGISTERED_TESTS: [RegisteredTest; 2] = [
    RegisteredTest {
        label: "The energy used by the hosting",
        test: HOSTING_TEST,
        endpoint: "/site-health/tests/hosting",
    },
    RegisteredTest {
        label: "The carbon footprint of the homepage",
        test: FOOTPRINT_TEST,
        endpoint: "/site-health/tests/footprint",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Badge {
    pub label: &'static str,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub href: &'static str,
    pub text: &'static str,
    pub external: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub label: String,
    pub status: Status,
    pub badge: Badge,
    pub description: String,
    pub actions: Vec<Link>,
    pub test: &'static str,
    pub message_key: &'static str,
}

impl TestResult {
    fn new(test: &'static str, status: Status, message_key: &'static str) -> Self {
        TestResult {
            label: String::new(),
            status,
            badge: Badge {
                label: "Sustainability",
                color: status.badge_color(),
            },
            description: String::new(),
            actions: Vec::new(),
            test,
            message_key,
        }
    }
}

fn test_your_site() -> Link {
    Link {
        href: WEBSITE_CARBON_URL,
        text: "Test your site",
        external: false,
    }
}

pub fn hosting_test(report: Option<&CarbonReport>) -> TestResult {
    let class = classify_hosting(report.map(|report| report.is_green));
    let mut result = TestResult::new(HOSTING_TEST, class.status, class.message_key);
    match report.map(|report| report.is_green) {
        None => {
            result.label = "Determine whether your site uses renewable energy".to_string();
            result.description = "The test did not succeed. Please note that your site needs to be public to be tested. If it is, then something must have gone wrong... Consider testing your site manually to learn more about the carbon footprint of your website.".to_string();
            result.actions.push(test_your_site());
        }
        Some(true) => {
            result.label = "Your website runs on renewable energy".to_string();
            result.description = "Nice! You save around 10% of carbon emissions by using renewable energy to run your website. The other part of the emission is determined by other parameters, such as the size of your web pages, the network and the end user devices.".to_string();
        }
        Some(false) => {
            result.label = "Your website runs on bog standard energy".to_string();
            result.description = "Oh no, it looks like your website does not run on renewable energy (or your host is not listed in the Green Hosting Directory). You could save around 10% of carbon emissions by using renewable energy. Please consider informing your hosting provider or switching to another host.".to_string();
            result.actions.push(Link {
                href: GREEN_DIRECTORY_URL,
                text: "Check out green hosting providers",
                external: false,
            });
        }
    }
    result
}

pub fn footprint_test(report: Option<&CarbonReport>) -> TestResult {
    let cleaner_than = report.map(|report| report.cleaner_than);
    let class = classify_footprint(cleaner_than);
    let mut result = TestResult::new(FOOTPRINT_TEST, class.status, class.message_key);
    let ratio = cleaner_than.unwrap_or_default();

    result.label = match class.tier {
        Tier::Unknown => "Estimate the carbon footprint of your homepage".to_string(),
        Tier::Excellent | Tier::Good => format!(
            "Your homepage is cleaner than {}% of web pages tested",
            format_number(ratio * 100.0, 0)
        ),
        Tier::Poor | Tier::VeryPoor => format!(
            "Your homepage is dirtier than {}% of web pages tested",
            format_number((1.0 - ratio) * 100.0, 0)
        ),
    };
    result.description = match class.tier {
        Tier::Unknown => "The footprint of your homepage could not be determined. Please consider testing your site manually if you want to learn more about the carbon footprint of your website.".to_string(),
        Tier::Excellent => format!("{FOOTPRINT_BASE}Your homepage is doing great, however, when compared to other pages tested. Keep up the good work!"),
        Tier::Good => format!("{FOOTPRINT_BASE}Your homepage is doing quite good when compared to other pages tested. It might be doing even better with the information below."),
        Tier::Poor => format!("{FOOTPRINT_BASE}Your homepage has a relatively large footprint when compared to other pages tested. Learn how to improve it using the information below."),
        Tier::VeryPoor => format!("{FOOTPRINT_BASE}Your homepage has a large footprint when compared to other pages tested. It could be much lower. Learn how to improve it using the information below."),
    };
    if class.tier == Tier::Unknown {
        result.actions.push(test_your_site());
    }
    result.actions.extend([
        Link {
            href: STRATEGIES_URL,
            text: "Find out how to lower the footprint of your website",
            external: true,
        },
        Link {
            href: WEBSITE_CARBON_URL,
            text: "Check other pages of your website with the Website Carbon Calculator",
            external: true,
        },
    ]);
    result
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoField {
    pub key: &'static str,
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoSection {
    pub key: &'static str,
    pub label: &'static str,
    pub fields: Vec<InfoField>,
}

fn energy_source(report: Option<&CarbonReport>) -> &'static str {
    match report.map(|report| report.is_green) {
        Some(true) => "Renewable energy",
        Some(false) => "Bog standard energy",
        None => ENERGY_UNKNOWN,
    }
}

/// The carbon footprint info section, left out entirely without a report.
pub fn carbon_info(report: Option<&CarbonReport>) -> Option<InfoSection> {
    let report = report?;
    Some(InfoSection {
        key: "carbonfootprint",
        label: "Carbon Footprint",
        fields: vec![
            InfoField {
                key: "energy_source",
                label: "Energy source server",
                value: energy_source(Some(report)).to_string(),
            },
            InfoField {
                key: "homepage_size",
                label: "Homepage size",
                value: format!("{} KB", format_number(report.bytes as f64 / 1000.0, 0)),
            },
            InfoField {
                key: "emission",
                label: "Carbon emission",
                value: format!(
                    "{} g (grams) of CO2 per pageview for the homepage",
                    format_number(report.carbon_emission(), 2)
                ),
            },
        ],
    })
}

/// Energy source line for the server section.
pub fn server_info(report: Option<&CarbonReport>) -> InfoSection {
    InfoSection {
        key: "wp-server",
        label: "Server",
        fields: vec![InfoField {
            key: "energy_source",
            label: "Energy source",
            value: energy_source(report).to_string(),
        }],
    }
}

pub fn debug_information(report: Option<&CarbonReport>) -> Vec<InfoSection> {
    carbon_info(report)
        .into_iter()
        .chain([server_info(report)])
        .collect()
}
