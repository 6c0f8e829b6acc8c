use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use reqwest::Url;

use crate::issuances::IssuanceKind;

pub const DEFAULT_ISSUANCES_PAGE_URL: &str = "https://travel.state.gov/content/travel/en/legal/visa-law0/visa-statistics/nonimmigrant-visa-statistics/monthly-nonimmigrant-visa-issuances.html";
pub const DEFAULT_WAIT_TIMES_PAGE_URL: &str = "https://travel.state.gov/content/travel/en/us-visas/visa-information-resources/global-visa-wait-times.html";
pub const DEFAULT_SITE_BASE_URL: &str = "https://travel.state.gov";

/// Destination tables, one per loaded data set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    pub nationality_raw: String,
    pub post_raw: String,
    pub wait_time_raw: String,
    pub wait_time: String,
}

/// Settings for a single run, loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub issuances_page_url: String,
    pub wait_times_page_url: String,
    pub site_base_url: Url,
    pub http_timeout: Duration,
    pub database_url: Option<String>,
    pub tables: Tables,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            issuances_page_url: DEFAULT_ISSUANCES_PAGE_URL.to_string(),
            wait_times_page_url: DEFAULT_WAIT_TIMES_PAGE_URL.to_string(),
            site_base_url: Url::parse(DEFAULT_SITE_BASE_URL).expect("default base URL is valid"),
            http_timeout: Duration::from_secs(60),
            database_url: None,
            tables: Tables {
                nationality_raw: "visas_issued_by_nationality_raw".to_string(),
                post_raw: "visas_issued_by_post_raw".to_string(),
                wait_time_raw: "visa_wait_time_raw".to_string(),
                wait_time: "visa_wait_time".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// public page URLs and default table names.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = Config::default();
        let var_or = |name: &str, default: String| env::var(name).unwrap_or(default);

        let http_timeout = match env::var("HTTP_TIMEOUT_SECS") {
            Ok(secs) => Duration::from_secs(
                secs.parse()
                    .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            Err(_) => defaults.http_timeout,
        };

        let site_base_url = match env::var("SITE_BASE_URL") {
            Ok(url) => Url::parse(&url).context("SITE_BASE_URL must be an absolute URL")?,
            Err(_) => defaults.site_base_url,
        };

        Ok(Self {
            issuances_page_url: var_or("ISSUANCES_PAGE_URL", defaults.issuances_page_url),
            wait_times_page_url: var_or("WAIT_TIMES_PAGE_URL", defaults.wait_times_page_url),
            site_base_url,
            http_timeout,
            database_url: env::var("DATABASE_URL").ok(),
            tables: Tables {
                nationality_raw: var_or(
                    "VISAS_ISSUED_BY_NATIONALITY_RAW",
                    defaults.tables.nationality_raw,
                ),
                post_raw: var_or("VISAS_ISSUED_BY_POST_RAW", defaults.tables.post_raw),
                wait_time_raw: var_or("VISA_WAIT_TIME_RAW_TABLE", defaults.tables.wait_time_raw),
                wait_time: var_or("VISA_WAIT_TIME_TABLE", defaults.tables.wait_time),
            },
        })
    }

    pub fn issuances_table(&self, kind: IssuanceKind) -> &str {
        match kind {
            IssuanceKind::Nationality => &self.tables.nationality_raw,
            IssuanceKind::Post => &self.tables.post_raw,
        }
    }

    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set unless --dry-run is given")
    }
}
