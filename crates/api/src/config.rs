//! Process configuration.
//!
//! Environment variables with the `KILIM_` prefix, read once at startup.
//! A missing or unusable key falls back to its default with a warning so a
//! bare environment still boots.

use std::time::Duration;

use kilim_infra::EmptyCompanyListing;

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration for the API process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres DSN; empty selects the in-memory store.
    pub postgres_dsn: String,
    /// Listen address for the HTTP server.
    pub http_addr: String,
    /// Deadline applied to each remote call.
    pub service_timeout: Duration,
    /// How an empty company listing is reported.
    pub empty_company_listing: EmptyCompanyListing,
}

impl Config {
    pub fn from_env() -> Self {
        let postgres_dsn = std::env::var("KILIM_POSTGRES_DSN").unwrap_or_else(|_| {
            tracing::warn!("KILIM_POSTGRES_DSN not set; using the in-memory store");
            String::new()
        });

        let http_addr = std::env::var("KILIM_HTTP_ADDR").unwrap_or_else(|_| {
            tracing::warn!(default = DEFAULT_HTTP_ADDR, "KILIM_HTTP_ADDR not set");
            DEFAULT_HTTP_ADDR.to_string()
        });

        let service_timeout = match std::env::var("KILIM_SERVICE_TIMEOUT_SECS") {
            Ok(raw) => match raw.parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(_) => {
                    tracing::warn!(
                        value = %raw,
                        default = DEFAULT_TIMEOUT_SECS,
                        "KILIM_SERVICE_TIMEOUT_SECS is not a number of seconds"
                    );
                    Duration::from_secs(DEFAULT_TIMEOUT_SECS)
                }
            },
            Err(_) => {
                tracing::warn!(default = DEFAULT_TIMEOUT_SECS, "KILIM_SERVICE_TIMEOUT_SECS not set");
                Duration::from_secs(DEFAULT_TIMEOUT_SECS)
            }
        };

        let empty_company_listing = match std::env::var("KILIM_EMPTY_COMPANY_LISTING").as_deref() {
            Ok("empty") => EmptyCompanyListing::Empty,
            Ok("not_found") | Err(_) => EmptyCompanyListing::NotFound,
            Ok(other) => {
                tracing::warn!(value = other, "unrecognized KILIM_EMPTY_COMPANY_LISTING; using not_found");
                EmptyCompanyListing::NotFound
            }
        };

        Self { postgres_dsn, http_addr, service_timeout, empty_company_listing }
    }
}
