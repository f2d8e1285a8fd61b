//! Outbound connection to the router.
//!
//! When the HSS tears registrations down, the gateway instructs the
//! router to clear the matching bindings with a single
//! `DELETE /registrations` call. Transient (5xx / send) failures are
//! retried with exponential back-off.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use uuid::Uuid;

use cx_domain::config::RouterConfig;
use cx_domain::error::{Error, Result};
use cx_domain::trace::TraceEvent;

/// Seam for the router-bound HTTP surface.
#[async_trait]
pub trait RouterNotifier: Send + Sync {
    /// Ask the router to drop the bindings for the given identities.
    /// Returns the router's HTTP status; the caller maps it to the HSS
    /// answer code.
    async fn deregister_bindings(
        &self,
        send_notifications: bool,
        impus: &[String],
        impis: &[String],
        trail: Uuid,
    ) -> Result<u16>;
}

/// Build the deregistration body. With IMPIs present the registrations
/// array is the Cartesian product of default public identity ×
/// private identity; without, just the list of public identities.
pub fn dereg_body(impus: &[String], impis: &[String]) -> serde_json::Value {
    let mut registrations = Vec::new();
    for impu in impus {
        if impis.is_empty() {
            registrations.push(json!({ "primary-impu": impu }));
        } else {
            for impi in impis {
                registrations.push(json!({ "primary-impu": impu, "impi": impi }));
            }
        }
    }
    json!({ "registrations": registrations })
}

/// Production notifier over `reqwest`.
pub struct HttpRouterNotifier {
    http: Client,
    base_url: String,
    max_retries: u32,
}

impl HttpRouterNotifier {
    pub fn new(cfg: &RouterConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            max_retries: cfg.max_retries,
        })
    }
}

#[async_trait]
impl RouterNotifier for HttpRouterNotifier {
    async fn deregister_bindings(
        &self,
        send_notifications: bool,
        impus: &[String],
        impis: &[String],
        trail: Uuid,
    ) -> Result<u16> {
        let url = format!(
            "{}/registrations?send-notifications={}",
            self.base_url,
            if send_notifications { "true" } else { "false" }
        );
        let body = dereg_body(impus, impis);
        let registrations = body["registrations"].as_array().map(Vec::len).unwrap_or(0);

        let mut last_err: Option<Error> = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                tokio::time::sleep(backoff).await;
            }

            let started = Instant::now();
            let result = self
                .http
                .delete(&url)
                .header("X-Trail-Id", trail.to_string())
                .json(&body)
                .send()
                .await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    TraceEvent::RouterDereg {
                        status,
                        registrations,
                        duration_ms,
                    }
                    .emit();

                    if resp.status().is_server_error() && attempt < self.max_retries {
                        last_err = Some(Error::Http(format!("router returned {status}")));
                        continue;
                    }
                    return Ok(status);
                }
                Err(e) => {
                    TraceEvent::RouterDereg {
                        status: 0,
                        registrations,
                        duration_ms,
                    }
                    .emit();
                    last_err = Some(if e.is_timeout() {
                        Error::Timeout(e.to_string())
                    } else {
                        Error::Http(e.to_string())
                    });
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Http("router dereg: no attempts made".into())))
    }
}
