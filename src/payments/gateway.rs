//! Payment gateway clients.
//!
//! # Responsibilities
//! - Define the `PaymentGateway` seam used by the dispatcher
//! - Call a real upstream over HTTP with a hard request timeout
//! - Provide an in-process gateway with a fixed outcome
//!
//! # Design Decisions
//! - A timeout is an ordinary failure, reported like any other
//! - Any non-2xx upstream status is a failure
//! - Gateways never retry; the dispatcher decides what happens next

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::UpstreamConfig;
use crate::payments::error::GatewayError;

/// A side-effecting payment operation.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Label used in logs and errors.
    fn name(&self) -> &str;

    /// Attempt one payment.
    async fn process(&self) -> Result<(), GatewayError>;
}

/// Gateway backed by an HTTP upstream.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    name: String,
    url: Url,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(name: impl Into<String>, url: Url, timeout: Duration) -> Result<Self, GatewayError> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        // Loopback upstreams never go through a proxy.
        if is_loopback(&url) {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(GatewayError::Client)?;

        Ok(Self {
            name: name.into(),
            url,
            timeout,
            client,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(self.url.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout {
                        gateway: self.name.clone(),
                        after: self.timeout,
                    }
                } else {
                    GatewayError::Transport {
                        gateway: self.name.clone(),
                        source: e,
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(gateway = %self.name, status = %status, "Payment gateway returned an error status");
            return Err(GatewayError::Status {
                gateway: self.name.clone(),
                status: status.as_u16(),
            });
        }

        tracing::info!(gateway = %self.name, "Payment gateway success");
        Ok(())
    }
}

/// In-process gateway with a fixed outcome and optional latency.
#[derive(Debug, Clone)]
pub struct StaticGateway {
    name: String,
    succeed: bool,
    latency: Duration,
}

impl StaticGateway {
    pub fn succeeding(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            succeed: true,
            latency: Duration::ZERO,
        }
    }

    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            succeed: false,
            ..Self::succeeding(name)
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl PaymentGateway for StaticGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self) -> Result<(), GatewayError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.succeed {
            tracing::info!(gateway = %self.name, "Payment gateway success");
            Ok(())
        } else {
            tracing::warn!(gateway = %self.name, "Payment gateway declined");
            Err(GatewayError::Declined {
                gateway: self.name.clone(),
            })
        }
    }
}

/// Build the gateway described by `config`.
pub fn build_gateway(
    name: &str,
    config: &UpstreamConfig,
) -> Result<Arc<dyn PaymentGateway>, GatewayError> {
    match config {
        UpstreamConfig::Http { url, timeout_ms } => {
            let parsed = Url::parse(url).map_err(|e| GatewayError::InvalidUrl {
                url: url.clone(),
                source: e,
            })?;
            let gateway = HttpGateway::new(name, parsed, Duration::from_millis(*timeout_ms))?;
            Ok(Arc::new(gateway))
        }
        UpstreamConfig::Static {
            succeed,
            latency_ms,
        } => {
            let gateway = if *succeed {
                StaticGateway::succeeding(name)
            } else {
                StaticGateway::failing(name)
            };
            Ok(Arc::new(gateway.with_latency(Duration::from_millis(*latency_ms))))
        }
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain == "localhost",
        Some(url::Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
        Some(url::Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
        None => false,
    }
}
