// File: ./src/client/core.rs
use crate::client::middleware::{DefaultHeadersLayer, DefaultHeadersService};
use crate::client::redirect::{FollowRedirectLayer, FollowRedirectService};
use crate::config::Config;
use crate::model::Dataset;
use crate::sanitize::{clean_incoming, normalize_dataset_for_write};

use anyhow::{Context, Result, anyhow, bail};
use http::{Method, Request, StatusCode, Uri, header};
use http_body_util::BodyExt;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde_json::Value;
use std::time::Duration;
use tower::{ServiceBuilder, ServiceExt};

/// Spreadsheet web apps reject CORS preflights, so writes go out as plain text.
pub const WRITE_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

type HttpsClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, String>;
type Transport = FollowRedirectService<DefaultHeadersService<HttpsClient>>;

#[derive(Clone, Debug)]
struct Remote {
    endpoint: Uri,
    transport: Transport,
}

/// Reads and writes the whole dataset at a single endpoint.
///
/// Neither operation returns an error: every failure is logged and degrades
/// to `None` / `false`.
#[derive(Clone, Debug)]
pub struct RemoteGateway {
    remote: Option<Remote>,
    timeout: Option<Duration>,
}

fn build_transport(config: &Config) -> Transport {
    let mut root_store = rustls::RootCertStore::empty();
    let result = rustls_native_certs::load_native_certs();
    for err in &result.errors {
        log::debug!("Skipping native certificate: {}", err);
    }
    let (added, _) = root_store.add_parsable_certificates(result.certs);
    if added == 0 {
        log::warn!("No system certificates found; only plain http endpoints will work");
    }

    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let https_connector = HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1()
        .build();

    let http_client: HttpsClient = Client::builder(TokioExecutor::new()).build(https_connector);

    ServiceBuilder::new()
        .layer(FollowRedirectLayer::new(config.max_redirects))
        .layer(DefaultHeadersLayer::new(&config.user_agent))
        .service(http_client)
}

impl RemoteGateway {
    /// Builds a gateway for the configured endpoint. An empty endpoint gives an
    /// unconfigured gateway; an invalid one is an error.
    pub fn new(config: &Config) -> Result<Self> {
        let timeout = config.request_timeout_secs.map(Duration::from_secs);
        let Some(endpoint) = config.endpoint_uri()? else {
            return Ok(Self {
                remote: None,
                timeout,
            });
        };
        Ok(Self {
            remote: Some(Remote {
                endpoint,
                transport: build_transport(config),
            }),
            timeout,
        })
    }

    /// A gateway with no endpoint: reads yield `None`, writes yield `false`.
    pub fn offline() -> Self {
        Self {
            remote: None,
            timeout: None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.remote.is_some()
    }

    pub fn endpoint(&self) -> Option<&Uri> {
        self.remote.as_ref().map(|r| &r.endpoint)
    }

    // --- READ ---

    /// Fetches and sanitizes the remote dataset.
    ///
    /// `None` means "no usable remote data" (unconfigured, unreachable, non-2xx,
    /// undecodable). A successful response with empty collections is `Some`.
    pub async fn fetch_remote(&self) -> Option<Dataset> {
        let Some(remote) = &self.remote else {
            log::debug!("No endpoint configured, skipping remote fetch");
            return None;
        };
        match self.try_fetch(remote).await {
            Ok(data) => {
                log::debug!(
                    "Fetched {} events and {} help services",
                    data.events.len(),
                    data.help.len()
                );
                Some(data)
            }
            Err(e) => {
                log::warn!("DB fetch error: {:#}", e);
                None
            }
        }
    }

    async fn try_fetch(&self, remote: &Remote) -> Result<Dataset> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(remote.endpoint.clone())
            .body(String::new())?;
        let (status, body) = self.execute(remote, req).await?;
        if !status.is_success() {
            bail!("endpoint answered {}", status);
        }
        let raw: Value = serde_json::from_slice(&body).context("response is not valid JSON")?;
        clean_incoming(&raw)
    }

    // --- WRITE ---

    /// Normalizes and uploads the full dataset, replacing the remote copy.
    /// Returns whether the endpoint acknowledged with a 2xx status.
    pub async fn push_remote(&self, data: &Dataset) -> bool {
        let Some(remote) = &self.remote else {
            return false;
        };
        match self.try_push(remote, data).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("DB save error: {:#}", e);
                false
            }
        }
    }

    async fn try_push(&self, remote: &Remote, data: &Dataset) -> Result<()> {
        let body = serde_json::to_string(&normalize_dataset_for_write(data))?;
        let req = Request::builder()
            .method(Method::POST)
            .uri(remote.endpoint.clone())
            .header(header::CONTENT_TYPE, WRITE_CONTENT_TYPE)
            .body(body)?;
        let (status, _) = self.execute(remote, req).await?;
        if !status.is_success() {
            bail!("endpoint answered {}", status);
        }
        Ok(())
    }

    // --- TRANSPORT ---

    async fn execute(&self, remote: &Remote, req: Request<String>) -> Result<(StatusCode, Vec<u8>)> {
        let transport = remote.transport.clone();
        let exchange = async move {
            let response = transport.oneshot(req).await.context("request failed")?;
            let (parts, body) = response.into_parts();
            let bytes = body
                .collect()
                .await
                .context("failed to read response body")?
                .to_bytes();
            Ok::<_, anyhow::Error>((parts.status, bytes.to_vec()))
        };
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| anyhow!("request timed out after {:?}", limit))?,
            None => exchange.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_endpoint_is_unconfigured() {
        let gateway = RemoteGateway::new(&Config::default()).unwrap();
        assert!(!gateway.is_configured());
        assert!(gateway.endpoint().is_none());
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let config = Config {
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        assert!(RemoteGateway::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_offline_gateway_degrades() {
        let gateway = RemoteGateway::offline();
        assert!(gateway.fetch_remote().await.is_none());
        assert!(!gateway.push_remote(&Dataset::default()).await);
    }
}
