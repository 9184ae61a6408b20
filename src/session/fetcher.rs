//! HTTP fetcher implementation
//!
//! This module sends product page requests for a session:
//! - Building one HTTP client per active egress candidate
//! - Browser-like headers with a rotating user agent
//! - Mapping network failures to transport errors

use crate::config::FetchConfig;
use crate::driver::{browser_headers, FetchedPage, UserAgentRotation};
use crate::egress::{EgressCandidate, EgressError};
use crate::session::types::FetchAttempt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::{Client, Proxy};
use std::future::Future;
use thiserror::Error;

/// Network-level failure: connect, proxy, TLS, timeout, or a broken body
#[derive(Debug, Error)]
#[error("Transport error: {0}")]
pub struct TransportError(pub String);

/// Sends one request for a fetch attempt
pub trait Fetcher {
    fn fetch(
        &mut self,
        attempt: &FetchAttempt<'_>,
    ) -> impl Future<Output = Result<FetchedPage, TransportError>> + Send;
}

/// Builds an HTTP client routed through `candidate`, or direct when `None`
///
/// # Example
///
/// ```no_run
/// use shelfwatch::config::FetchConfig;
/// use shelfwatch::egress::EgressCandidate;
/// use shelfwatch::session::build_http_client;
///
/// let candidate = EgressCandidate::public("1.2.3.4:3128");
/// let client = build_http_client(&FetchConfig::default(), Some(&candidate)).unwrap();
/// ```
pub fn build_http_client(
    config: &FetchConfig,
    candidate: Option<&EgressCandidate>,
) -> Result<Client, EgressError> {
    let client_error = |e: reqwest::Error| EgressError::Client {
        candidate: candidate.map_or_else(|| "direct".to_string(), |c| c.address.clone()),
        message: e.to_string(),
    };

    let mut builder = Client::builder()
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .gzip(true)
        .brotli(true);

    builder = match candidate {
        Some(candidate) => builder.proxy(Proxy::all(candidate.proxy_url()).map_err(client_error)?),
        None => builder.no_proxy(),
    };

    builder.build().map_err(client_error)
}

/// [`Fetcher`] backed by reqwest
///
/// The client for the active candidate is kept until a different candidate
/// (or the direct route) is requested.
pub struct HttpFetcher {
    config: FetchConfig,
    agents: UserAgentRotation,
    rng: StdRng,
    cached: Option<(Option<EgressCandidate>, Client)>,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Self {
        let agents = UserAgentRotation::new(&config.user_agents);
        Self {
            config,
            agents,
            rng: StdRng::from_rng(&mut rand::rng()),
            cached: None,
        }
    }

    fn client_for(&mut self, candidate: Option<&EgressCandidate>) -> Result<Client, EgressError> {
        if let Some((cached_for, client)) = &self.cached {
            if cached_for.as_ref() == candidate {
                return Ok(client.clone());
            }
        }

        let client = build_http_client(&self.config, candidate)?;
        self.cached = Some((candidate.cloned(), client.clone()));
        Ok(client)
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&mut self, attempt: &FetchAttempt<'_>) -> Result<FetchedPage, TransportError> {
        let client = self
            .client_for(attempt.candidate)
            .map_err(|e| TransportError(e.to_string()))?;
        let headers = browser_headers(self.agents.pick(&mut self.rng));

        let response = client
            .get(attempt.item.url())
            .headers(headers)
            .send()
            .await
            .map_err(|e| TransportError(describe(&e)))?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(describe(&e)))?;

        Ok(FetchedPage { url, status, body })
    }
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}
