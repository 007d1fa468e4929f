//! Controller API client: the crate's only network boundary.
//!
//! [`ControllerApi`] is the seam every resolver is written against; the
//! [`HttpControllerApi`] implementation talks to a real controller over
//! reqwest. The client is deliberately thin (request, decode, classify),
//! with every call bounded by the configured timeout so a hung controller
//! surfaces as an ordinary fetch failure.

pub mod errors;
pub mod json;
pub mod models;

use crate::config::Config;
use anyhow::Context;
use async_trait::async_trait;
use errors::ControllerError;
use models::{Role, Service, Site, Station, TrafficRecord};
use url::Url;

/// How much of an error response body is kept for diagnostics.
const BODY_SNIPPET_LEN: usize = 200;

/// Listing parameters for the station endpoint.
#[derive(Debug, Clone, Default)]
pub struct StationQuery {
    /// Restrict the response to these camelCase fields, when supported.
    pub fields: Vec<&'static str>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// The external controller API surface the resolvers consume.
#[async_trait]
pub trait ControllerApi: Send + Sync {
    async fn fetch_sites(&self) -> Result<Vec<Site>, ControllerError>;
    async fn fetch_site_by_id(&self, id: &str) -> Result<Option<Site>, ControllerError>;
    async fn fetch_stations(&self, query: &StationQuery) -> Result<Vec<Station>, ControllerError>;
    async fn fetch_station_traffic(
        &self,
        mac: &str,
    ) -> Result<Option<TrafficRecord>, ControllerError>;
    async fn fetch_services(&self) -> Result<Vec<Service>, ControllerError>;
    async fn fetch_roles(&self) -> Result<Vec<Role>, ControllerError>;
}

/// Production client over the controller's REST API.
pub struct HttpControllerApi {
    http: reqwest::Client,
    base: Url,
    api_token: Option<String>,
}

impl HttpControllerApi {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        // A trailing slash keeps Url::join appending instead of replacing
        // the last path segment.
        let mut raw = config.controller_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw).context("invalid controller_url")?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("failed to build controller http client")?;

        Ok(Self {
            http,
            base,
            api_token: config.api_token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ControllerError> {
        self.base
            .join(path)
            .with_context(|| format!("invalid endpoint path {path}"))
            .map_err(ControllerError::from)
    }

    /// GET `url` and decode the JSON body. 404 surfaces as `Ok(None)` so
    /// callers can tell "absent" from "broken"; any other non-2xx status
    /// and any parse failure become typed errors.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<Option<T>, ControllerError> {
        let mut request = self.http.get(url.clone());
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("reading body from {url} failed"))?;
        if !status.is_success() {
            return Err(ControllerError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body: body.chars().take(BODY_SNIPPET_LEN).collect(),
            });
        }

        match json::decode_with_path(&body) {
            Ok(value) => Ok(Some(value)),
            Err(source) => Err(ControllerError::ParseFailed {
                status: status.as_u16(),
                url: url.to_string(),
                source,
            }),
        }
    }
}

#[async_trait]
impl ControllerApi for HttpControllerApi {
    async fn fetch_sites(&self) -> Result<Vec<Site>, ControllerError> {
        let url = self.endpoint("api/v2/sites")?;
        Ok(self.get_json(url).await?.unwrap_or_default())
    }

    async fn fetch_site_by_id(&self, id: &str) -> Result<Option<Site>, ControllerError> {
        let url = self.endpoint(&format!("api/v2/sites/{id}"))?;
        self.get_json(url).await
    }

    async fn fetch_stations(&self, query: &StationQuery) -> Result<Vec<Station>, ControllerError> {
        let mut url = self.endpoint("api/v2/stations")?;
        {
            let mut pairs = url.query_pairs_mut();
            if !query.fields.is_empty() {
                pairs.append_pair("fields", &query.fields.join(","));
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(offset) = query.offset {
                pairs.append_pair("offset", &offset.to_string());
            }
        }
        Ok(self.get_json(url).await?.unwrap_or_default())
    }

    async fn fetch_station_traffic(
        &self,
        mac: &str,
    ) -> Result<Option<TrafficRecord>, ControllerError> {
        let url = self.endpoint(&format!("api/v2/stations/{mac}/traffic"))?;
        self.get_json(url).await
    }

    async fn fetch_services(&self) -> Result<Vec<Service>, ControllerError> {
        let url = self.endpoint("api/v2/services")?;
        Ok(self.get_json(url).await?.unwrap_or_default())
    }

    async fn fetch_roles(&self) -> Result<Vec<Role>, ControllerError> {
        let url = self.endpoint("api/v2/roles")?;
        Ok(self.get_json(url).await?.unwrap_or_default())
    }
}
