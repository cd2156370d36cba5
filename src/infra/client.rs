//! HTTP access to the SCM-Manager host.

use std::fs;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, StatusCode, Url, header};
use scm_audit_log_api_types::IndexDocument;
use tracing::{debug, instrument};

use super::error::InfraError;
use crate::application::error::FetchFailure;
use crate::application::fetcher::{AuditLogSource, decode_page};
use crate::application::links::CapabilityLinks;
use crate::application::request_key::RequestIdentity;
use crate::config::{AuthArgs, ServerSettings};
use crate::domain::entries::AuditLogPage;

const ACCEPT_HAL: &str = "application/hal+json, application/json;q=0.9";

#[derive(Clone, Debug)]
pub struct ScmClient {
    client: Client,
    index_url: Url,
    key: Option<String>,
}

impl ScmClient {
    pub fn new(server: &ServerSettings, key: Option<String>) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(server.timeout)
            .build()?;
        Ok(Self {
            client,
            index_url: server.index_url.clone(),
            key,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("scm-audit-log/", env!("CARGO_PKG_VERSION"))
    }

    pub fn index_url(&self) -> &Url {
        &self.index_url
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url).header(header::ACCEPT, ACCEPT_HAL);
        match &self.key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Read the index resource and pick out the audit log links.
    #[instrument(skip(self), fields(url = %self.index_url))]
    pub async fn discover_links(&self) -> Result<CapabilityLinks, InfraError> {
        let url = self.index_url.as_str();
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|err| InfraError::discovery(url, err.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| InfraError::discovery(url, err.to_string()))?;
        if !status.is_success() {
            return Err(InfraError::discovery(url, format!("status {status}")));
        }

        let index: IndexDocument = serde_json::from_slice(&body)
            .map_err(|err| InfraError::discovery(url, format!("failed to parse body: {err}")))?;
        let links = CapabilityLinks::from_index(&index, &self.index_url);
        debug!(
            audit_log = links.is_available(),
            csv_export = links.can_export(),
            "discovered audit log links"
        );
        Ok(links)
    }

    /// Download a resource as raw bytes, such as a CSV export.
    pub async fn download(&self, url: &str) -> Result<Bytes, FetchFailure> {
        let (status, body) = self.send(url).await?;
        if !status.is_success() {
            return Err(http_failure(url, status, &body));
        }
        Ok(body)
    }

    async fn send(&self, url: &str) -> Result<(StatusCode, Bytes), FetchFailure> {
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|err| FetchFailure::network(url, err.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| FetchFailure::network(url, err.to_string()))?;
        Ok((status, body))
    }
}

fn http_failure(url: &str, status: StatusCode, body: &[u8]) -> FetchFailure {
    FetchFailure::http(url, status.as_u16(), String::from_utf8_lossy(body).into_owned())
}

#[async_trait]
impl AuditLogSource for ScmClient {
    async fn fetch_page(&self, identity: &RequestIdentity) -> Result<AuditLogPage, FetchFailure> {
        let (status, body) = self.send(identity.as_str()).await?;
        if !status.is_success() {
            return Err(http_failure(identity.as_str(), status, &body));
        }
        decode_page(identity, &body)
    }
}

/// API key from the key file, falling back to the environment.
pub fn read_api_key(auth: &AuthArgs) -> Result<Option<String>, InfraError> {
    if let Some(path) = &auth.key_file {
        let key = fs::read_to_string(path).map_err(|source| InfraError::KeyFile {
            path: path.display().to_string(),
            source,
        })?;
        return Ok(Some(key.trim().to_string()));
    }
    Ok(auth.api_key_env.clone().filter(|key| !key.is_empty()))
}
