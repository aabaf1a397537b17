//! HTTP implementation of the SLO gateway

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument, trace};

use super::SloGateway;
use crate::config::ClientConfig;
use crate::error::{SloError, SloResult, ViolationKind};
use crate::model::{Folder, Slo};

/// Path reported for violations raised by the server itself
const SERVER_PATH: &str = "<server>";

/// Talks to the SLO endpoints of a remote service
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    credentials: Option<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct CreatedSlo {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> SloResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SloError::Transport {
                status: None,
                message: "failed to build HTTP client".to_string(),
                source: Some(e),
            })?;

        let base_url = Url::parse(config.api_url.trim_end_matches('/'))
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| SloError::Transport {
                status: None,
                message: format!("invalid api_url '{}'", config.api_url),
                source: None,
            })?;

        Ok(Self {
            client,
            base_url,
            credentials: config
                .credentials()
                .map(|(id, key)| (id.to_string(), key.to_string())),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Append `segments` to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> SloResult<Url> {
        if let Some(bad) = segments.iter().find(|s| s.is_empty() || **s == "." || **s == "..") {
            return Err(SloError::invalid(
                "id",
                ViolationKind::InvalidId {
                    value: bad.to_string(),
                },
            ));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SloError::Transport {
                status: None,
                message: format!("cannot extend api_url '{}'", self.base_url),
                source: None,
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attach basic auth when credentials are configured
    fn authenticated(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((id, key)) => request.basic_auth(id, Some(key)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> SloResult<Response> {
        let response = self.authenticated(request).send().await?;
        trace!(status = %response.status(), url = %response.url(), "response received");
        Ok(response)
    }
}

/// Map a non-success response onto the error taxonomy.
async fn status_error(response: Response, resource: &'static str, id: &str) -> SloError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = error_message(&text);

    match status {
        StatusCode::NOT_FOUND => SloError::NotFound {
            resource,
            id: id.to_string(),
        },
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => SloError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            SloError::invalid(SERVER_PATH, ViolationKind::Rejected { message })
        }
        _ => SloError::Transport {
            status: Some(status.as_u16()),
            message,
            source: None,
        },
    }
}

/// Flatten `{"errors":[{code, message}]}` into one line, or fall back to the
/// raw body.
fn error_message(body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    if parsed.errors.is_empty() {
        return body.trim().to_string();
    }

    parsed
        .errors
        .iter()
        .map(|e| match (e.code.is_empty(), e.message.is_empty()) {
            (false, false) => format!("{}: {}", e.code, e.message),
            (true, _) => e.message.clone(),
            (false, true) => e.code.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
impl SloGateway for HttpGateway {
    #[instrument(skip(self))]
    async fn get_folder(&self, id_or_alias: &str) -> SloResult<Folder> {
        let url = self.url(&["sloLibraryFolders", id_or_alias])?;
        let response = self.send(self.client.get(url)).await?;

        if !response.status().is_success() {
            return Err(status_error(response, "folder", id_or_alias).await);
        }

        let folder: Folder = response.json().await?;
        debug!(folder_id = %folder.id, "resolved folder");
        Ok(folder)
    }

    #[instrument(skip(self, slo), fields(name = %slo.name, kind = %slo.kind))]
    async fn create_slo(&self, slo: &Slo, parent_id: &str) -> SloResult<String> {
        let request = self
            .client
            .post(self.url(&["slos"])?)
            .query(&[("parentId", parent_id)])
            .json(slo);
        let response = self.send(request).await?;

        if !response.status().is_success() {
            return Err(status_error(response, "folder", parent_id).await);
        }

        let created: CreatedSlo = response.json().await?;
        debug!(id = %created.id, "created SLO");
        Ok(created.id)
    }

    #[instrument(skip(self))]
    async fn read_slo(&self, id: &str) -> SloResult<Slo> {
        let response = self.send(self.client.get(self.url(&["slos", id])?)).await?;

        if !response.status().is_success() {
            return Err(status_error(response, "slo", id).await);
        }

        Ok(response.json().await?)
    }

    #[instrument(skip(self, slo), fields(id = %slo.id, version = slo.version))]
    async fn update_slo(&self, slo: &Slo) -> SloResult<()> {
        let request = self
            .client
            .put(self.url(&["slos", &slo.id])?)
            .json(slo);
        let response = self.send(request).await?;

        if !response.status().is_success() {
            return Err(status_error(response, "slo", &slo.id).await);
        }

        debug!("updated SLO");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_slo(&self, id: &str) -> SloResult<()> {
        let response = self
            .send(self.client.delete(self.url(&["slos", id])?))
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response, "slo", id).await);
        }

        debug!("deleted SLO");
        Ok(())
    }
}
