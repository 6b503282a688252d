//! GOST control API client.
//!
//! # Responsibilities
//! - Fetch the full config snapshot
//! - Create, update and delete services, chains and limiters
//! - Turn GOST's `{"msg": ...}` replies into [`GostError`] right after each call

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::gost::types::{
    ConfigSnapshot, GostError, GostResult, Resource, ResourceKind, MSG_DUPLICATED, MSG_OK,
};
use crate::observability::metrics;

/// Operations the reconciler needs from the proxy.
#[async_trait]
pub trait ProxyControl: Send + Sync {
    /// `GET /config`.
    async fn fetch_config(&self) -> GostResult<ConfigSnapshot>;

    /// `POST /config/{kind}`.
    async fn create(&self, resource: &Resource) -> GostResult<()>;

    /// `PUT /config/{kind}/{name}`.
    async fn update(&self, resource: &Resource) -> GostResult<()>;

    /// `DELETE /config/{kind}/{name}`.
    async fn delete(&self, kind: ResourceKind, name: &str) -> GostResult<()>;
}

/// Create the resource, or update it in place if GOST reports a duplicate.
///
/// The update is attempted at most once; its result is the result of the whole call.
pub async fn upsert(api: &dyn ProxyControl, resource: &Resource) -> GostResult<()> {
    let kind = resource.kind().as_str();
    match api.create(resource).await {
        Ok(()) => {
            metrics::record_write(kind, "create");
            Ok(())
        }
        Err(GostError::Duplicated) => {
            tracing::debug!(kind, name = resource.name(), "Object exists, updating");
            api.update(resource).await?;
            metrics::record_write(kind, "update");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    msg: String,
}

/// Interpret the answer to a write (POST/PUT/DELETE).
pub fn classify_write(status: StatusCode, body: &str) -> GostResult<()> {
    let reply: Reply = serde_json::from_str(body).map_err(|e| GostError::Decode {
        reason: e.to_string(),
        raw: body.to_string(),
    })?;

    if reply.msg == MSG_DUPLICATED {
        return Err(GostError::Duplicated);
    }
    if status == StatusCode::OK && reply.msg == MSG_OK {
        return Ok(());
    }
    Err(GostError::Rejected {
        status: status.as_u16(),
        msg: reply.msg,
    })
}

/// Interpret the answer to `GET /config`.
pub fn classify_snapshot(status: StatusCode, body: &str) -> GostResult<ConfigSnapshot> {
    if status != StatusCode::OK {
        let msg = serde_json::from_str::<Reply>(body)
            .map(|r| r.msg)
            .unwrap_or_else(|_| body.to_string());
        return Err(GostError::Rejected {
            status: status.as_u16(),
            msg,
        });
    }
    serde_json::from_str(body).map_err(|e| GostError::Decode {
        reason: e.to_string(),
        raw: body.to_string(),
    })
}

/// HTTP implementation of [`ProxyControl`].
#[derive(Debug, Clone)]
pub struct GostApi {
    client: Client,
    endpoint: Url,
}

impl GostApi {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn url(&self, path: &str) -> GostResult<Url> {
        self.endpoint
            .join(path)
            .map_err(|e| GostError::Transport(format!("invalid URL path '{}': {}", path, e)))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> GostResult<(StatusCode, String)> {
        let url = self.url(path)?;
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(%method, path, error = %e, "GOST request failed");
            GostError::Transport(e.to_string())
        })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GostError::Transport(e.to_string()))?;
        Ok((status, text))
    }
}

#[async_trait]
impl ProxyControl for GostApi {
    async fn fetch_config(&self) -> GostResult<ConfigSnapshot> {
        let (status, body) = self.send(Method::GET, "/config", None).await?;
        classify_snapshot(status, &body)
    }

    async fn create(&self, resource: &Resource) -> GostResult<()> {
        let path = format!("/config/{}", resource.kind().path());
        let (status, body) = self.send(Method::POST, &path, Some(resource.to_json())).await?;
        classify_write(status, &body)
    }

    async fn update(&self, resource: &Resource) -> GostResult<()> {
        let path = format!("/config/{}/{}", resource.kind().path(), resource.name());
        let (status, body) = self.send(Method::PUT, &path, Some(resource.to_json())).await?;
        classify_write(status, &body)
    }

    async fn delete(&self, kind: ResourceKind, name: &str) -> GostResult<()> {
        let path = format!("/config/{}/{}", kind.path(), name);
        let (status, body) = self.send(Method::DELETE, &path, None).await?;
        classify_write(status, &body)
    }
}
