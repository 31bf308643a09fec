//! HTTP client for a DataVault server.

use anyhow::{Context, Result, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use datavault_web::api::{SecretList, SecretResponse, StoreResponse, TokenResponse};
use reqwest::{Client, Response, Url};
use serde_json::{Value, json};
use tracing::debug;

/// Thin wrapper over the gateway's JSON API.
pub struct ApiClient {
    http: Client,
    base: String,
}

impl ApiClient {
    /// `base` is the server root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("datavault/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{path}", self.base)
    }

    /// URL of one secret; `id` is percent-encoded as a single path segment.
    fn secret_url(&self, id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.url("secrets"))
            .with_context(|| format!("invalid server address {}", self.base))?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("server address {} cannot carry a path", self.base))?
            .push(id);
        Ok(url)
    }

    pub async fn register(&self, login: &str, password: &str) -> Result<TokenResponse> {
        self.credentials("register", login, password).await
    }

    pub async fn login(&self, login: &str, password: &str) -> Result<TokenResponse> {
        self.credentials("login", login, password).await
    }

    async fn credentials(&self, path: &str, login: &str, password: &str) -> Result<TokenResponse> {
        let resp = self
            .http
            .post(self.url(path))
            .json(&json!({"login": login, "password": password}))
            .send()
            .await
            .with_context(|| format!("could not reach {}", self.base))?;
        Ok(check(resp).await?.json().await?)
    }

    /// Store `data` under `kind`.
    pub async fn store(&self, token: &str, kind: &str, data: &[u8]) -> Result<StoreResponse> {
        debug!(kind, len = data.len(), "storing secret");
        let resp = self
            .http
            .post(self.url("secrets"))
            .bearer_auth(token)
            .json(&json!({"kind": kind, "data": B64.encode(data)}))
            .send()
            .await
            .with_context(|| format!("could not reach {}", self.base))?;
        Ok(check(resp).await?.json().await?)
    }

    /// Every secret of the token's owner, newest first.
    pub async fn list(&self, token: &str) -> Result<Vec<SecretResponse>> {
        let resp = self
            .http
            .get(self.url("secrets"))
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("could not reach {}", self.base))?;
        let list: SecretList = check(resp).await?.json().await?;
        Ok(list.secrets)
    }

    pub async fn delete(&self, token: &str, id: &str) -> Result<()> {
        let resp = self
            .http
            .delete(self.secret_url(id)?)
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("could not reach {}", self.base))?;
        check(resp).await?;
        Ok(())
    }

    /// Authenticated reachability check of the server and its database.
    pub async fn ping(&self, token: &str) -> Result<()> {
        let resp = self
            .http
            .get(self.url("ping"))
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("could not reach {}", self.base))?;
        check(resp).await?;
        Ok(())
    }
}


/// Turn a non-2xx response into an error carrying the server's message.
async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| status.to_string());
    bail!("server returned {status}: {message}")
}
