//! ureq-backed [`PadApi`] with native-tls support.
//!
//! ureq is blocking, so every call runs on tokio's blocking pool. Non-2xx
//! statuses are read as ordinary responses so the error body can be mined
//! for a human-readable message.

use crate::error::{ApiError, PadOperation};
use crate::remote::wire::{self, PadRecord, RenameRequest, SharingRequest, UserResponse};
use crate::remote::{PadApi, PadListing};
use crate::tab::{SharingPolicy, Tab};
use anyhow::{Context, Result};
use padsync_config::ServerConfig;
use std::sync::Arc;
use std::time::Duration;
use ureq::tls::{RootCerts, TlsConfig, TlsProvider};
use ureq::{Agent, RequestBuilder};
use url::Url;

/// Maximum response body size for API responses (10 MB).
pub const MAX_API_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

/// Hosts allowed to use plain HTTP (local development servers).
const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1", "[::1]"];

/// Validate and normalize the server base URL.
///
/// Enforces:
/// - HTTPS, or HTTP only against a loopback host
/// - no query or fragment
///
/// The returned URL always ends with `/` so endpoint paths append cleanly.
pub fn validate_base_url(raw: &str) -> Result<Url, String> {
    let mut parsed = Url::parse(raw).map_err(|e| format!("Invalid URL '{}': {}", raw, e))?;

    let host = parsed.host_str().unwrap_or("");
    match parsed.scheme() {
        "https" => {}
        "http" if LOOPBACK_HOSTS.contains(&host) => {}
        scheme => {
            return Err(format!(
                "Insecure URL scheme '{}' rejected; only HTTPS is allowed \
                 (plain HTTP only for localhost). URL: {}",
                scheme, raw
            ));
        }
    }
    if host.is_empty() {
        return Err(format!("URL '{}' has no host", raw));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(format!(
            "Server URL '{}' must not carry a query or fragment",
            raw
        ));
    }

    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }
    Ok(parsed)
}

/// Create an HTTP agent configured with native-tls and an optional global
/// timeout. Status codes are returned as responses, not errors.
pub fn agent(timeout: Option<Duration>) -> Agent {
    let tls_config = TlsConfig::builder()
        .provider(TlsProvider::NativeTls)
        .root_certs(RootCerts::PlatformVerifier)
        .build();

    Agent::config_builder()
        .tls_config(tls_config)
        .timeout_global(timeout)
        .http_status_as_error(false)
        .build()
        .into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// One prepared request, owned so it can move onto the blocking pool.
#[derive(Debug)]
struct Call {
    operation: PadOperation,
    method: Method,
    url: Url,
    body: Option<String>,
}

#[derive(Debug)]
struct Inner {
    agent: Agent,
    base_url: Url,
    user_agent: String,
    session_cookie: Option<String>,
}

/// Production [`PadApi`] talking JSON over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpPadApi {
    inner: Arc<Inner>,
}

impl HttpPadApi {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let base_url = validate_base_url(&config.base_url)
            .map_err(anyhow::Error::msg)
            .context("Invalid server.base_url")?;
        log::info!(
            "Pad API at {} (timeout: {:?})",
            base_url,
            config.request_timeout()
        );
        Ok(Self {
            inner: Arc::new(Inner {
                agent: agent(config.request_timeout()),
                base_url,
                user_agent: config.user_agent.clone(),
                session_cookie: config.session_cookie.clone(),
            }),
        })
    }

    /// Origin the client talks to, used to build shareable pad links
    pub fn origin(&self) -> String {
        self.inner
            .base_url
            .as_str()
            .trim_end_matches('/')
            .to_string()
    }

    /// Build `<base>/<segments...>` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn execute(&self, call: Call) -> Result<String, ApiError> {
        let inner = Arc::clone(&self.inner);
        let operation = call.operation;
        tokio::task::spawn_blocking(move || inner.send(call))
            .await
            .map_err(|e| ApiError::Transport {
                operation,
                message: format!("request task failed: {}", e),
            })?
    }
}

impl Inner {
    fn with_headers<B>(&self, request: RequestBuilder<B>) -> RequestBuilder<B> {
        let request = request
            .header("User-Agent", self.user_agent.as_str())
            .header("Accept", "application/json");
        match &self.session_cookie {
            Some(cookie) => request.header("Cookie", cookie.as_str()),
            None => request,
        }
    }

    /// Perform the request, returning the success body.
    fn send(&self, call: Call) -> Result<String, ApiError> {
        let Call {
            operation,
            method,
            url,
            body,
        } = call;
        log::debug!("{:?} {} ({})", method, url, operation);

        let result = match method {
            Method::Get => self.with_headers(self.agent.get(url.as_str())).call(),
            Method::Delete => self.with_headers(self.agent.delete(url.as_str())).call(),
            Method::Post => {
                let request = self.with_headers(self.agent.post(url.as_str()));
                match body {
                    Some(json) => request
                        .header("Content-Type", "application/json")
                        .send(json),
                    None => request.send_empty(),
                }
            }
            Method::Put => self
                .with_headers(self.agent.put(url.as_str()))
                .header("Content-Type", "application/json")
                .send(body.unwrap_or_default()),
        };

        let response = result.map_err(|e| {
            log::warn!("{} failed: {}", operation, e);
            ApiError::Transport {
                operation,
                message: e.to_string(),
            }
        })?;

        let status = response.status().as_u16();
        let text = response
            .into_body()
            .with_config()
            .limit(MAX_API_RESPONSE_SIZE)
            .read_to_string();

        if !(200..300).contains(&status) {
            let message = wire::error_message(text.as_deref().unwrap_or_default(), operation);
            log::warn!("{} rejected with HTTP {}: {}", operation, status, message);
            return Err(ApiError::Rejected {
                operation,
                status,
                message,
            });
        }

        text.map_err(|e| ApiError::Transport {
            operation,
            message: format!("failed to read response body: {}", e),
        })
    }
}

impl PadApi for HttpPadApi {
    async fn fetch_pads(&self) -> Result<PadListing, ApiError> {
        let operation = PadOperation::FetchPads;
        let body = self
            .execute(Call {
                operation,
                method: Method::Get,
                url: self.endpoint(&["api", "users", "me"]),
                body: None,
            })
            .await?;
        let user: UserResponse = wire::decode(&body, operation)?;
        Ok(user.into())
    }

    async fn create_pad(&self) -> Result<Tab, ApiError> {
        let operation = PadOperation::CreatePad;
        let body = self
            .execute(Call {
                operation,
                method: Method::Post,
                url: self.endpoint(&["api", "pad", "new"]),
                body: None,
            })
            .await?;
        let record: PadRecord = wire::decode(&body, operation)?;
        Ok(record.into())
    }

    async fn rename_pad(&self, id: &str, new_name: &str) -> Result<(), ApiError> {
        let operation = PadOperation::RenamePad;
        let request = RenameRequest {
            display_name: new_name,
        };
        let payload = encode(&request, operation)?;
        self.execute(Call {
            operation,
            method: Method::Put,
            url: self.endpoint(&["api", "pad", id, "rename"]),
            body: Some(payload),
        })
        .await
        .map(drop)
    }

    async fn delete_pad(&self, id: &str) -> Result<(), ApiError> {
        self.execute(Call {
            operation: PadOperation::DeletePad,
            method: Method::Delete,
            url: self.endpoint(&["api", "pad", id]),
            body: None,
        })
        .await
        .map(drop)
    }

    async fn leave_pad(&self, id: &str) -> Result<(), ApiError> {
        self.execute(Call {
            operation: PadOperation::LeavePad,
            method: Method::Delete,
            url: self.endpoint(&["api", "users", "close", id]),
            body: None,
        })
        .await
        .map(drop)
    }

    async fn update_sharing_policy(
        &self,
        id: &str,
        policy: SharingPolicy,
    ) -> Result<(), ApiError> {
        let operation = PadOperation::UpdateSharingPolicy;
        let payload = encode(&SharingRequest { policy }, operation)?;
        self.execute(Call {
            operation,
            method: Method::Put,
            url: self.endpoint(&["api", "pad", id, "sharing"]),
            body: Some(payload),
        })
        .await
        .map(drop)
    }

    async fn fetch_pad_content(&self, id: &str) -> Result<serde_json::Value, ApiError> {
        let operation = PadOperation::FetchPadContent;
        let body = self
            .execute(Call {
                operation,
                method: Method::Get,
                url: self.endpoint(&["api", "pad", id]),
                body: None,
            })
            .await?;
        wire::decode(&body, operation)
    }
}

fn encode<T: serde::Serialize>(value: &T, operation: PadOperation) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::Transport {
        operation,
        message: format!("failed to encode request: {}", e),
    })
}
