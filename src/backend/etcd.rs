//! etcd v3 client
//!
//! Talks to the etcd v3 HTTP/JSON gateway (`/v3/kv/*`). Keys and values
//! travel base64-encoded. Requests start at the endpoint that answered last
//! and fail over to the next one on connection errors.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header::AUTHORIZATION, Certificate, Client, Identity, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{BackendError, BackendResult, KvBackend};

/// Range bound meaning "every key" when used as both start and end.
const ALL_KEYS: &str = "\0";

// == Options ==
/// Everything needed to build an [`EtcdClient`].
#[derive(Debug, Clone)]
pub struct EtcdOptions {
    /// Endpoint URLs, e.g. `http://10.0.0.1:2379`
    pub endpoints: Vec<String>,
    /// Username; authentication is enabled when non-empty
    pub username: Option<String>,
    pub password: Option<String>,
    /// PEM CA bundle used to verify the servers
    pub ca_cert: Option<PathBuf>,
    /// PEM client certificate, paired with `client_key`
    pub client_cert: Option<PathBuf>,
    /// PEM client private key, paired with `client_cert`
    pub client_key: Option<PathBuf>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for EtcdOptions {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://localhost:2379".to_string()],
            username: None,
            password: None,
            ca_cert: None,
            client_cert: None,
            client_key: None,
            timeout: Duration::from_secs(5),
        }
    }
}

// == Wire Types ==
#[derive(Debug, Serialize)]
struct RangeRequest {
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    range_end: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutRequest {
    key: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct DeleteRangeRequest {
    key: String,
}

#[derive(Debug, Serialize)]
struct AuthenticateRequest<'a> {
    name: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthenticateResponse {
    #[serde(default)]
    token: String,
}

/// etcd omits empty fields, so a range with no match has no `kvs` at all.
#[derive(Debug, Default, Deserialize)]
struct RangeResponse {
    #[serde(default)]
    kvs: Vec<KeyValue>,
}

#[derive(Debug, Deserialize)]
struct KeyValue {
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: String,
}

fn encode(raw: &str) -> String {
    STANDARD.encode(raw.as_bytes())
}

fn decode(encoded: &str) -> BackendResult<String> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| BackendError::Protocol(format!("invalid base64 in response: {e}")))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[derive(Debug, Clone)]
struct Credentials {
    username: String,
    password: String,
}

// == Client ==
#[derive(Debug)]
pub struct EtcdClient {
    http: Client,
    endpoints: Vec<String>,
    credentials: Option<Credentials>,
    /// Cached auth token, cleared when etcd rejects it
    token: RwLock<Option<String>>,
    /// Index of the endpoint that answered last
    cursor: AtomicUsize,
}

impl EtcdClient {
    // == Constructor ==
    /// Validates the options and builds the HTTP client.
    ///
    /// No network traffic happens here; an unreachable cluster is only
    /// discovered by the first request.
    pub fn new(options: &EtcdOptions) -> BackendResult<Self> {
        let tls = options.ca_cert.is_some();
        let endpoints = options
            .endpoints
            .iter()
            .map(|raw| normalize_endpoint(raw, tls))
            .collect::<BackendResult<Vec<_>>>()?;

        if endpoints.is_empty() {
            return Err(BackendError::Config(
                "no etcd endpoints configured".to_string(),
            ));
        }

        let mut builder = Client::builder()
            .timeout(options.timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .user_agent(concat!("etcd_gateway/", env!("CARGO_PKG_VERSION")));

        if let Some(path) = &options.ca_cert {
            builder = builder.add_root_certificate(load_certificate(path)?);
        }

        match (&options.client_cert, &options.client_key) {
            (Some(cert), Some(key)) => builder = builder.identity(load_identity(cert, key)?),
            (None, None) => {}
            _ => {
                return Err(BackendError::Config(
                    "client certificate and key must be configured together".to_string(),
                ))
            }
        }

        let http = builder
            .build()
            .map_err(|e| BackendError::Config(format!("failed to build HTTP client: {e}")))?;

        let credentials = options
            .username
            .as_ref()
            .filter(|username| !username.is_empty())
            .map(|username| Credentials {
                username: username.clone(),
                password: options.password.clone().unwrap_or_default(),
            });

        Ok(Self {
            http,
            endpoints,
            credentials,
            token: RwLock::new(None),
            cursor: AtomicUsize::new(0),
        })
    }

    /// Normalized endpoint list.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    // == Request Dispatch ==
    /// Sends one gateway call, failing over across endpoints on connection
    /// errors. Any other error is returned from the first endpoint that
    /// produced it.
    async fn call<B, R>(&self, path: &str, body: &B) -> BackendResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let count = self.endpoints.len();
        let start = self.cursor.load(Ordering::Relaxed) % count;
        let mut last_error = None;

        for offset in 0..count {
            let index = (start + offset) % count;
            let endpoint = &self.endpoints[index];

            match self.call_endpoint(endpoint, path, body).await {
                Ok(response) => {
                    self.cursor.store(index, Ordering::Relaxed);
                    return Ok(response);
                }
                Err(err) if err.is_connection() => {
                    warn!(endpoint = %endpoint, error = %err, "etcd endpoint unreachable");
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BackendError::Connection("no etcd endpoint answered".to_string())
        }))
    }

    async fn call_endpoint<B, R>(&self, endpoint: &str, path: &str, body: &B) -> BackendResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let mut reauthenticated = false;

        loop {
            let token = self.auth_token(endpoint).await?;

            let mut request = self.http.post(format!("{endpoint}{path}")).json(body);
            if let Some(token) = &token {
                request = request.header(AUTHORIZATION, token.as_str());
            }

            let response = request.send().await?;

            let unauthorized = response.status() == StatusCode::UNAUTHORIZED;
            if let Some(rejected) = token.as_ref().filter(|_| unauthorized && !reauthenticated) {
                debug!(endpoint = %endpoint, "etcd rejected auth token, re-authenticating");
                let mut cached = self.token.write().await;
                // Another request may already have replaced it
                if cached.as_deref() == Some(rejected.as_str()) {
                    *cached = None;
                }
                reauthenticated = true;
                continue;
            }

            return decode_response(response).await;
        }
    }

    /// Returns the auth token, authenticating first if none is cached.
    ///
    /// The write lock is held across authentication so concurrent callers
    /// wait for one token instead of each requesting their own.
    async fn auth_token(&self, endpoint: &str) -> BackendResult<Option<String>> {
        let Some(credentials) = &self.credentials else {
            return Ok(None);
        };

        if let Some(token) = self.token.read().await.clone() {
            return Ok(Some(token));
        }

        let mut cached = self.token.write().await;
        if let Some(token) = cached.clone() {
            return Ok(Some(token));
        }

        let response = self
            .http
            .post(format!("{endpoint}/v3/auth/authenticate"))
            .json(&AuthenticateRequest {
                name: &credentials.username,
                password: &credentials.password,
            })
            .send()
            .await?;
        let auth: AuthenticateResponse = decode_response(response).await?;

        if auth.token.is_empty() {
            return Err(BackendError::Protocol(
                "etcd returned an empty auth token".to_string(),
            ));
        }

        debug!(endpoint = %endpoint, user = %credentials.username, "authenticated against etcd");
        *cached = Some(auth.token.clone());
        Ok(Some(auth.token))
    }
}

#[async_trait]
impl KvBackend for EtcdClient {
    fn backend_name(&self) -> &'static str {
        "etcd"
    }

    async fn get(&self, key: &str) -> BackendResult<Option<String>> {
        let response: RangeResponse = self
            .call(
                "/v3/kv/range",
                &RangeRequest {
                    key: encode(key),
                    range_end: None,
                },
            )
            .await?;

        response
            .kvs
            .first()
            .map(|kv| decode(&kv.value))
            .transpose()
    }

    async fn put(&self, key: &str, value: &str) -> BackendResult<()> {
        let _: serde_json::Value = self
            .call(
                "/v3/kv/put",
                &PutRequest {
                    key: encode(key),
                    value: encode(value),
                },
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> BackendResult<()> {
        let _: serde_json::Value = self
            .call("/v3/kv/deleterange", &DeleteRangeRequest { key: encode(key) })
            .await?;
        Ok(())
    }

    async fn list(&self) -> BackendResult<BTreeMap<String, String>> {
        let response: RangeResponse = self
            .call(
                "/v3/kv/range",
                &RangeRequest {
                    key: encode(ALL_KEYS),
                    range_end: Some(encode(ALL_KEYS)),
                },
            )
            .await?;

        response
            .kvs
            .iter()
            .map(|kv| Ok((decode(&kv.key)?, decode(&kv.value)?)))
            .collect()
    }
}

// == Helpers ==
async fn decode_response<R: DeserializeOwned>(response: Response) -> BackendResult<R> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::from_status(status.as_u16(), &body));
    }

    response
        .json::<R>()
        .await
        .map_err(|e| BackendError::Protocol(e.to_string()))
}

/// Bare `host:port` entries get `https://` when a CA is configured and
/// `http://` otherwise.
fn normalize_endpoint(raw: &str, tls: bool) -> BackendResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let endpoint = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        let scheme = if tls { "https" } else { "http" };
        format!("{scheme}://{trimmed}")
    };

    let url = Url::parse(&endpoint)
        .map_err(|e| BackendError::Config(format!("invalid etcd endpoint '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(endpoint),
        other => Err(BackendError::Config(format!(
            "unsupported scheme '{other}' in etcd endpoint '{raw}'"
        ))),
    }
}

fn read_pem(path: &Path) -> BackendResult<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| BackendError::Config(format!("cannot read {}: {e}", path.display())))
}

fn load_certificate(path: &Path) -> BackendResult<Certificate> {
    Certificate::from_pem(&read_pem(path)?).map_err(|e| {
        BackendError::Config(format!("invalid CA certificate {}: {e}", path.display()))
    })
}

fn load_identity(cert: &Path, key: &Path) -> BackendResult<Identity> {
    let mut pem = read_pem(cert)?;
    pem.push(b'\n');
    pem.extend(read_pem(key)?);

    Identity::from_pem(&pem).map_err(|e| {
        BackendError::Config(format!(
            "invalid client identity {} / {}: {e}",
            cert.display(),
            key.display()
        ))
    })
}
