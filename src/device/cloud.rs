//! Cloud IoT API client.
//!
//! Logs in with `GET /v1.0/token?grant_type=1`, then sends
//! `POST {endpoint}/v1.0/iot-03/devices/{id}/commands` with a
//! `{"commands": [{"code", "value"}]}` body and reads the `success` flag from
//! the JSON reply.
//!
//! Every request is signed with HMAC-SHA256 keyed by the access secret:
//!
//! ```text
//! string_to_sign = METHOD "\n" hex(sha256(body)) "\n" "\n" path_and_query
//! sign           = HEX(hmac(secret, client_id + access_token + t + string_to_sign))
//! ```
//!
//! `access_token` is empty for the token calls themselves. The secret is never
//! sent; only `client_id`, `access_token`, `t`, `sign` and `sign_method` are.

use super::{DeviceCommand, DeviceController, DeviceError};
use crate::config::DeviceConfig;
use crate::error::{Result, SpeechError};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

const SIGN_METHOD: &str = "HMAC-SHA256";
const LOGIN_PATH: &str = "/v1.0/token?grant_type=1";
/// Tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);
/// Reply code for an access token the API no longer accepts.
const TOKEN_INVALID: i64 = 1010;

pub struct CloudDeviceController {
    client: reqwest::Client,
    endpoint: String,
    access_id: String,
    access_secret: String,
    token: Mutex<Option<AccessToken>>,
}

impl std::fmt::Debug for CloudDeviceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudDeviceController")
            .field("endpoint", &self.endpoint)
            .field("access_id", &self.access_id)
            .finish_non_exhaustive()
    }
}

struct AccessToken {
    access_token: String,
    refresh_token: String,
    expires_at: Instant,
}

/// Envelope shared by every API reply.
#[derive(Debug, Deserialize)]
struct ApiReply<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
    result: Option<T>,
}

impl<T> ApiReply<T> {
    fn message(&self) -> String {
        self.msg.clone().unwrap_or_else(|| "unknown error".to_owned())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResult {
    access_token: String,
    refresh_token: String,
    /// Lifetime in seconds.
    expire_time: u64,
}

impl CloudDeviceController {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &DeviceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_s.max(1)))
            .build()
            .map_err(|e| SpeechError::Device(format!("cannot build HTTP client: {e}")))?;

        info!("device API configured: {}", config.endpoint);

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_owned(),
            access_id: config.access_id.clone(),
            access_secret: config.access_secret.clone(),
            token: Mutex::new(None),
        })
    }

    /// Log in now instead of on the first command.
    ///
    /// # Errors
    ///
    /// Returns an error if the API is unreachable or refuses the credentials.
    pub async fn connect(&self) -> std::result::Result<(), DeviceError> {
        let token = self.fetch_token(LOGIN_PATH).await?;
        *self.token.lock().await = Some(token);
        Ok(())
    }

    /// A token valid for at least [`REFRESH_MARGIN`], logging in or
    /// refreshing as needed.
    async fn access_token(&self) -> std::result::Result<String, DeviceError> {
        let mut guard = self.token.lock().await;

        let refresh_token = match guard.as_ref() {
            Some(t) if t.expires_at > Instant::now() + REFRESH_MARGIN => {
                return Ok(t.access_token.clone());
            }
            Some(t) => Some(t.refresh_token.clone()),
            None => None,
        };

        let fresh = match refresh_token {
            Some(refresh_token) => {
                debug!("device API token near expiry, refreshing");
                match self
                    .fetch_token(&format!("/v1.0/token/{refresh_token}"))
                    .await
                {
                    Ok(token) => token,
                    Err(e) => {
                        warn!("token refresh failed, logging in again: {e}");
                        self.fetch_token(LOGIN_PATH).await?
                    }
                }
            }
            None => self.fetch_token(LOGIN_PATH).await?,
        };

        let access_token = fresh.access_token.clone();
        *guard = Some(fresh);
        Ok(access_token)
    }

    async fn fetch_token(&self, path: &str) -> std::result::Result<AccessToken, DeviceError> {
        let reply: ApiReply<TokenResult> = self.call(Method::GET, path, None, "").await?;
        let message = reply.message();
        match reply.result {
            Some(result) if reply.success => {
                info!(
                    "device API token obtained, valid for {}s",
                    result.expire_time
                );
                Ok(AccessToken {
                    access_token: result.access_token,
                    refresh_token: result.refresh_token,
                    expires_at: Instant::now() + Duration::from_secs(result.expire_time),
                })
            }
            _ => {
                warn!("device API login refused: {message}");
                Err(DeviceError::Rejected(format!(
                    "authentication failed: {message}"
                )))
            }
        }
    }

    /// Send one signed request and decode the reply envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        access_token: &str,
    ) -> std::result::Result<ApiReply<T>, DeviceError> {
        let body = match body {
            Some(value) => serde_json::to_vec(value)
                .map_err(|e| DeviceError::Transport(format!("cannot encode body: {e}")))?,
            None => Vec::new(),
        };

        let t = timestamp_ms();
        let to_sign = string_to_sign(method.as_str(), &body, path);
        let sign = sign(
            &self.access_secret,
            &self.access_id,
            access_token,
            t,
            &to_sign,
        )?;

        let mut request = self
            .client
            .request(method, format!("{}{path}", self.endpoint))
            .header("client_id", &self.access_id)
            .header("sign", sign)
            .header("sign_method", SIGN_METHOD)
            .header("t", t.to_string())
            .header("lang", "en");
        if !access_token.is_empty() {
            request = request.header("access_token", access_token);
        }
        if !body.is_empty() {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeviceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("device API returned HTTP {status} for {path}");
            return Err(DeviceError::Rejected(format!("HTTP {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| DeviceError::Transport(format!("invalid reply: {e}")))
    }
}

#[async_trait]
impl DeviceController for CloudDeviceController {
    async fn execute(
        &self,
        device_id: &str,
        command: &DeviceCommand,
    ) -> std::result::Result<(), DeviceError> {
        let access_token = self.access_token().await?;
        let path = format!("/v1.0/iot-03/devices/{device_id}/commands");
        let body = serde_json::json!({
            "commands": [{ "code": command.code, "value": command.value }]
        });

        let reply: ApiReply<IgnoredAny> = self
            .call(Method::POST, &path, Some(&body), &access_token)
            .await?;

        if reply.success {
            info!("device {device_id}: {} = {}", command.code, command.value);
            return Ok(());
        }

        if reply.code == Some(TOKEN_INVALID) {
            *self.token.lock().await = None;
        }
        let msg = reply.message();
        warn!("device {device_id} rejected {}: {msg}", command.code);
        Err(DeviceError::Rejected(msg))
    }
}

fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

fn string_to_sign(method: &str, body: &[u8], path_and_query: &str) -> String {
    let content_hash = hex::encode(Sha256::digest(body));
    format!("{method}\n{content_hash}\n\n{path_and_query}")
}

fn sign(
    secret: &str,
    client_id: &str,
    access_token: &str,
    t: u64,
    string_to_sign: &str,
) -> std::result::Result<String, DeviceError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| DeviceError::Transport(format!("cannot sign request: {e}")))?;
    mac.update(client_id.as_bytes());
    mac.update(access_token.as_bytes());
    mac.update(t.to_string().as_bytes());
    mac.update(string_to_sign.as_bytes());
    Ok(hex::encode_upper(mac.finalize().into_bytes()))
}
