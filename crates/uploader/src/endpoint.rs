//! Upload endpoint negotiation.
//!
//! One GET to the upload-info address returns the URL chunks are posted to,
//! the permitted number of concurrent uploads and the bot's display name.
//! Resolution never fails from the caller's point of view: on any error the
//! last good URL, or the configured fallback, is used instead.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use replaybot_settings::{SettingKey, SettingsStore};

use crate::client::HEADER_DEV;
use crate::config::{UploaderConfig, default_fallback_upload_url};
use crate::error::{ParseError, ResolveError, UploadError};

/// Parsed upload-info response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub upload_url: String,
    /// Raw `max_threads_curl` value, when present and non-empty.
    pub max_threads: Option<String>,
    /// Bot display name, when present and non-empty.
    pub display_name: Option<String>,
}

impl EndpointConfig {
    /// Concurrency ceiling advertised by the server, if it is a positive integer.
    pub fn max_uploads(&self) -> Option<usize> {
        self.max_threads.as_deref().and_then(parse_max_uploads)
    }
}

#[derive(Debug, Deserialize)]
struct UploadInfo {
    #[serde(default)]
    upload_url: Option<String>,
    #[serde(default)]
    max_threads_curl: Option<Value>,
    #[serde(default)]
    name_bot: Option<String>,
}

/// Parses an upload-info body:
/// `{"upload_url": "...", "max_threads_curl": "4", "name_bot": "..."}`.
pub fn parse_upload_info(body: &[u8]) -> Result<EndpointConfig, ParseError> {
    let value: Value = serde_json::from_slice(body)?;
    if !value.is_object() {
        return Err(ParseError::NotAnObject);
    }
    let info: UploadInfo = serde_json::from_value(value)?;

    let upload_url = info
        .upload_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or(ParseError::MissingUploadUrl)?;

    let max_threads = match info.max_threads_curl {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    Ok(EndpointConfig {
        upload_url,
        max_threads,
        display_name: info.name_bot.filter(|n| !n.is_empty()),
    })
}

fn parse_max_uploads(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

// ---------------------------------------------------------------------------
// EndpointResolver
// ---------------------------------------------------------------------------

/// Resolves the upload URL and concurrency ceiling, caching results in the
/// settings store and in memory.
pub struct EndpointResolver {
    http: reqwest::Client,
    info_url: String,
    fallback_url: String,
    default_max_uploads: usize,
    is_dev: bool,
    store: Arc<dyn SettingsStore>,
    cached_url: RwLock<Option<String>>,
}

impl EndpointResolver {
    /// Creates a resolver from the uploader config.
    ///
    /// A blank fallback URL is replaced by the built-in one.
    pub fn new(
        config: &UploaderConfig,
        store: Arc<dyn SettingsStore>,
    ) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.info_timeout_secs.max(1)))
            .build()?;

        let fallback_url = match config.fallback_upload_url.trim() {
            "" => {
                warn!("fallback upload URL is blank, using the built-in one");
                default_fallback_upload_url()
            }
            url => url.to_string(),
        };

        Ok(Self {
            http,
            info_url: config.upload_info_url.clone(),
            fallback_url,
            default_max_uploads: config.default_max_uploads.max(1),
            is_dev: config.is_dev,
            store,
            cached_url: RwLock::new(None),
        })
    }

    /// Queries the upload-info endpoint and returns the URL to upload to.
    ///
    /// On success the display name and concurrency are persisted when
    /// non-empty. On failure the last resolved URL is returned, or the
    /// fallback URL if there is none; persisted values stay untouched.
    pub async fn resolve(&self, credential: &str) -> String {
        match self.fetch(credential).await {
            Ok(endpoint) => {
                self.persist(&endpoint);
                if let Ok(mut cached) = self.cached_url.write() {
                    *cached = Some(endpoint.upload_url.clone());
                }
                info!(
                    upload_url = %endpoint.upload_url,
                    max_threads = ?endpoint.max_threads,
                    name_bot = ?endpoint.display_name,
                    "upload endpoint resolved"
                );
                endpoint.upload_url
            }
            Err(e) => {
                let url = self.last_known_url();
                warn!(
                    error = %e,
                    upload_url = %url,
                    "upload endpoint resolution failed, falling back"
                );
                url
            }
        }
    }

    /// Current concurrency ceiling: the persisted value when it is a positive
    /// integer, otherwise the configured default.
    pub fn max_uploads(&self) -> usize {
        parse_max_uploads(&self.store.get(SettingKey::MaxThreadsCurl))
            .unwrap_or(self.default_max_uploads)
    }

    /// Last successfully resolved URL, or the fallback.
    pub fn last_known_url(&self) -> String {
        self.cached_url
            .read()
            .ok()
            .and_then(|c| c.clone())
            .unwrap_or_else(|| self.fallback_url.clone())
    }

    async fn fetch(&self, credential: &str) -> Result<EndpointConfig, ResolveError> {
        let mut req = self
            .http
            .get(&self.info_url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, credential);
        if self.is_dev {
            req = req.header(HEADER_DEV, "true");
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ResolveError::Status(status.as_u16()));
        }

        let body = resp.bytes().await?;
        Ok(parse_upload_info(&body)?)
    }

    fn persist(&self, endpoint: &EndpointConfig) {
        if let Some(name) = &endpoint.display_name
            && let Err(e) = self.store.set(SettingKey::NameBot, name)
        {
            warn!(error = %e, "failed to persist bot name");
        }
        if let Some(threads) = &endpoint.max_threads
            && let Err(e) = self.store.set(SettingKey::MaxThreadsCurl, threads)
        {
            warn!(error = %e, "failed to persist upload concurrency");
        }
        debug!("endpoint settings persisted");
    }
}
