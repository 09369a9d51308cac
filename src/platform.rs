use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Persisted configuration record for the secret-store component.
///
/// The record is camelCase JSON on the wire. Unseal keys are stored as
/// dynamic `unsealKey<N>` fields because the number of shares is decided by
/// the backend; they ride in the flattened map with typed accessors below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecretComponentConfig {
    pub is_initialized: bool,
    pub is_installed: bool,
    pub is_processing: bool,
    pub is_failed: bool,
    pub address: String,
    pub port: u16,
    pub root_token: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SecretComponentConfig {
    /// True when the store returned a record with no content at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == SecretComponentConfig::default()
    }

    #[must_use]
    pub fn unseal_key(&self, index: u32) -> Option<&str> {
        self.extra
            .get(&format!("unsealKey{index}"))
            .and_then(serde_json::Value::as_str)
    }

    pub fn set_unseal_key(&mut self, index: u32, value: String) {
        self.extra
            .insert(format!("unsealKey{index}"), serde_json::Value::String(value));
    }
}

/// Client for the platform's per-component configuration store.
///
/// `put` has merge semantics: the body is a partial set of fields applied on
/// top of the stored record, never a full replace.
#[derive(Debug, Clone)]
pub struct ConfigStoreClient {
    base_url: String,
    client: Client,
}

impl ConfigStoreClient {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .build()
                .context("Failed to build config store HTTP client")?,
        })
    }

    /// Fetches the stored record for a component, `None` when absent.
    ///
    /// # Errors
    /// Returns error on transport failure or a non-success response.
    pub async fn get_component(&self, name: &str) -> Result<Option<SecretComponentConfig>> {
        let url = format!("{}/configs/{name}", self.base_url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Config store request failed: {name}"))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let text = response
            .text()
            .await
            .context("Failed to read config store response body")?;
        if !status.is_success() {
            anyhow::bail!("Config store error ({status}): {text}");
        }
        if text.trim().is_empty() || text.trim() == "null" {
            return Ok(None);
        }
        let parsed = serde_json::from_str(&text).context("Failed to parse component config")?;
        Ok(Some(parsed))
    }

    /// Applies a partial update to a component record.
    ///
    /// # Errors
    /// Returns error on transport failure or a non-success response.
    pub async fn put_component(&self, name: &str, partial: &serde_json::Value) -> Result<()> {
        let url = format!("{}/configs/{name}", self.base_url);
        let response = self
            .client
            .put(url)
            .json(partial)
            .send()
            .await
            .with_context(|| format!("Config store update failed: {name}"))?;
        ensure_success(response, "Config store").await
    }
}

/// Client for the platform's named environment-value registry.
#[derive(Debug, Clone)]
pub struct EnvRegistryClient {
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize, Deserialize)]
struct EnvironmentEntry {
    value: String,
}

impl EnvRegistryClient {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .build()
                .context("Failed to build env registry HTTP client")?,
        })
    }

    /// Reads a named value, `None` when the name is not registered.
    ///
    /// # Errors
    /// Returns error on transport failure or a non-success response.
    pub async fn get(&self, name: &str) -> Result<Option<String>> {
        let url = format!("{}/envs/{name}", self.base_url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Env registry request failed: {name}"))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let text = response
            .text()
            .await
            .context("Failed to read env registry response body")?;
        if !status.is_success() {
            anyhow::bail!("Env registry error ({status}): {text}");
        }
        let entry: EnvironmentEntry =
            serde_json::from_str(&text).context("Failed to parse env registry entry")?;
        Ok(Some(entry.value))
    }

    /// Writes a named value.
    ///
    /// # Errors
    /// Returns error on transport failure or a non-success response.
    pub async fn put(&self, name: &str, value: &str) -> Result<()> {
        let url = format!("{}/envs/{name}", self.base_url);
        let response = self
            .client
            .put(url)
            .json(&EnvironmentEntry {
                value: value.to_string(),
            })
            .send()
            .await
            .with_context(|| format!("Env registry update failed: {name}"))?;
        ensure_success(response, "Env registry").await
    }
}

/// Client for the platform's system-settings endpoint.
#[derive(Debug, Clone)]
pub struct SystemClient {
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SystemSettings {
    release_version: String,
}

impl SystemClient {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .build()
                .context("Failed to build system HTTP client")?,
        })
    }

    /// Queries the platform's current release version (empty filter).
    ///
    /// # Errors
    /// Returns error on transport failure, a non-success response, or an
    /// unparseable body.
    pub async fn release_version(&self) -> Result<String> {
        let url = format!("{}/systemSettings", self.base_url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("System settings request failed")?;
        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read system settings response body")?;
        if !status.is_success() {
            anyhow::bail!("System settings error ({status}): {text}");
        }
        let settings: SystemSettings =
            serde_json::from_str(&text).context("Failed to parse system settings")?;
        Ok(settings.release_version)
    }
}

async fn ensure_success(response: reqwest::Response, who: &str) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let text = response.text().await.unwrap_or_default();
    anyhow::bail!("{who} error ({status}): {text}")
}
