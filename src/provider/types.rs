use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Timeout applied when a profile does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Azure `api-version` used when the profile does not set one.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

/// Which backend family a profile addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    OpenRouter,
    Azure,
    Custom,
}

impl ProviderKind {
    /// Stable identifier reported in errors and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
            Self::Azure => "azure",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AzureSettings {
    /// Deployment name (defaults to the profile's model).
    #[serde(default)]
    pub deployment: Option<String>,

    /// `api-version` query parameter.
    #[serde(default)]
    pub api_version: Option<String>,
}

/// How to address one backend: endpoint, model, credential and timeout.
///
/// Profiles are read-only for the duration of a call.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub provider: ProviderKind,

    /// Endpoint root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,

    pub model: String,

    /// Credential attached according to the provider's auth header shape.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request header overrides, applied after provider headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub azure: Option<AzureSettings>,

    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl ProviderProfile {
    pub fn new(provider: ProviderKind, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider,
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            headers: BTreeMap::new(),
            azure: None,
            timeout_ms: None,
        }
    }

    pub fn openai(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::new(ProviderKind::OpenAi, "https://api.openai.com/v1", model).with_api_key(api_key)
    }

    pub fn openrouter(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::new(ProviderKind::OpenRouter, "https://openrouter.ai/api/v1", model)
            .with_api_key(api_key)
    }

    pub fn azure(
        base_url: impl Into<String>,
        deployment: impl Into<String>,
        api_version: Option<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let deployment = deployment.into();
        let mut p = Self::new(ProviderKind::Azure, base_url, deployment.clone()).with_api_key(api_key);
        p.azure = Some(AzureSettings {
            deployment: Some(deployment),
            api_version,
        });
        p
    }

    pub fn custom(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(ProviderKind::Custom, base_url, model)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    pub fn provider_id(&self) -> &'static str {
        self.provider.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_ms.map(Duration::from_millis).unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Credential, treating an empty string as absent.
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Full chat-completions endpoint for this profile.
    ///
    /// `{base}/chat/completions`, or for Azure
    /// `{base}/openai/deployments/{deployment}/chat/completions?api-version={version}`.
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.provider {
            ProviderKind::Azure => {
                let azure = self.azure.clone().unwrap_or_default();
                let deployment = azure.deployment.unwrap_or_else(|| self.model.clone());
                let version = azure
                    .api_version
                    .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string());
                format!("{base}/openai/deployments/{deployment}/chat/completions?api-version={version}")
            }
            _ => format!("{base}/chat/completions"),
        }
    }
}

impl fmt::Debug for ProviderProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderProfile")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("azure", &self.azure)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl Default for ProviderProfile {
    /// Local OpenAI-compatible server (e.g. Ollama) with no credential.
    fn default() -> Self {
        Self::custom("http://localhost:11434/v1", "gpt-4o-mini")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_endpoint() {
        let p = ProviderProfile::openai("gpt-4o", "sk");
        assert_eq!(p.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn trailing_slashes_are_stripped() {
        let p = ProviderProfile::custom("http://localhost:11434/v1//", "llama3");
        assert_eq!(p.endpoint(), "http://localhost:11434/v1/chat/completions");

        let p = ProviderProfile::new(ProviderKind::OpenRouter, "https://openrouter.ai/api/v1/", "m");
        assert!(!p.endpoint().contains("v1//"));
    }

    #[test]
    fn azure_endpoint_uses_deployment_and_version() {
        let p = ProviderProfile::azure(
            "https://example.openai.azure.com/",
            "gpt4-prod",
            Some("2024-06-01".into()),
            "key",
        );
        assert_eq!(
            p.endpoint(),
            "https://example.openai.azure.com/openai/deployments/gpt4-prod/chat/completions?api-version=2024-06-01"
        );
    }

    #[test]
    fn azure_defaults_to_model_and_default_version() {
        let p = ProviderProfile::new(ProviderKind::Azure, "https://example.openai.azure.com", "gpt-4o");
        assert_eq!(
            p.endpoint(),
            "https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-02-01"
        );
    }

    #[test]
    fn timeout_defaults_to_sixty_seconds() {
        let p = ProviderProfile::default();
        assert_eq!(p.timeout(), Duration::from_secs(60));
        let p = p.with_timeout(Duration::from_millis(250));
        assert_eq!(p.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn debug_redacts_credential() {
        let p = ProviderProfile::openai("gpt-4o", "sk-secret");
        let s = format!("{p:?}");
        assert!(!s.contains("sk-secret"));
        assert!(s.contains("<redacted>"));
    }

    #[test]
    fn empty_credential_is_absent() {
        let p = ProviderProfile::custom("http://x", "m").with_api_key("");
        assert_eq!(p.credential(), None);
    }

    #[test]
    fn deserializes_from_toml() {
        let p: ProviderProfile = toml::from_str(
            r#"
provider = "azure"
base_url = "https://example.openai.azure.com"
model = "gpt-4o"
api_key = "k"
timeout_ms = 5000
azure = { deployment = "prod" }
"#,
        )
        .unwrap();
        assert_eq!(p.provider, ProviderKind::Azure);
        assert_eq!(p.timeout(), Duration::from_secs(5));
        assert!(p.endpoint().contains("/deployments/prod/"));
    }
}
