use anyhow::Context;
use chatstream::prompts::{builtin_templates, PromptTemplate};
use chatstream::ProviderProfile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// Name used for the built-in profile when no config file exists.
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub active: Option<String>,

    #[serde(default)]
    pub profiles: BTreeMap<String, ProviderProfile>,

    /// User templates; an id shared with a built-in replaces it.
    #[serde(default)]
    pub prompts: BTreeMap<String, PromptTemplate>,
}

impl Config {
    /// Read and validate the config file. A missing file is `Ok(None)`.
    pub fn load_optional(path: impl AsRef<Path>) -> anyhow::Result<Option<Self>> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text)
                .with_context(|| format!("invalid config: {}", path.display()))
                .map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using built-in profile");
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("failed to read config: {}", path.display())),
        }
    }

    /// Parse TOML and reject configs that would only fail later, per request.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let cfg: Config = toml::from_str(text).context("failed to parse TOML")?;

        if let Some(active) = &cfg.active {
            let builtin = active == DEFAULT_PROFILE && cfg.profiles.is_empty();
            if !builtin && !cfg.profiles.contains_key(active) {
                anyhow::bail!("`active` names unknown profile: {active}");
            }
        }
        for (name, p) in &cfg.profiles {
            if p.base_url.trim().is_empty() {
                anyhow::bail!("profile `{name}` has an empty base_url");
            }
            if p.model.trim().is_empty() {
                anyhow::bail!("profile `{name}` has an empty model");
            }
        }
        if let Some((id, _)) = cfg.prompts.iter().find(|(_, t)| t.body.trim().is_empty()) {
            anyhow::bail!("prompt template `{id}` has an empty body");
        }
        Ok(cfg)
    }

    /// Resolve a profile by name, falling back to `active`, then to the only
    /// configured profile, then to the built-in default.
    pub fn profile(&self, name: Option<&str>) -> anyhow::Result<(String, ProviderProfile)> {
        let name = name.or(self.active.as_deref());
        match name {
            Some(name) => {
                if let Some(p) = self.profiles.get(name) {
                    return Ok((name.to_string(), p.clone()));
                }
                if name == DEFAULT_PROFILE && self.profiles.is_empty() {
                    return Ok((name.to_string(), ProviderProfile::default()));
                }
                anyhow::bail!("unknown profile: {name}")
            }
            None => match self.profiles.iter().next() {
                Some((name, p)) if self.profiles.len() == 1 => Ok((name.clone(), p.clone())),
                Some(_) => anyhow::bail!("several profiles configured; set `active` or pass --profile"),
                None => Ok((DEFAULT_PROFILE.to_string(), ProviderProfile::default())),
            },
        }
    }

    /// Built-in templates overlaid with the configured ones.
    pub fn templates(&self) -> BTreeMap<String, PromptTemplate> {
        let mut all = builtin_templates();
        all.extend(self.prompts.iter().map(|(id, t)| (id.clone(), t.clone())));
        all
    }

    pub fn template(&self, id: &str) -> anyhow::Result<PromptTemplate> {
        self.prompts
            .get(id)
            .cloned()
            .or_else(|| builtin_templates().remove(id))
            .with_context(|| format!("unknown prompt template: {id}"))
    }
}
