use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::inference::InferencePolicy;
use crate::site::{DEFAULT_HOMEPAGE, Site, UNKNOWN_LANGUAGE};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub homepage: Url,
    pub inference: InferencePolicy,
    pub languages: LanguageFilter,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LanguageFilter {
    /// When non-empty, only these languages (and "unknown") are kept.
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
}

impl LanguageFilter {
    pub fn normalized(mut self) -> Self {
        for lang in self.whitelist.iter_mut().chain(self.blacklist.iter_mut()) {
            *lang = lang.trim().to_lowercase();
        }
        self.whitelist.retain(|lang| !lang.is_empty());
        self.blacklist.retain(|lang| !lang.is_empty());
        self
    }

    /// Blacklisted languages are dropped; with a whitelist, only listed and
    /// unknown languages pass.
    pub fn allows(&self, language: &str) -> bool {
        if self.blacklist.iter().any(|lang| lang == language) {
            return false;
        }
        self.whitelist.is_empty()
            || language == UNKNOWN_LANGUAGE
            || self.whitelist.iter().any(|lang| lang == language)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            homepage: Url::parse(DEFAULT_HOMEPAGE).expect("static homepage url"),
            inference: InferencePolicy::default(),
            languages: LanguageFilter::default(),
        }
    }
}

impl SiteConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read site config: {}", path.display()))?;
        Self::from_yaml(&contents).with_context(|| format!("parse site config: {}", path.display()))
    }

    pub fn from_yaml(contents: &str) -> anyhow::Result<Self> {
        let mut config: Self = serde_yaml::from_str(contents).context("deserialize site config")?;
        if config.homepage.host_str().is_none() {
            anyhow::bail!("site config homepage must have a host: {}", config.homepage);
        }
        config.languages = config.languages.normalized();
        Ok(config)
    }

    /// Loads `path` when given, otherwise falls back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn site(&self) -> Site {
        Site::new(self.homepage.clone())
    }
}
