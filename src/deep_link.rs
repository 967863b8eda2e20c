//! Deep-link identifier storage
//!
//! Read once at startup; replaced whenever the selected candidate changes and
//! cleared on reset. Writes always replace, never append history.

use std::sync::{Mutex, MutexGuard};

use url::Url;

use crate::config::LookupConfig;
use crate::error::ConfigError;

/// Key-value sink for the selected candidate identifier
pub trait DeepLinkStore: Send + Sync {
    /// Identifier present at startup, if any
    fn read(&self) -> Option<String>;

    /// Replace the stored identifier
    fn replace(&self, id: &str);

    /// Remove the stored identifier
    fn clear(&self);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Process-local store, used when no shareable URL is involved
#[derive(Debug, Default)]
pub struct MemoryDeepLink {
    value: Mutex<Option<String>>,
}

impl MemoryDeepLink {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(id.into())),
        }
    }
}

impl DeepLinkStore for MemoryDeepLink {
    fn read(&self) -> Option<String> {
        lock(&self.value).clone()
    }

    fn replace(&self, id: &str) {
        *lock(&self.value) = Some(id.to_string());
    }

    fn clear(&self) {
        *lock(&self.value) = None;
    }
}

// =============================================================================
// URL PARAMETER
// =============================================================================

/// Stores the identifier in one query parameter of a URL
#[derive(Debug)]
pub struct UrlDeepLink {
    url: Mutex<Url>,
    param: String,
}

impl UrlDeepLink {
    pub fn new(url: Url, param: impl Into<String>) -> Self {
        Self {
            url: Mutex::new(url),
            param: param.into(),
        }
    }

    /// Parse `link` and track the parameter named by `deep_link_param`
    pub fn from_config(link: &str, config: &LookupConfig) -> Result<Self, ConfigError> {
        let url = Url::parse(link).map_err(|e| ConfigError::Invalid {
            field: "link",
            message: format!("'{link}': {e}"),
        })?;
        Ok(Self::new(url, config.deep_link_param.as_str()))
    }

    pub fn current_url(&self) -> Url {
        lock(&self.url).clone()
    }

    /// Rewrite the query string, dropping `param` and optionally setting it again
    fn rewrite(&self, value: Option<&str>) {
        let mut url = lock(&self.url);
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != self.param.as_str())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() && value.is_none() {
            url.set_query(None);
            return;
        }

        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        if let Some(value) = value {
            pairs.append_pair(&self.param, value);
        }
    }
}

impl DeepLinkStore for UrlDeepLink {
    fn read(&self) -> Option<String> {
        let url = lock(&self.url);
        url.query_pairs()
            .find(|(k, _)| k == self.param.as_str())
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn replace(&self, id: &str) {
        self.rewrite(Some(id));
    }

    fn clear(&self) {
        self.rewrite(None);
    }
}
