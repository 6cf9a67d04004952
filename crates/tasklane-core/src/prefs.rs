use std::fmt;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use tracing::{debug, warn};

use crate::kv::KvStore;

const THEME_STORAGE_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn storage_value(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_value())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(anyhow!("unknown theme: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreferenceStore<K: KvStore> {
    kv: K,
}

impl<K: KvStore> PreferenceStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    #[tracing::instrument(skip(self))]
    pub fn theme(&self) -> anyhow::Result<Theme> {
        let stored = self
            .kv
            .get(THEME_STORAGE_KEY)
            .context("failed to read theme preference")?;

        match stored.as_deref().map(str::parse::<Theme>) {
            None => Ok(Theme::default()),
            Some(Ok(theme)) => Ok(theme),
            Some(Err(err)) => {
                warn!(error = %err, "stored theme unrecognised; using default");
                Ok(Theme::default())
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn set_theme(&self, theme: Theme) -> anyhow::Result<()> {
        debug!(%theme, "saving theme preference");
        self.kv
            .set(THEME_STORAGE_KEY, theme.storage_value())
            .context("failed to save theme preference")
    }
}
