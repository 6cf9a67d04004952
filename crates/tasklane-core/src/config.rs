//! `.tasklanerc` settings.
//!
//! The rc file is a flat list of `key = value` lines. `#` starts a comment
//! and `include <path>` splices another rc file in place, relative to the
//! including file. Later lines win, and `rc.<key>=<value>` overrides from
//! the command line win over every file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use tracing::{debug, info, trace, warn};

use crate::task::ListKind;

const RC_ENV_VAR: &str = "TASKLANERC";
const RC_FILE_NAME: &str = ".tasklanerc";
const DATA_DIR_NAME: &str = ".tasklane";

const DEFAULTS: [(&str, &str); 3] = [
    ("data.location", "~/.tasklane"),
    ("default.list", "active"),
    ("color", "on"),
];

#[derive(Debug, Clone)]
pub struct Config {
    settings: HashMap<String, String>,
    pub loaded_files: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: DEFAULTS
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            loaded_files: Vec::new(),
        }
    }
}

/// One meaningful rc line.
#[derive(Debug, PartialEq, Eq)]
enum RcLine<'a> {
    Include(&'a str),
    Setting { key: &'a str, value: &'a str },
}

impl Config {
    #[tracing::instrument(skip(rc_override))]
    pub fn load(rc_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config::default();
        match rc_path(rc_override) {
            Some(path) => {
                info!(rc = %path.display(), "loading rc file");
                let mut chain = Vec::new();
                cfg.read_rc(&path, &mut chain)?;
            }
            None => debug!("no rc file; using defaults"),
        }
        Ok(cfg)
    }

    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in overrides {
            let key = key.strip_prefix("rc.").unwrap_or(&key).to_string();
            debug!(%key, %value, "rc override");
            self.settings.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.settings.get(key).cloned()
    }

    pub fn default_list(&self) -> anyhow::Result<ListKind> {
        self.settings
            .get("default.list")
            .map_or("active", String::as_str)
            .parse::<ListKind>()
            .context("invalid default.list setting")
    }

    /// Whether output may carry ANSI color.
    pub fn color(&self) -> anyhow::Result<bool> {
        let raw = self.settings.get("color").map_or("on", String::as_str);
        switch(raw).ok_or_else(|| anyhow!("invalid color setting: {raw}"))
    }

    /// Reads `path` into the settings. `chain` holds the canonical paths of
    /// the files currently being read, outermost first.
    #[tracing::instrument(skip(self, chain))]
    fn read_rc(&mut self, path: &Path, chain: &mut Vec<PathBuf>) -> anyhow::Result<()> {
        let path = expand_home(path);
        let canonical = path
            .canonicalize()
            .with_context(|| format!("failed to read {}", path.display()))?;
        if chain.contains(&canonical) {
            bail!("include cycle at {}", path.display());
        }

        let text = fs::read_to_string(&canonical)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.loaded_files.push(path.clone());
        chain.push(canonical);

        let base = path.parent().unwrap_or(Path::new("."));
        for (idx, raw) in text.lines().enumerate() {
            let line = parse_line(raw)
                .with_context(|| format!("{}:{}", path.display(), idx + 1))?;
            match line {
                None => {}
                Some(RcLine::Include(target)) => {
                    let target = base.join(expand_home(Path::new(target)));
                    if target.exists() {
                        self.read_rc(&target, chain)?;
                    } else {
                        warn!(include = %target.display(), "missing include skipped");
                    }
                }
                Some(RcLine::Setting { key, value }) => {
                    trace!(key, value, "rc setting");
                    self.settings.insert(key.to_string(), value.to_string());
                }
            }
        }

        chain.pop();
        Ok(())
    }
}

fn parse_line(raw: &str) -> anyhow::Result<Option<RcLine<'_>>> {
    let line = raw.split_once('#').map_or(raw, |(before, _)| before).trim();
    if line.is_empty() {
        return Ok(None);
    }
    if let Some(target) = line.strip_prefix("include ") {
        let target = target.trim();
        if target.is_empty() {
            bail!("include needs a path");
        }
        return Ok(Some(RcLine::Include(target)));
    }
    let (key, value) = line
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key = value, got {raw:?}"))?;
    Ok(Some(RcLine::Setting {
        key: key.trim(),
        value: value.trim(),
    }))
}

fn switch(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Some(true),
        "off" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// `--rcfile`, then `TASKLANERC` (`/dev/null` opts out), then `~/.tasklanerc`
/// when it exists.
fn rc_path(rc_override: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = rc_override {
        return Some(path.to_path_buf());
    }
    if let Ok(env) = std::env::var(RC_ENV_VAR) {
        return (env != "/dev/null").then(|| PathBuf::from(env));
    }
    dirs::home_dir()
        .map(|home| home.join(RC_FILE_NAME))
        .filter(|candidate| candidate.exists())
}

/// The directory task lists live in, created on demand. `--data` wins over
/// `data.location`.
#[tracing::instrument(skip(cfg))]
pub fn resolve_data_dir(cfg: &Config, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = match (override_dir, cfg.get("data.location")) {
        (Some(dir), _) => dir.to_path_buf(),
        (None, Some(location)) => expand_home(Path::new(&location)),
        (None, None) => dirs::home_dir()
            .map(|home| home.join(DATA_DIR_NAME))
            .ok_or_else(|| anyhow!("cannot determine home directory"))?,
    };

    if !dir.exists() {
        info!(dir = %dir.display(), "creating data directory");
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    Ok(dir)
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
