//! Configuration loading and resolution.

use crate::error::{GeneratorError, GeneratorResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_ENV: &str = "SPIDERGEN_CONFIG";
const LOCAL_CONFIG: &str = "spidergen.json";

/// Settings shared by the dispatcher, the chain runner and the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Longest request chain a single detection or extraction may follow.
    pub max_chain_steps: usize,
    /// HTTP redirects followed per request.
    pub max_redirects: usize,
    /// Independent site chains probed at once by batch detection.
    pub concurrency: usize,
    pub user_agent: String,
    /// Where generated spider sources are written.
    pub output_dir: PathBuf,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_chain_steps: 8,
            max_redirects: 5,
            concurrency: 4,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                         AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/131.0.0.0 Safari/537.36"
                .to_string(),
            output_dir: PathBuf::from("spiders"),
        }
    }
}

impl GeneratorConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> GeneratorResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            GeneratorError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| GeneratorError::Config(format!("invalid {}: {e}", path.display())))
    }

    /// Resolve the effective configuration.
    ///
    /// File lookup order: `explicit`, `$SPIDERGEN_CONFIG`, `./spidergen.json`,
    /// built-in defaults. `SPIDERGEN_TIMEOUT_MS`, `SPIDERGEN_MAX_STEPS` and
    /// `SPIDERGEN_CONCURRENCY` then override individual fields.
    pub fn resolve(explicit: Option<&Path>) -> GeneratorResult<Self> {
        let mut config = match resolve_config_path(explicit) {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: F) -> GeneratorResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SPIDERGEN_TIMEOUT_MS") {
            self.timeout_ms = parse_env("SPIDERGEN_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("SPIDERGEN_MAX_STEPS") {
            self.max_chain_steps = parse_env("SPIDERGEN_MAX_STEPS", &v)?;
        }
        if let Some(v) = lookup("SPIDERGEN_CONCURRENCY") {
            self.concurrency = parse_env::<usize>("SPIDERGEN_CONCURRENCY", &v)?.max(1);
        }
        Ok(())
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }

    let local = PathBuf::from(LOCAL_CONFIG);
    local.exists().then_some(local)
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> GeneratorResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| GeneratorError::Config(format!("{key}: cannot parse {value:?}")))
}
