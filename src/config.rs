use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

pub const CORPUS_NAME: &str = "PRESEEA";
pub const CODE_URL: &str = "https://github.com/PaulOberm/preseeapy";
pub const DOWNLOAD_URL: &str = "https://test.pypi.org/project/preseeapy/";

const DEFAULT_BASE_URL: &str = "https://preseea.linguas.net/Corpus.aspx";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/55.0.2883.75 Safari/537.36";

/// Runtime settings: defaults, then `preseea.toml`, then `PRESEEA_*` env.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub taxonomy_path: Option<PathBuf>,
    pub report_dir: PathBuf,
    pub author: String,
    pub word_range: usize,
    pub count_city_samples: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 100,
            taxonomy_path: None,
            report_dir: PathBuf::from("report"),
            author: "anonymous".to_string(),
            word_range: 3,
            count_city_samples: true,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let defaults = Settings::default();
        let settings = Config::builder()
            .set_default("base_url", defaults.base_url)?
            .set_default("user_agent", defaults.user_agent)?
            .set_default("timeout_secs", defaults.timeout_secs)?
            .set_default("report_dir", defaults.report_dir.to_string_lossy().into_owned())?
            .set_default("author", defaults.author)?
            .set_default("word_range", defaults.word_range as u64)?
            .set_default("count_city_samples", defaults.count_city_samples)?
            .add_source(File::with_name("preseea").required(false))
            .add_source(Environment::with_prefix("PRESEEA"))
            .build()?;

        let settings: Settings = settings.try_deserialize()?;
        tracing::debug!(?settings, "settings loaded");
        Ok(settings)
    }
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_corpus_site() {
        let s = Settings::default();
        assert_eq!(s.base_url, "https://preseea.linguas.net/Corpus.aspx");
        assert_eq!(s.word_range, 3);
        assert_eq!(s.timeout_secs, 100);
        assert!(s.taxonomy_path.is_none());
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let s = Settings::load().unwrap();
        assert!(s.base_url.starts_with("http"));
        assert!(s.word_range > 0);
    }
}
