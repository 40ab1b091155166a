use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use config::{Config, Environment};
use serde::Deserialize;

use crate::error::{CrawlError, Result};

const ENV_PREFIX: &str = "SCRAPPING";
const DEFAULT_DATA_PATH: &str = "ressources";
const DEFAULT_DELAY_SECS: u64 = 30;

/// Which backend turns a URL into HTML.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    /// Plain HTTP GET, no JavaScript rendering
    #[default]
    Http,
    /// Rendered HTML through spider.cloud (needs SPIDER_API_KEY)
    Spider,
}

impl FetcherKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FetcherKind::Http => "http",
            FetcherKind::Spider => "spider",
        }
    }
}

/// Values given on the command line; each one wins over its environment twin.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub seed_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub delay_secs: Option<u64>,
    pub fetcher: Option<FetcherKind>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: Option<String>,
    pub seed_url: Option<String>,
    pub data_path: PathBuf,
    pub delay_secs: u64,
    pub fetcher: FetcherKind,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: None,
            seed_url: None,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            delay_secs: DEFAULT_DELAY_SECS,
            fetcher: FetcherKind::default(),
        }
    }
}

impl Settings {
    /// Read `SCRAPPING_*` from the environment, then apply CLI overrides.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let settings = Config::builder()
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("base_url", overrides.base_url.clone())?
            .set_override_option("seed_url", overrides.seed_url.clone())?
            .set_override_option(
                "data_path",
                overrides
                    .data_dir
                    .as_ref()
                    .map(|p| p.display().to_string()),
            )?
            .set_override_option("delay_secs", overrides.delay_secs.map(|s| s as i64))?
            .set_override_option("fetcher", overrides.fetcher.map(FetcherKind::as_str))?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// The validated base URL. Every stage needs it, so this is checked
    /// once before any network activity.
    pub fn base_url(&self) -> Result<BaseUrl> {
        match self.base_url.as_deref() {
            Some(raw) => BaseUrl::new(raw),
            None => Err(CrawlError::ConfigurationMissing("SCRAPPING_BASE_URL")),
        }
    }

    /// Listing page for the district stage; falls back to the base URL.
    pub fn seed_url(&self) -> Result<String> {
        match self.seed_url.as_deref().map(str::trim) {
            Some(seed) if !seed.is_empty() => Ok(seed.to_string()),
            _ => Ok(self.base_url()?.as_str().to_string()),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }
}

/// Root of the source site; relative record paths are appended to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(String);

impl BaseUrl {
    pub fn new(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CrawlError::ConfigurationMissing("SCRAPPING_BASE_URL"));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Absolute paths pass through untouched; anything else is appended to
    /// the base with exactly one slash at the seam.
    pub fn join(&self, path: &str) -> String {
        let path = path.trim();
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        match (self.0.ends_with('/'), path.starts_with('/')) {
            (true, true) => format!("{}{}", self.0, &path[1..]),
            (false, false) if !path.is_empty() => format!("{}/{}", self.0, path),
            _ => format!("{}{}", self.0, path),
        }
    }
}
