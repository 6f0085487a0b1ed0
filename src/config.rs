use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Monitored category pages, relative to the base origin. The second field
/// marks the crash/defect section, which carries different inclusion rules
/// and extra tabular columns.
const CATEGORY_PATHS: &[(&str, bool)] = &[
    ("/lv/transport/cars/toyota/sell/", false),
    ("/lv/transport/other/transport-with-defects-or-after-crash/sell/", true),
];

#[derive(Debug, Clone)]
pub struct Category {
    pub url: String,
    pub is_defect: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub check_interval: Duration,
    pub request_timeout: Duration,
    pub seen_file: PathBuf,
    pub auto_notify: bool,
    pub max_initial_send: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            base_url: env_or("SS_BASE_URL", "https://www.ss.lv"),
            check_interval: Duration::from_secs(parse_or("CHECK_INTERVAL_SECS", 20)?),
            request_timeout: Duration::from_secs(parse_or("REQUEST_TIMEOUT_SECS", 25)?),
            seen_file: PathBuf::from(env_or("SEEN_FILE", "toyota_seen.json")),
            auto_notify: parse_or("AUTO_NOTIFY", true)?,
            max_initial_send: parse_or("MAX_INITIAL_SEND", 50)?,
        })
    }

    pub fn categories(&self) -> Vec<Category> {
        CATEGORY_PATHS
            .iter()
            .map(|(path, is_defect)| Category {
                url: format!("{}{}", self.base_url.trim_end_matches('/'), path),
                is_defect: *is_defect,
            })
            .collect()
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => Ok(raw.parse()?),
        Err(_) => Ok(default),
    }
}
