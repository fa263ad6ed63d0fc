use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

/// Booking page for foreign licence exchange reservations.
pub const DEFAULT_BOOKING_URL: &str =
    "https://www.keishicho-gto.metro.tokyo.lg.jp/keishicho-u/reserve/offerList_detail?tempSeq=461";

const LINE_PUSH_URL: &str = "https://api.line.me/v2/bot/message/push";

const REAL_LOCATION: &str = "府中試験場";
const REAL_CATEGORY: &str = "29の国･地域以外の方で、住民票のある方";

// The test target pairs a location with a category that usually has open
// slots, so a full run can be exercised on demand.
const TEST_LOCATION: &str = "江東試験場";
const TEST_CATEGORY: &str = "29の国･地域の方";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub browser: BrowserConfig,
    pub poll: PollConfig,
    pub line: LineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub booking_url: String,
    pub real: Target,
    pub test: Target,
}

/// A row of the schedule table, identified by examination location and
/// applicant category exactly as the site renders them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub location: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub chrome_path: Option<String>,
    pub window_width: u32,
    pub window_height: u32,
    pub navigation_attempts: u32,
    pub element_timeout_secs: u64,
    pub page_settle_ms: u64,
    pub cycle_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub max_pages: u32,
    pub backoff_cap_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConfig {
    pub api_url: String,
    pub channel_token: Option<String>,
    pub user_id: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let s = Config::builder()
            // Coded defaults so the watcher runs without any config file
            .set_default("site.booking_url", DEFAULT_BOOKING_URL)?
            .set_default("site.real.location", REAL_LOCATION)?
            .set_default("site.real.category", REAL_CATEGORY)?
            .set_default("site.test.location", TEST_LOCATION)?
            .set_default("site.test.category", TEST_CATEGORY)?
            .set_default("browser.window_width", 1920)?
            .set_default("browser.window_height", 1080)?
            .set_default("browser.navigation_attempts", 3)?
            .set_default("browser.element_timeout_secs", 30)?
            .set_default("browser.page_settle_ms", 500)?
            .set_default("browser.cycle_timeout_secs", 300)?
            .set_default("poll.interval_secs", 900)?
            .set_default("poll.max_pages", 12)?
            .set_default("poll.backoff_cap_secs", 300)?
            .set_default("line.api_url", LINE_PUSH_URL)?
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix "YOYAKU__"
            .add_source(
                Environment::with_prefix("YOYAKU")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        // LINE credentials come straight from the environment when not set
        // through the config surface
        if config.line.channel_token.is_none() {
            config.line.channel_token = non_empty_env("LINE_CHANNEL_TOKEN");
        }
        if config.line.user_id.is_none() {
            config.line.user_id = non_empty_env("LINE_USER_ID");
        }

        // Add Chrome path from environment if not set
        if config.browser.chrome_path.is_none() {
            config.browser.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if Url::parse(&self.site.booking_url).is_err() {
            return Err(ConfigError::Message("Invalid booking URL format".into()));
        }

        if Url::parse(&self.line.api_url).is_err() {
            return Err(ConfigError::Message("Invalid LINE API URL format".into()));
        }

        for target in [&self.site.real, &self.site.test] {
            if target.location.is_empty() || target.category.is_empty() {
                return Err(ConfigError::Message(
                    "Target location and category must not be empty".into(),
                ));
            }
        }

        if self.browser.navigation_attempts == 0 {
            return Err(ConfigError::Message(
                "Browser navigation_attempts must be greater than 0".into(),
            ));
        }

        if self.browser.cycle_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Browser cycle_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.poll.interval_secs == 0 {
            return Err(ConfigError::Message(
                "Poll interval_secs must be greater than 0".into(),
            ));
        }

        if self.poll.max_pages == 0 {
            return Err(ConfigError::Message(
                "Poll max_pages must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Target to watch for this run. The test target exists so the whole
    /// pipeline can be exercised against a row that is rarely empty.
    pub fn target(&self, test_mode: bool) -> &Target {
        if test_mode {
            &self.site.test
        } else {
            &self.site.real
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}
