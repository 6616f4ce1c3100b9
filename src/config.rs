//! Configuration loaded once at startup from the process environment.
//!
//! Every component receives only the settings section it needs, so a
//! component can be run (and tested) without configuring the others.
//! Loading a section reports all of its missing or malformed keys at once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::{debug, info, warn};
use rust_decimal::Decimal;

use crate::error::{ConfigIssue, Result, SyncError};

pub const DEFAULT_BRANDS: &[&str] = &["BOSCH", "TRIALLI", "MANN"];
pub const DEFAULT_MARKETPLACE_API_URL: &str = "https://marketplace-api.wildberries.ru";
pub const DEFAULT_PRICES_API_URL: &str = "https://discounts-prices-api.wildberries.ru";
pub const DEFAULT_CONTENT_API_URL: &str = "https://content-api.wildberries.ru";
/// Provider limit for both stock and price uploads
pub const MAX_BATCH_SIZE: usize = 1000;

/// Snapshot of environment variables.
#[derive(Debug, Clone, Default)]
pub struct Env {
    vars: HashMap<String, String>,
}

impl Env {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Trimmed value, `None` when unset or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Loads a `.env` file into the process environment. Variables already set
/// in the environment win. Returns the file that was loaded, if any.
pub fn load_dotenv(env_file: Option<&Path>) -> Option<PathBuf> {
    let loaded = match env_file {
        Some(path) => dotenv::from_path(path).ok().map(|_| path.to_path_buf()),
        None => dotenv::dotenv().ok(),
    };
    match &loaded {
        Some(path) => debug!("Loaded environment from {}", path.display()),
        None => debug!("No .env file loaded"),
    }
    loaded
}

/// Like [`load_dotenv`], but a file named on the command line must load.
pub fn load_env_file(requested: Option<&Path>) -> Result<Option<PathBuf>> {
    let loaded = load_dotenv(requested);
    match (requested, &loaded) {
        (Some(path), None) => Err(SyncError::config(
            "--env-file",
            format!("cannot read {}", path.display()),
        )),
        _ => Ok(loaded),
    }
}

/// Collects issues while reading keys, so one pass reports every problem.
struct KeyReader<'a> {
    env: &'a Env,
    issues: Vec<ConfigIssue>,
}

impl<'a> KeyReader<'a> {
    fn new(env: &'a Env) -> Self {
        Self {
            env,
            issues: Vec::new(),
        }
    }

    fn required(&mut self, key: &str) -> String {
        match self.env.get(key) {
            Some(value) => value.to_string(),
            None => {
                self.report(ConfigIssue::new(key, "is not set"));
                String::new()
            }
        }
    }

    fn optional(&self, key: &str) -> Option<String> {
        self.env.get(key).map(str::to_string)
    }

    fn parsed_or<T: FromStr>(&mut self, key: &str, default: T) -> T {
        match self.env.get(key) {
            None => default,
            Some(raw) => match raw.parse() {
                Ok(value) => value,
                Err(_) => {
                    self.report(ConfigIssue::new(key, format!("cannot parse '{raw}'")));
                    default
                }
            },
        }
    }

    fn parsed_opt<T: FromStr>(&mut self, key: &str) -> Option<T> {
        let raw = self.env.get(key)?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                self.report(ConfigIssue::new(key, format!("cannot parse '{raw}'")));
                None
            }
        }
    }

    fn flag(&mut self, key: &str, default: bool) -> bool {
        match self.env.get(key) {
            None => default,
            Some(raw) => match parse_bool(raw) {
                Some(value) => value,
                None => {
                    self.report(ConfigIssue::new(
                        key,
                        format!("'{raw}' is not a boolean (use true/false)"),
                    ));
                    default
                }
            },
        }
    }

    fn check(&mut self, ok: bool, key: &str, reason: &str) {
        if !ok {
            self.report(ConfigIssue::new(key, reason));
        }
    }

    /// Sections sharing a key read it more than once; report it once.
    fn report(&mut self, issue: ConfigIssue) {
        if !self.issues.contains(&issue) {
            self.issues.push(issue);
        }
    }

    fn finish<T>(self, value: T) -> Result<T> {
        if self.issues.is_empty() {
            Ok(value)
        } else {
            Err(SyncError::Config(self.issues))
        }
    }
}

/// Parses `1/0/true/false/yes/no/on/off`, case-insensitive.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Timeouts, retries and pacing shared by the HTTP and IMAP clients.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub request_delay: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_backoff: Duration::from_millis(1000),
            request_delay: Duration::from_millis(200),
        }
    }
}

impl HttpSettings {
    fn read(r: &mut KeyReader<'_>) -> Self {
        let timeout_secs: u64 = r.parsed_or("HTTP_TIMEOUT_SECS", 30);
        r.check(timeout_secs > 0, "HTTP_TIMEOUT_SECS", "must be greater than 0");
        Self {
            timeout: Duration::from_secs(timeout_secs),
            max_retries: r.parsed_or("MAX_RETRIES", 3),
            retry_backoff: Duration::from_millis(r.parsed_or("RETRY_BACKOFF_MS", 1000)),
            request_delay: Duration::from_millis(r.parsed_or("REQUEST_DELAY_MS", 200)),
        }
    }

    pub fn from_env(env: &Env) -> Result<Self> {
        let mut r = KeyReader::new(env);
        let settings = Self::read(&mut r);
        r.finish(settings)
    }
}

/// Wildberries API access.
#[derive(Clone)]
pub struct WbSettings {
    pub api_token: String,
    pub marketplace_url: String,
    pub prices_url: String,
    pub content_url: String,
    pub batch_size: usize,
    pub discount: u32,
    pub warehouse_id: Option<u64>,
    pub http: HttpSettings,
}

// Hand-written so the token never reaches a log line.
impl std::fmt::Debug for WbSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WbSettings")
            .field("api_token", &"***")
            .field("marketplace_url", &self.marketplace_url)
            .field("prices_url", &self.prices_url)
            .field("content_url", &self.content_url)
            .field("batch_size", &self.batch_size)
            .field("discount", &self.discount)
            .field("warehouse_id", &self.warehouse_id)
            .field("http", &self.http)
            .finish()
    }
}

impl WbSettings {
    fn read(r: &mut KeyReader<'_>) -> Self {
        let api_token = match r.optional("WB_API_TOKEN").or_else(|| r.optional("WB_KEY")) {
            Some(token) => token,
            None => {
                r.check(false, "WB_API_TOKEN", "is not set (WB_KEY is also accepted)");
                String::new()
            }
        };
        let batch_size: usize = r.parsed_or("WB_BATCH_SIZE", 100);
        r.check(
            (1..=MAX_BATCH_SIZE).contains(&batch_size),
            "WB_BATCH_SIZE",
            "must be between 1 and 1000",
        );
        let discount: u32 = r.parsed_or("WB_DISCOUNT", 0);
        r.check(discount < 100, "WB_DISCOUNT", "must be between 0 and 99");

        Self {
            api_token,
            marketplace_url: base_url(r, "WB_MARKETPLACE_API_URL", DEFAULT_MARKETPLACE_API_URL),
            prices_url: base_url(r, "WB_PRICES_API_URL", DEFAULT_PRICES_API_URL),
            content_url: base_url(r, "WB_CONTENT_API_URL", DEFAULT_CONTENT_API_URL),
            batch_size,
            discount,
            warehouse_id: r.parsed_opt("WB_WAREHOUSE_ID"),
            http: HttpSettings::read(r),
        }
    }

    pub fn from_env(env: &Env) -> Result<Self> {
        let mut r = KeyReader::new(env);
        let settings = Self::read(&mut r);
        r.finish(settings)
    }
}

fn base_url(r: &KeyReader<'_>, key: &str, default: &str) -> String {
    r.optional(key)
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Mailbox access and the criteria for the price-list message.
#[derive(Clone)]
pub struct ImapSettings {
    pub server: String,
    pub port: u16,
    pub login: String,
    pub password: String,
    pub email_from: String,
    pub attachment_pattern: String,
    pub subject_filter: Option<String>,
    pub max_messages_checked: usize,
    /// Timeout and retries for the connection
    pub http: HttpSettings,
}

impl std::fmt::Debug for ImapSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("login", &self.login)
            .field("password", &"***")
            .field("email_from", &self.email_from)
            .field("attachment_pattern", &self.attachment_pattern)
            .field("subject_filter", &self.subject_filter)
            .field("max_messages_checked", &self.max_messages_checked)
            .field("http", &self.http)
            .finish()
    }
}

impl ImapSettings {
    fn read(r: &mut KeyReader<'_>) -> Self {
        let server = r
            .optional("IMAP_SERVER")
            .unwrap_or_else(|| "imap.mail.ru".to_string());
        let port = r.parsed_or("IMAP_PORT", 993u16);
        let login = r.required("IMAP_LOGIN");
        let password = r.required("IMAP_PASSWORD");
        let email_from = r.required("EMAIL_FROM");
        let attachment_pattern = r.required("ATTACHMENT_FILENAME");
        let max_messages_checked: usize = r.parsed_or("MAX_MESSAGES_CHECKED", 50);
        r.check(
            max_messages_checked > 0,
            "MAX_MESSAGES_CHECKED",
            "must be greater than 0",
        );
        Self {
            server,
            port,
            login,
            password,
            email_from,
            attachment_pattern,
            subject_filter: r.optional("EMAIL_SUBJECT"),
            max_messages_checked,
            http: HttpSettings::read(r),
        }
    }

    pub fn from_env(env: &Env) -> Result<Self> {
        let mut r = KeyReader::new(env);
        let settings = Self::read(&mut r);
        r.finish(settings)
    }
}

/// Working directories and cross-reference file locations.
#[derive(Debug, Clone)]
pub struct PathSettings {
    pub base_dir: PathBuf,
    pub download_dir: PathBuf,
    pub target_dir: PathBuf,
    pub articles_file: Option<PathBuf>,
    pub barcodes_file: Option<PathBuf>,
}

impl PathSettings {
    fn read(r: &mut KeyReader<'_>) -> Self {
        let base_dir = r
            .optional("BASE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let download_dir = r
            .optional("DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| base_dir.join("tmp"));
        let target_dir = r
            .optional("TARGET_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| base_dir.join("price"));
        Self {
            base_dir,
            download_dir,
            target_dir,
            articles_file: r.optional("ARTICLES_FILE").map(PathBuf::from),
            barcodes_file: r.optional("BARCODES_FILE").map(PathBuf::from),
        }
    }

    pub fn from_env(env: &Env) -> Result<Self> {
        let mut r = KeyReader::new(env);
        let settings = Self::read(&mut r);
        r.finish(settings)
    }
}

/// Business rules: which brands are synced and how prices are marked up.
#[derive(Debug, Clone)]
pub struct PricingSettings {
    pub brands: Vec<String>,
    pub multiplier: Decimal,
}

impl PricingSettings {
    fn read(r: &mut KeyReader<'_>) -> Self {
        let brands = match r.optional("BRANDS") {
            Some(raw) => parse_brand_list(&raw),
            None => DEFAULT_BRANDS.iter().map(|b| b.to_string()).collect(),
        };
        r.check(!brands.is_empty(), "BRANDS", "must list at least one brand");
        let multiplier: Decimal = r.parsed_or("PRICE_MULTIPLIER", Decimal::new(15, 1));
        r.check(
            multiplier > Decimal::ZERO,
            "PRICE_MULTIPLIER",
            "must be a positive number",
        );
        Self { brands, multiplier }
    }

    pub fn from_env(env: &Env) -> Result<Self> {
        let mut r = KeyReader::new(env);
        let settings = Self::read(&mut r);
        r.finish(settings)
    }
}

/// Comma-separated brand names, trimmed, empties dropped, first spelling of
/// a duplicate kept.
pub fn parse_brand_list(raw: &str) -> Vec<String> {
    let mut brands: Vec<String> = Vec::new();
    for brand in raw.split(',').map(str::trim).filter(|b| !b.is_empty()) {
        let key = crate::pricelist::normalize_brand(brand);
        if brands
            .iter()
            .any(|b| crate::pricelist::normalize_brand(b) == key)
        {
            warn!("Brand '{brand}' listed twice in BRANDS, ignoring duplicate");
            continue;
        }
        brands.push(brand.to_string());
    }
    brands
}

/// Orchestrator policy.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub continue_on_error: bool,
    pub settle: Duration,
}

impl PipelineSettings {
    fn read(r: &mut KeyReader<'_>) -> Self {
        Self {
            continue_on_error: r.flag("CONTINUE_ON_ERROR", false),
            settle: Duration::from_secs(r.parsed_or("STOCK_SETTLE_SECS", 30)),
        }
    }

    pub fn from_env(env: &Env) -> Result<Self> {
        let mut r = KeyReader::new(env);
        let settings = Self::read(&mut r);
        r.finish(settings)
    }
}

/// Every section, as needed by the full pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub wb: WbSettings,
    pub imap: ImapSettings,
    pub paths: PathSettings,
    pub pricing: PricingSettings,
    pub pipeline: PipelineSettings,
}

impl Config {
    /// Loads and validates all sections, reporting every issue at once.
    pub fn from_env(env: &Env) -> Result<Self> {
        let mut r = KeyReader::new(env);
        let config = Self {
            wb: WbSettings::read(&mut r),
            imap: ImapSettings::read(&mut r),
            paths: PathSettings::read(&mut r),
            pricing: PricingSettings::read(&mut r),
            pipeline: PipelineSettings::read(&mut r),
        };
        let config = r.finish(config)?;
        info!(
            "Configuration loaded: brands={:?}, multiplier={}, batch size={}",
            config.pricing.brands, config.pricing.multiplier, config.wb.batch_size
        );
        Ok(config)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
