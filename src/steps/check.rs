//! Pre-flight checks of configuration, local directories and connectivity.
//! Nothing remote is modified.

use std::fmt;
use std::fs;
use std::path::Path;

use log::{error, info, warn};

use super::fetch::open_mailbox;
use crate::catalog::CatalogMapping;
use crate::config::{Config, Env, ImapSettings, PathSettings, WbSettings};
use crate::error::Result;
use crate::mailbox::Mailbox;
use crate::wildberries::{MarketplaceApi, WildberriesClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Warn,
    Fail,
}

#[derive(Debug, Clone)]
pub struct CheckItem {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub items: Vec<CheckItem>,
}

impl CheckReport {
    fn push(&mut self, name: &str, status: CheckStatus, detail: impl Into<String>) {
        let detail = detail.into();
        match status {
            CheckStatus::Ok => info!("[OK]   {name}: {detail}"),
            CheckStatus::Warn => warn!("[WARN] {name}: {detail}"),
            CheckStatus::Fail => error!("[FAIL] {name}: {detail}"),
        }
        self.items.push(CheckItem {
            name: name.to_string(),
            status,
            detail,
        });
    }

    /// True when nothing failed; warnings are allowed.
    pub fn all_ok(&self) -> bool {
        self.items.iter().all(|i| i.status != CheckStatus::Fail)
    }

    pub fn find(&self, name: &str) -> Option<&CheckItem> {
        self.items.iter().find(|i| i.name == name)
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            let tag = match item.status {
                CheckStatus::Ok => "OK",
                CheckStatus::Warn => "WARN",
                CheckStatus::Fail => "FAIL",
            };
            writeln!(f, "  [{tag:<4}] {}: {}", item.name, item.detail)?;
        }
        Ok(())
    }
}

/// Remote reachability tests, replaceable in tests.
pub trait ConnectivityProbe {
    fn imap(&mut self, settings: &ImapSettings) -> Result<String>;
    fn marketplace(&mut self, settings: &WbSettings) -> Result<String>;
}

/// Connects to the real servers.
pub struct LiveProbe;

impl ConnectivityProbe for LiveProbe {
    fn imap(&mut self, settings: &ImapSettings) -> Result<String> {
        let mut session = open_mailbox(settings)?;
        session.close()?;
        Ok(format!(
            "logged in to {}:{} as {}",
            settings.server, settings.port, settings.login
        ))
    }

    fn marketplace(&mut self, settings: &WbSettings) -> Result<String> {
        let client = WildberriesClient::new(settings)?;
        let warehouses = client.warehouses()?;
        Ok(format!("token accepted, {} warehouse(s)", warehouses.len()))
    }
}

/// Runs every check and collects the results; never stops early.
pub fn run_checks(
    env: &Env,
    dotenv_file: Option<&Path>,
    probe: &mut dyn ConnectivityProbe,
) -> CheckReport {
    let mut report = CheckReport::default();

    match dotenv_file {
        Some(path) => report.push(".env file", CheckStatus::Ok, path.display().to_string()),
        None => report.push(
            ".env file",
            CheckStatus::Warn,
            "not found, using the process environment only",
        ),
    }

    match Config::from_env(env) {
        Ok(_) => report.push("configuration", CheckStatus::Ok, "all keys valid"),
        Err(e) => report.push("configuration", CheckStatus::Fail, e.to_string()),
    }

    if let Ok(paths) = PathSettings::from_env(env) {
        check_directories(&paths, &mut report);
        match CatalogMapping::load(&paths) {
            Ok(Some(mapping)) => report.push(
                "cross-reference files",
                CheckStatus::Ok,
                format!(
                    "{} article(s), {} barcode(s)",
                    mapping.article_count(),
                    mapping.barcodes().len()
                ),
            ),
            Ok(None) => report.push(
                "cross-reference files",
                CheckStatus::Fail,
                format!(
                    "no Articles/Barcodes file in {}; the price update cannot resolve nmIDs",
                    paths.base_dir.display()
                ),
            ),
            Err(e) => report.push("cross-reference files", CheckStatus::Fail, e.to_string()),
        }
    }

    match ImapSettings::from_env(env) {
        Ok(imap) => match probe.imap(&imap) {
            Ok(detail) => report.push("IMAP", CheckStatus::Ok, detail),
            Err(e) => report.push("IMAP", CheckStatus::Fail, e.to_string()),
        },
        Err(_) => report.push("IMAP", CheckStatus::Fail, "not tested, settings incomplete"),
    }

    match WbSettings::from_env(env) {
        Ok(wb) => match probe.marketplace(&wb) {
            Ok(detail) => report.push("marketplace API", CheckStatus::Ok, detail),
            Err(e) => report.push("marketplace API", CheckStatus::Fail, e.to_string()),
        },
        Err(_) => report.push(
            "marketplace API",
            CheckStatus::Fail,
            "not tested, settings incomplete",
        ),
    }

    report
}

/// Missing local directories are created; that is the only change made.
fn check_directories(paths: &PathSettings, report: &mut CheckReport) {
    let dirs = [
        ("BASE_DIR", &paths.base_dir),
        ("DOWNLOAD_DIR", &paths.download_dir),
        ("TARGET_DIR", &paths.target_dir),
    ];
    for (key, dir) in dirs {
        if dir.is_dir() {
            report.push(key, CheckStatus::Ok, dir.display().to_string());
            continue;
        }
        match fs::create_dir_all(dir) {
            Ok(()) => report.push(key, CheckStatus::Ok, format!("created {}", dir.display())),
            Err(e) => report.push(
                key,
                CheckStatus::Fail,
                format!("cannot create {}: {e}", dir.display()),
            ),
        }
    }
}

#[cfg(test)]
#[path = "check_tests.rs"]
mod tests;
