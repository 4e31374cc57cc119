// src/config.rs
// Configuration for the VPN/geo gate.
// Loads per-site settings from the key-value store, with defaults and
// env overrides.

use std::env;

use serde::{Deserialize, Serialize};

use crate::policy::Action;
use crate::session::KeyValueStore;

/// Configuration struct for a site, loaded from KV or defaults.
/// Field names mirror the option names recognized in deployment config.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    /// Enable the plain timezone-detect variant.
    #[serde(rename = "FORBID_VPN", default)]
    pub forbid_vpn: bool,
    /// Redirect target for the detect variant on mismatch.
    #[serde(rename = "FORBIDDEN_URL", default)]
    pub forbidden_url: Option<String>,
    /// PERMIT or FORBID semantics for the location rules.
    #[serde(rename = "ACTION", default)]
    pub action: Action,
    /// Two-letter country codes for location rules.
    #[serde(rename = "COUNTRIES", default)]
    pub countries: Vec<String>,
    /// Two-letter continent codes for location rules.
    #[serde(rename = "TERRITORIES", default)]
    pub territories: Vec<String>,
    /// Redirect target when the location gate denies.
    #[serde(rename = "FORBIDDEN_LOC_URL", default)]
    pub forbidden_loc_url: Option<String>,
    /// Enable the network/VPN challenge variant.
    #[serde(rename = "VPN", default)]
    pub vpn: bool,
    /// Cool-down in seconds after a successful verification.
    #[serde(rename = "PERIOD", default)]
    pub period: Option<f64>,
    /// Redirect target for the network variant on mismatch.
    #[serde(rename = "FORBIDDEN_VPN_URL", default)]
    pub forbidden_vpn_url: Option<String>,
    /// Relaxed mode: unresolved addresses are always granted.
    #[serde(rename = "DEBUG", default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            forbid_vpn: false,
            forbidden_url: None,
            action: Action::Forbid,
            countries: vec![],
            territories: vec![],
            forbidden_loc_url: None,
            vpn: false,
            period: None,
            forbidden_vpn_url: None,
            debug: false,
        }
    }
}

fn parse_bool_env(value: Option<&str>) -> bool {
    value
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

impl Config {
    /// Loads config for a site from the key-value store, or returns
    /// defaults if not set. The DEBUG env var overrides the stored flag.
    pub fn load(store: &impl KeyValueStore, site_id: &str) -> Self {
        let key = format!("config:{}", site_id);
        let mut cfg = match store.get(&key) {
            Ok(Some(val)) => serde_json::from_slice::<Config>(&val).unwrap_or_default(),
            _ => Config::default(),
        };
        if let Ok(val) = env::var("DEBUG") {
            cfg.debug = parse_bool_env(Some(val.as_str()));
        }
        cfg
    }
}
