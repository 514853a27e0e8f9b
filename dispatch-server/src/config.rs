use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use dispatch_core::geocode::{
    GeocoderConfig, DEFAULT_NOMINATIM_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use dispatch_core::map::DEFAULT_CENTER;
use dispatch_core::model::GeoPoint;
use dispatch_core::places::CachePolicy;
use serde::Deserialize;

use crate::state::{MapSettings, SessionLimits};

pub const CONFIG_FILE: &str = "dispatch.toml";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind: String,
    pub geocoder_url: String,
    pub geocoder_user_agent: String,
    pub geocoder_timeout_secs: u64,
    pub cache_failures: bool,
    pub map_center_lat: f64,
    pub map_center_lng: f64,
    pub session_idle_secs: u64,
    pub max_sessions: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".into(),
            geocoder_url: DEFAULT_NOMINATIM_URL.into(),
            geocoder_user_agent: DEFAULT_USER_AGENT.into(),
            geocoder_timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache_failures: false,
            map_center_lat: DEFAULT_CENTER.lat,
            map_center_lng: DEFAULT_CENTER.lng,
            session_idle_secs: SessionLimits::default().idle_ttl.as_secs(),
            max_sessions: SessionLimits::default().max_sessions,
        }
    }
}

impl Settings {
    pub fn geocoder(&self) -> GeocoderConfig {
        GeocoderConfig {
            base_url: self.geocoder_url.clone(),
            user_agent: self.geocoder_user_agent.clone(),
            timeout_secs: self.geocoder_timeout_secs,
        }
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            cache_failures: self.cache_failures,
        }
    }

    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            idle_ttl: Duration::from_secs(self.session_idle_secs),
            max_sessions: self.max_sessions,
        }
    }

    pub fn map(&self) -> MapSettings {
        MapSettings {
            center: GeoPoint::new(self.map_center_lat, self.map_center_lng),
            ..MapSettings::default()
        }
    }
}

/// Defaults, then `dispatch.toml` in the working directory if present, then
/// `DISPATCH_*` environment variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    let mut settings = read_file(Path::new(CONFIG_FILE))?.unwrap_or_default();
    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn read_file(path: &Path) -> anyhow::Result<Option<Settings>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_settings(&raw)
        .with_context(|| format!("parsing {}", path.display()))
        .map(Some)
}

pub fn parse_settings(raw: &str) -> anyhow::Result<Settings> {
    Ok(toml::from_str(raw)?)
}

pub fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("DISPATCH_BIND") {
        settings.bind = v;
    }
    if let Some(v) = lookup("DISPATCH_GEOCODER_URL") {
        settings.geocoder_url = v;
    }
    if let Some(v) = lookup("DISPATCH_GEOCODER_USER_AGENT") {
        settings.geocoder_user_agent = v;
    }
    if let Some(v) = lookup("DISPATCH_GEOCODER_TIMEOUT_SECS") {
        settings.geocoder_timeout_secs = v
            .trim()
            .parse()
            .with_context(|| format!("DISPATCH_GEOCODER_TIMEOUT_SECS='{v}'"))?;
    }
    if let Some(v) = lookup("DISPATCH_CACHE_FAILURES") {
        settings.cache_failures = parse_flag(&v)
            .with_context(|| format!("DISPATCH_CACHE_FAILURES='{v}'"))?;
    }
    if let Some(v) = lookup("DISPATCH_MAP_CENTER_LAT") {
        settings.map_center_lat = v
            .trim()
            .parse()
            .with_context(|| format!("DISPATCH_MAP_CENTER_LAT='{v}'"))?;
    }
    if let Some(v) = lookup("DISPATCH_MAP_CENTER_LNG") {
        settings.map_center_lng = v
            .trim()
            .parse()
            .with_context(|| format!("DISPATCH_MAP_CENTER_LNG='{v}'"))?;
    }
    if let Some(v) = lookup("DISPATCH_SESSION_IDLE_SECS") {
        settings.session_idle_secs = v
            .trim()
            .parse()
            .with_context(|| format!("DISPATCH_SESSION_IDLE_SECS='{v}'"))?;
    }
    if let Some(v) = lookup("DISPATCH_MAX_SESSIONS") {
        settings.max_sessions = v
            .trim()
            .parse()
            .with_context(|| format!("DISPATCH_MAX_SESSIONS='{v}'"))?;
    }
    Ok(())
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("not a boolean: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_public_nominatim() {
        let settings = Settings::default();
        assert_eq!(settings.bind, "127.0.0.1:8501");
        assert_eq!(settings.geocoder().timeout_secs, 10);
        assert_eq!(settings.geocoder().user_agent, "ambulance_dispatch_app");
        assert!(!settings.cache_policy().cache_failures);
        assert_eq!(settings.map().center, DEFAULT_CENTER);
        assert_eq!(settings.session_limits(), SessionLimits::default());
    }

    #[test]
    fn session_limits_come_from_env() {
        let mut settings = Settings::default();
        apply_env(
            &mut settings,
            env(&[
                ("DISPATCH_SESSION_IDLE_SECS", "120"),
                ("DISPATCH_MAX_SESSIONS", "8"),
            ]),
        )
        .expect("env");
        assert_eq!(
            settings.session_limits(),
            SessionLimits {
                idle_ttl: Duration::from_secs(120),
                max_sessions: 8,
            }
        );
    }

    #[test]
    fn file_overrides_only_named_keys() {
        let settings = parse_settings(
            r#"
            bind = "0.0.0.0:9000"
            cache_failures = true
            "#,
        )
        .expect("parse");
        assert_eq!(settings.bind, "0.0.0.0:9000");
        assert!(settings.cache_failures);
        assert_eq!(settings.geocoder_url, DEFAULT_NOMINATIM_URL);
    }

    #[test]
    fn env_wins_over_file() {
        let mut settings = parse_settings(r#"geocoder_url = "http://file""#).expect("parse");
        apply_env(
            &mut settings,
            env(&[
                ("DISPATCH_GEOCODER_URL", "http://env"),
                ("DISPATCH_GEOCODER_TIMEOUT_SECS", "3"),
                ("DISPATCH_CACHE_FAILURES", "yes"),
                ("DISPATCH_MAP_CENTER_LAT", "-1.5"),
            ]),
        )
        .expect("env");
        assert_eq!(settings.geocoder_url, "http://env");
        assert_eq!(settings.geocoder_timeout_secs, 3);
        assert!(settings.cache_failures);
        assert_eq!(settings.map().center, GeoPoint::new(-1.5, DEFAULT_CENTER.lng));
    }

    #[test]
    fn malformed_env_values_are_reported() {
        let mut settings = Settings::default();
        let err = apply_env(&mut settings, env(&[("DISPATCH_GEOCODER_TIMEOUT_SECS", "soon")]))
            .expect_err("bad timeout");
        assert!(err.to_string().contains("DISPATCH_GEOCODER_TIMEOUT_SECS"));

        let err = apply_env(&mut settings, env(&[("DISPATCH_CACHE_FAILURES", "maybe")]))
            .expect_err("bad flag");
        assert!(err.to_string().contains("DISPATCH_CACHE_FAILURES"));
    }

    #[test]
    fn unknown_file_keys_are_ignored() {
        let settings = parse_settings("colour = \"red\"").expect("parse");
        assert_eq!(settings, Settings::default());
    }
}
