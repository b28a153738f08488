use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "HomeCare";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Days before expiry at which a credential becomes EXPIRING_SOON.
pub const DEFAULT_EXPIRING_WINDOW_DAYS: u32 = 30;
/// Days-before-expiry thresholds at which renewal reminders are due.
pub const DEFAULT_REMINDER_DAYS: &[u32] = &[60, 30, 7];
pub const DEFAULT_AUDIT_RETENTION_DAYS: i64 = 365;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 6 * 60 * 60;
pub const DEFAULT_MAX_VISIT_HOURS: u32 = 12;
const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "homecare_lib=info,homecare=info,tower_http=warn"
}

/// Get the application data directory.
/// ~/HomeCare/ unless `HOMECARE_DATA_DIR` is set.
pub fn app_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HOMECARE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub expiring_window_days: u32,
    /// Sorted descending, deduplicated.
    pub reminder_days: Vec<u32>,
    pub audit_retention_days: i64,
    pub max_upload_bytes: usize,
    pub sweep_interval_secs: u64,
    pub max_visit_hours: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: app_data_dir(),
            bind_addr: DEFAULT_BIND.parse().unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8080))),
            expiring_window_days: DEFAULT_EXPIRING_WINDOW_DAYS,
            reminder_days: DEFAULT_REMINDER_DAYS.to_vec(),
            audit_retention_days: DEFAULT_AUDIT_RETENTION_DAYS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            max_visit_hours: DEFAULT_MAX_VISIT_HOURS,
        }
    }
}

impl AppConfig {
    /// Build from `HOMECARE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values keep the
    /// default and are logged.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("HOMECARE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(addr) = parse_var(&lookup, "HOMECARE_BIND") {
            config.bind_addr = addr;
        }
        if let Some(days) = parse_var(&lookup, "HOMECARE_EXPIRING_WINDOW_DAYS") {
            config.expiring_window_days = days;
        }
        if let Some(raw) = lookup("HOMECARE_REMINDER_DAYS") {
            match parse_reminder_days(&raw) {
                Some(days) => config.reminder_days = days,
                None => tracing::warn!(value = %raw, "Ignoring invalid HOMECARE_REMINDER_DAYS"),
            }
        }
        if let Some(days) = parse_var(&lookup, "HOMECARE_AUDIT_RETENTION_DAYS") {
            config.audit_retention_days = days;
        }
        if let Some(bytes) = parse_var(&lookup, "HOMECARE_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = bytes;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "HOMECARE_SWEEP_INTERVAL_SECS") {
            config.sweep_interval_secs = secs.max(60);
        }
        if let Some(hours) = parse_var(&lookup, "HOMECARE_MAX_VISIT_HOURS") {
            config.max_visit_hours = hours;
        }

        config
    }

    /// SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("database").join("homecare.db")
    }

    /// Directory for uploaded credential documents.
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring invalid configuration value");
            None
        }
    }
}

/// Parse `"60,30,7"` into descending unique thresholds.
fn parse_reminder_days(raw: &str) -> Option<Vec<u32>> {
    let mut days = raw
        .split(',')
        .map(|s| s.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    if days.is_empty() {
        return None;
    }
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();
    Some(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.expiring_window_days, 30);
        assert_eq!(config.reminder_days, vec![60, 30, 7]);
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("HOMECARE_DATA_DIR", "/srv/homecare"),
            ("HOMECARE_BIND", "0.0.0.0:9000"),
            ("HOMECARE_EXPIRING_WINDOW_DAYS", "45"),
            ("HOMECARE_REMINDER_DAYS", "7, 90,30,30"),
        ]));
        assert_eq!(config.data_dir, PathBuf::from("/srv/homecare"));
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.expiring_window_days, 45);
        assert_eq!(config.reminder_days, vec![90, 30, 7]);
        assert_eq!(
            config.database_path(),
            PathBuf::from("/srv/homecare/database/homecare.db")
        );
        assert_eq!(config.uploads_dir(), PathBuf::from("/srv/homecare/uploads"));
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("HOMECARE_EXPIRING_WINDOW_DAYS", "soon"),
            ("HOMECARE_REMINDER_DAYS", "60,x"),
            ("HOMECARE_BIND", "not-an-addr"),
        ]));
        assert_eq!(config.expiring_window_days, 30);
        assert_eq!(config.reminder_days, vec![60, 30, 7]);
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn sweep_interval_has_a_floor() {
        let config = AppConfig::from_lookup(lookup_from(&[("HOMECARE_SWEEP_INTERVAL_SECS", "1")]));
        assert_eq!(config.sweep_interval_secs, 60);
    }

    #[test]
    fn app_name_is_homecare() {
        assert_eq!(APP_NAME, "HomeCare");
    }
}
