use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    errors::Error, notifier::NotifierConfig, rate_limiter::RateLimiter, retry::RetryPolicy,
    watcher::WatcherConfig, Result,
};

/// Typed runtime configuration.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub database_path: PathBuf,

    // Change-detection loop
    pub check_interval: Duration,
    pub error_cooldown: Duration,
    pub checkpoint_ttl: Duration,

    // Rate limiting
    pub rate_limit_enabled: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,

    // Delivery
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub send_timeout: Duration,

    // Store
    pub store_retry_attempts: usize,
    pub store_retry_delay: Duration,

    // Retention
    pub retention_max_age: Duration,
    pub retention_interval: Duration,

    // Admin
    pub cache_ttl: Duration,
}

impl Config {
    /// Read `.env` (if present) and then the process environment.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env(&lookup);

        let telegram_bot_token = env.str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let database_path = env
            .str("DATABASE_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("tracking.db"));

        let check_interval = Duration::from_secs(env.u64("CHECK_INTERVAL_SECS").unwrap_or(10));
        let error_cooldown = Duration::from_secs(env.u64("ERROR_COOLDOWN_SECS").unwrap_or(5));
        let checkpoint_ttl =
            Duration::from_secs(env.u64("CHECKPOINT_TTL_SECS").unwrap_or(86_400));

        let rate_limit_enabled = env.bool("RATE_LIMIT_ENABLED").unwrap_or(true);
        let rate_limit_requests = env.u32("RATE_LIMIT_REQUESTS").unwrap_or(30);
        let rate_limit_window = Duration::from_secs(env.u64("RATE_LIMIT_WINDOW").unwrap_or(60));

        let max_retries = env.u32("MAX_RETRIES").unwrap_or(3);
        let retry_delay = Duration::from_millis(env.u64("RETRY_DELAY_MS").unwrap_or(1000));
        let send_timeout = Duration::from_secs(env.u64("SEND_TIMEOUT_SECS").unwrap_or(10));

        let store_retry_attempts = env.usize("STORE_RETRY_ATTEMPTS").unwrap_or(3);
        let store_retry_delay =
            Duration::from_millis(env.u64("STORE_RETRY_DELAY_MS").unwrap_or(1000));

        let retention_days = env.u64("RETENTION_DAYS").unwrap_or(30);
        let retention_max_age = Duration::from_secs(retention_days.saturating_mul(86_400));
        let retention_interval =
            Duration::from_secs(env.u64("RETENTION_INTERVAL_SECS").unwrap_or(86_400));

        let cache_ttl = Duration::from_secs(env.u64("CACHE_TTL_SECS").unwrap_or(60));

        Ok(Self {
            telegram_bot_token,
            database_path,
            check_interval,
            error_cooldown,
            checkpoint_ttl,
            rate_limit_enabled,
            rate_limit_requests,
            rate_limit_window,
            max_retries,
            retry_delay,
            send_timeout,
            store_retry_attempts,
            store_retry_delay,
            retention_max_age,
            retention_interval,
            cache_ttl,
        })
    }

    pub fn watcher(&self) -> WatcherConfig {
        WatcherConfig {
            poll_interval: self.check_interval,
            error_cooldown: self.error_cooldown,
            checkpoint_ttl: self.checkpoint_ttl,
        }
    }

    pub fn notifier(&self) -> NotifierConfig {
        NotifierConfig {
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
            send_timeout: self.send_timeout,
        }
    }

    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(
            self.rate_limit_enabled,
            self.rate_limit_requests,
            self.rate_limit_window,
        )
    }

    pub fn store_retry(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.store_retry_attempts,
            delay: self.store_retry_delay,
        }
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn str(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn bool(&self, key: &str) -> Option<bool> {
        self.str(key).and_then(|s| match s.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
    }

    fn u64(&self, key: &str) -> Option<u64> {
        self.str(key).and_then(|s| s.trim().parse::<u64>().ok())
    }

    fn u32(&self, key: &str) -> Option<u32> {
        self.str(key).and_then(|s| s.trim().parse::<u32>().ok())
    }

    fn usize(&self, key: &str) -> Option<usize> {
        self.str(key).and_then(|s| s.trim().parse::<usize>().ok())
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = &val[1..val.len() - 1];
        }

        out.push((key.to_string(), val.to_string()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn token_is_required() {
        assert!(matches!(load(&[]), Err(Error::Config(_))));
        assert!(matches!(
            load(&[("TELEGRAM_BOT_TOKEN", "   ")]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn defaults_apply() {
        let cfg = load(&[("TELEGRAM_BOT_TOKEN", "123:abc")]).unwrap();
        assert_eq!(cfg.database_path, PathBuf::from("tracking.db"));
        assert_eq!(cfg.check_interval, Duration::from_secs(10));
        assert_eq!(cfg.error_cooldown, Duration::from_secs(5));
        assert_eq!(cfg.checkpoint_ttl, Duration::from_secs(86_400));
        assert!(cfg.rate_limit_enabled);
        assert_eq!(cfg.rate_limit_requests, 30);
        assert_eq!(cfg.rate_limit_window, Duration::from_secs(60));
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.retry_delay, Duration::from_secs(1));
        assert_eq!(cfg.send_timeout, Duration::from_secs(10));
        assert_eq!(cfg.store_retry().max_attempts, 3);
        assert_eq!(cfg.retention_max_age, Duration::from_secs(30 * 86_400));
        assert_eq!(cfg.retention_interval, Duration::from_secs(86_400));
        assert_eq!(cfg.cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn overrides_and_bad_values() {
        let cfg = load(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("DATABASE_PATH", "/var/lib/ipt/db.sqlite"),
            ("CHECK_INTERVAL_SECS", "30"),
            ("RATE_LIMIT_ENABLED", "off"),
            ("RATE_LIMIT_REQUESTS", "many"),
            ("RETENTION_DAYS", "7"),
        ])
        .unwrap();
        assert_eq!(cfg.database_path, PathBuf::from("/var/lib/ipt/db.sqlite"));
        assert_eq!(cfg.watcher().poll_interval, Duration::from_secs(30));
        assert!(!cfg.rate_limit_enabled);
        assert_eq!(cfg.rate_limit_requests, 30);
        assert_eq!(cfg.retention_max_age, Duration::from_secs(7 * 86_400));
    }

    #[test]
    fn dotenv_lines_are_parsed() {
        let parsed = parse_dotenv(
            "# comment\n\nTELEGRAM_BOT_TOKEN=\"123:abc\"\nDATABASE_PATH = 'x.db'\nnot a pair\n=novalue\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TELEGRAM_BOT_TOKEN".to_string(), "123:abc".to_string()),
                ("DATABASE_PATH".to_string(), "x.db".to_string()),
            ]
        );
    }
}
