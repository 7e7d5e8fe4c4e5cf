use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SCAN_TIMEOUT_MS: u64 = 3_000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Where the file-backed store keeps settings/history/feedback.
    pub data_dir: PathBuf,
    /// Bound on one cross-context scan request; expiry means "no text".
    pub scan_timeout: Duration,
    pub language: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            scan_timeout: Duration::from_millis(DEFAULT_SCAN_TIMEOUT_MS),
            language: "en".to_string(),
        }
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env(key)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}

pub fn default_data_dir() -> PathBuf {
    // Keep it local + user-owned; callers can override.
    std::env::temp_dir().join("factlens-data")
}

impl Config {
    /// Defaults overridden by `FACTLENS_DATA_DIR`, `FACTLENS_SCAN_TIMEOUT_MS`,
    /// `FACTLENS_LANGUAGE`.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            data_dir: env("FACTLENS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.data_dir),
            scan_timeout: Duration::from_millis(
                env_u64("FACTLENS_SCAN_TIMEOUT_MS", DEFAULT_SCAN_TIMEOUT_MS).clamp(1, 600_000),
            ),
            language: env("FACTLENS_LANGUAGE").unwrap_or(d.language),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-global; serialize tests that mutate them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn env_overrides_defaults() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("FACTLENS_DATA_DIR", "/tmp/factlens-test-dir");
        std::env::set_var("FACTLENS_SCAN_TIMEOUT_MS", "250");
        let c = Config::from_env();
        assert_eq!(c.data_dir, PathBuf::from("/tmp/factlens-test-dir"));
        assert_eq!(c.scan_timeout, Duration::from_millis(250));
        std::env::remove_var("FACTLENS_DATA_DIR");
        std::env::remove_var("FACTLENS_SCAN_TIMEOUT_MS");
    }

    #[test]
    fn garbage_timeout_falls_back() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("FACTLENS_SCAN_TIMEOUT_MS", "soon");
        assert_eq!(
            Config::from_env().scan_timeout,
            Duration::from_millis(DEFAULT_SCAN_TIMEOUT_MS)
        );
        std::env::remove_var("FACTLENS_SCAN_TIMEOUT_MS");
    }
}
