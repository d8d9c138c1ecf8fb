/// Environment variable that locks sessions once completed.
pub const LOCK_COMPLETED_ENV: &str = "QUIZ_LOCK_COMPLETED";

/// Behavioural switches for `SessionService`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    /// When set, completed sessions reject answers and keep their first
    /// completion stamp. Off by default: late corrections and re-completion
    /// are allowed.
    pub lock_completed_sessions: bool,
}

impl ServiceConfig {
    #[must_use]
    pub fn with_lock_completed_sessions(mut self, lock: bool) -> Self {
        self.lock_completed_sessions = lock;
        self
    }

    /// Reads settings from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; unknown or malformed values fall back
    /// to the defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lock_completed_sessions = lookup(LOCK_COMPLETED_ENV)
            .as_deref()
            .and_then(parse_flag)
            .unwrap_or(false);
        Self {
            lock_completed_sessions,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
