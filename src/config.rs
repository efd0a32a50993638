use serde::Serialize;

pub const DEFAULT_LOG_FILTER: &str = "info";

/// What `grades.submitScores` does with an entry that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorePolicy {
    /// Refuse the whole submission.
    #[default]
    Strict,
    /// Compute capped totals from the raw values and report warnings.
    Lenient,
}

impl ScorePolicy {
    fn parse(raw: &str) -> Option<ScorePolicy> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(ScorePolicy::Strict),
            "lenient" => Some(ScorePolicy::Lenient),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_filter: String,
    pub score_policy: ScorePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            score_policy: ScorePolicy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset or unrecognized values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();

        if let Some(filter) = lookup("SCHOOLD_LOG") {
            if !filter.trim().is_empty() {
                cfg.log_filter = filter;
            }
        }

        if let Some(policy) = lookup("SCHOOLD_SCORE_POLICY").and_then(|v| ScorePolicy::parse(&v)) {
            cfg.score_policy = policy;
        }

        cfg
    }
}
