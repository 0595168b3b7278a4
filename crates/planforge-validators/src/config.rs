use std::time::Duration;

use camino::Utf8PathBuf;

/// Deadline applied to each validator subprocess when none is configured.
pub const DEFAULT_VALIDATOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Validator commands, cache location and per-validator deadline.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub acceptance_cmd: Option<String>,
    pub evidence_cmd: Option<String>,
    pub interface_cmd: Option<String>,
    pub cache_dir: Utf8PathBuf,
    pub timeout: Duration,
}

impl ValidatorConfig {
    /// Config with no commands and the default timeout.
    #[must_use]
    pub fn new(cache_dir: Utf8PathBuf) -> Self {
        Self {
            acceptance_cmd: None,
            evidence_cmd: None,
            interface_cmd: None,
            cache_dir,
            timeout: DEFAULT_VALIDATOR_TIMEOUT,
        }
    }

    /// True when at least one validator command is set.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.acceptance_cmd.is_some() || self.evidence_cmd.is_some() || self.interface_cmd.is_some()
    }

    /// Configured validators in execution order.
    pub(crate) fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("acceptance", &self.acceptance_cmd),
            ("evidence", &self.evidence_cmd),
            ("interface", &self.interface_cmd),
        ]
        .into_iter()
        .filter_map(|(name, cmd)| cmd.as_deref().map(|c| (name, c)))
        .collect()
    }
}
