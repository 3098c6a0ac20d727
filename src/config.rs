use std::str::FromStr;

use anyhow::{bail, Result};

// ============================================================================
// Order Table Configuration
// ============================================================================
//
// Resolved once when the table is built and passed in by value. Environment
// overrides are read only by `from_env`, never during command handling.
//
// ============================================================================

pub const DATE_FORMAT_ENV: &str = "ORDER_ENTRY_DATE_FORMAT";
pub const AMBIGUITY_POLICY_ENV: &str = "ORDER_ENTRY_AMBIGUITY_POLICY";
pub const CONFIRM_PROMPT_ENV: &str = "ORDER_ENTRY_CONFIRM_PROMPT";

/// What to do when several concept candidates share a display name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmbiguityPolicy {
    /// Take the first candidate in catalog order and report the ambiguity
    #[default]
    FirstMatch,
    /// Refuse to resolve; the command is not built
    Reject,
}

impl FromStr for AmbiguityPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first-match" | "first_match" | "first" => Ok(AmbiguityPolicy::FirstMatch),
            "reject" | "strict" => Ok(AmbiguityPolicy::Reject),
            other => bail!("Unknown ambiguity policy: {}", other),
        }
    }
}

#[derive(Clone, Debug)]
pub struct OrderTableConfig {
    /// chrono pattern used for the active-dates column
    pub date_format: String,
    /// Concept resolution tie-break
    pub ambiguity_policy: AmbiguityPolicy,
    /// Discontinue question; `{display}` and `{order_number}` are substituted
    pub confirm_prompt: String,
}

impl Default for OrderTableConfig {
    fn default() -> Self {
        Self {
            date_format: "%d/%m/%Y".to_string(),
            ambiguity_policy: AmbiguityPolicy::FirstMatch,
            confirm_prompt: "Are you sure you want to discontinue {display} (order #{order_number})?"
                .to_string(),
        }
    }
}

impl OrderTableConfig {
    /// Refuse ambiguous concept matches instead of picking one
    pub fn strict() -> Self {
        Self {
            ambiguity_policy: AmbiguityPolicy::Reject,
            ..Self::default()
        }
    }

    /// Defaults overridden by `ORDER_ENTRY_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(format) = lookup(DATE_FORMAT_ENV) {
            if format.trim().is_empty() {
                bail!("{} cannot be empty", DATE_FORMAT_ENV);
            }
            config.date_format = format;
        }

        if let Some(policy) = lookup(AMBIGUITY_POLICY_ENV) {
            config.ambiguity_policy = policy.parse()?;
        }

        if let Some(prompt) = lookup(CONFIRM_PROMPT_ENV) {
            config.confirm_prompt = prompt;
        }

        Ok(config)
    }

    pub fn render_prompt(&self, display: &str, order_number: &str) -> String {
        self.confirm_prompt
            .replace("{display}", display)
            .replace("{order_number}", order_number)
    }
}
