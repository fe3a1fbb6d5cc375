//! Named admission quotas.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, TollgateError};

/// The two quotas a route can be placed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitPolicy {
    /// Public form submissions: contact, trip request, file upload.
    Strict,
    /// Every other read/write API route.
    General,
}

impl LimitPolicy {
    /// Both policies, in a stable order.
    pub const ALL: [LimitPolicy; 2] = [LimitPolicy::Strict, LimitPolicy::General];

    /// The name used in configuration and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitPolicy::Strict => "strict",
            LimitPolicy::General => "general",
        }
    }
}

impl fmt::Display for LimitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LimitPolicy {
    type Err = TollgateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(LimitPolicy::Strict),
            "general" => Ok(LimitPolicy::General),
            _ => Err(TollgateError::InvalidPolicy(s.to_string())),
        }
    }
}

/// Points allowed per window and the window length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyLimits {
    /// Maximum requests admitted in one window
    pub points: u32,
    /// Window length in seconds
    pub duration_secs: u64,
}

impl PolicyLimits {
    pub const fn new(points: u32, duration_secs: u64) -> Self {
        Self {
            points,
            duration_secs,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    fn validate(&self, policy: LimitPolicy) -> Result<()> {
        if self.points == 0 {
            return Err(TollgateError::Config(format!(
                "policy {} must allow at least one point",
                policy
            )));
        }
        if self.duration_secs == 0 {
            return Err(TollgateError::Config(format!(
                "policy {} must have a non-zero duration",
                policy
            )));
        }
        Ok(())
    }
}

/// Limits for every [`LimitPolicy`].
///
/// Any field left out of the configuration keeps that policy's default, so
/// overriding `strict.points` alone leaves `strict.duration_secs` at 60.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PartialPolicySet")]
pub struct PolicySet {
    pub strict: PolicyLimits,
    pub general: PolicyLimits,
}

#[derive(Debug, Default, Deserialize)]
struct PartialLimits {
    #[serde(default)]
    points: Option<u32>,
    #[serde(default)]
    duration_secs: Option<u64>,
}

impl PartialLimits {
    fn or(self, defaults: PolicyLimits) -> PolicyLimits {
        PolicyLimits {
            points: self.points.unwrap_or(defaults.points),
            duration_secs: self.duration_secs.unwrap_or(defaults.duration_secs),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PartialPolicySet {
    #[serde(default)]
    strict: PartialLimits,
    #[serde(default)]
    general: PartialLimits,
}

impl From<PartialPolicySet> for PolicySet {
    fn from(partial: PartialPolicySet) -> Self {
        Self {
            strict: partial.strict.or(default_strict()),
            general: partial.general.or(default_general()),
        }
    }
}

impl Default for PolicySet {
    fn default() -> Self {
        Self {
            strict: default_strict(),
            general: default_general(),
        }
    }
}

fn default_strict() -> PolicyLimits {
    PolicyLimits::new(5, 60)
}

fn default_general() -> PolicyLimits {
    PolicyLimits::new(60, 60)
}

impl PolicySet {
    /// Get the limits configured for a policy.
    pub fn limits(&self, policy: LimitPolicy) -> PolicyLimits {
        match policy {
            LimitPolicy::Strict => self.strict,
            LimitPolicy::General => self.general,
        }
    }

    /// Reject quotas that could never admit anything.
    pub fn validate(&self) -> Result<()> {
        for policy in LimitPolicy::ALL {
            self.limits(policy).validate(policy)?;
        }
        Ok(())
    }
}
