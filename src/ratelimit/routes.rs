//! Route classification.
//!
//! Maps an HTTP method and path to the policy that protects it. Rules are
//! tried in order and the first match wins; a matching rule without a
//! policy exempts the route. Paths matching no rule are exempt.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use super::policy::LimitPolicy;
use crate::error::{Result, TollgateError};

/// A single classification rule.
///
/// Path patterns are `/`-separated segments. A segment is matched
/// literally, `:name` matches any one segment, and a trailing `*` matches
/// whatever remains (including nothing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    /// HTTP method to match; any method when absent
    #[serde(default)]
    pub method: Option<String>,
    /// Path pattern
    pub path: String,
    /// Policy to apply; the route is exempt when absent
    #[serde(default)]
    pub policy: Option<LimitPolicy>,
}

impl RouteRule {
    pub fn new(method: Option<&str>, path: &str, policy: Option<LimitPolicy>) -> Self {
        Self {
            method: method.map(str::to_string),
            path: path.to_string(),
            policy,
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(TollgateError::Config(format!(
                "route pattern must start with '/': {}",
                self.path
            )));
        }

        let segments: Vec<&str> = segments(&self.path).collect();
        if let Some(pos) = segments.iter().position(|s| *s == "*") {
            if pos + 1 != segments.len() {
                return Err(TollgateError::Config(format!(
                    "'*' may only appear as the last segment: {}",
                    self.path
                )));
            }
        }
        Ok(())
    }

    fn matches(&self, method: &str, path: &str) -> bool {
        if let Some(ref m) = self.method {
            if !m.eq_ignore_ascii_case(method) {
                return false;
            }
        }

        let mut pattern = segments(&self.path);
        let mut actual = segments(path);

        loop {
            match (pattern.next(), actual.next()) {
                (Some("*"), _) => return true,
                (Some(p), Some(a)) => {
                    if !p.starts_with(':') && p != a {
                        return false;
                    }
                }
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Ordered list of route rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl Default for RouteTable {
    /// Public form submissions are strict, auth endpoints are left to the
    /// session library, and the rest of the API is general.
    fn default() -> Self {
        Self {
            rules: vec![
                RouteRule::new(Some("POST"), "/api/contact", Some(LimitPolicy::Strict)),
                RouteRule::new(Some("POST"), "/api/trip-requests", Some(LimitPolicy::Strict)),
                RouteRule::new(Some("POST"), "/api/upload", Some(LimitPolicy::Strict)),
                RouteRule::new(None, "/api/auth/*", None),
                RouteRule::new(None, "/api/*", Some(LimitPolicy::General)),
            ],
        }
    }
}

impl RouteTable {
    /// Build a table from rules, rejecting malformed patterns.
    pub fn new(rules: Vec<RouteRule>) -> Result<Self> {
        for rule in &rules {
            rule.validate()?;
        }
        Ok(Self { rules })
    }

    /// Load rules from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading route rules");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load rules from a YAML list.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let rules: Vec<RouteRule> = serde_yaml::from_str(yaml)
            .map_err(|e| TollgateError::Config(format!("Failed to parse route rules: {}", e)))?;
        Self::new(rules)
    }

    /// Find the policy protecting a request, or `None` if it is exempt.
    pub fn classify(&self, method: &str, path: &str) -> Option<LimitPolicy> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        self.rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .and_then(|rule| rule.policy)
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}
