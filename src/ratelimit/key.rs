//! Consumption record keys.

use crate::client::ClientIdentifier;

use super::policy::LimitPolicy;

/// A key that uniquely identifies a consumption record.
///
/// The policy is part of the key, so a client's `strict` and `general`
/// quotas never interfere.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConsumptionKey {
    pub policy: LimitPolicy,
    pub client: ClientIdentifier,
}

impl ConsumptionKey {
    pub fn new(policy: LimitPolicy, client: &ClientIdentifier) -> Self {
        Self {
            policy,
            client: client.clone(),
        }
    }
}

impl std::fmt::Display for ConsumptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.policy, self.client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = ConsumptionKey::new(LimitPolicy::Strict, &ClientIdentifier::new("203.0.113.5"));
        assert_eq!(key.to_string(), "strict:203.0.113.5");
    }

    #[test]
    fn test_policy_separates_keys() {
        let client = ClientIdentifier::new("203.0.113.5");
        let strict = ConsumptionKey::new(LimitPolicy::Strict, &client);
        let general = ConsumptionKey::new(LimitPolicy::General, &client);

        assert_ne!(strict, general);
        assert_eq!(strict, ConsumptionKey::new(LimitPolicy::Strict, &client));
    }
}
