//! Index configuration.

use tracing::warn;

/// Environment variable selecting the [`ReplacePolicy`] (`detach` or `reject`).
pub const REPLACE_POLICY_ENV: &str = "ENGINE_INDEX_REPLACE_POLICY";

/// Environment variable giving the initial entity capacity.
pub const CAPACITY_ENV: &str = "ENGINE_INDEX_CAPACITY";

/// What [`Index::add_component`](crate::Index::add_component) does when the
/// entity already holds a *different* component of the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacePolicy {
    /// Detach the previous component from the entity (dropping it from the
    /// type index if that was its last owner), then attach the new one.
    #[default]
    Detach,
    /// Refuse with [`IndexError::ComponentAlreadyAttached`](crate::IndexError::ComponentAlreadyAttached).
    Reject,
}

impl std::str::FromStr for ReplacePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detach" => Ok(Self::Detach),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown replace policy '{other}'")),
        }
    }
}

/// Configuration for an [`Index`](crate::Index).
#[derive(Debug, Clone, Default)]
pub struct IndexConfig {
    /// Behaviour when re-attaching a type an entity already has.
    pub replace_policy: ReplacePolicy,
    /// Number of entities to reserve space for up front.
    pub entity_capacity: usize,
}

impl IndexConfig {
    /// Default configuration: [`ReplacePolicy::Detach`], no pre-allocation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from [`REPLACE_POLICY_ENV`] and [`CAPACITY_ENV`].
    ///
    /// Unset variables keep their defaults. Malformed values are logged and
    /// ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(REPLACE_POLICY_ENV) {
            match raw.parse() {
                Ok(policy) => config.replace_policy = policy,
                Err(e) => warn!(var = REPLACE_POLICY_ENV, "{e}, using default"),
            }
        }

        if let Some(raw) = lookup(CAPACITY_ENV) {
            match raw.trim().parse() {
                Ok(capacity) => config.entity_capacity = capacity,
                Err(e) => warn!(var = CAPACITY_ENV, value = %raw, "invalid capacity: {e}, using default"),
            }
        }

        config
    }

    /// Override the replace policy.
    #[must_use]
    pub fn with_replace_policy(mut self, policy: ReplacePolicy) -> Self {
        self.replace_policy = policy;
        self
    }

    /// Override the initial entity capacity.
    #[must_use]
    pub fn with_entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }
}
