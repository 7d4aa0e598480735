//! Dependency configuration types.

use serde::{Deserialize, Serialize};

/// Condition a dependency must reach before its dependent is brought up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyCondition {
    /// The dependency has been started (default)
    #[default]
    ServiceStarted,
    /// The dependency passes its health check
    ServiceHealthy,
    /// The dependency ran to completion with a zero exit code
    ServiceCompletedSuccessfully,
}

/// Dependency reference - supports both simple strings and structured refs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependsOn {
    /// Simple service name dependency
    Simple(String),
    /// Structured dependency with a readiness condition
    Structured {
        service: String,
        #[serde(default, skip_serializing_if = "is_default_condition")]
        condition: DependencyCondition,
    },
}

fn is_default_condition(condition: &DependencyCondition) -> bool {
    *condition == DependencyCondition::default()
}

impl DependsOn {
    /// Get the name of the service depended upon.
    pub fn service_name(&self) -> &str {
        match self {
            DependsOn::Simple(name) => name,
            DependsOn::Structured { service, .. } => service,
        }
    }

    /// Get the readiness condition for this dependency.
    pub fn condition(&self) -> DependencyCondition {
        match self {
            DependsOn::Structured { condition, .. } => *condition,
            DependsOn::Simple(_) => DependencyCondition::default(),
        }
    }
}

impl From<&str> for DependsOn {
    fn from(name: &str) -> Self {
        DependsOn::Simple(name.to_string())
    }
}
