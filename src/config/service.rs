//! Service configuration types.
//!
//! This module contains the [`Service`] struct as declared in the
//! federation config.

use super::DependsOn;
use crate::dependency::ServiceDefinition;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Service configuration for a single service in the federation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Service {
    // Process-based service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,

    // Docker-based service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<DependsOn>,

    // Service profiles for conditional startup
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<String>,
}

impl Service {
    /// Whether the service is enabled for the given active profiles.
    ///
    /// Services without profiles are always enabled.
    pub fn is_active(&self, active_profiles: &[String]) -> bool {
        self.profiles.is_empty() || self.profiles.iter().any(|p| active_profiles.contains(p))
    }
}

impl ServiceDefinition for Service {
    fn dependency_names(&self) -> Vec<&str> {
        self.depends_on.iter().map(DependsOn::service_name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        let service = Service {
            profiles: vec!["debug".to_string()],
            ..Default::default()
        };
        assert!(!service.is_active(&[]));
        assert!(service.is_active(&["debug".to_string()]));
        assert!(Service::default().is_active(&[]));
    }

    #[test]
    fn test_dependency_names() {
        let service = Service {
            depends_on: vec!["db".into(), "cache".into()],
            ..Default::default()
        };
        assert_eq!(service.dependency_names(), vec!["db", "cache"]);
    }
}
