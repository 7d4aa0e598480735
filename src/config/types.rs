//! Root configuration type.

use super::Service;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration structure for service-federation.yaml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub services: HashMap<String, Service>,
}

impl Config {
    /// Services enabled under the given profiles.
    ///
    /// Dependencies are not pulled in automatically: a dependency that is
    /// filtered out surfaces as an unknown dependency when the graph is built.
    pub fn services_in_profiles(&self, active_profiles: &[String]) -> HashMap<String, Service> {
        self.services
            .iter()
            .filter(|(_, service)| service.is_active(active_profiles))
            .map(|(name, service)| (name.clone(), service.clone()))
            .collect()
    }

    /// Return a copy of this config restricted to the given profiles.
    pub fn with_profiles(&self, active_profiles: &[String]) -> Config {
        Config {
            services: self.services_in_profiles(active_profiles),
        }
    }
}
