//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::auth::AuthPolicy;
use crate::core::operation::Operation;
use crate::core::security::Security;

fn default_address() -> String {
    "127.0.0.1:1111".to_string()
}

fn default_policy() -> String {
    "public".to_string()
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind (e.g., "127.0.0.1:1111")
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

/// Policy string per operation kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAuthConfig {
    #[serde(default = "default_policy")]
    pub create: String,

    #[serde(default = "default_policy")]
    pub update: String,

    #[serde(default = "default_policy")]
    pub view: String,

    #[serde(default = "default_policy")]
    pub list: String,

    #[serde(default = "default_policy")]
    pub delete: String,
}

impl Default for ResourceAuthConfig {
    fn default() -> Self {
        Self {
            create: default_policy(),
            update: default_policy(),
            view: default_policy(),
            list: default_policy(),
            delete: default_policy(),
        }
    }
}

impl ResourceAuthConfig {
    /// Policy string for an operation
    pub fn policy_for(&self, operation: Operation) -> &str {
        match operation {
            Operation::Create => &self.create,
            Operation::Update => &self.update,
            Operation::View => &self.view,
            Operation::List => &self.list,
            Operation::Delete => &self.delete,
        }
    }
}

/// Configuration for one exposed resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Singular name, used in routes and messages (e.g., "product")
    pub name: String,

    #[serde(default)]
    pub auth: ResourceAuthConfig,
}

impl ResourceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auth: ResourceAuthConfig::default(),
        }
    }
}

/// Complete configuration of an API server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: Option<ServerConfig>,

    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

impl ApiConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("invalid api configuration")?;
        Ok(config)
    }

    /// Merge multiple configurations into one
    ///
    /// Later configurations win: the last `server` section present is kept
    /// and a resource redefined under the same name replaces the earlier
    /// definition in place.
    pub fn merge(configs: Vec<ApiConfig>) -> Self {
        let mut merged = ApiConfig::default();

        for config in configs {
            if config.server.is_some() {
                merged.server = config.server;
            }

            for resource in config.resources {
                match merged.resources.iter_mut().find(|r| r.name == resource.name) {
                    Some(existing) => *existing = resource,
                    None => merged.resources.push(resource),
                }
            }
        }

        merged
    }

    /// Address the server binds to
    pub fn address(&self) -> String {
        self.server
            .as_ref()
            .map(|s| s.address.clone())
            .unwrap_or_else(default_address)
    }

    /// Find a resource by name
    pub fn resource(&self, name: &str) -> Option<&ResourceConfig> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Configured policy of `operation` on resource `name`
    ///
    /// Unknown resources are public.
    pub fn policy_for(&self, name: &str, operation: Operation) -> AuthPolicy {
        self.resource(name)
            .map(|r| AuthPolicy::parse_policy(r.auth.policy_for(operation)))
            .unwrap_or(AuthPolicy::Public)
    }

    /// Security predicates of `operation` on resource `name`
    pub fn security_for(&self, name: &str, operation: Operation) -> Security {
        Security::from_policy(self.policy_for(name, operation))
    }
}
