//! Service configuration loading.
//!
//! Services are declared in a pipeline config (`config.yml`) as a list of
//! single-key mappings, which also fixes the default pipeline order. Host-side
//! ports come from the config itself, the generated compose file, or the
//! provisioning convention of numbering services from 5001 upwards.
use crate::error::PipelineError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Port every service listens on inside the managed runtime.
pub const INTERNAL_PORT: u16 = 5000;

/// Where the orchestrator runs relative to the services it calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExecutionContext {
    /// On the host, reaching services through their published ports.
    Host,
    /// Inside the managed runtime, reaching services by container name.
    Managed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub name: String,
    pub container: String,
    pub image: Option<String>,
    pub port: u16,
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub services: Vec<ServiceConfig>,
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    services: Vec<BTreeMap<String, ServiceEntry>>,
}

#[derive(Deserialize)]
struct ServiceEntry {
    container: Option<String>,
    image: Option<String>,
    port: Option<u16>,
    #[serde(default)]
    parameters: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Deserialize)]
struct ComposeFile {
    #[serde(default)]
    services: BTreeMap<String, ComposeService>,
}

#[derive(Deserialize)]
struct ComposeService {
    #[serde(default)]
    ports: Vec<serde_yaml::Value>,
}

impl PipelineConfig {
    /// Load the pipeline config, consulting the compose file only if it exists.
    pub fn load(config_path: &Path, compose_path: &Path) -> Result<Self> {
        let config_text = fs::read_to_string(config_path)
            .with_context(|| format!("read config {}", config_path.display()))?;
        let compose_text = if compose_path.is_file() {
            Some(
                fs::read_to_string(compose_path)
                    .with_context(|| format!("read compose file {}", compose_path.display()))?,
            )
        } else {
            tracing::debug!(path = %compose_path.display(), "no compose file");
            None
        };
        Self::from_yaml(&config_text, compose_text.as_deref())
    }

    pub fn from_yaml(config_text: &str, compose_text: Option<&str>) -> Result<Self> {
        let config: ConfigFile =
            serde_yaml::from_str(config_text).context("parse pipeline config YAML")?;
        let compose = compose_text
            .map(serde_yaml::from_str::<ComposeFile>)
            .transpose()
            .context("parse compose YAML")?;

        let mut seen = BTreeSet::new();
        let mut services = Vec::new();
        for (index, item) in config.services.into_iter().enumerate() {
            if item.len() != 1 {
                return Err(config_error(format!(
                    "service entry {} must name exactly one service (found {})",
                    index + 1,
                    item.len()
                )));
            }
            for (name, entry) in item {
                if !seen.insert(name.clone()) {
                    return Err(config_error(format!("duplicate service {name:?}")));
                }
                let compose_port = compose
                    .as_ref()
                    .and_then(|compose| compose.services.get(&name))
                    .map(|service| published_port(&name, &service.ports))
                    .transpose()?
                    .flatten();
                let port = match entry.port.or(compose_port) {
                    Some(port) => port,
                    None => conventional_port(index)?,
                };
                let parameters = entry
                    .parameters
                    .into_iter()
                    .map(|(key, value)| -> Result<(String, String)> {
                        let value = scalar_to_string(&value).ok_or_else(|| {
                            config_error(format!(
                                "parameter {key:?} of service {name:?} must be a scalar"
                            ))
                        })?;
                        Ok((key, value))
                    })
                    .collect::<Result<BTreeMap<_, _>>>()?;
                services.push(ServiceConfig {
                    container: entry.container.unwrap_or_else(|| name.clone()),
                    image: entry.image,
                    port,
                    parameters,
                    name,
                });
            }
        }
        Ok(Self { services })
    }

    pub fn get(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|service| service.name == name)
    }

    /// Service names in declaration order.
    pub fn service_names(&self) -> Vec<String> {
        self.services
            .iter()
            .map(|service| service.name.clone())
            .collect()
    }
}

fn config_error(message: String) -> anyhow::Error {
    PipelineError::Config(message).into()
}

fn conventional_port(index: usize) -> Result<u16> {
    u16::try_from(index + 1)
        .ok()
        .and_then(|offset| INTERNAL_PORT.checked_add(offset))
        .ok_or_else(|| config_error(format!("no port available for service {}", index + 1)))
}

/// Host side of the first compose port mapping (`"5001:5000"` -> 5001).
fn published_port(name: &str, ports: &[serde_yaml::Value]) -> Result<Option<u16>> {
    let Some(first) = ports.first() else {
        return Ok(None);
    };
    let text = scalar_to_string(first).unwrap_or_default();
    let parts: Vec<&str> = text.split(':').collect();
    let host = if parts.len() >= 3 {
        parts[parts.len() - 2]
    } else {
        parts[0]
    };
    host.trim().parse::<u16>().map(Some).map_err(|_| {
        config_error(format!(
            "cannot read a port from {text:?} for service {name:?}"
        ))
    })
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(text) => Some(text.clone()),
        serde_yaml::Value::Bool(flag) => Some(flag.to_string()),
        serde_yaml::Value::Number(number) => Some(number.to_string()),
        serde_yaml::Value::Null => Some(String::new()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
