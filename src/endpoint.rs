//! Endpoint resolution: where each service lives and what parameters it gets.
//!
//! Endpoints are resolved once per run and reused for every input file.
use crate::config::{ExecutionContext, PipelineConfig, ServiceConfig, INTERNAL_PORT};
use crate::error::PipelineError;
use anyhow::Result;
use std::collections::BTreeMap;

/// Caller-supplied parameter overrides, keyed by service name then parameter.
pub type Overrides = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEndpoint {
    pub service: String,
    pub address: String,
    pub parameters: BTreeMap<String, String>,
}

/// Parse `--params` text of the form `"svc-key=value,svc2-key2=value2"`.
///
/// Items without a `-` before the `=`, or with an empty service or key, are
/// dropped.
pub fn parse_overrides(text: Option<&str>) -> Overrides {
    let mut overrides = Overrides::new();
    let Some(text) = text else {
        return overrides;
    };
    for item in text.split(',') {
        match parse_override(item.trim()) {
            Some((service, key, value)) => {
                overrides
                    .entry(service.to_string())
                    .or_default()
                    .insert(key.to_string(), value.to_string());
            }
            None if item.trim().is_empty() => {}
            None => tracing::warn!(item, "ignoring malformed parameter override"),
        }
    }
    overrides
}

fn parse_override(item: &str) -> Option<(&str, &str, &str)> {
    let (service, rest) = item.split_once('-')?;
    let (key, value) = rest.split_once('=')?;
    if service.is_empty() || key.is_empty() {
        return None;
    }
    Some((service, key, value))
}

pub fn address_for(service: &ServiceConfig, context: ExecutionContext) -> String {
    match context {
        ExecutionContext::Host => format!("http://127.0.0.1:{}/", service.port),
        ExecutionContext::Managed => format!("http://{}:{INTERNAL_PORT}/", service.container),
    }
}

/// Resolve one service: pick its address and overlay matching overrides on
/// its declared defaults.
pub fn resolve(
    service: &ServiceConfig,
    context: ExecutionContext,
    overrides: &Overrides,
) -> ResolvedEndpoint {
    let mut parameters = service.parameters.clone();
    if let Some(own) = overrides.get(&service.name) {
        parameters.extend(own.iter().map(|(key, value)| (key.clone(), value.clone())));
    }
    ResolvedEndpoint {
        service: service.name.clone(),
        address: address_for(service, context),
        parameters,
    }
}

/// Resolve the ordered pipeline. An empty name list means every configured
/// service in declaration order.
pub fn resolve_pipeline(
    config: &PipelineConfig,
    names: &[String],
    context: ExecutionContext,
    overrides: &Overrides,
) -> Result<Vec<ResolvedEndpoint>> {
    let names = if names.is_empty() {
        config.service_names()
    } else {
        names.to_vec()
    };
    for service in overrides.keys() {
        if config.get(service).is_none() {
            tracing::debug!(service = %service, "override names no configured service");
        }
    }
    let mut endpoints = Vec::with_capacity(names.len());
    for name in &names {
        let service = config
            .get(name)
            .ok_or_else(|| PipelineError::UnknownService(name.clone()))?;
        let endpoint = resolve(service, context, overrides);
        tracing::debug!(
            service = %endpoint.service,
            address = %endpoint.address,
            image = ?service.image,
            parameters = ?endpoint.parameters,
            "resolved endpoint"
        );
        endpoints.push(endpoint);
    }
    Ok(endpoints)
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod tests;
