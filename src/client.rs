//! Service invocation over HTTP.
//!
//! Each service is a small web app: `PUT /` with an MMIF body runs it, `GET /`
//! returns its app metadata. The client never fails: every outcome, including
//! network faults, comes back as an [`Invocation`] so the executor can keep a
//! valid document at each step boundary.
use crate::endpoint::ResolvedEndpoint;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use ureq::Agent;

/// Response bodies larger than this are treated as an internal failure.
const MAX_RESPONSE_BYTES: u64 = 512 * 1024 * 1024;

/// What came back from one invocation, before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPrimitive {
    /// The service answered with this HTTP status.
    Http(u16),
    /// The service could not be reached.
    TransportFailure,
    /// Something went wrong locally while talking to the service.
    InternalFailure,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub status: StatusPrimitive,
    /// Response body, or the unchanged input when no response was obtained.
    pub body: String,
}

impl Invocation {
    pub fn reported(status: u16, body: String) -> Self {
        Self {
            status: StatusPrimitive::Http(status),
            body,
        }
    }

    pub fn transport_failure(input: &str) -> Self {
        Self {
            status: StatusPrimitive::TransportFailure,
            body: input.to_string(),
        }
    }

    pub fn internal_failure(input: &str) -> Self {
        Self {
            status: StatusPrimitive::InternalFailure,
            body: input.to_string(),
        }
    }
}

/// Seam between the executor and the network.
pub trait ServiceClient {
    /// Run the service on `document`. Never fails; faults are encoded in the
    /// returned status.
    fn invoke(&self, endpoint: &ResolvedEndpoint, document: &str) -> Invocation;

    /// Fetch the service's self-description.
    fn metadata(&self, endpoint: &ResolvedEndpoint) -> Result<Value>;
}

impl<C: ServiceClient + ?Sized> ServiceClient for &C {
    fn invoke(&self, endpoint: &ResolvedEndpoint, document: &str) -> Invocation {
        (**self).invoke(endpoint, document)
    }

    fn metadata(&self, endpoint: &ResolvedEndpoint) -> Result<Value> {
        (**self).metadata(endpoint)
    }
}

/// Blocking HTTP client for deployed services.
pub struct HttpClient {
    agent: Agent,
}

impl HttpClient {
    pub fn new() -> Self {
        // Error statuses carry the service's own error view, so they are data.
        let config = Agent::config_builder().http_status_as_error(false).build();
        Self {
            agent: Agent::new_with_config(config),
        }
    }

    fn put(
        &self,
        endpoint: &ResolvedEndpoint,
        document: &str,
    ) -> Result<(u16, Vec<u8>), ureq::Error> {
        let mut request = self
            .agent
            .put(&endpoint.address)
            .header("Content-Type", "application/json");
        for (key, value) in &endpoint.parameters {
            request = request.query(key, value);
        }
        let mut response = request.send(document)?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_vec()?;
        Ok((status, body))
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceClient for HttpClient {
    fn invoke(&self, endpoint: &ResolvedEndpoint, document: &str) -> Invocation {
        tracing::debug!(
            service = %endpoint.service,
            address = %endpoint.address,
            parameters = ?endpoint.parameters,
            "invoking service"
        );
        match self.put(endpoint, document) {
            Ok((status, bytes)) => match String::from_utf8(bytes) {
                Ok(body) => {
                    tracing::debug!(
                        service = %endpoint.service,
                        status,
                        bytes = body.len(),
                        "service responded"
                    );
                    Invocation::reported(status, body)
                }
                Err(_) => {
                    tracing::warn!(
                        service = %endpoint.service,
                        status,
                        "response body is not UTF-8"
                    );
                    Invocation::internal_failure(document)
                }
            },
            Err(err) if is_transport_error(&err) => {
                tracing::warn!(
                    service = %endpoint.service,
                    address = %endpoint.address,
                    error = %err,
                    "could not reach service, keeping input document"
                );
                Invocation::transport_failure(document)
            }
            Err(err) => {
                tracing::warn!(
                    service = %endpoint.service,
                    error = %err,
                    "service invocation failed locally, keeping input document"
                );
                Invocation::internal_failure(document)
            }
        }
    }

    fn metadata(&self, endpoint: &ResolvedEndpoint) -> Result<Value> {
        let mut response = self
            .agent
            .get(&endpoint.address)
            .call()
            .with_context(|| format!("fetch metadata from {}", endpoint.address))?;
        let status = response.status();
        if !status.is_success() {
            bail!("metadata request to {} returned {status}", endpoint.address);
        }
        response
            .body_mut()
            .read_json::<Value>()
            .with_context(|| format!("parse metadata from {}", endpoint.address))
    }
}

fn is_transport_error(err: &ureq::Error) -> bool {
    matches!(
        err,
        ureq::Error::Io(_)
            | ureq::Error::Timeout(_)
            | ureq::Error::HostNotFound
            | ureq::Error::ConnectionFailed
    )
}
