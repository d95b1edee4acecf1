use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use url::Url;

use crate::defaults::{DEFAULT_SUPERVISOR_HOST, DEFAULT_SUPERVISOR_PATH, DEFAULT_SUPERVISOR_PORT};

/// Transport scheme of a [`SupervisorEndpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
enum EndpointScheme {
    /// Plain HTTP, as served by the supervisor's inet server.
    Http,
    /// HTTP behind TLS.
    Https,
}

/// HTTP endpoint serving the supervisor's XML-RPC interface.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct SupervisorEndpoint {
    scheme: EndpointScheme,
    host: String,
    port: u16,
    path: String,
}

impl SupervisorEndpoint {
    /// Builds a plain HTTP endpoint.
    #[must_use]
    pub fn http(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            scheme: EndpointScheme::Http,
            host: host.into(),
            port,
            path: path.into(),
        }
    }

    /// Endpoint exposed by a supervisor running with its stock inet server.
    #[must_use]
    pub fn local() -> Self {
        Self::http(
            DEFAULT_SUPERVISOR_HOST,
            DEFAULT_SUPERVISOR_PORT,
            DEFAULT_SUPERVISOR_PATH,
        )
    }

    fn from_url(url: &Url) -> Result<Self, EndpointParseError> {
        let scheme = url
            .scheme()
            .parse::<EndpointScheme>()
            .map_err(|_| EndpointParseError::UnsupportedScheme(url.scheme().to_owned()))?;
        let host = url
            .host_str()
            .ok_or_else(|| EndpointParseError::MissingHost(url.to_string()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| EndpointParseError::MissingHost(url.to_string()))?;
        Ok(Self {
            scheme,
            host: host.to_owned(),
            port,
            path: url.path().to_owned(),
        })
    }
}

impl Default for SupervisorEndpoint {
    fn default() -> Self {
        Self::local()
    }
}

impl fmt::Display for SupervisorEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}://{}:{}{}",
            self.scheme, self.host, self.port, self.path
        )
    }
}

impl FromStr for SupervisorEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::from_url(&Url::parse(input)?)
    }
}

impl TryFrom<String> for SupervisorEndpoint {
    type Error = EndpointParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SupervisorEndpoint> for String {
    fn from(endpoint: SupervisorEndpoint) -> Self {
        endpoint.to_string()
    }
}

/// Errors encountered while parsing a [`SupervisorEndpoint`] from text.
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// Scheme was not HTTP or HTTPS.
    #[error("unsupported supervisor endpoint scheme '{0}'")]
    UnsupportedScheme(String),
    /// The URL did not name a host.
    #[error("missing host in supervisor endpoint '{0}'")]
    MissingHost(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
