use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

/// Address of the configuration authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    host: String,
    port: u16,
}

impl ServerEndpoint {
    /// Builds an endpoint from a host name and TCP port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or address of the authority.
    #[must_use]
    pub fn host(&self) -> &str {
        self.host.as_str()
    }

    /// TCP port of the authority.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl Default for ServerEndpoint {
    fn default() -> Self {
        Self::new(crate::DEFAULT_HOST, crate::DEFAULT_PORT)
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "tcp://{}:{}", self.host, self.port)
    }
}

impl FromStr for ServerEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.contains("://") {
            return parse_url(input, trimmed);
        }

        let (host, port) = trimmed
            .rsplit_once(':')
            .ok_or_else(|| EndpointParseError::MissingPort(input.to_owned()))?;
        if host.is_empty() {
            return Err(EndpointParseError::MissingHost(input.to_owned()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| EndpointParseError::InvalidPort(input.to_owned()))?;
        Ok(Self::new(host, port))
    }
}

fn parse_url(input: &str, trimmed: &str) -> Result<ServerEndpoint, EndpointParseError> {
    let url = Url::parse(trimmed)?;
    if url.scheme() != "tcp" {
        return Err(EndpointParseError::UnsupportedScheme(
            url.scheme().to_owned(),
        ));
    }
    let host = url
        .host_str()
        .ok_or_else(|| EndpointParseError::MissingHost(input.to_owned()))?;
    let port = url
        .port()
        .ok_or_else(|| EndpointParseError::MissingPort(input.to_owned()))?;
    Ok(ServerEndpoint::new(host, port))
}

/// Errors encountered while parsing a [`ServerEndpoint`] from text.
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// Scheme was not recognised.
    #[error("unsupported endpoint scheme '{0}'")]
    UnsupportedScheme(String),
    /// Host name was missing.
    #[error("missing host in '{0}'")]
    MissingHost(String),
    /// Port was missing from the address.
    #[error("missing port in '{0}'")]
    MissingPort(String),
    /// Port was not a valid TCP port number.
    #[error("invalid port in '{0}'")]
    InvalidPort(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
