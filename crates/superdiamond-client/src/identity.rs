//! The (project, profile) pair a client subscribes to.

use std::fmt;

use thiserror::Error;

const HANDSHAKE_PREFIX: &str = "superdiamond";

/// Project and profile whose configuration the client follows.
///
/// The pair is fixed for the lifetime of a client. It forms the handshake
/// payload and keys the local backup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectIdentity {
    proj_code: String,
    profile: String,
}

impl ProjectIdentity {
    /// Builds an identity, rejecting values the handshake cannot carry.
    pub fn new(
        proj_code: impl Into<String>,
        profile: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let proj_code = proj_code.into();
        let profile = profile.into();
        validate("project code", &proj_code)?;
        validate("profile", &profile)?;
        Ok(Self { proj_code, profile })
    }

    /// Project code.
    #[must_use]
    pub fn proj_code(&self) -> &str {
        self.proj_code.as_str()
    }

    /// Profile name, for example `development` or `production`.
    #[must_use]
    pub fn profile(&self) -> &str {
        self.profile.as_str()
    }

    /// Line sent to the authority to subscribe to this identity.
    #[must_use]
    pub fn handshake_line(&self) -> String {
        format!("{HANDSHAKE_PREFIX},{},{}", self.proj_code, self.profile)
    }
}

impl fmt::Display for ProjectIdentity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.proj_code, self.profile)
    }
}

fn validate(component: &'static str, value: &str) -> Result<(), IdentityError> {
    if value.trim().is_empty() {
        return Err(IdentityError::Blank { component });
    }
    if value.contains([',', '\r', '\n']) {
        return Err(IdentityError::Delimiter {
            component,
            value: value.to_owned(),
        });
    }
    Ok(())
}

/// Errors raised when building a [`ProjectIdentity`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// A component was empty or whitespace.
    #[error("{component} must not be blank")]
    Blank {
        /// Which component was blank.
        component: &'static str,
    },
    /// A component contained a handshake delimiter.
    #[error("{component} '{value}' must not contain commas or line breaks")]
    Delimiter {
        /// Which component was rejected.
        component: &'static str,
        /// Offending value.
        value: String,
    },
}
