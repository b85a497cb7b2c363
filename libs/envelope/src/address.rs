//! Logical destination addresses.

use crate::{EnvelopeError, EnvelopeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque, string-roundtrippable destination: a logical queue name with an
/// optional endpoint qualifier, rendered as `queue` or `queue@endpoint`.
///
/// `Address::parse(addr.to_string())` always yields an equal value. Address
/// correctness matters for routing, so malformed input is a hard error here,
/// unlike the lenient intent parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    queue: String,
    endpoint: Option<String>,
}

impl Address {
    /// Address of a local queue.
    pub fn new(queue: impl Into<String>) -> EnvelopeResult<Self> {
        let queue = queue.into();
        validate_part(&queue)?;
        Ok(Self {
            queue,
            endpoint: None,
        })
    }

    /// Address of a queue hosted at a named endpoint.
    pub fn with_endpoint(
        queue: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> EnvelopeResult<Self> {
        let queue = queue.into();
        let endpoint = endpoint.into();
        validate_part(&queue)?;
        validate_part(&endpoint)?;
        Ok(Self {
            queue,
            endpoint: Some(endpoint),
        })
    }

    /// Parse the string form produced by [`fmt::Display`].
    pub fn parse(input: &str) -> EnvelopeResult<Self> {
        let mut parts = input.split('@');
        let queue = parts.next().unwrap_or_default();
        let endpoint = parts.next();
        if parts.next().is_some() {
            return Err(EnvelopeError::malformed_address(
                input,
                "more than one '@' separator",
            ));
        }
        match endpoint {
            Some(endpoint) => Self::with_endpoint(queue, endpoint),
            None => Self::new(queue),
        }
        .map_err(|_| EnvelopeError::malformed_address(input, "empty or non-printable component"))
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn is_local(&self) -> bool {
        self.endpoint.is_none()
    }
}

fn validate_part(part: &str) -> EnvelopeResult<()> {
    if part.is_empty() {
        return Err(EnvelopeError::malformed_address(part, "empty component"));
    }
    if part.chars().any(|c| c.is_whitespace() || c.is_control() || c == '@') {
        return Err(EnvelopeError::malformed_address(
            part,
            "whitespace, control, or '@' character in component",
        ));
    }
    Ok(())
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.endpoint {
            Some(endpoint) => write!(f, "{}@{}", self.queue, endpoint),
            None => f.write_str(&self.queue),
        }
    }
}

impl FromStr for Address {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}
