//! Router-level failures surfaced to embedders.

use crate::command::EndpointKind;
use crate::transport::TransportError;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use thiserror::Error;

/// Which negotiation step failed while opening an endpoint.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NegotiationStage {
    Session,
    Link,
}

impl Display for NegotiationStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NegotiationStage::Session => write!(f, "session"),
            NegotiationStage::Link => write!(f, "link"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RouterError {
    /// Session or link negotiation failed; the address stays absent and a
    /// later create command retries.
    #[error("failed to open {kind} {stage} for address {address}: {source}")]
    EndpointCreation {
        address: String,
        kind: EndpointKind,
        stage: NegotiationStage,
        #[source]
        source: TransportError,
    },
    /// The link could not be wrapped with an event client.
    #[error("failed to build {kind} event client for address {address}: {reason}")]
    ClientConstruction {
        address: String,
        kind: EndpointKind,
        reason: String,
    },
    #[error("invalid command: {reason}")]
    InvalidCommand { reason: String },
    #[error("router is not running")]
    Closed,
    #[error("timed out waiting for acknowledgement of command for address {address}")]
    AckTimedOut { address: String },
    #[error("router did not drain within {0:?}")]
    ShutdownTimedOut(Duration),
}

impl RouterError {
    pub(crate) fn invalid_command(reason: impl Into<String>) -> Self {
        RouterError::InvalidCommand {
            reason: reason.into(),
        }
    }

    /// Whether resubmitting the same create command may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RouterError::EndpointCreation { .. } | RouterError::ClientConstruction { .. }
        )
    }
}
