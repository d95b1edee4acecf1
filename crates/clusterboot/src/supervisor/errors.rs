use std::io;

use thiserror::Error;

/// Errors returned by supervisor RPC calls.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The request never got an answer: refused, reset or timed out.
    #[error("could not reach supervisor at {endpoint}: {source}")]
    Connectivity {
        /// Endpoint the call was addressed to.
        endpoint: String,
        /// Underlying transport error.
        #[source]
        source: io::Error,
    },
    /// The supervisor answered with a non-success HTTP status.
    #[error("supervisor at {endpoint} answered {method} with HTTP {status}")]
    HttpStatus {
        /// Endpoint the call was addressed to.
        endpoint: String,
        /// RPC method name.
        method: &'static str,
        /// HTTP status code.
        status: u16,
    },
    /// The supervisor rejected the call with an XML-RPC fault.
    #[error("supervisor fault {code} from {method}: {message}")]
    Fault {
        /// RPC method name.
        method: &'static str,
        /// Supervisor fault code.
        code: i64,
        /// Supervisor fault description.
        message: String,
    },
    /// The response could not be decoded.
    #[error("malformed response to {method}: {source}")]
    Protocol {
        /// RPC method name.
        method: &'static str,
        /// Decoding failure.
        #[source]
        source: xmlrpc::Error,
    },
    /// A process info answer carried no `statename`.
    #[error("{method} answer for {process} has no statename")]
    MissingState {
        /// RPC method name.
        method: &'static str,
        /// Process that was queried.
        process: String,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build supervisor client: {source}")]
    ClientSetup {
        /// Underlying client builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl SupervisorError {
    /// Whether the call failed before the supervisor could answer it.
    ///
    /// Callers retry these; every other variant means the supervisor was
    /// reached and gave an answer.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }
}
