/// Error types for the sequence inference client
use std::time::Duration;

use thiserror::Error;

use crate::client::Phase;
use crate::transport::TransportFault;

#[derive(Debug, Error)]
pub enum Error {
    /// The remote call failed. Carries the underlying fault and a
    /// formatted copy of the request that was on the wire, for diagnostics.
    #[error("transport error during {operation}: {fault}")]
    Transport {
        operation: &'static str,
        #[source]
        fault: TransportFault,
        request: String,
    },

    /// The call exceeded its deadline. Kept distinct from `Transport` so
    /// callers can apply a different retry policy.
    #[error("{operation} exceeded deadline of {deadline:?}")]
    Timeout {
        operation: &'static str,
        deadline: Duration,
    },

    /// A raw buffer's length is not a multiple of the element width.
    #[error("buffer of {len} bytes is not a multiple of element width {width}")]
    InvalidLength { len: usize, width: usize },

    /// An operation was called outside its legal lifecycle phase.
    /// Detected locally; no remote call is made.
    #[error("cannot {operation} while session is {phase}")]
    IllegalState {
        operation: &'static str,
        phase: Phase,
    },

    /// The response payload does not have the shape the protocol promises.
    #[error("malformed output: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, Error>;
