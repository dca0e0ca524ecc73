//! The [`DsarchError`] type shared by every fallible operation.

use crate::{channel::ChannelId, host::HostId};
use thiserror::Error as ThisError;

/// Errors raised while building or charging the traffic model.
///
/// None of these are retried. An operation that fails leaves the
/// [`Network`](crate::Network) exactly as it found it.
#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum DsarchError {
    #[error("Empty {0} name")]
    InvalidName(&'static str),
    #[error("Method {0} redeclared with a different one-way flag")]
    ConflictingDeclaration(String),
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(&'static str),
    #[error("Invalid topology: {0}")]
    InvalidTopology(&'static str),
    #[error("Invalid {kind} code {code:#010x}")]
    InvalidCode { kind: &'static str, code: u32 },
    #[error("Not ready: {0}")]
    NotReady(&'static str),
    #[error("No host {0} in the network")]
    UnknownHost(HostId),
    #[error("No channel {0} in the network")]
    UnknownChannel(ChannelId),
    #[error("No call {0} on the proxy")]
    UnknownCall(usize),
}
