//! Traffic accounting for simulations of distributed algorithms.
//!
//! Algorithms are written as hosts calling remote methods on each other. No
//! message is ever delivered: calls run synchronously, in process, and every
//! call is charged to a channel so that the message and byte complexity of an
//! algorithm can be measured once the simulation is over.
//!
//! # Organization
//! - [`Network`] owns the hosts, the host groups and the channels
//! - [`RpcProtocol`] allocates the [`RpcCode`] of every interface and method
//! - [`RpcProxy`] is the calling side of a remote interface, and
//!   [`ProxyMap`] holds one proxy per remote site
//! - [`ChannelFrame`] queries the channels once the simulation is over
//!
//! # Channels
//!
//! A channel counts the traffic of one method in one direction between two
//! hosts. A two-way method has a request channel and a response channel. A
//! channel to a host group is a multicast channel, which also counts what the
//! members of the group received.

mod logging;

mod named;
pub use named::Named;

pub mod error;
pub use error::DsarchError;

pub mod rpc;
pub use rpc::{RpcCode, RpcInterface, RpcMethod, RpcProtocol};

pub mod host;
pub use host::{Host, HostAddr, HostId, Membership, Receivers};

pub mod channel;
pub use channel::{Channel, ChannelId};

pub mod network;
pub use network::Network;

pub mod proxy;
pub use proxy::{CallHandle, ProxyMap, RemoteInterface, RpcCall, RpcProxy};

pub mod message;
pub use message::{Ack, ByteSize};

pub mod frame;
pub use frame::ChannelFrame;
