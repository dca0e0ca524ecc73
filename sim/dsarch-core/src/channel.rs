//! Point-to-point and multicast traffic counters.
//!
//! A channel is defined by the source host, the destination host and the
//! [`RpcCode`] of the messages it carries. Each remote method has a request
//! channel and, unless it is one-way, a response channel.
//!
//! A channel whose destination is a host group is a multicast channel. It
//! counts what the source sent and, separately, what the members of the group
//! received. For example, if a group has 3 receivers and a 100 byte message is
//! sent, the channel registers one message and 100 bytes sent, and 3 messages
//! and 300 bytes received. Group membership may change between transmissions,
//! so the fan-out is computed anew every time.

use crate::{host::HostAddr, rpc::RpcCode, HostId};
use std::fmt::{self, Display};

/// A handle to a [`Channel`] owned by a [`Network`](crate::Network).
///
/// Handles are never reused, so a handle to a disconnected channel stays
/// invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(u64);

impl ChannelId {
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message count and a byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Traffic {
    pub messages: u64,
    pub bytes: u64,
}

impl Traffic {
    fn add(&mut self, messages: u64, bytes: u64) {
        self.messages += messages;
        self.bytes += bytes;
    }
}

/// How a channel delivers what its source transmits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// One message sent is one message received.
    Unicast,
    /// Every message sent is received by each current receiver of the group.
    Multicast { received: Traffic },
}

impl Delivery {
    fn record(&mut self, size: u64, fanout: usize) {
        if let Delivery::Multicast { received } = self {
            let fanout = fanout as u64;
            received.add(fanout, fanout * size);
        }
    }
}

/// A unidirectional traffic counter for one (source, destination, code).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    id: ChannelId,
    source: HostId,
    destination: Option<HostId>,
    code: RpcCode,
    source_addr: HostAddr,
    destination_addr: HostAddr,
    sent: Traffic,
    delivery: Delivery,
}

impl Channel {
    pub(crate) fn new(
        id: ChannelId,
        (source, source_addr): (HostId, HostAddr),
        (destination, destination_addr): (HostId, HostAddr),
        code: RpcCode,
        multicast: bool,
    ) -> Self {
        let delivery = if multicast {
            Delivery::Multicast {
                received: Traffic::default(),
            }
        } else {
            Delivery::Unicast
        };
        Self {
            id,
            source,
            destination: Some(destination),
            code,
            source_addr,
            destination_addr,
            sent: Traffic::default(),
            delivery,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn source(&self) -> HostId {
        self.source
    }

    /// The destination host, or `None` once the destination was removed from
    /// the network.
    pub fn destination(&self) -> Option<HostId> {
        self.destination
    }

    pub fn code(&self) -> RpcCode {
        self.code
    }

    pub fn source_addr(&self) -> HostAddr {
        self.source_addr
    }

    pub fn destination_addr(&self) -> HostAddr {
        self.destination_addr
    }

    pub fn delivery(&self) -> Delivery {
        self.delivery
    }

    pub fn is_multicast(&self) -> bool {
        matches!(self.delivery, Delivery::Multicast { .. })
    }

    /// Number of messages sent.
    pub fn messages(&self) -> u64 {
        self.sent.messages
    }

    /// Number of bytes sent.
    pub fn bytes(&self) -> u64 {
        self.sent.bytes
    }

    /// Number of messages received. Differs from [`messages`](Self::messages)
    /// only on multicast channels.
    pub fn messages_received(&self) -> u64 {
        self.received().messages
    }

    /// Number of bytes received. Differs from [`bytes`](Self::bytes) only on
    /// multicast channels.
    pub fn bytes_received(&self) -> u64 {
        self.received().bytes
    }

    fn received(&self) -> Traffic {
        match self.delivery {
            Delivery::Unicast => self.sent,
            Delivery::Multicast { received } => received,
        }
    }

    /// Registers one message of `size` bytes, delivered to `fanout` receivers.
    /// The fan-out is ignored by unicast channels.
    pub(crate) fn transmit(&mut self, size: usize, fanout: usize) {
        let size = size as u64;
        self.sent.add(1, size);
        self.delivery.record(size, fanout);
    }

    pub(crate) fn sever(&mut self) {
        self.destination = None;
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[chan {}->{} traffic:",
            self.source_addr, self.destination_addr
        )?;
        match self.delivery {
            Delivery::Unicast => write!(f, "{},{}]", self.sent.messages, self.sent.bytes),
            Delivery::Multicast { received } => write!(
                f,
                "{}({}),{}({})]",
                self.sent.messages, received.messages, self.sent.bytes, received.bytes
            ),
        }
    }
}
