//! A fluent query interface over sets of channels.
//!
//! Frames are meant for statistics computed at the end of an experiment: a
//! frame is built from the network's channels, narrowed down with filters and
//! reduced to totals. Every filter returns a new frame and leaves the original
//! untouched.

use crate::{
    channel::{Channel, ChannelId},
    proxy::RemoteInterface,
    rpc::{RpcCode, RpcProtocol},
    HostId, Network,
};
use rustc_hash::FxHashSet;
use std::{collections::BTreeMap, ops::AddAssign};

/// An ordered, duplicate-tolerant view over some channels of a network.
#[derive(Debug, Clone)]
pub struct ChannelFrame<'a> {
    protocol: &'a RpcProtocol,
    channels: Vec<&'a Channel>,
}

impl<'a> ChannelFrame<'a> {
    /// A snapshot of every channel of `network`, in creation order.
    pub fn new(network: &'a Network) -> Self {
        Self {
            protocol: network.protocol(),
            channels: network.channels().collect(),
        }
    }

    /// A frame with no channels and the empty protocol.
    pub fn empty() -> Self {
        Self {
            protocol: RpcProtocol::empty(),
            channels: Vec::new(),
        }
    }

    /// A frame holding one channel, or nothing if it no longer exists.
    pub fn single(network: &'a Network, id: ChannelId) -> Self {
        Self::from_ids(network, [id])
    }

    /// A frame holding the given channels in the given order. Channels that no
    /// longer exist are skipped.
    pub fn from_ids(network: &'a Network, ids: impl IntoIterator<Item = ChannelId>) -> Self {
        Self {
            protocol: network.protocol(),
            channels: ids.into_iter().filter_map(|id| network.channel(id)).collect(),
        }
    }

    /// The protocol used to resolve interface and method names.
    pub fn protocol(&self) -> &'a RpcProtocol {
        self.protocol
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Channel> + '_ {
        self.channels.iter().copied()
    }

    /// The ids of the channels, in frame order.
    pub fn ids(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.channels.iter().map(|channel| channel.id())
    }

    // ---------------------------------------------------------------
    // Statistics
    // ---------------------------------------------------------------

    /// Sums `extract` over every channel.
    pub fn tally<N, F>(&self, extract: F) -> N
    where
        N: Default + AddAssign,
        F: Fn(&Channel) -> N,
    {
        let mut total = N::default();
        for &channel in self.channels.iter() {
            total += extract(channel);
        }
        total
    }

    /// Messages sent over all channels.
    pub fn total_messages(&self) -> u64 {
        self.tally(Channel::messages)
    }

    /// Bytes sent over all channels.
    pub fn total_bytes(&self) -> u64 {
        self.tally(Channel::bytes)
    }

    /// Messages received over the multicast channels.
    pub fn total_received_messages(&self) -> u64 {
        self.tally(|c| if c.is_multicast() { c.messages_received() } else { 0 })
    }

    /// Bytes received over the multicast channels.
    pub fn total_received_bytes(&self) -> u64 {
        self.tally(|c| if c.is_multicast() { c.bytes_received() } else { 0 })
    }

    // ---------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------

    /// The channels satisfying `predicate`, in their original order.
    pub fn select(&self, predicate: impl Fn(&Channel) -> bool) -> Self {
        Self {
            protocol: self.protocol,
            channels: self
                .channels
                .iter()
                .copied()
                .filter(|&channel| predicate(channel))
                .collect(),
        }
    }

    pub fn source(&self, host: HostId) -> Self {
        self.select(|c| c.source() == host)
    }

    pub fn source_in(&self, hosts: impl IntoIterator<Item = HostId>) -> Self {
        let hosts: FxHashSet<HostId> = hosts.into_iter().collect();
        self.select(|c| hosts.contains(&c.source()))
    }

    /// Channels to `host`. Channels whose destination was removed never match.
    pub fn destination(&self, host: HostId) -> Self {
        self.select(|c| c.destination() == Some(host))
    }

    pub fn destination_in(&self, hosts: impl IntoIterator<Item = HostId>) -> Self {
        let hosts: FxHashSet<HostId> = hosts.into_iter().collect();
        self.select(|c| c.destination().map_or(false, |host| hosts.contains(&host)))
    }

    pub fn unicast(&self) -> Self {
        self.select(|c| !c.is_multicast())
    }

    pub fn multicast(&self) -> Self {
        self.select(Channel::is_multicast)
    }

    /// Channels whose code agrees with `code` on the bits of `mask`.
    pub fn endpoint(&self, code: RpcCode, mask: u32) -> Self {
        self.select(|c| c.code().matches(code, mask))
    }

    pub fn requests(&self) -> Self {
        self.endpoint(RpcCode::NONE, RpcCode::RESPONSE_MASK)
    }

    pub fn responses(&self) -> Self {
        self.endpoint(RpcCode::new(RpcCode::RESPONSE_MASK), RpcCode::RESPONSE_MASK)
    }

    /// Channels of every method of the interface called `name`.
    pub fn interface(&self, name: &str) -> Self {
        self.endpoint(self.protocol.code(name), RpcCode::INTERFACE_MASK)
    }

    pub fn interface_of<I: RemoteInterface>(&self) -> Self {
        self.interface(I::NAME)
    }

    /// Channels of one method, in both directions.
    pub fn method(&self, interface: &str, method: &str) -> Self {
        self.endpoint(
            self.protocol.method_code(interface, method),
            !RpcCode::RESPONSE_MASK,
        )
    }

    pub fn method_of<I: RemoteInterface>(&self, method: &str) -> Self {
        self.method(I::NAME, method)
    }

    // ---------------------------------------------------------------
    // Set operations
    // ---------------------------------------------------------------

    /// The distinct channels of both frames, ordered by creation.
    pub fn union_with(&self, other: &ChannelFrame<'a>) -> Self {
        let set: BTreeMap<ChannelId, &'a Channel> = self
            .channels
            .iter()
            .chain(other.channels.iter())
            .map(|&channel| (channel.id(), channel))
            .collect();
        self.from_set(set)
    }

    /// The distinct channels of this frame that are not in `other`, ordered by
    /// creation.
    pub fn except(&self, other: &ChannelFrame<'a>) -> Self {
        let mut set: BTreeMap<ChannelId, &'a Channel> = self
            .channels
            .iter()
            .map(|&channel| (channel.id(), channel))
            .collect();
        for channel in other.channels.iter() {
            set.remove(&channel.id());
        }
        self.from_set(set)
    }

    fn from_set(&self, set: BTreeMap<ChannelId, &'a Channel>) -> Self {
        Self {
            protocol: self.protocol,
            channels: set.into_values().collect(),
        }
    }
}

impl<'a> From<&'a Network> for ChannelFrame<'a> {
    fn from(network: &'a Network) -> Self {
        Self::new(network)
    }
}

impl<'a, 'f> IntoIterator for &'f ChannelFrame<'a> {
    type Item = &'a Channel;
    type IntoIter = std::iter::Copied<std::slice::Iter<'f, &'a Channel>>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.iter().copied()
    }
}
