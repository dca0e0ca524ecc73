//! Hosts, host groups and their addresses.

use crate::{channel::ChannelId, named::display_name, Named};
use rustc_hash::FxHashSet;
use std::{
    collections::BTreeSet,
    fmt::{self, Debug, Display},
};

/// A handle to a [`Host`] registered in a [`Network`](crate::Network).
///
/// Handles are never reused, so a handle to a removed host stays invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostId(u64);

impl HostId {
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A numeric identity for hosts, used for reporting.
///
/// - Plain hosts have non-negative addresses.
/// - Host groups have negative addresses.
/// - The "all hosts" group is -1.
/// - [`HostAddr::UNKNOWN`] marks a host that has no address yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostAddr(i32);

impl HostAddr {
    /// The "unknown address" sentinel, 2^31-1.
    pub const UNKNOWN: Self = Self(i32::MAX);

    /// The address of the built-in "all hosts" group.
    pub const ALL_HOSTS: Self = Self(-1);

    pub const fn new(addr: i32) -> Self {
        Self(addr)
    }

    pub fn into_inner(self) -> i32 {
        self.0
    }

    pub fn is_known(self) -> bool {
        self != Self::UNKNOWN
    }

    /// True for addresses in the group range.
    pub fn is_group(self) -> bool {
        self.0 < 0
    }
}

impl Default for HostAddr {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl From<i32> for HostAddr {
    fn from(addr: i32) -> Self {
        Self(addr)
    }
}

impl From<HostAddr> for i32 {
    fn from(addr: HostAddr) -> Self {
        addr.0
    }
}

impl Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user-supplied fan-out rule for a host group.
pub trait Receivers {
    /// The number of hosts that receive a message `sender` sends to the group.
    fn receivers(&self, sender: HostId) -> usize;
}

/// Who receives the messages sent to a host group.
pub enum Membership {
    /// Every plain host in the network except the sender.
    AllHosts,
    /// An explicit member set. The sender does not receive its own messages.
    Members(BTreeSet<HostId>),
    /// Anything else.
    Custom(Box<dyn Receivers>),
}

impl Membership {
    /// An empty explicit member set.
    pub fn members() -> Self {
        Self::Members(BTreeSet::new())
    }

    /// True when `host` is an explicit member.
    pub fn contains(&self, host: HostId) -> bool {
        match self {
            Self::Members(members) => members.contains(&host),
            _ => false,
        }
    }

    /// The fan-out of a message from `sender`, given the number of plain
    /// hosts in the network.
    pub(crate) fn receivers(&self, sender: HostId, hosts: usize) -> usize {
        match self {
            Self::AllHosts => hosts.saturating_sub(1),
            Self::Members(members) => members.len() - usize::from(members.contains(&sender)),
            Self::Custom(rule) => rule.receivers(sender),
        }
    }
}

impl Debug for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllHosts => f.write_str("AllHosts"),
            Self::Members(members) => f.debug_tuple("Members").field(members).finish(),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl FromIterator<HostId> for Membership {
    fn from_iter<T: IntoIterator<Item = HostId>>(iter: T) -> Self {
        Self::Members(iter.into_iter().collect())
    }
}

#[derive(Debug)]
pub(crate) enum HostKind {
    Host,
    Group(Membership),
}

/// A node of the simulated network: a single site, or a group of sites
/// reachable through one broadcast address.
#[derive(Debug)]
pub struct Host {
    pub(crate) id: HostId,
    pub(crate) name: String,
    pub(crate) addr: HostAddr,
    pub(crate) kind: HostKind,
    pub(crate) incoming: FxHashSet<ChannelId>,
}

impl Host {
    pub(crate) fn new(id: HostId, name: &str, kind: HostKind) -> Self {
        Self {
            id,
            name: name.to_string(),
            addr: HostAddr::UNKNOWN,
            kind,
            incoming: Default::default(),
        }
    }

    pub fn id(&self) -> HostId {
        self.id
    }

    /// The address, which may still be [`HostAddr::UNKNOWN`]. Use
    /// [`Network::address`](crate::Network::address) to force one.
    pub fn addr(&self) -> HostAddr {
        self.addr
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, HostKind::Group(_))
    }

    /// The membership of a group, `None` for plain hosts.
    pub fn membership(&self) -> Option<&Membership> {
        match &self.kind {
            HostKind::Group(membership) => Some(membership),
            HostKind::Host => None,
        }
    }

    /// The channels whose destination is this host.
    pub fn incoming(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.incoming.iter().copied()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl Named for Host {
    fn name(&self) -> String {
        let type_name = if self.is_group() { "HostGroup" } else { "Host" };
        display_name(&self.name, type_name, self.id)
    }
}
