//! The [`Network`]: the registry of hosts, groups, channels and RPC codes.

use crate::{
    channel::{Channel, ChannelId},
    host::{Host, HostAddr, HostId, HostKind, Membership},
    logging::{
        address_event, channel_creation_event, channel_removal_event, host_registration_event,
        host_removal_event,
    },
    proxy::RemoteInterface,
    rpc::{RpcCode, RpcProtocol},
    DsarchError, Named,
};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// A closed simulation universe.
///
/// The network owns every host record and every channel. Algorithm code holds
/// [`HostId`] and [`ChannelId`] handles and goes through the network for every
/// change, so the registries are never mutated behind its back.
///
/// RPC endpoints correspond to the concept of "message type". Each interface
/// and each method has a name and an [`RpcCode`], managed by the network's
/// [`RpcProtocol`].
#[derive(Debug)]
pub struct Network {
    hosts: BTreeMap<HostId, Host>,
    channels: BTreeMap<ChannelId, Channel>,
    addr_map: FxHashMap<HostAddr, HostId>,
    next_host_addr: i32,
    next_group_addr: i32,
    protocol: RpcProtocol,
    all_hosts: HostId,
    plain_hosts: usize,
    next_host_id: u64,
    next_channel_id: u64,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    /// Creates an empty network holding only the "all hosts" group, at
    /// address -1.
    pub fn new() -> Self {
        let mut network = Self {
            hosts: BTreeMap::new(),
            channels: BTreeMap::new(),
            addr_map: FxHashMap::default(),
            next_host_addr: 0,
            next_group_addr: -1,
            protocol: RpcProtocol::new(),
            all_hosts: HostId::new(0),
            plain_hosts: 0,
            next_host_id: 0,
            next_channel_id: 0,
        };
        network.all_hosts = network.register("all_hosts", HostKind::Group(Membership::AllHosts));
        let id = network.all_hosts;
        network.addr_map.insert(HostAddr::ALL_HOSTS, id);
        if let Some(host) = network.hosts.get_mut(&id) {
            host.addr = HostAddr::ALL_HOSTS;
        }
        network
    }

    /// Creates an empty network whose protocol is called `name`.
    pub fn with_name(name: impl Into<String>) -> Self {
        let mut network = Self::new();
        network.protocol.set_name(name);
        network
    }

    /// Registers a plain host. An empty name makes the host anonymous.
    pub fn add_host(&mut self, name: &str) -> HostId {
        self.plain_hosts += 1;
        self.register(name, HostKind::Host)
    }

    /// Registers a host group with the given membership rule.
    pub fn add_group(&mut self, name: &str, membership: Membership) -> HostId {
        self.register(name, HostKind::Group(membership))
    }

    fn register(&mut self, name: &str, kind: HostKind) -> HostId {
        let id = HostId::new(self.next_host_id);
        self.next_host_id += 1;
        let host = Host::new(id, name, kind);
        host_registration_event(id, name, host.is_group());
        self.hosts.insert(id, host);
        id
    }

    /// Removes a host or group from the network.
    ///
    /// Channels whose destination is the removed host are kept, with their
    /// destination cleared. The host's address is released and it leaves
    /// every explicit member set.
    pub fn remove_host(&mut self, id: HostId) -> Result<(), DsarchError> {
        if id == self.all_hosts {
            return Err(DsarchError::InvalidTopology(
                "the all-hosts group cannot be removed",
            ));
        }
        let host = self.hosts.remove(&id).ok_or(DsarchError::UnknownHost(id))?;

        for channel in host.incoming.iter() {
            if let Some(channel) = self.channels.get_mut(channel) {
                channel.sever();
            }
        }
        if host.addr.is_known() {
            self.addr_map.remove(&host.addr);
        }
        if !host.is_group() {
            self.plain_hosts -= 1;
            for group in self.hosts.values_mut() {
                if let HostKind::Group(Membership::Members(members)) = &mut group.kind {
                    members.remove(&id);
                }
            }
        }
        host_removal_event(id, host.incoming.len());
        Ok(())
    }

    pub fn host(&self, id: HostId) -> Option<&Host> {
        self.hosts.get(&id)
    }

    fn checked_host(&self, id: HostId) -> Result<&Host, DsarchError> {
        self.hosts.get(&id).ok_or(DsarchError::UnknownHost(id))
    }

    /// True when `id` names a live host group.
    pub fn is_group(&self, id: HostId) -> bool {
        self.hosts.get(&id).map_or(false, Host::is_group)
    }

    /// The plain hosts, in registration order.
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values().filter(|host| !host.is_group())
    }

    /// The host groups, in registration order.
    pub fn groups(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values().filter(|host| host.is_group())
    }

    /// The number of plain hosts.
    pub fn size(&self) -> usize {
        self.plain_hosts
    }

    /// The built-in group of every host.
    pub fn all_hosts(&self) -> HostId {
        self.all_hosts
    }

    /// The display name of a host, if it exists.
    pub fn name_of(&self, id: HostId) -> Option<String> {
        self.hosts.get(&id).map(Named::name)
    }

    pub fn set_name(&mut self, id: HostId, name: impl Into<String>) -> Result<(), DsarchError> {
        self.hosts
            .get_mut(&id)
            .ok_or(DsarchError::UnknownHost(id))?
            .set_name(name);
        Ok(())
    }

    /// Adds `host` to the explicit member set of `group`. Returns false if it
    /// was already a member.
    pub fn join(&mut self, group: HostId, host: HostId) -> Result<bool, DsarchError> {
        if self.checked_host(host)?.is_group() {
            return Err(DsarchError::InvalidTopology("a host group cannot join a group"));
        }
        Ok(self.members_mut(group)?.insert(host))
    }

    /// Removes `host` from the explicit member set of `group`. Returns false if
    /// it was not a member.
    pub fn leave(&mut self, group: HostId, host: HostId) -> Result<bool, DsarchError> {
        Ok(self.members_mut(group)?.remove(&host))
    }

    fn members_mut(
        &mut self,
        group: HostId,
    ) -> Result<&mut std::collections::BTreeSet<HostId>, DsarchError> {
        match &mut self
            .hosts
            .get_mut(&group)
            .ok_or(DsarchError::UnknownHost(group))?
            .kind
        {
            HostKind::Group(Membership::Members(members)) => Ok(members),
            _ => Err(DsarchError::InvalidTopology(
                "only groups with an explicit member set take members",
            )),
        }
    }

    /// The number of hosts that receive a message `sender` sends to `group`.
    pub fn receivers(&self, group: HostId, sender: HostId) -> Result<usize, DsarchError> {
        self.checked_host(group)?
            .membership()
            .map(|membership| membership.receivers(sender, self.plain_hosts))
            .ok_or(DsarchError::InvalidTopology("only host groups have receivers"))
    }

    /// Assigns an address to a host.
    ///
    /// - A host that already has an address keeps it; the call succeeds only
    ///   if `requested` is that address.
    /// - [`HostAddr::UNKNOWN`] asks for the next free default address.
    /// - Any other address is assigned if it is free and of the host's sign
    ///   class (non-negative for hosts, negative for groups).
    ///
    /// Returns whether the host now holds `requested` (or, for a default
    /// request, any address).
    pub fn assign_address(
        &mut self,
        id: HostId,
        requested: HostAddr,
    ) -> Result<bool, DsarchError> {
        let host = self.checked_host(id)?;
        if host.addr.is_known() {
            return Ok(host.addr == requested);
        }
        let group = host.is_group();

        let assigned = if !requested.is_known() {
            Some(self.next_free_address(group)?)
        } else if requested.is_group() == group && !self.addr_map.contains_key(&requested) {
            Some(requested)
        } else {
            None
        };
        address_event(id, requested, assigned);

        match (assigned, self.hosts.get_mut(&id)) {
            (Some(addr), Some(host)) => {
                host.addr = addr;
                self.addr_map.insert(addr, id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Scans from the cursor of the host's kind for an address nobody holds.
    /// Hosts scan upwards from 0, groups downwards from -1.
    fn next_free_address(&mut self, group: bool) -> Result<HostAddr, DsarchError> {
        let (cursor, step) = if group {
            (&mut self.next_group_addr, -1)
        } else {
            (&mut self.next_host_addr, 1)
        };
        loop {
            let candidate = HostAddr::new(*cursor);
            if !candidate.is_known() {
                return Err(DsarchError::CapacityExceeded("host address space exhausted"));
            }
            *cursor = cursor
                .checked_add(step)
                .ok_or(DsarchError::CapacityExceeded("group address space exhausted"))?;
            if !self.addr_map.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
    }

    /// Keeps default assignment away from every address between 0 (or -1) and
    /// `bound`, so those can be requested explicitly.
    ///
    /// A non-negative `bound` reserves host addresses, a negative one group
    /// addresses. Reserved addresses remain available to explicit requests.
    pub fn reserve_address_range(&mut self, bound: HostAddr) {
        let bound = bound.into_inner();
        if bound >= 0 {
            if self.next_host_addr <= bound {
                self.next_host_addr = bound.saturating_add(1);
            }
        } else if self.next_group_addr >= bound {
            self.next_group_addr = bound.saturating_sub(1);
        }
    }

    /// The address of a host, assigning a default one first if needed.
    pub fn address(&mut self, id: HostId) -> Result<HostAddr, DsarchError> {
        let addr = self.checked_host(id)?.addr;
        if addr.is_known() {
            return Ok(addr);
        }
        self.assign_address(id, HostAddr::UNKNOWN)?;
        let addr = self.checked_host(id)?.addr;
        if !addr.is_known() {
            return Err(DsarchError::CapacityExceeded("no address available"));
        }
        Ok(addr)
    }

    /// Asks for a specific address. See [`assign_address`](Self::assign_address).
    pub fn request_address(&mut self, id: HostId, addr: HostAddr) -> Result<bool, DsarchError> {
        self.assign_address(id, addr)
    }

    /// The live host holding `addr`.
    pub fn lookup_by_address(&self, addr: HostAddr) -> Option<HostId> {
        self.addr_map.get(&addr).copied()
    }

    pub fn protocol(&self) -> &RpcProtocol {
        &self.protocol
    }

    pub fn set_protocol_name(&mut self, name: impl Into<String>) {
        self.protocol.set_name(name);
    }

    /// Declares an interface by name, or returns the code it already has.
    pub fn declare_interface(&mut self, name: &str) -> Result<RpcCode, DsarchError> {
        self.protocol.declare(name)
    }

    /// Declares the interface `I`.
    pub fn declare_interface_of<I: RemoteInterface>(&mut self) -> Result<RpcCode, DsarchError> {
        self.protocol.declare(I::NAME)
    }

    /// Declares a method of an interface, or returns the code it already has.
    pub fn declare_method(
        &mut self,
        interface: RpcCode,
        name: &str,
        one_way: bool,
    ) -> Result<RpcCode, DsarchError> {
        self.protocol.declare_method(interface, name, one_way)
    }

    /// Runs `declare`, dropping every code it declared if it fails.
    pub(crate) fn declaring<T>(
        &mut self,
        declare: impl FnOnce(&mut Self) -> Result<T, DsarchError>,
    ) -> Result<T, DsarchError> {
        let checkpoint = self.protocol.clone();
        let result = declare(self);
        if result.is_err() {
            self.protocol = checkpoint;
        }
        result
    }

    /// Returns the channel for `(source, destination, code)`, creating it if
    /// needed.
    ///
    /// The source cannot be a group, and a channel to a group must carry a
    /// one-way method. Connecting finalizes the addresses of both ends.
    pub fn connect(
        &mut self,
        source: HostId,
        destination: HostId,
        code: RpcCode,
    ) -> Result<ChannelId, DsarchError> {
        let source_host = self.checked_host(source)?;
        let destination_host = self.checked_host(destination)?;

        let existing = destination_host.incoming().find(|id| {
            self.channels
                .get(id)
                .map_or(false, |chan| chan.source() == source && chan.code() == code)
        });
        if let Some(existing) = existing {
            return Ok(existing);
        }

        if source_host.is_group() {
            return Err(DsarchError::InvalidTopology(
                "a channel source cannot be a host group",
            ));
        }
        let one_way = self.protocol.method(code)?.one_way();
        let multicast = destination_host.is_group();
        if multicast && !one_way {
            return Err(DsarchError::InvalidTopology(
                "a broadcast channel on a method that is not one-way cannot be created",
            ));
        }

        let source_addr = self.address(source)?;
        let destination_addr = self.address(destination)?;

        let id = ChannelId::new(self.next_channel_id);
        self.next_channel_id += 1;
        let channel = Channel::new(
            id,
            (source, source_addr),
            (destination, destination_addr),
            code,
            multicast,
        );
        self.channels.insert(id, channel);
        if let Some(host) = self.hosts.get_mut(&destination) {
            host.incoming.insert(id);
        }
        channel_creation_event(id, source, destination, code, multicast);
        Ok(id)
    }

    /// Removes a channel from the network and hands it back.
    pub fn disconnect(&mut self, id: ChannelId) -> Result<Channel, DsarchError> {
        let channel = self
            .channels
            .remove(&id)
            .ok_or(DsarchError::UnknownChannel(id))?;
        if let Some(host) = channel
            .destination()
            .and_then(|destination| self.hosts.get_mut(&destination))
        {
            host.incoming.remove(&id);
        }
        channel_removal_event(id, channel.messages(), channel.bytes());
        Ok(channel)
    }

    /// Registers the transmission of a `size` byte message on a channel.
    pub fn transmit(&mut self, id: ChannelId, size: usize) -> Result<(), DsarchError> {
        let channel = self.channels.get(&id).ok_or(DsarchError::UnknownChannel(id))?;
        let fanout = match channel.destination() {
            Some(group) if channel.is_multicast() => self.receivers(group, channel.source())?,
            _ => 0,
        };
        self.channels
            .get_mut(&id)
            .ok_or(DsarchError::UnknownChannel(id))?
            .transmit(size, fanout);
        Ok(())
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(&id)
    }

    /// Every channel, in creation order.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
