//! Proxies: the calling side of simulated remote calls.
//!
//! When host A wants to call a remote method on host B, it makes the call
//! through an [`RpcProxy`] so that the traffic can be accounted for. Host A is
//! the owner of the proxy and host B is its destination. Each proxy
//! instantiates one interface; each [`RpcCall`] on it is one method of that
//! interface, with a request channel and, unless it is one-way, a response
//! channel. Channels are created when the proxy is bound to its destination.

use crate::{
    channel::ChannelId,
    message::{Ack, ByteSize},
    rpc::RpcCode,
    DsarchError, HostId, Network,
};
use std::{
    collections::{btree_map::Entry, BTreeMap},
    marker::PhantomData,
};

/// The number of calls a single proxy can hold.
pub const MAX_PROXY_CALLS: usize = 1000;

/// A remote interface, identified by a stable name rather than by its Rust
/// type.
pub trait RemoteInterface {
    /// The interface name registered in the protocol.
    const NAME: &'static str;

    /// Declares the calls of the interface on a freshly created proxy.
    fn declare_calls(_proxy: &mut RpcProxy, _network: &mut Network) -> Result<(), DsarchError> {
        Ok(())
    }
}

/// An opaque reference to one call of one [`RpcProxy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallHandle(usize);

/// One declared remote operation on a proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcCall {
    name: String,
    endpoint: RpcCode,
    one_way: bool,
    request: Option<ChannelId>,
    response: Option<ChannelId>,
}

impl RpcCall {
    fn new(name: &str, endpoint: RpcCode, one_way: bool) -> Self {
        Self {
            name: name.to_string(),
            endpoint,
            one_way,
            request: None,
            response: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The request code of the method.
    pub fn endpoint(&self) -> RpcCode {
        self.endpoint
    }

    pub fn one_way(&self) -> bool {
        self.one_way
    }

    pub fn request_channel(&self) -> Option<ChannelId> {
        self.request
    }

    pub fn response_channel(&self) -> Option<ChannelId> {
        self.response
    }

    fn connect(
        &mut self,
        network: &mut Network,
        owner: HostId,
        destination: HostId,
    ) -> Result<(), DsarchError> {
        let request = network.connect(owner, destination, self.endpoint)?;
        let response = if self.one_way {
            None
        } else {
            Some(network.connect(destination, owner, self.endpoint.response())?)
        };
        self.request = Some(request);
        self.response = response;
        Ok(())
    }

    /// Disconnects the channels of this call. Channels that are already gone
    /// are skipped.
    pub fn release(&mut self, network: &mut Network) -> Result<(), DsarchError> {
        for channel in [self.request.take(), self.response.take()].into_iter().flatten() {
            match network.disconnect(channel) {
                Ok(_) | Err(DsarchError::UnknownChannel(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// A host's view of one remote interface instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcProxy {
    interface: RpcCode,
    owner: HostId,
    destination: Option<HostId>,
    calls: Vec<RpcCall>,
}

impl RpcProxy {
    /// Creates a proxy owned by `owner` for the interface called `interface`,
    /// declaring the interface if needed.
    pub fn new(network: &mut Network, owner: HostId, interface: &str) -> Result<Self, DsarchError> {
        let code = network.declare_interface(interface)?;
        Self::for_interface(network, owner, code)
    }

    /// Creates a proxy for an already declared interface.
    pub fn for_interface(
        network: &Network,
        owner: HostId,
        interface: RpcCode,
    ) -> Result<Self, DsarchError> {
        let interface = network.protocol().interface(interface)?.code();
        let host = network.host(owner).ok_or(DsarchError::UnknownHost(owner))?;
        if host.is_group() {
            return Err(DsarchError::InvalidTopology("a host group cannot own a proxy"));
        }
        Ok(Self {
            interface,
            owner,
            destination: None,
            calls: Vec::new(),
        })
    }

    /// Creates a proxy for `I` with every call `I` declares.
    ///
    /// If any declaration fails, the interface and the methods declared on
    /// the way are dropped from the protocol again.
    pub fn of<I: RemoteInterface>(network: &mut Network, owner: HostId) -> Result<Self, DsarchError> {
        network.declaring(|network| {
            let code = network.declare_interface_of::<I>()?;
            let mut proxy = Self::for_interface(network, owner, code)?;
            I::declare_calls(&mut proxy, network)?;
            Ok(proxy)
        })
    }

    pub fn interface(&self) -> RpcCode {
        self.interface
    }

    pub fn owner(&self) -> HostId {
        self.owner
    }

    /// The host or group the proxy is bound to.
    pub fn destination(&self) -> Option<HostId> {
        self.destination
    }

    pub fn calls(&self) -> &[RpcCall] {
        &self.calls
    }

    pub fn call(&self, handle: CallHandle) -> Option<&RpcCall> {
        self.calls.get(handle.0)
    }

    /// The handle of the call called `name`.
    pub fn handle(&self, name: &str) -> Option<CallHandle> {
        self.calls
            .iter()
            .position(|call| call.name == name)
            .map(CallHandle)
    }

    /// Declares a call, allocating its method code. A proxy that is already
    /// bound connects the new call right away. Declaring a name again returns
    /// the handle it already has.
    pub fn declare_call(
        &mut self,
        network: &mut Network,
        name: &str,
        one_way: bool,
    ) -> Result<CallHandle, DsarchError> {
        if let Some(handle) = self.handle(name) {
            if self.calls[handle.0].one_way != one_way {
                return Err(DsarchError::ConflictingDeclaration(name.to_string()));
            }
            return Ok(handle);
        }
        self.register(network, name, one_way)
    }

    /// Adds one more call site for the method `name`, declaring the method
    /// if needed.
    ///
    /// Every site gets its own handle but shares the channels of the other
    /// sites of the same method. [`handle`](Self::handle) finds the first.
    pub fn declare_call_site(
        &mut self,
        network: &mut Network,
        name: &str,
        one_way: bool,
    ) -> Result<CallHandle, DsarchError> {
        self.register(network, name, one_way)
    }

    fn register(
        &mut self,
        network: &mut Network,
        name: &str,
        one_way: bool,
    ) -> Result<CallHandle, DsarchError> {
        if self.calls.len() == MAX_PROXY_CALLS {
            return Err(DsarchError::CapacityExceeded("too many calls on one proxy"));
        }
        let Some(destination) = self.destination else {
            let endpoint = network.declare_method(self.interface, name, one_way)?;
            self.calls.push(RpcCall::new(name, endpoint, one_way));
            return Ok(CallHandle(self.calls.len() - 1));
        };

        network
            .host(self.owner)
            .ok_or(DsarchError::UnknownHost(self.owner))?;
        let host = network
            .host(destination)
            .ok_or(DsarchError::UnknownHost(destination))?;
        if !one_way && host.is_group() {
            return Err(DsarchError::InvalidTopology(
                "a proxy bound to a group takes only one-way calls",
            ));
        }

        let (interface, owner) = (self.interface, self.owner);
        let call = network.declaring(|network| {
            let endpoint = network.declare_method(interface, name, one_way)?;
            let mut call = RpcCall::new(name, endpoint, one_way);
            call.connect(network, owner, destination)?;
            Ok(call)
        })?;
        self.calls.push(call);
        Ok(CallHandle(self.calls.len() - 1))
    }

    /// Binds the proxy to `destination`, creating (or reusing) the channels of
    /// every call.
    ///
    /// A group destination requires every call to be one-way. Rebinding keeps
    /// the channels of the previous destination in the network.
    pub fn connect(&mut self, network: &mut Network, destination: HostId) -> Result<(), DsarchError> {
        if destination == self.owner {
            return Err(DsarchError::InvalidTopology(
                "a proxy cannot be bound to its owner",
            ));
        }
        network
            .host(self.owner)
            .ok_or(DsarchError::UnknownHost(self.owner))?;
        let host = network
            .host(destination)
            .ok_or(DsarchError::UnknownHost(destination))?;
        if host.is_group() && self.calls.iter().any(|call| !call.one_way) {
            return Err(DsarchError::InvalidTopology(
                "a broadcast channel on a method that is not one-way cannot be created",
            ));
        }

        for call in self.calls.iter_mut() {
            call.connect(network, self.owner, destination)?;
        }
        self.destination = Some(destination);
        Ok(())
    }

    /// Disconnects the channels of every call.
    pub fn release(mut self, network: &mut Network) -> Result<(), DsarchError> {
        for call in self.calls.iter_mut() {
            call.release(network)?;
        }
        Ok(())
    }

    fn bound_call(&self, handle: CallHandle) -> Result<&RpcCall, DsarchError> {
        if self.destination.is_none() {
            return Err(DsarchError::NotReady("proxy is not bound to a destination"));
        }
        self.call(handle).ok_or(DsarchError::UnknownCall(handle.0))
    }

    /// Performs a two-way call.
    ///
    /// The request channel is charged `request_size` bytes, then `body` runs
    /// the simulated method. Unless it answers [`Ack::Suppressed`], the
    /// response channel is charged the size of the answer.
    pub fn invoke<T: ByteSize>(
        &self,
        network: &mut Network,
        handle: CallHandle,
        request_size: usize,
        body: impl FnOnce(&mut Network) -> Ack<T>,
    ) -> Result<Ack<T>, DsarchError> {
        let call = self.bound_call(handle)?;
        if call.one_way {
            return Err(DsarchError::InvalidTopology("one-way calls are sent, not invoked"));
        }
        let (request, response) = match (call.request, call.response) {
            (Some(request), Some(response)) => (request, response),
            _ => return Err(DsarchError::NotReady("call has no channels")),
        };

        network.transmit(request, request_size)?;
        let answer = body(network);
        if let Some(size) = answer.response_size() {
            network.transmit(response, size)?;
        }
        Ok(answer)
    }

    /// Performs a one-way call.
    ///
    /// The request channel is charged once, however many hosts a group
    /// destination has; the fan-out is accounted by the channel.
    pub fn send(
        &self,
        network: &mut Network,
        handle: CallHandle,
        request_size: usize,
    ) -> Result<(), DsarchError> {
        let call = self.bound_call(handle)?;
        if !call.one_way {
            return Err(DsarchError::InvalidTopology("two-way calls are invoked, not sent"));
        }
        let request = call
            .request
            .ok_or(DsarchError::NotReady("call has no channels"))?;
        network.transmit(request, request_size)
    }
}

/// The proxies a host holds on other hosts (or groups) of one interface.
#[derive(Debug)]
pub struct ProxyMap<I> {
    owner: Option<HostId>,
    proxies: BTreeMap<HostId, RpcProxy>,
    interface: PhantomData<fn() -> I>,
}

impl<I> Default for ProxyMap<I> {
    fn default() -> Self {
        Self {
            owner: None,
            proxies: BTreeMap::new(),
            interface: PhantomData,
        }
    }
}

impl<I: RemoteInterface> ProxyMap<I> {
    /// Creates a map with no owner. It cannot create proxies until
    /// [`set_owner`](Self::set_owner) is called.
    pub fn new() -> Self {
        Default::default()
    }

    pub fn owned(owner: HostId) -> Self {
        Self {
            owner: Some(owner),
            ..Default::default()
        }
    }

    pub fn owner(&self) -> Option<HostId> {
        self.owner
    }

    pub fn set_owner(&mut self, owner: HostId) {
        self.owner = Some(owner);
    }

    /// The proxy for `destination`, created and bound on first use.
    pub fn get_or_connect(
        &mut self,
        network: &mut Network,
        destination: HostId,
    ) -> Result<&mut RpcProxy, DsarchError> {
        let owner = self
            .owner
            .ok_or(DsarchError::NotReady("proxy map has not been owned yet"))?;
        match self.proxies.entry(destination) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let mut proxy = RpcProxy::of::<I>(network, owner)?;
                proxy.connect(network, destination)?;
                Ok(entry.insert(proxy))
            }
        }
    }

    pub fn get(&self, destination: HostId) -> Option<&RpcProxy> {
        self.proxies.get(&destination)
    }

    /// Adds proxies to every site except the owner.
    pub fn add_sites(
        &mut self,
        network: &mut Network,
        sites: impl IntoIterator<Item = HostId>,
    ) -> Result<(), DsarchError> {
        for site in sites {
            if Some(site) != self.owner {
                self.get_or_connect(network, site)?;
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (HostId, &RpcProxy)> {
        self.proxies.iter().map(|(&host, proxy)| (host, proxy))
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Releases every proxy of the map.
    pub fn release(self, network: &mut Network) -> Result<(), DsarchError> {
        for (_, proxy) in self.proxies {
            proxy.release(network)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Membership;

    struct Ping;

    impl RemoteInterface for Ping {
        const NAME: &'static str = "Ping";

        fn declare_calls(proxy: &mut RpcProxy, network: &mut Network) -> Result<(), DsarchError> {
            proxy.declare_call(network, "send", true)?;
            proxy.declare_call(network, "req", false)?;
            Ok(())
        }
    }

    struct Notify;

    impl RemoteInterface for Notify {
        const NAME: &'static str = "Notify";

        fn declare_calls(proxy: &mut RpcProxy, network: &mut Network) -> Result<(), DsarchError> {
            proxy.declare_call(network, "notify", true)?;
            Ok(())
        }
    }

    #[test]
    fn binding_creates_channels() {
        let mut net = Network::new();
        let a = net.add_host("A");
        let b = net.add_host("B");
        let mut proxy = RpcProxy::of::<Ping>(&mut net, a).unwrap();
        assert_eq!(net.channel_count(), 0);
        proxy.connect(&mut net, b).unwrap();
        assert_eq!(net.channel_count(), 3);

        let req = proxy.call(proxy.handle("req").unwrap()).unwrap();
        let response = net.channel(req.response_channel().unwrap()).unwrap();
        assert_eq!(response.source(), b);
        assert_eq!(response.destination(), Some(a));
        assert!(response.code().is_response());

        let send = proxy.call(proxy.handle("send").unwrap()).unwrap();
        assert_eq!(send.response_channel(), None);
    }

    #[test]
    fn binding_reuses_channels() {
        let mut net = Network::new();
        let a = net.add_host("A");
        let b = net.add_host("B");
        let mut first = RpcProxy::of::<Ping>(&mut net, a).unwrap();
        let mut second = RpcProxy::of::<Ping>(&mut net, a).unwrap();
        first.connect(&mut net, b).unwrap();
        second.connect(&mut net, b).unwrap();
        assert_eq!(net.channel_count(), 3);
        assert_eq!(first.calls(), second.calls());
    }

    #[test]
    fn invalid_bindings() {
        let mut net = Network::new();
        let a = net.add_host("A");
        let g = net.add_group("G", Membership::members());
        let mut proxy = RpcProxy::of::<Ping>(&mut net, a).unwrap();
        assert!(matches!(proxy.connect(&mut net, a), Err(DsarchError::InvalidTopology(_))));
        assert!(matches!(proxy.connect(&mut net, g), Err(DsarchError::InvalidTopology(_))));
        assert_eq!(net.channel_count(), 0);
        assert_eq!(proxy.destination(), None);
        assert!(matches!(
            RpcProxy::of::<Ping>(&mut net, g),
            Err(DsarchError::InvalidTopology(_))
        ));

        let mut notify = RpcProxy::of::<Notify>(&mut net, a).unwrap();
        notify.connect(&mut net, g).unwrap();
        assert!(matches!(
            notify.declare_call(&mut net, "ask", false),
            Err(DsarchError::InvalidTopology(_))
        ));
        assert_eq!(notify.calls().len(), 1);
    }

    #[test]
    fn unbound_calls_are_not_ready() {
        let mut net = Network::new();
        let a = net.add_host("A");
        let proxy = RpcProxy::of::<Ping>(&mut net, a).unwrap();
        let send = proxy.handle("send").unwrap();
        assert!(matches!(proxy.send(&mut net, send, 1), Err(DsarchError::NotReady(_))));
    }

    #[test]
    fn invoke_charges_both_directions() {
        let mut net = Network::new();
        let a = net.add_host("A");
        let b = net.add_host("B");
        let mut proxy = RpcProxy::of::<Ping>(&mut net, a).unwrap();
        proxy.connect(&mut net, b).unwrap();
        let req = proxy.handle("req").unwrap();
        let send = proxy.handle("send").unwrap();

        let answer = proxy
            .invoke(&mut net, req, 20, |_| Ack::Acknowledged(String::from("hello")))
            .unwrap();
        assert_eq!(answer.payload().map(String::as_str), Some("hello"));
        proxy
            .invoke(&mut net, req, 20, |_| Ack::<u32>::Suppressed)
            .unwrap();

        let call = proxy.call(req).unwrap();
        let request = net.channel(call.request_channel().unwrap()).unwrap();
        let response = net.channel(call.response_channel().unwrap()).unwrap();
        assert_eq!((request.messages(), request.bytes()), (2, 40));
        assert_eq!((response.messages(), response.bytes()), (1, 5));

        assert!(proxy.invoke(&mut net, send, 1, |_| Ack::Acknowledged(())).is_err());
        assert!(proxy.send(&mut net, req, 1).is_err());
    }

    #[test]
    fn calls_are_declared_once() {
        let mut net = Network::new();
        let a = net.add_host("A");
        let mut proxy = RpcProxy::new(&mut net, a, "Ping").unwrap();
        let first = proxy.declare_call(&mut net, "send", true).unwrap();
        assert_eq!(proxy.declare_call(&mut net, "send", true).unwrap(), first);
        assert!(matches!(
            proxy.declare_call(&mut net, "send", false),
            Err(DsarchError::ConflictingDeclaration(_))
        ));
        assert_eq!(proxy.calls().len(), 1);
    }

    #[test]
    fn call_sites_share_channels() {
        let mut net = Network::new();
        let a = net.add_host("A");
        let b = net.add_host("B");
        let mut proxy = RpcProxy::of::<Ping>(&mut net, a).unwrap();
        proxy.connect(&mut net, b).unwrap();
        let first = proxy.handle("req").unwrap();
        let second = proxy.declare_call_site(&mut net, "req", false).unwrap();
        assert_ne!(first, second);
        assert_eq!(proxy.calls().len(), 3);
        assert_eq!(net.channel_count(), 3);
        assert_eq!(proxy.call(first), proxy.call(second));
        assert_eq!(proxy.handle("req"), Some(first));

        proxy
            .invoke(&mut net, second, 6, |_| Ack::Acknowledged(7u32))
            .unwrap();
        let request = proxy.call(first).unwrap().request_channel().unwrap();
        assert_eq!(net.channel(request).unwrap().bytes(), 6);
        assert!(matches!(
            proxy.declare_call_site(&mut net, "req", true),
            Err(DsarchError::ConflictingDeclaration(_))
        ));
    }

    #[test]
    fn call_ceiling() {
        let mut net = Network::new();
        let a = net.add_host("A");
        let mut proxy = RpcProxy::new(&mut net, a, "Huge").unwrap();
        for _ in 0..MAX_PROXY_CALLS {
            proxy.declare_call_site(&mut net, "tick", true).unwrap();
        }
        assert!(matches!(
            proxy.declare_call_site(&mut net, "tick", true),
            Err(DsarchError::CapacityExceeded(_))
        ));
        assert!(matches!(
            proxy.declare_call(&mut net, "last", true),
            Err(DsarchError::CapacityExceeded(_))
        ));
        assert_eq!(proxy.calls().len(), MAX_PROXY_CALLS);
        assert_eq!(net.protocol().method_code("Huge", "last"), RpcCode::NONE);
        assert_eq!(net.protocol().interface(proxy.interface()).unwrap().methods().len(), 1);
    }

    #[test]
    fn calls_on_removed_destinations_are_not_declared() {
        let mut net = Network::new();
        let a = net.add_host("A");
        let b = net.add_host("B");
        let g = net.add_group("G", Membership::members());
        let mut proxy = RpcProxy::of::<Ping>(&mut net, a).unwrap();
        proxy.connect(&mut net, b).unwrap();
        let mut notify = RpcProxy::of::<Notify>(&mut net, a).unwrap();
        notify.connect(&mut net, g).unwrap();
        net.remove_host(b).unwrap();
        net.remove_host(g).unwrap();

        assert_eq!(
            proxy.declare_call(&mut net, "late", false),
            Err(DsarchError::UnknownHost(b))
        );
        assert_eq!(
            notify.declare_call(&mut net, "ask", false),
            Err(DsarchError::UnknownHost(g))
        );
        assert_eq!(proxy.calls().len(), 2);
        assert_eq!(notify.calls().len(), 1);
        assert_eq!(net.protocol().method_code("Ping", "late"), RpcCode::NONE);
        assert_eq!(net.protocol().method_code("Notify", "ask"), RpcCode::NONE);
        assert_eq!(net.channel_count(), 4);
    }

    struct Broken;

    impl RemoteInterface for Broken {
        const NAME: &'static str = "Broken";

        fn declare_calls(proxy: &mut RpcProxy, network: &mut Network) -> Result<(), DsarchError> {
            proxy.declare_call(network, "ok", true)?;
            proxy.declare_call(network, "", true)?;
            Ok(())
        }
    }

    struct PingTwice;

    impl RemoteInterface for PingTwice {
        const NAME: &'static str = "Ping";

        fn declare_calls(proxy: &mut RpcProxy, network: &mut Network) -> Result<(), DsarchError> {
            proxy.declare_call(network, "again", true)?;
            proxy.declare_call(network, "send", false)?;
            Ok(())
        }
    }

    #[test]
    fn failed_interfaces_are_not_declared() {
        let mut net = Network::new();
        let a = net.add_host("A");
        assert_eq!(
            RpcProxy::of::<Broken>(&mut net, a).unwrap_err(),
            DsarchError::InvalidName("method")
        );
        assert_eq!(net.protocol().code("Broken"), RpcCode::NONE);
        assert_eq!(net.protocol().method_code("Broken", "ok"), RpcCode::NONE);

        RpcProxy::of::<Ping>(&mut net, a).unwrap();
        let before = net.protocol().clone();
        assert!(matches!(
            RpcProxy::of::<PingTwice>(&mut net, a),
            Err(DsarchError::ConflictingDeclaration(_))
        ));
        assert_eq!(net.protocol(), &before);
        assert_eq!(net.protocol().method_code("Ping", "again"), RpcCode::NONE);
    }

    #[test]
    fn stale_handles_are_unknown_calls() {
        let mut net = Network::new();
        let a = net.add_host("A");
        let b = net.add_host("B");
        let ping = RpcProxy::of::<Ping>(&mut net, a).unwrap();
        let mut notify = RpcProxy::of::<Notify>(&mut net, a).unwrap();
        notify.connect(&mut net, b).unwrap();
        let req = ping.handle("req").unwrap();
        assert_eq!(notify.send(&mut net, req, 1), Err(DsarchError::UnknownCall(1)));
    }

    struct Bare;

    impl RemoteInterface for Bare {
        const NAME: &'static str = "Bare";
    }

    #[test]
    fn interfaces_without_calls() {
        let mut net = Network::new();
        let a = net.add_host("A");
        let b = net.add_host("B");
        let mut proxy = RpcProxy::of::<Bare>(&mut net, a).unwrap();
        proxy.connect(&mut net, b).unwrap();
        assert!(proxy.calls().is_empty());
        assert_eq!(net.protocol().code("Bare"), proxy.interface());
        assert_eq!(net.channel_count(), 0);
    }

    #[test]
    fn release_disconnects() {
        let mut net = Network::new();
        let a = net.add_host("A");
        let b = net.add_host("B");
        let mut proxy = RpcProxy::of::<Ping>(&mut net, a).unwrap();
        proxy.connect(&mut net, b).unwrap();
        let twin = proxy.clone();
        proxy.release(&mut net).unwrap();
        assert_eq!(net.channel_count(), 0);
        // The twin shared the same channels; releasing it skips them.
        twin.release(&mut net).unwrap();
    }

    #[test]
    fn proxy_map() {
        let mut net = Network::new();
        let a = net.add_host("A");
        let b = net.add_host("B");
        let c = net.add_host("C");

        let mut unowned = ProxyMap::<Ping>::new();
        assert!(matches!(
            unowned.get_or_connect(&mut net, b),
            Err(DsarchError::NotReady(_))
        ));

        let mut map = ProxyMap::<Ping>::owned(a);
        map.add_sites(&mut net, [a, b, c]).unwrap();
        assert_eq!(map.len(), 2);
        assert!(map.get(a).is_none());
        assert_eq!(map.get(c).unwrap().destination(), Some(c));
        assert_eq!(net.channel_count(), 6);
        map.get_or_connect(&mut net, b).unwrap();
        assert_eq!(net.channel_count(), 6);

        map.release(&mut net).unwrap();
        assert_eq!(net.channel_count(), 0);
    }
}
