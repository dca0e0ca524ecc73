//! A peer-to-peer scatter/gather network.
//!
//! Each peer holds an integer key. When its key changes, a peer asks the
//! network how many peers share the new key: it multicasts an inquiry to the
//! group of all peers, and every peer holding the same key replies to the
//! sender over a unicast proxy. The sender counts the replies as its arity.

use super::SimConfig;
use dsarch_core::{
    message::Sender, message_size, DsarchError, HostId, Membership, Network, ProxyMap,
    RemoteInterface, RpcProxy,
};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

/// The remote interface of a [`Peer`]. Both calls are one-way.
#[derive(Debug)]
pub struct PeerInterface;

impl RemoteInterface for PeerInterface {
    const NAME: &'static str = "Peer";

    fn declare_calls(proxy: &mut RpcProxy, network: &mut Network) -> Result<(), DsarchError> {
        proxy.declare_call(network, "gather_replies", true)?;
        proxy.declare_call(network, "scatter_inquiry", true)?;
        Ok(())
    }
}

/// One site of a [`PeerNetwork`].
#[derive(Debug)]
pub struct Peer {
    host: HostId,
    key: i32,
    arity: usize,
    proxies: ProxyMap<PeerInterface>,
}

impl Peer {
    pub fn host(&self) -> HostId {
        self.host
    }

    pub fn key(&self) -> i32 {
        self.key
    }

    /// The number of peers found holding the same key at the last inquiry,
    /// this one included.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Charges one call of `call` to the proxy for `destination`.
    fn send(
        &mut self,
        network: &mut Network,
        destination: HostId,
        call: &str,
        size: usize,
    ) -> Result<(), DsarchError> {
        let proxy = self.proxies.get_or_connect(network, destination)?;
        let handle = proxy
            .handle(call)
            .ok_or(DsarchError::NotReady("peer call was not declared"))?;
        proxy.send(network, handle, size)
    }
}

/// A network of peers sharing one multicast group.
#[derive(Debug)]
pub struct PeerNetwork {
    network: Network,
    group: HostId,
    peers: Vec<Peer>,
    index: FxHashMap<HostId, usize>,
}

impl Default for PeerNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerNetwork {
    pub fn new() -> Self {
        let mut network = Network::with_name("scatter-gather");
        let group = network.add_group("peers", Membership::members());
        Self {
            network,
            group,
            peers: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    /// The multicast group every peer joins.
    pub fn group(&self) -> HostId {
        self.group
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    pub fn peer(&self, host: HostId) -> Option<&Peer> {
        self.index.get(&host).map(|&i| &self.peers[i])
    }

    /// Adds a peer holding `key` and joins it to the group.
    pub fn add_peer(&mut self, key: i32) -> Result<HostId, DsarchError> {
        let host = self.network.add_host("");
        self.network.join(self.group, host)?;
        self.index.insert(host, self.peers.len());
        self.peers.push(Peer {
            host,
            key,
            arity: 1,
            proxies: ProxyMap::owned(host),
        });
        Ok(host)
    }

    fn index_of(&self, host: HostId) -> Result<usize, DsarchError> {
        self.index
            .get(&host)
            .copied()
            .ok_or(DsarchError::UnknownHost(host))
    }

    /// Changes the key of a peer and recomputes its arity.
    pub fn change_key(&mut self, host: HostId, key: i32) -> Result<(), DsarchError> {
        let sender = self.index_of(host)?;
        let group = self.group;
        let peer = &mut self.peers[sender];
        peer.key = key;
        peer.arity = 0;
        peer.send(
            &mut self.network,
            group,
            "scatter_inquiry",
            message_size!(Sender(host), key),
        )?;

        let membership = self
            .network
            .host(group)
            .and_then(|group| group.membership())
            .ok_or(DsarchError::UnknownHost(group))?;
        let receivers: Vec<usize> = (0..self.peers.len())
            .filter(|&i| membership.contains(self.peers[i].host))
            .collect();
        for receiver in receivers {
            self.scatter_inquiry(receiver, sender, key)?;
        }
        debug!(peer = %host, key, arity = self.peers[sender].arity, "key changed");
        Ok(())
    }

    fn scatter_inquiry(&mut self, receiver: usize, sender: usize, what: i32) -> Result<(), DsarchError> {
        let key = self.peers[receiver].key;
        if key != what {
            return Ok(());
        }
        if receiver != sender {
            let replier = self.peers[receiver].host;
            let destination = self.peers[sender].host;
            self.peers[receiver].send(
                &mut self.network,
                destination,
                "gather_replies",
                message_size!(Sender(replier), key),
            )?;
        }
        // A peer answers its own inquiry locally, without a proxy.
        self.gather_replies(sender, key);
        Ok(())
    }

    fn gather_replies(&mut self, receiver: usize, x: i32) {
        let peer = &mut self.peers[receiver];
        if peer.key == x {
            peer.arity += 1;
        }
    }
}

/// `config.peers` peers with random keys; in each of `config.rounds` rounds
/// a random peer picks a new random key.
pub fn scatter_gather(config: &SimConfig) -> Result<PeerNetwork, DsarchError> {
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let keys = config.keys.max(1);
    let mut peers = PeerNetwork::new();
    let hosts = (0..config.peers)
        .map(|_| peers.add_peer(rng.gen_range(0..keys)))
        .collect::<Result<Vec<_>, _>>()?;

    if !hosts.is_empty() {
        for _ in 0..config.rounds {
            let host = hosts[rng.gen_range(0..hosts.len())];
            peers.change_key(host, rng.gen_range(0..keys))?;
        }
    }

    info!(
        peers = hosts.len(),
        rounds = config.rounds,
        channels = peers.network().channel_count(),
        "scatter/gather simulation finished"
    );
    Ok(peers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsarch_core::ChannelFrame;

    #[test]
    #[tracing_test::traced_test]
    fn arity_counts_matching_peers() {
        let config = SimConfig {
            peers: 6,
            rounds: 20,
            seed: 7,
            keys: 2,
        };
        let mut peers = scatter_gather(&config).unwrap();
        let host = peers.peers()[0].host();
        peers.change_key(host, 1).unwrap();
        let matching = peers.peers().iter().filter(|peer| peer.key() == 1).count();
        assert_eq!(peers.peer(host).unwrap().arity(), matching);

        let frame = ChannelFrame::new(peers.network());
        assert_eq!(frame.multicast().total_messages(), 21);
        assert_eq!(frame.multicast().total_received_messages(), 21 * 5);
        // Only one-way calls, so nothing flows back.
        assert!(frame.responses().is_empty());
    }
}
