//! Prebuilt simulations that exercise the traffic model end to end.

mod echo;
pub use echo::{echo, Echo, EchoClient, EchoServer};

mod scatter_gather;
pub use scatter_gather::{scatter_gather, Peer, PeerInterface, PeerNetwork};

/// Parameters shared by the prebuilt simulations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Number of clients (echo) or peers (scatter/gather).
    pub peers: usize,
    /// Number of rounds of calls.
    pub rounds: usize,
    /// Seed of the random choices made by the simulation.
    pub seed: u64,
    /// Number of distinct keys a peer can pick.
    pub keys: i32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            peers: 4,
            rounds: 10,
            seed: 0,
            keys: 3,
        }
    }
}
