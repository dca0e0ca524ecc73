//! Property-based tests for the traffic model
//!
//! Validates network invariants:
//! - Redeclaring a name always yields the code it was first given
//! - No two live hosts ever hold the same address
//! - Frame filters compose like predicates
//! - Frame set operations behave like set operations on channel ids

use dsarch_core::{ChannelFrame, HostAddr, HostId, Membership, Network, RpcCode};
use proptest::prelude::*;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rustc_hash::FxHashSet;

#[derive(Debug, Clone)]
enum Op {
    AddHost,
    AddGroup,
    Remove(usize),
    Request(usize, i32),
    Address(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::AddHost),
        Just(Op::AddGroup),
        (0usize..16).prop_map(Op::Remove),
        (0usize..16, -8i32..8).prop_map(|(i, addr)| Op::Request(i, addr)),
        (0usize..16).prop_map(Op::Address),
    ]
}

/// A random network with traffic on random channels between 5 hosts.
fn random_network(seed: u64, connections: usize) -> (Network, Vec<HostId>) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut net = Network::new();
    let hosts: Vec<_> = (0..5).map(|i| net.add_host(&format!("h{i}"))).collect();
    let group = net.add_group("g", hosts[..3].iter().copied().collect());
    let mut codes = Vec::new();
    for ifc in ["Alpha", "Beta"] {
        let ifc = net.declare_interface(ifc).unwrap();
        codes.push((net.declare_method(ifc, "tell", true).unwrap(), true));
        codes.push((net.declare_method(ifc, "ask", false).unwrap(), false));
    }
    for _ in 0..connections {
        let source = hosts[rng.gen_range(0..hosts.len())];
        let (code, one_way) = codes[rng.gen_range(0..codes.len())];
        let destination = if one_way && rng.gen_bool(0.2) {
            group
        } else {
            hosts[rng.gen_range(0..hosts.len())]
        };
        let code = if !one_way && rng.gen_bool(0.5) {
            code.response()
        } else {
            code
        };
        let chan = net.connect(source, destination, code).unwrap();
        for _ in 0..rng.gen_range(0..4) {
            net.transmit(chan, rng.gen_range(0..64)).unwrap();
        }
    }
    (net, hosts)
}

fn ids(frame: &ChannelFrame) -> Vec<u64> {
    frame.ids().map(|id| id.into_inner()).collect()
}

proptest! {
    /// Property: declaration is idempotent and codes are distinct
    #[test]
    fn redeclaration_is_idempotent(
        names in prop::collection::vec("[a-z]{1,6}", 1..20),
        methods in prop::collection::vec("[a-z]{1,4}", 0..10),
    ) {
        let mut net = Network::new();
        let first: Vec<RpcCode> = names
            .iter()
            .map(|name| net.declare_interface(name).unwrap())
            .collect();
        for (name, code) in names.iter().zip(first.iter()) {
            prop_assert_eq!(net.declare_interface(name).unwrap(), *code);
            prop_assert_eq!(net.protocol().code(name), *code);
        }
        let distinct: FxHashSet<&String> = names.iter().collect();
        let codes: FxHashSet<RpcCode> = first.iter().copied().collect();
        prop_assert_eq!(distinct.len(), codes.len());

        let ifc = first[0];
        let declared: Vec<RpcCode> = methods
            .iter()
            .map(|m| net.declare_method(ifc, m, false).unwrap())
            .collect();
        for (m, code) in methods.iter().zip(declared.iter()) {
            prop_assert_eq!(net.declare_method(ifc, m, false).unwrap(), *code);
            prop_assert!(!code.is_response());
            prop_assert!(code.matches(ifc, RpcCode::INTERFACE_MASK));
        }
    }

    /// Property: addresses are unique among live hosts and never change
    #[test]
    fn addresses_stay_unique(ops in prop::collection::vec(op(), 1..60)) {
        let mut net = Network::new();
        let mut created: Vec<HostId> = Vec::new();
        let mut seen: Vec<(HostId, HostAddr)> = Vec::new();

        for op in ops {
            match op {
                Op::AddHost => created.push(net.add_host("")),
                Op::AddGroup => created.push(net.add_group("", Membership::members())),
                Op::Remove(i) => {
                    if let Some(&host) = created.get(i) {
                        let _ = net.remove_host(host);
                    }
                }
                Op::Request(i, addr) => {
                    if let Some(&host) = created.get(i) {
                        let _ = net.request_address(host, HostAddr::new(addr));
                    }
                }
                Op::Address(i) => {
                    if let Some(&host) = created.get(i) {
                        if let Ok(addr) = net.address(host) {
                            seen.push((host, addr));
                        }
                    }
                }
            }

            let mut addrs = FxHashSet::default();
            for host in net.hosts().chain(net.groups()) {
                let addr = host.addr();
                if addr.is_known() {
                    prop_assert!(addrs.insert(addr), "address {} held twice", addr);
                    prop_assert_eq!(net.lookup_by_address(addr), Some(host.id()));
                    prop_assert_eq!(addr.is_group(), host.is_group());
                }
            }
            for &(host, addr) in seen.iter() {
                if let Some(live) = net.host(host) {
                    prop_assert_eq!(live.addr(), addr);
                }
            }
        }
    }

    /// Property: chained filters equal one combined predicate
    #[test]
    fn filters_compose(seed in any::<u64>(), connections in 0usize..40, pick in 0usize..5) {
        let (net, hosts) = random_network(seed, connections);
        let host = hosts[pick];
        let frame = ChannelFrame::new(&net);

        let chained = frame.source(host).unicast().requests();
        let combined = frame.select(|c| {
            c.source() == host && !c.is_multicast() && !c.code().is_response()
        });
        prop_assert_eq!(ids(&chained), ids(&combined));

        let alpha = frame.interface("Alpha");
        let beta = frame.interface("Beta");
        prop_assert_eq!(alpha.len() + beta.len(), frame.len());
        prop_assert_eq!(
            frame.requests().total_bytes() + frame.responses().total_bytes(),
            frame.total_bytes()
        );
        prop_assert_eq!(frame.unicast().total_received_bytes(), 0);
    }

    /// Property: union and except behave like set operations
    #[test]
    fn union_then_except(seed in any::<u64>(), connections in 0usize..40) {
        let (net, hosts) = random_network(seed, connections);
        let frame = ChannelFrame::new(&net);
        let left = frame.source_in(hosts[..2].iter().copied());
        let right = frame.interface("Beta");

        let union = left.union_with(&right);
        let mut expected: Vec<u64> = ids(&left).into_iter().chain(ids(&right)).collect();
        expected.sort_unstable();
        expected.dedup();
        prop_assert_eq!(ids(&union), expected);

        let back = union.except(&right);
        prop_assert_eq!(ids(&back), ids(&left.except(&right)));
        prop_assert!(back.iter().all(|c| !right.iter().any(|r| r.id() == c.id())));
        prop_assert!(union.total_bytes() <= left.total_bytes() + right.total_bytes());
    }
}
