use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dsarch_core::{Ack, ChannelFrame, DsarchError, Network, ProxyMap, RemoteInterface, RpcProxy};

struct Gossip;

impl RemoteInterface for Gossip {
    const NAME: &'static str = "Gossip";

    fn declare_calls(proxy: &mut RpcProxy, network: &mut Network) -> Result<(), DsarchError> {
        proxy.declare_call(network, "push", true)?;
        proxy.declare_call(network, "pull", false)?;
        Ok(())
    }
}

/// Every peer pulls from every other peer once.
fn all_to_all(peers: usize) -> Network {
    let mut net = Network::new();
    let hosts: Vec<_> = (0..peers).map(|_| net.add_host("")).collect();
    for &host in hosts.iter() {
        let mut map = ProxyMap::<Gossip>::owned(host);
        map.add_sites(&mut net, hosts.iter().copied()).unwrap();
        for &other in hosts.iter().filter(|&&other| other != host) {
            let proxy = map.get_or_connect(&mut net, other).unwrap();
            let pull = proxy.handle("pull").unwrap();
            proxy
                .invoke(&mut net, pull, 16, |_| Ack::Acknowledged(0u64))
                .unwrap();
        }
    }
    net
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("all-to-all pulls, 32 peers", |b| {
        b.iter(|| all_to_all(black_box(32)))
    });

    let net = all_to_all(64);
    c.bench_function("frame query, 64 peers", |b| {
        b.iter(|| {
            let frame = ChannelFrame::new(&net);
            black_box(frame.method("Gossip", "pull").responses().total_bytes())
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
