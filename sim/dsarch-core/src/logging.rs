//! Logging holds wrapper functions for the traffic model's events.
//! Each function corresponds to one kind of event (host registration, channel
//! creation, ...). The library never installs a subscriber; the embedding
//! simulation decides where these go.

use crate::{channel::ChannelId, host::HostAddr, rpc::RpcCode, HostId};
use tracing::{event, Level};

/// Host or group registration.
pub fn host_registration_event(host: HostId, name: &str, group: bool) {
    event!(target: "HOST", Level::DEBUG, host = host.into_inner(), name = name, group = group, "registered");
}

/// Host or group removal. Captures the number of channels whose destination
/// was cleared.
pub fn host_removal_event(host: HostId, severed: usize) {
    event!(target: "HOST", Level::DEBUG, host = host.into_inner(), severed = severed, "removed");
}

/// Address assignment. `requested` is the unknown sentinel for default
/// assignments.
pub fn address_event(host: HostId, requested: HostAddr, assigned: Option<HostAddr>) {
    match assigned {
        Some(addr) => {
            event!(target: "ADDRESS", Level::TRACE, host = host.into_inner(), requested = %requested, assigned = %addr)
        }
        None => {
            event!(target: "ADDRESS", Level::WARN, host = host.into_inner(), requested = %requested, "address unavailable")
        }
    }
}

/// Channel creation.
pub fn channel_creation_event(channel: ChannelId, source: HostId, destination: HostId, code: RpcCode, multicast: bool) {
    event!(target: "CHANNEL", Level::DEBUG, channel = channel.into_inner(), source = source.into_inner(), destination = destination.into_inner(), code = %code, multicast = multicast, "connected");
}

/// Channel removal. Captures the final traffic of the channel.
pub fn channel_removal_event(channel: ChannelId, messages: u64, bytes: u64) {
    event!(target: "CHANNEL", Level::DEBUG, channel = channel.into_inner(), messages = messages, bytes = bytes, "disconnected");
}

/// Method declaration.
pub fn declaration_event(interface: &str, method: &str, code: RpcCode) {
    event!(target: "RPC", Level::TRACE, interface = interface, method = method, code = %code, "declared");
}
