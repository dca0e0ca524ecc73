//! Textual traffic reports.

use dsarch_core::{ChannelFrame, Named, Network};
use std::fmt::{self, Display};

/// A report of every channel of a network, followed by per-interface and
/// overall totals.
///
/// ```text
/// echo
/// [chan 0->1 traffic:2,12] Echo::echo
/// ...
/// Echo: 12 channels, 40 messages, 180 bytes
/// total: 12 channels, 40 messages, 180 bytes
/// ```
pub struct Report<'a> {
    network: &'a Network,
}

impl<'a> Report<'a> {
    pub fn new(network: &'a Network) -> Self {
        Self { network }
    }
}

fn totals(f: &mut fmt::Formatter<'_>, label: &str, frame: &ChannelFrame) -> fmt::Result {
    write!(
        f,
        "{label}: {} channels, {} messages, {} bytes",
        frame.len(),
        frame.total_messages(),
        frame.total_bytes()
    )?;
    let multicast = frame.multicast();
    if !multicast.is_empty() {
        write!(
            f,
            " ({} messages, {} bytes received by groups)",
            multicast.total_received_messages(),
            multicast.total_received_bytes()
        )?;
    }
    writeln!(f)
}

impl Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let protocol = self.network.protocol();
        let frame = ChannelFrame::new(self.network);
        writeln!(f, "{}", protocol.name())?;
        for channel in frame.iter() {
            let code = channel.code();
            match (protocol.interface(code), protocol.method(code)) {
                (Ok(interface), Ok(method)) => {
                    let direction = if code.is_response() { " (response)" } else { "" };
                    writeln!(
                        f,
                        "{channel} {}::{}{direction}",
                        interface.name(),
                        method.name()
                    )?
                }
                _ => writeln!(f, "{channel} {code}")?,
            }
        }
        for interface in protocol.interfaces() {
            let name = interface.name();
            totals(f, &name, &frame.interface(&name))?;
        }
        totals(f, "total", &frame)
    }
}
