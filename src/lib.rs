/*!
`bgpkit-collector` receives routing and traffic telemetry from network devices and hands fully
decoded packets to application code.

Three transports are supported:

- **BMP** over TCP: one long-lived session per monitored router, framed by the BMP common header
- **sFlow v5** over UDP: one datagram per packet
- **NetFlow v9** over UDP: template-based records, templates are cached per exporter

# Example

```no_run
use bgpkit_collector::{
    CollectedPacket, CollectorConfig, Controller, ListenerError, PacketContext, PacketListener,
};
use std::sync::Arc;

struct Printer;

impl PacketListener for Printer {
    fn name(&self) -> &str {
        "printer"
    }

    fn process_packet(
        &self,
        context: &PacketContext,
        packet: &CollectedPacket,
    ) -> Result<(), ListenerError> {
        println!("{} {}: {:?}", context.transport, context.peer, packet);
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let controller = Controller::new(CollectorConfig::default());
    controller.register_listener(Arc::new(Printer));
    controller.start_listener().await.unwrap();
    tokio::signal::ctrl_c().await.unwrap();
    controller.close_listener().await;
}
```

The decoders under [parser] work on plain [bytes::Bytes] buffers and can be used without the
network layer.

## Supported RFCs

- [X] [RFC 7854](https://datatracker.ietf.org/doc/html/rfc7854): BGP Monitoring Protocol (BMP)
- [X] [RFC 3954](https://datatracker.ietf.org/doc/html/rfc3954): Cisco Systems NetFlow Services Export Version 9
- [X] [sFlow Version 5](https://sflow.org/sflow_version_5.txt)
*/

pub mod config;
pub mod controller;
pub mod error;
pub mod framing;
pub mod listener;
pub mod models;
pub mod parser;
pub mod session;

pub use config::CollectorConfig;
pub use controller::{CollectorError, CollectorStats, Controller};
pub use error::ParserError;
pub use framing::{BmpFrameDecoder, FrameStats};
pub use listener::{CollectedPacket, ListenerError, PacketContext, PacketListener, Transport};
pub use session::{BmpSession, SessionEnd, SessionState};
