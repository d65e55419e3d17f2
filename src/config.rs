use crate::parser::netflow::DEFAULT_MAX_TEMPLATES_PER_EXPORTER;
use crate::parser::SflowMode;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Well-known BMP station port.
pub const DEFAULT_BMP_PORT: u16 = 9000;
pub const DEFAULT_SFLOW_PORT: u16 = 6343;
pub const DEFAULT_NETFLOW_PORT: u16 = 2055;

const DEFAULT_WORKER_THREADS: usize = 4;
const DEFAULT_UDP_WORKERS: usize = 2;
const DEFAULT_MAX_CONNECTIONS: usize = 1024;
/// Far above anything a router sends; a larger declared length means a corrupt header.
const DEFAULT_MAX_BMP_MESSAGE_LEN: usize = 1 << 20;
const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;
/// Largest UDP payload.
const DEFAULT_UDP_BUFFER_SIZE: usize = 65535;
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Collector configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CollectorConfig {
    /// Address every listener binds to
    pub bind_address: IpAddr,

    /// BMP TCP port, `None` disables BMP
    pub bmp_port: Option<u16>,

    /// sFlow UDP port, `None` disables sFlow
    pub sflow_port: Option<u16>,

    /// NetFlow v9 UDP port, `None` disables NetFlow
    pub netflow_port: Option<u16>,

    /// Runtime worker threads; read by the binary when it builds the runtime
    pub worker_threads: usize,

    /// Receive tasks per UDP socket
    pub udp_workers: usize,

    /// Concurrently active BMP sessions; further connections are closed on accept
    pub max_connections: usize,

    /// Largest BMP message accepted by the frame decoder
    pub max_bmp_message_len: usize,

    /// Initial per-connection read buffer capacity
    pub read_buffer_size: usize,

    /// Datagram receive buffer size
    pub udp_buffer_size: usize,

    /// How long `close_listener` waits for open sessions before aborting them
    pub shutdown_timeout: Duration,

    /// Handling of sFlow datagrams whose samples do not match the header
    pub sflow_mode: SflowMode,

    /// NetFlow templates kept per exporter; further new templates are ignored
    pub max_templates_per_exporter: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            bmp_port: Some(DEFAULT_BMP_PORT),
            sflow_port: Some(DEFAULT_SFLOW_PORT),
            netflow_port: Some(DEFAULT_NETFLOW_PORT),
            worker_threads: DEFAULT_WORKER_THREADS,
            udp_workers: DEFAULT_UDP_WORKERS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_bmp_message_len: DEFAULT_MAX_BMP_MESSAGE_LEN,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            udp_buffer_size: DEFAULT_UDP_BUFFER_SIZE,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            sflow_mode: SflowMode::default(),
            max_templates_per_exporter: DEFAULT_MAX_TEMPLATES_PER_EXPORTER,
        }
    }
}

impl CollectorConfig {
    /// Config with every transport on an ephemeral loopback port.
    pub fn loopback() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            bmp_port: Some(0),
            sflow_port: Some(0),
            netflow_port: Some(0),
            ..Default::default()
        }
    }

    pub fn bmp_address(&self) -> Option<SocketAddr> {
        self.bmp_port.map(|port| SocketAddr::new(self.bind_address, port))
    }

    pub fn sflow_address(&self) -> Option<SocketAddr> {
        self.sflow_port.map(|port| SocketAddr::new(self.bind_address, port))
    }

    pub fn netflow_address(&self) -> Option<SocketAddr> {
        self.netflow_port
            .map(|port| SocketAddr::new(self.bind_address, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CollectorConfig::default();
        assert_eq!(
            config.bmp_address(),
            Some("0.0.0.0:9000".parse().unwrap())
        );
        assert_eq!(config.sflow_address().map(|a| a.port()), Some(6343));
        assert_eq!(config.netflow_address().map(|a| a.port()), Some(2055));
        assert_eq!(config.sflow_mode, SflowMode::Lenient);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.max_templates_per_exporter, 4096);
    }

    #[test]
    fn test_disabled_transport() {
        let config = CollectorConfig {
            sflow_port: None,
            ..CollectorConfig::loopback()
        };
        assert_eq!(config.sflow_address(), None);
        assert_eq!(config.bmp_address(), Some("127.0.0.1:0".parse().unwrap()));
    }
}
