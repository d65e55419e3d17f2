use std::io::Write;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use bgpkit_collector::models::FlowSet;
use bgpkit_collector::parser::SflowMode;
use bgpkit_collector::{
    CollectedPacket, CollectorConfig, Controller, ListenerError, PacketContext, PacketListener,
};
use clap::Parser;
use log::info;

/// bgpkit-collector receives BMP, sFlow and NetFlow v9 telemetry and prints every decoded packet.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Opts {
    /// Address all listeners bind to
    #[clap(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// BMP TCP port
    #[clap(long, default_value_t = bgpkit_collector::config::DEFAULT_BMP_PORT)]
    bmp_port: u16,

    /// Disable the BMP listener
    #[clap(long)]
    no_bmp: bool,

    /// sFlow UDP port
    #[clap(long, default_value_t = bgpkit_collector::config::DEFAULT_SFLOW_PORT)]
    sflow_port: u16,

    /// Disable the sFlow listener
    #[clap(long)]
    no_sflow: bool,

    /// NetFlow v9 UDP port
    #[clap(long, default_value_t = bgpkit_collector::config::DEFAULT_NETFLOW_PORT)]
    netflow_port: u16,

    /// Disable the NetFlow listener
    #[clap(long)]
    no_netflow: bool,

    /// Runtime worker threads
    #[clap(short, long)]
    workers: Option<usize>,

    /// Reject sFlow datagrams that end with a partial sample
    #[clap(long)]
    strict_sflow: bool,

    /// Output as JSON objects
    #[clap(long)]
    json: bool,
}

impl Opts {
    fn config(&self) -> CollectorConfig {
        let defaults = CollectorConfig::default();
        CollectorConfig {
            bind_address: self.bind,
            bmp_port: (!self.no_bmp).then_some(self.bmp_port),
            sflow_port: (!self.no_sflow).then_some(self.sflow_port),
            netflow_port: (!self.no_netflow).then_some(self.netflow_port),
            worker_threads: self.workers.unwrap_or(defaults.worker_threads),
            sflow_mode: match self.strict_sflow {
                true => SflowMode::Strict,
                false => SflowMode::Lenient,
            },
            ..defaults
        }
    }
}

/// Writes one line per packet to stdout.
struct Printer {
    json: bool,
    stdout: Mutex<std::io::Stdout>,
}

impl PacketListener for Printer {
    fn name(&self) -> &str {
        "stdout"
    }

    fn process_packet(
        &self,
        context: &PacketContext,
        packet: &CollectedPacket,
    ) -> Result<(), ListenerError> {
        let line = if self.json {
            serde_json::json!({ "context": context, "packet": packet }).to_string()
        } else {
            format!("{}|{}|{}", context.transport, context.peer, summary(packet))
        };
        let mut stdout = self.stdout.lock().map_err(|_| "stdout lock poisoned")?;
        writeln!(stdout, "{}", line)?;
        Ok(())
    }
}

fn summary(packet: &CollectedPacket) -> String {
    match packet {
        CollectedPacket::Bmp(p) => match p.per_peer_header() {
            Some(peer) => format!(
                "{:?}|{}|{}",
                p.msg_type, peer.peer_ip, peer.peer_asn
            ),
            None => format!("{:?}", p.msg_type),
        },
        CollectedPacket::Sflow(p) => format!(
            "agent {}|seq {}|{} samples",
            p.agent_address,
            p.sequence_number,
            p.samples.len()
        ),
        CollectedPacket::Netflow(p) => {
            let records: usize = p
                .flowsets
                .iter()
                .map(|set| match set {
                    FlowSet::Data { records, .. } => records.len(),
                    _ => 0,
                })
                .sum();
            format!(
                "source {}|seq {}|{} flowsets|{} data records",
                p.header.source_id,
                p.header.sequence_number,
                p.flowsets.len(),
                records
            )
        }
    }
}

fn main() {
    let opts: Opts = Opts::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = opts.config();
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads.max(1))
        .enable_all()
        .build()
    {
        Ok(r) => r,
        Err(e) => {
            eprintln!("failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    runtime.block_on(async move {
        let controller = Controller::new(config);
        controller.register_listener(Arc::new(Printer {
            json: opts.json,
            stdout: Mutex::new(std::io::stdout()),
        }));

        if let Err(e) = controller.start_listener().await {
            eprintln!("{}", e);
            std::process::exit(1);
        }

        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to wait for ctrl-c: {}", e);
        }
        controller.close_listener().await;
        info!("final counters: {:?}", controller.stats());
    });
}
