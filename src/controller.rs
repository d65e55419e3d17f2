/*!
Owns the listening sockets and routes decoded packets to the registered listeners.

```text
TCP accept loop ──spawn──> BmpSession (one task per connection) ─┐
UDP receive tasks (sFlow, NetFlow) ──────────────────────────────┴─> Controller::process_packet
                                                                          └─> every PacketListener
```

The [Controller] is a cheap handle; clones share the same sockets, listeners and counters.
*/
use crate::config::CollectorConfig;
use crate::listener::{CollectedPacket, PacketContext, PacketListener, Transport};
use crate::parser::{parse_netflow_packet, parse_sflow_packet, TemplateCache};
use crate::session::BmpSession;
use arc_swap::ArcSwap;
use bytes::Bytes;
use log::{debug, error, info, warn};
use std::fmt::Display;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Controller errors
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// Failed to bind a listening socket
    #[error("failed to bind {transport} listener to {address}: {source}")]
    Bind {
        transport: Transport,
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Point-in-time copy of the controller counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollectorStats {
    pub sessions_opened: u64,
    pub sessions_active: u64,
    /// Connections closed on accept because `max_connections` sessions were active.
    pub sessions_rejected: u64,
    pub packets_dispatched: u64,
    /// BMP frames that failed to decode.
    pub frames_dropped: u64,
    pub datagrams_received: u64,
    /// Datagrams that failed to decode.
    pub datagrams_dropped: u64,
    pub listener_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    sessions_opened: AtomicU64,
    sessions_active: AtomicU64,
    sessions_rejected: AtomicU64,
    packets_dispatched: AtomicU64,
    frames_dropped: AtomicU64,
    datagrams_received: AtomicU64,
    datagrams_dropped: AtomicU64,
    listener_failures: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> CollectorStats {
        CollectorStats {
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            sessions_active: self.sessions_active.load(Ordering::Relaxed),
            sessions_rejected: self.sessions_rejected.load(Ordering::Relaxed),
            packets_dispatched: self.packets_dispatched.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            datagrams_dropped: self.datagrams_dropped.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
        }
    }
}

/// Sockets and tasks of a started controller.
struct Running {
    cancel: CancellationToken,
    tasks: JoinSet<()>,
    local_addrs: Vec<(Transport, SocketAddr)>,
}

struct Inner {
    config: CollectorConfig,
    listeners: ArcSwap<Vec<Arc<dyn PacketListener>>>,
    templates: TemplateCache,
    counters: Counters,
    running: Mutex<Option<Running>>,
}

#[derive(Clone)]
pub struct Controller {
    inner: Arc<Inner>,
}

impl Controller {
    pub fn new(config: CollectorConfig) -> Self {
        let templates = TemplateCache::with_limit(config.max_templates_per_exporter);
        Controller {
            inner: Arc::new(Inner {
                config,
                listeners: ArcSwap::from_pointee(vec![]),
                templates,
                counters: Counters::default(),
                running: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.inner.config
    }

    /// NetFlow templates learned so far.
    pub fn templates(&self) -> &TemplateCache {
        &self.inner.templates
    }

    pub fn stats(&self) -> CollectorStats {
        self.inner.counters.snapshot()
    }

    /// Add a listener. Packets already being dispatched may not reach it.
    pub fn register_listener(&self, listener: Arc<dyn PacketListener>) {
        info!("registering listener {}", listener.name());
        self.inner.listeners.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&listener));
            next
        });
    }

    /// Remove every listener called `name`. Returns whether one was found.
    pub fn unregister_listener(&self, name: &str) -> bool {
        let previous = self.inner.listeners.rcu(|current| {
            current
                .iter()
                .filter(|l| l.name() != name)
                .cloned()
                .collect::<Vec<_>>()
        });
        previous.iter().any(|l| l.name() == name)
    }

    pub async fn is_running(&self) -> bool {
        self.inner.running.lock().await.is_some()
    }

    /// Addresses the started listeners are bound to, empty when not running.
    pub async fn local_addrs(&self) -> Vec<(Transport, SocketAddr)> {
        match &*self.inner.running.lock().await {
            Some(running) => running.local_addrs.clone(),
            None => vec![],
        }
    }

    pub async fn local_addr(&self, transport: Transport) -> Option<SocketAddr> {
        self.local_addrs()
            .await
            .into_iter()
            .find(|(t, _)| *t == transport)
            .map(|(_, addr)| addr)
    }

    /// Bind every enabled transport and start accepting connections and datagrams.
    ///
    /// Calling this while already running does nothing. If any socket fails to bind, the
    /// ones bound before it are released and nothing is started.
    pub async fn start_listener(&self) -> Result<(), CollectorError> {
        let mut running = self.inner.running.lock().await;
        if running.is_some() {
            info!("collector already running");
            return Ok(());
        }
        let config = &self.inner.config;

        let bmp = match config.bmp_address() {
            Some(address) => Some(TcpListener::bind(address).await.map_err(|source| {
                CollectorError::Bind {
                    transport: Transport::Bmp,
                    address,
                    source,
                }
            })?),
            None => None,
        };
        let sflow = bind_udp(Transport::Sflow, config.sflow_address()).await?;
        let netflow = bind_udp(Transport::Netflow, config.netflow_address()).await?;

        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();
        let mut local_addrs = vec![];

        if let Some(listener) = bmp {
            let address = listener.local_addr()?;
            info!("BMP listening on {}", address);
            local_addrs.push((Transport::Bmp, address));
            tasks.spawn(self.clone().accept_loop(listener, cancel.clone()));
        }
        for (transport, socket) in [(Transport::Sflow, sflow), (Transport::Netflow, netflow)] {
            let Some(socket) = socket else { continue };
            let address = socket.local_addr()?;
            info!("{} listening on {}", transport, address);
            local_addrs.push((transport, address));
            let socket = Arc::new(socket);
            for _ in 0..config.udp_workers.max(1) {
                tasks.spawn(self.clone().receive_loop(
                    transport,
                    Arc::clone(&socket),
                    cancel.clone(),
                ));
            }
        }

        *running = Some(Running {
            cancel,
            tasks,
            local_addrs,
        });
        Ok(())
    }

    /// Stop accepting, close every session and release the sockets.
    ///
    /// Sessions get `shutdown_timeout` to finish the message they are dispatching; whatever
    /// is still running after that is aborted. Does nothing when not running.
    pub async fn close_listener(&self) {
        let Some(mut running) = self.inner.running.lock().await.take() else {
            debug!("collector not running");
            return;
        };
        info!("stopping collector");
        running.cancel.cancel();

        // the accept loop spends up to shutdown_timeout draining its sessions
        let grace = self.inner.config.shutdown_timeout * 2;
        let drain = async { while running.tasks.join_next().await.is_some() {} };
        if tokio::time::timeout(grace, drain).await.is_err() {
            warn!("collector tasks still running after {:?}, aborting", grace);
            running.tasks.shutdown().await;
        }
        info!("collector stopped");
    }

    /// Hand a packet to every registered listener.
    ///
    /// Listener errors and panics are counted and logged; they never reach the caller and do
    /// not keep later listeners from seeing the packet.
    pub fn process_packet(&self, context: &PacketContext, packet: &CollectedPacket) {
        let counters = &self.inner.counters;
        counters.packets_dispatched.fetch_add(1, Ordering::Relaxed);

        let listeners = self.inner.listeners.load();
        for listener in listeners.iter() {
            let result =
                panic::catch_unwind(AssertUnwindSafe(|| listener.process_packet(context, packet)));
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    counters.listener_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "{}: listener {} failed on {} packet: {}",
                        context.peer,
                        listener.name(),
                        context.transport,
                        e
                    );
                }
                Err(_) => {
                    counters.listener_failures.fetch_add(1, Ordering::Relaxed);
                    error!(
                        "{}: listener {} panicked on {} packet",
                        context.peer,
                        listener.name(),
                        context.transport
                    );
                }
            }
        }
    }

    /// Decode one datagram and dispatch it. Undecodable datagrams are logged and dropped.
    pub fn process_datagram(&self, transport: Transport, peer: SocketAddr, mut data: Bytes) {
        let counters = &self.inner.counters;
        counters.datagrams_received.fetch_add(1, Ordering::Relaxed);

        let packet = match transport {
            Transport::Sflow => {
                match parse_sflow_packet(&mut data, self.inner.config.sflow_mode) {
                    Ok(packet) => CollectedPacket::Sflow(packet),
                    Err(e) => return self.drop_datagram(transport, peer, e),
                }
            }
            Transport::Netflow => {
                match parse_netflow_packet(&mut data, peer.ip(), &self.inner.templates) {
                    Ok(packet) => CollectedPacket::Netflow(packet),
                    Err(e) => return self.drop_datagram(transport, peer, e),
                }
            }
            Transport::Bmp => {
                return self.drop_datagram(transport, peer, "BMP is not carried over UDP")
            }
        };
        self.process_packet(&PacketContext { peer, transport }, &packet);
    }

    pub(crate) fn record_frames_dropped(&self, n: u64) {
        self.inner
            .counters
            .frames_dropped
            .fetch_add(n, Ordering::Relaxed);
    }

    fn drop_datagram(&self, transport: Transport, peer: SocketAddr, e: impl Display) {
        self.inner
            .counters
            .datagrams_dropped
            .fetch_add(1, Ordering::Relaxed);
        warn!("{}: dropping {} datagram: {}", peer, transport, e);
    }

    async fn accept_loop(self, listener: TcpListener, cancel: CancellationToken) {
        let limit = Arc::new(Semaphore::new(self.inner.config.max_connections));
        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                Some(result) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = result {
                        error!("BMP session task failed: {}", e);
                    }
                }
                result = listener.accept() => {
                    let (stream, peer) = match result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!("BMP accept failed: {}", e);
                            continue;
                        }
                    };
                    let Ok(permit) = Arc::clone(&limit).try_acquire_owned() else {
                        self.inner.counters.sessions_rejected.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            "{}: refusing BMP connection, {} sessions active",
                            peer, self.inner.config.max_connections
                        );
                        continue;
                    };
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("{}: failed to set TCP_NODELAY: {}", peer, e);
                    }

                    let counters = &self.inner.counters;
                    counters.sessions_opened.fetch_add(1, Ordering::Relaxed);
                    counters.sessions_active.fetch_add(1, Ordering::Relaxed);

                    let controller = self.clone();
                    let cancel = cancel.clone();
                    sessions.spawn(async move {
                        let _permit = permit;
                        let mut session = BmpSession::new(peer);
                        session.run(stream, &controller, cancel).await;
                        controller
                            .inner
                            .counters
                            .sessions_active
                            .fetch_sub(1, Ordering::Relaxed);
                    });
                }
            }
        }
        drop(listener);

        let open = sessions.len();
        if open > 0 {
            debug!("waiting for {} BMP sessions to close", open);
        }
        let timeout = self.inner.config.shutdown_timeout;
        let drain = async { while sessions.join_next().await.is_some() {} };
        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!(
                "{} BMP sessions still open after {:?}, aborting",
                sessions.len(),
                timeout
            );
            sessions.shutdown().await;
            // aborted sessions never reach their own decrement
            self.inner.counters.sessions_active.store(0, Ordering::Relaxed);
        }
    }

    async fn receive_loop(
        self,
        transport: Transport,
        socket: Arc<UdpSocket>,
        cancel: CancellationToken,
    ) {
        let mut buf = vec![0u8; self.inner.config.udp_buffer_size];
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = socket.recv_from(&mut buf) => match result {
                    Ok((len, peer)) => {
                        self.process_datagram(transport, peer, Bytes::copy_from_slice(&buf[..len]));
                    }
                    Err(e) => warn!("{} receive failed: {}", transport, e),
                }
            }
        }
    }
}

async fn bind_udp(
    transport: Transport,
    address: Option<SocketAddr>,
) -> Result<Option<UdpSocket>, CollectorError> {
    let Some(address) = address else {
        return Ok(None);
    };
    let socket = UdpSocket::bind(address)
        .await
        .map_err(|source| CollectorError::Bind {
            transport,
            address,
            source,
        })?;
    Ok(Some(socket))
}
