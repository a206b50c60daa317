//! Connection manager
//!
//! Owns the push channel on a dedicated thread: dials the server, performs
//! the Socket.IO handshake, answers pings, forwards decoded server events to
//! the app loop and writes queued client events. Any failure drops the
//! socket and redials after a fixed delay, forever, until shut down.

use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};
use url::Url;

use super::protocol::{self, ClientEvent, Packet, ServerEvent};
use crate::event::AppEvent;
use crate::models::ConnectionStatus;

/// How long a read may block before queued outbound events get a turn
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default delay between reconnection attempts
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Default bound on dialing, the TLS and WebSocket handshakes, and the wait
/// for the Engine.IO open packet
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Events surfaced by the connection manager
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Status(ConnectionStatus),
    Server(ServerEvent),
}

/// Errors ending a channel session
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Invalid server URL '{0}'")]
    InvalidUrl(String),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("Server refused connection: {0}")]
    Refused(String),
    #[error("Event loop closed")]
    Closed,
}

/// Build the Socket.IO WebSocket endpoint from the server's HTTP URL
pub fn socket_url(server_url: &str) -> Result<Url, ConnectionError> {
    let mut url =
        Url::parse(server_url).map_err(|_| ConnectionError::InvalidUrl(server_url.to_string()))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(ConnectionError::InvalidUrl(server_url.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|_| ConnectionError::InvalidUrl(server_url.to_string()))?;

    let base = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{}/socket.io/", base));
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

// =============================================================================
// Outbox
// =============================================================================

/// Cloneable handle for emitting client events on the channel
///
/// Events sent while disconnected are held and written after the next
/// successful connect.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: Sender<ClientEvent>,
}

impl Outbox {
    /// Create an outbox and the receiving end drained by the channel thread
    pub fn channel() -> (Self, Receiver<ClientEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: ClientEvent) -> Result<(), ConnectionError> {
        self.tx.send(event).map_err(|_| ConnectionError::Closed)
    }
}

// =============================================================================
// Connection
// =============================================================================

/// Channel settings
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub server_url: String,
    pub reconnect_delay: Duration,
    pub handshake_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

/// Running connection manager
pub struct Connection {
    outbox: Outbox,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Connection {
    /// Start the channel thread. Status and server events are delivered to
    /// `events` in arrival order.
    pub fn spawn(
        config: ConnectionConfig,
        events: UnboundedSender<AppEvent>,
    ) -> Result<Self, ConnectionError> {
        // Fail fast on a URL that can never work
        socket_url(&config.server_url)?;

        let (outbox, outbound) = Outbox::channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();

        let handle = std::thread::Builder::new()
            .name("channel".into())
            .spawn(move || run(config, outbound, events, flag))?;

        Ok(Self {
            outbox,
            shutdown,
            handle: Some(handle),
        })
    }

    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    /// Stop the channel thread and wait for it to close the socket
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    config: ConnectionConfig,
    outbound: Receiver<ClientEvent>,
    events: UnboundedSender<AppEvent>,
    shutdown: Arc<AtomicBool>,
) {
    let emit = |status: ConnectionStatus| {
        events
            .send(AppEvent::Channel(ChannelEvent::Status(status)))
            .is_ok()
    };

    while !shutdown.load(Ordering::SeqCst) {
        if !emit(ConnectionStatus::Connecting) {
            return;
        }

        let status = match session(&config, &outbound, &events, &shutdown) {
            Ok(()) => ConnectionStatus::Disconnected,
            Err(ConnectionError::Closed) => return,
            Err(e) => {
                log::warn!("Channel session ended: {}", e);
                ConnectionStatus::Error(e.to_string())
            }
        };

        if shutdown.load(Ordering::SeqCst) || !emit(status) {
            return;
        }

        log::info!(
            "Reconnecting to {} in {:?}",
            config.server_url,
            config.reconnect_delay
        );
        sleep_unless_shutdown(config.reconnect_delay, &shutdown);
    }
}

fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) {
    let mut waited = Duration::ZERO;
    while waited < total && !shutdown.load(Ordering::SeqCst) {
        std::thread::sleep(POLL_INTERVAL);
        waited += POLL_INTERVAL;
    }
}

/// Open the TCP connection, then the TLS and WebSocket handshakes. Each step
/// gives up at `timeout`; `None` means shutdown was requested meanwhile.
fn dial(url: &Url, timeout: Duration, shutdown: &AtomicBool) -> Result<Option<Socket>, ConnectionError> {
    let deadline = Instant::now() + timeout;
    let host = url
        .host_str()
        .ok_or_else(|| ConnectionError::InvalidUrl(url.to_string()))?;

    let mut last_error = None;
    let mut tcp = None;
    for addr in url.socket_addrs(|| None)? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                tcp = Some(stream);
                break;
            }
            Err(e) => last_error = Some(e),
        }
    }
    let tcp = match (tcp, last_error) {
        (Some(tcp), _) => tcp,
        (None, Some(e)) => return Err(e.into()),
        (None, None) => return Err(ConnectionError::InvalidUrl(url.to_string())),
    };

    // Reads wake up every poll interval so handshakes can watch the clock
    tcp.set_read_timeout(Some(POLL_INTERVAL))?;
    tcp.set_write_timeout(Some(timeout))?;
    tcp.set_nodelay(true)?;

    let stream = if url.scheme() == "wss" {
        let connector = native_tls::TlsConnector::new()?;
        let mut attempt = connector.connect(host, tcp);
        loop {
            match attempt {
                Ok(tls) => break MaybeTlsStream::NativeTls(tls),
                Err(native_tls::HandshakeError::WouldBlock(mid)) => {
                    if stop_waiting(deadline, shutdown, "TLS handshake")? {
                        return Ok(None);
                    }
                    attempt = mid.handshake();
                }
                Err(native_tls::HandshakeError::Failure(e)) => return Err(e.into()),
            }
        }
    } else {
        MaybeTlsStream::Plain(tcp)
    };

    let mut attempt = tungstenite::client::client(url.as_str(), stream);
    loop {
        match attempt {
            Ok((socket, _response)) => return Ok(Some(socket)),
            Err(tungstenite::HandshakeError::Interrupted(mid)) => {
                if stop_waiting(deadline, shutdown, "WebSocket handshake")? {
                    return Ok(None);
                }
                attempt = mid.handshake();
            }
            Err(tungstenite::HandshakeError::Failure(e)) => return Err(e.into()),
        }
    }
}

/// `Ok(true)` on shutdown, an error past the deadline
fn stop_waiting(deadline: Instant, shutdown: &AtomicBool, step: &'static str) -> Result<bool, ConnectionError> {
    if shutdown.load(Ordering::SeqCst) {
        return Ok(true);
    }
    if Instant::now() >= deadline {
        return Err(ConnectionError::Timeout(step));
    }
    Ok(false)
}

/// Silence allowed before the session is considered dead. Until the open
/// packet arrives the handshake timeout applies.
fn liveness_limit(handshake: &protocol::Handshake, fallback: Duration) -> Duration {
    match handshake.ping_interval + handshake.ping_timeout {
        0 => fallback,
        ms => Duration::from_millis(ms),
    }
}

/// One connected session; returns `Ok` when the server closes the channel
fn session(
    config: &ConnectionConfig,
    outbound: &Receiver<ClientEvent>,
    events: &UnboundedSender<AppEvent>,
    shutdown: &AtomicBool,
) -> Result<(), ConnectionError> {
    let url = socket_url(&config.server_url)?;
    log::info!("Dialing {}", url);

    let Some(mut socket) = dial(&url, config.handshake_timeout, shutdown)? else {
        return Ok(());
    };

    let mut connected = false;
    let mut silence_limit = config.handshake_timeout;
    let mut last_frame = Instant::now();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            let _ = socket.close(None);
            return Ok(());
        }

        if connected {
            flush_outbound(&mut socket, outbound)?;
        }

        let message = match socket.read() {
            Ok(message) => message,
            Err(tungstenite::Error::Io(ref e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                if last_frame.elapsed() > silence_limit {
                    return Err(ConnectionError::Timeout("server traffic"));
                }
                continue;
            }
            Err(tungstenite::Error::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        last_frame = Instant::now();

        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => return Ok(()),
            _ => continue,
        };

        let packet = match protocol::decode(text.as_str()) {
            Ok(packet) => packet,
            Err(e) => {
                log::warn!("Dropping undecodable frame: {}", e);
                continue;
            }
        };

        match packet {
            Packet::Open(handshake) => {
                log::debug!("Engine.IO open, sid {}", handshake.sid);
                silence_limit = liveness_limit(&handshake, config.handshake_timeout);
                socket.send(Message::Text(protocol::CONNECT.to_string().into()))?;
            }
            Packet::Ping => socket.send(Message::Text(protocol::PONG.to_string().into()))?,
            Packet::Connect => {
                connected = true;
                log::info!("Connected to {}", config.server_url);
                deliver(events, ChannelEvent::Status(ConnectionStatus::Connected))?;
                socket.send(Message::Text(ClientEvent::RequestLanguages.encode().into()))?;
            }
            Packet::Event { name, payload } => match ServerEvent::from_event(&name, payload) {
                Ok(Some(event)) => deliver(events, ChannelEvent::Server(event))?,
                Ok(None) => log::debug!("Ignoring event '{}'", name),
                Err(e) => log::warn!("Malformed '{}' payload: {}", name, e),
            },
            Packet::ConnectError(message) => return Err(ConnectionError::Refused(message)),
            Packet::Disconnect | Packet::Close => return Ok(()),
            Packet::Pong | Packet::Noop => {}
        }
    }
}

fn deliver(events: &UnboundedSender<AppEvent>, event: ChannelEvent) -> Result<(), ConnectionError> {
    events
        .send(AppEvent::Channel(event))
        .map_err(|_| ConnectionError::Closed)
}

fn flush_outbound(socket: &mut Socket, outbound: &Receiver<ClientEvent>) -> Result<(), ConnectionError> {
    loop {
        match outbound.try_recv() {
            Ok(event) => {
                log::debug!("Emitting '{}'", event.name());
                socket.send(Message::Text(event.encode().into()))?;
            }
            Err(TryRecvError::Empty) => return Ok(()),
            Err(TryRecvError::Disconnected) => return Err(ConnectionError::Closed),
        }
    }
}
