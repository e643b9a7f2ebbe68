//! The WebSocket client endpoint: lifecycle control, the frame reader
//! loop, and the concurrent frame writers.

use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::sync::{Condvar, Mutex};

use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::connection::state::ConnectionState;
use crate::error::{Error, Result};
use crate::listener::WebSocketListener;
use crate::net::{self, PendingSocket, ReadHalf, SocketHandle, WriteHalf};
use crate::protocol::{read_upgrade_response, write_upgrade_request, Frame, Opcode};
use crate::random::RandomSource;

const DEFAULT_WS_PORT: u16 = 80;
const DEFAULT_WSS_PORT: u16 = 443;

/// A single long-lived WebSocket client connection.
///
/// The thread that calls [`connect`](Self::connect) becomes the frame
/// reader and blocks for the connection's lifetime; any other thread
/// may call the `send_*` family or [`interrupt`](Self::interrupt).
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use url::Url;
/// use wsclient::{WebSocket, WebSocketListener, Result};
///
/// struct Printer;
/// impl WebSocketListener for Printer {
///     fn on_text(&self, message: String) -> Result<()> {
///         println!("{message}");
///         Ok(())
///     }
/// }
///
/// let ws = Arc::new(WebSocket::new(Printer));
/// let sender = Arc::clone(&ws);
/// std::thread::spawn(move || {
///     let _ = sender.send_text("hello");
/// });
/// let uri = Url::parse("ws://localhost:9001/echo").unwrap();
/// let err = ws.connect(&uri).unwrap_err();
/// eprintln!("session ended: {err}");
/// ```
pub struct WebSocket<L> {
    listener: L,
    random: RandomSource,
    config: Config,
    /// State lock: connection state, socket handle, write counter.
    shared: Mutex<Shared>,
    /// Broadcast for state changes and for the drain-to-zero condition.
    state_changed: Condvar,
    /// Write lock: owns the outbound stream and serializes whole-frame
    /// emission. Never held together with the state lock.
    writer: Mutex<Option<BufWriter<WriteHalf>>>,
}

#[derive(Debug)]
struct Shared {
    state: ConnectionState,
    socket: Option<SocketHandle>,
    /// Sends that have passed the state check but not yet completed.
    pending_writes: u32,
    /// Fully torn-down `connect` invocations.
    completed_sessions: u64,
}

impl<L: WebSocketListener> WebSocket<L> {
    /// Create an endpoint reporting into `listener`, with the default
    /// configuration.
    pub fn new(listener: L) -> Self {
        Self::with_config(listener, Config::default())
    }

    /// Create an endpoint with a custom configuration.
    pub fn with_config(listener: L, config: Config) -> Self {
        Self {
            listener,
            random: RandomSource::new(),
            config,
            shared: Mutex::new(Shared {
                state: ConnectionState::Disconnected,
                socket: None,
                pending_writes: 0,
                completed_sessions: 0,
            }),
            state_changed: Condvar::new(),
            writer: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.lock().unwrap().state
    }

    /// Connect to `uri` and run the connection on the calling thread.
    ///
    /// Blocks until the connection ends and always returns an error
    /// describing why it ended:
    ///
    /// - [`Error::Io`] — the socket failed or the server went away,
    /// - [`Error::WrongResponse`] — the server violated the protocol,
    /// - [`Error::Interrupted`] — [`interrupt`](Self::interrupt) was
    ///   honored,
    /// - [`Error::AlreadyConnected`] / [`Error::InvalidUri`] — the call
    ///   itself was invalid.
    ///
    /// On return the state is `Disconnected`, no writes are in flight,
    /// and the socket has been released.
    pub fn connect(&self, uri: &Url) -> Result<()> {
        if self.state() != ConnectionState::Disconnected {
            return Err(Error::AlreadyConnected);
        }
        let secure = match uri.scheme() {
            "ws" => false,
            "wss" => true,
            other => return Err(Error::InvalidUri(format!("unknown scheme `{other}`"))),
        };
        #[cfg(not(feature = "tls-rustls"))]
        if secure {
            return Err(Error::InvalidUri(
                "wss endpoints require the `tls-rustls` feature".into(),
            ));
        }
        let host = uri
            .host_str()
            .ok_or_else(|| Error::InvalidUri("missing host".into()))?
            .to_string();
        let port = uri.port().unwrap_or(if secure {
            DEFAULT_WSS_PORT
        } else {
            DEFAULT_WS_PORT
        });
        let addr = net::resolve(&host, port)?;

        // Claim the connection. The socket handle is published under
        // the state lock before the TCP connect is issued, so a
        // concurrent interrupt can close it.
        let pending = {
            let mut shared = self.shared.lock().unwrap();
            if shared.state != ConnectionState::Disconnected {
                return Err(Error::AlreadyConnected);
            }
            let (pending, handle) = PendingSocket::new(&addr)?;
            shared.socket = Some(handle);
            shared.state = ConnectionState::Connecting;
            self.state_changed.notify_all();
            pending
        };
        debug!(%host, port, secure, "connecting");

        let mut reader = match self.establish(pending, &addr, uri, &host, secure) {
            Ok(reader) => reader,
            Err(err) => {
                let err = self.rewrite_interrupted(err);
                self.teardown();
                return Err(err);
            }
        };

        {
            let mut shared = self.shared.lock().unwrap();
            if shared.state == ConnectionState::Disconnecting {
                // Interrupt landed after the handshake's last read; the
                // Disconnecting state must not be overwritten.
                drop(shared);
                self.teardown();
                return Err(Error::Interrupted);
            }
            shared.state = ConnectionState::Connected;
            self.state_changed.notify_all();
        }
        debug!("websocket established");

        let err = self.rewrite_interrupted(self.run(&mut reader));
        self.teardown();
        debug!(error = %err, "connection ended");
        Err(err)
    }

    /// TCP connect, optional TLS, and the opening handshake. On success
    /// the outbound stream is installed under the write lock and the
    /// inbound stream returned for the reader loop.
    fn establish(
        &self,
        pending: PendingSocket,
        addr: &SocketAddr,
        uri: &Url,
        host: &str,
        secure: bool,
    ) -> Result<BufReader<ReadHalf>> {
        let stream = pending.connect(addr)?;
        // A shutdown issued before the socket was connected is a no-op;
        // re-check for cancellation now that the connect has finished.
        if self.state() == ConnectionState::Disconnecting {
            return Err(Error::Io("connection cancelled".into()));
        }
        let (read_half, write_half) = open_stream(stream, host, secure)?;
        let mut reader = BufReader::new(read_half);
        let mut writer = BufWriter::new(write_half);

        let key = self.random.handshake_nonce();
        write_upgrade_request(&mut writer, uri, &key)?;
        read_upgrade_response(&mut reader, &key)?;

        *self.writer.lock().unwrap() = Some(writer);
        Ok(reader)
    }

    /// The reader loop. Decodes one frame per iteration and dispatches
    /// it; only returns when the stream or the listener fails.
    fn run(&self, reader: &mut BufReader<ReadHalf>) -> Error {
        if let Err(err) = self.listener.on_connected() {
            return err;
        }
        loop {
            let frame = match Frame::read_from(reader, self.config.max_inbound_payload) {
                Ok(frame) => frame,
                Err(err) => return err,
            };
            if let Err(err) = self.dispatch(frame) {
                return err;
            }
        }
    }

    fn dispatch(&self, frame: Frame) -> Result<()> {
        match frame.opcode {
            Opcode::Text => {
                let message = String::from_utf8_lossy(&frame.payload).into_owned();
                self.listener.on_text(message)
            }
            Opcode::Binary => self.listener.on_binary(frame.payload),
            Opcode::Close => self.listener.on_server_requested_close(frame.payload),
            Opcode::Pong => self.listener.on_pong(frame.payload),
            Opcode::Ping => {
                self.listener.on_ping(frame.payload.clone())?;
                self.send_pong(frame.payload)
            }
            Opcode::Other(_) => self.listener.on_unknown(frame.payload),
            // Already rejected during frame decoding.
            Opcode::Continuation => Err(Error::WrongResponse(
                "fragmented frames are not supported".into(),
            )),
        }
    }

    /// Send a UTF-8 text frame. Callable from any thread while
    /// connected; blocks until the frame is on the wire.
    pub fn send_text(&self, message: &str) -> Result<()> {
        self.send_frame(Frame::text(message))
    }

    /// Send a binary frame. Callable from any thread while connected.
    pub fn send_binary(&self, payload: Vec<u8>) -> Result<()> {
        self.send_frame(Frame::binary(payload))
    }

    /// Send a ping frame. Callable from any thread while connected.
    pub fn send_ping(&self, payload: Vec<u8>) -> Result<()> {
        self.send_frame(Frame::ping(payload))
    }

    /// Reply to a ping; reachable only from the reader loop.
    fn send_pong(&self, payload: Vec<u8>) -> Result<()> {
        self.send_frame(Frame::pong(payload))
    }

    fn send_frame(&self, frame: Frame) -> Result<()> {
        {
            let mut shared = self.shared.lock().unwrap();
            if !shared.state.can_send() {
                return Err(Error::NotConnected);
            }
            shared.pending_writes += 1;
        }

        let mask = self.random.frame_mask();
        let result = self
            .write_frame(frame, mask)
            .map_err(|err| self.rewrite_interrupted(err));

        let mut shared = self.shared.lock().unwrap();
        shared.pending_writes -= 1;
        self.state_changed.notify_all();
        result
    }

    fn write_frame(&self, frame: Frame, mask: Option<[u8; 4]>) -> Result<()> {
        let mut guard = self.writer.lock().unwrap();
        let writer = guard.as_mut().ok_or(Error::NotConnected)?;
        frame.write_to(writer, mask)?;
        writer.flush()?;
        Ok(())
    }

    /// Cancel the connection from any thread.
    ///
    /// Blocks while the endpoint is `Disconnected` and no session has
    /// completed yet (so an interrupt issued before `connect` begins
    /// waits for it instead of racing), closes the socket underneath
    /// the blocked connector or reader, and returns once the `connect`
    /// thread has fully unwound. After a completed session this is a
    /// no-op.
    pub fn interrupt(&self) {
        let mut shared = self.shared.lock().unwrap();
        if shared.state == ConnectionState::Disconnected && shared.completed_sessions > 0 {
            return;
        }
        while shared.state == ConnectionState::Disconnected {
            shared = self.state_changed.wait(shared).unwrap();
        }
        if matches!(
            shared.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            if let Some(socket) = shared.socket.as_ref() {
                socket.close();
            }
            shared.state = ConnectionState::Disconnecting;
            self.state_changed.notify_all();
        }
        while shared.state != ConnectionState::Disconnected {
            shared = self.state_changed.wait(shared).unwrap();
        }
    }

    /// Interruption wins over I/O: a socket-level failure observed
    /// while the state is `Disconnecting` is reported as `Interrupted`.
    /// Protocol violations are never rewritten.
    fn rewrite_interrupted(&self, err: Error) -> Error {
        if matches!(err, Error::Io(_) | Error::NotConnected) {
            let shared = self.shared.lock().unwrap();
            if shared.state == ConnectionState::Disconnecting {
                return Error::Interrupted;
            }
        }
        err
    }

    /// Drain in-flight writers to zero, then publish `Disconnected` and
    /// release the socket and outbound stream.
    fn teardown(&self) {
        {
            let mut shared = self.shared.lock().unwrap();
            while shared.pending_writes != 0 {
                shared = self.state_changed.wait(shared).unwrap();
            }
            shared.state = ConnectionState::Disconnected;
            shared.socket = None;
            shared.completed_sessions += 1;
            self.state_changed.notify_all();
        }
        *self.writer.lock().unwrap() = None;
    }
}

#[cfg(feature = "tls-rustls")]
fn open_stream(stream: TcpStream, host: &str, secure: bool) -> Result<(ReadHalf, WriteHalf)> {
    if secure {
        net::tls::split_tls(stream, host)
    } else {
        Ok(net::split_plain(stream)?)
    }
}

#[cfg(not(feature = "tls-rustls"))]
fn open_stream(stream: TcpStream, _host: &str, _secure: bool) -> Result<(ReadHalf, WriteHalf)> {
    Ok(net::split_plain(stream)?)
}
