//! Blocking TLS transport for `wss://` endpoints.
//!
//! One rustls client session is shared between the read half and the
//! write half behind a session mutex; each half owns its own clone of
//! the TCP stream. The mutex guards only in-memory session operations,
//! so a reader blocked in a kernel `read` never stalls concurrent
//! writers. Cancellation still works by shutting down the underlying
//! TCP socket.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, LazyLock, Mutex};

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore};

use crate::error::{Error, Result};
use crate::net::{ReadHalf, WriteHalf};

static CLIENT_CONFIG: LazyLock<Arc<ClientConfig>> = LazyLock::new(|| {
    let mut store = RootCertStore::empty();
    store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder()
        .with_root_certificates(store)
        .with_no_client_auth();

    Arc::new(config)
});

/// Establish a TLS session over `stream` for `host` and split it into
/// independently usable halves.
///
/// The TLS handshake completes on the calling thread before the halves
/// are returned.
pub(crate) fn split_tls(stream: TcpStream, host: &str) -> Result<(ReadHalf, WriteHalf)> {
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| Error::InvalidUri(format!("invalid dns name `{host}`")))?;
    let mut session = ClientConnection::new(CLIENT_CONFIG.clone(), server_name)
        .map_err(|err| Error::Io(err.to_string()))?;

    while session.is_handshaking() {
        session.complete_io(&mut &stream)?;
    }

    let session = Arc::new(Mutex::new(session));
    let read_stream = stream.try_clone()?;
    let reader = TlsReadHalf {
        session: Arc::clone(&session),
        stream: read_stream,
        pending: Vec::new(),
    };
    let writer = TlsWriteHalf { session, stream };
    Ok((Box::new(reader), Box::new(writer)))
}

/// Flush any TLS records the session wants to emit.
fn send_pending(session: &mut ClientConnection, stream: &TcpStream) -> std::io::Result<()> {
    while session.wants_write() {
        session.write_tls(&mut &*stream)?;
    }
    Ok(())
}

struct TlsReadHalf {
    session: Arc<Mutex<ClientConnection>>,
    stream: TcpStream,
    /// Ciphertext received from the socket but not yet accepted by the
    /// session's deframer.
    pending: Vec<u8>,
}

impl Read for TlsReadHalf {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            {
                let mut session = self.session.lock().unwrap();
                match session.reader().read(buf) {
                    Ok(n) => return Ok(n),
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {}
                    Err(err) => return Err(err),
                }

                if !self.pending.is_empty() {
                    let mut slice: &[u8] = &self.pending;
                    let accepted = session.read_tls(&mut slice)?;
                    let consumed = self.pending.len() - slice.len();
                    self.pending.drain(..consumed);
                    session
                        .process_new_packets()
                        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
                    send_pending(&mut session, &self.stream)?;
                    if accepted > 0 {
                        continue;
                    }
                }
            }

            // No plaintext and nothing buffered: block on the socket
            // without holding the session lock.
            let mut chunk = [0u8; 4096];
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                return Ok(0);
            }
            self.pending.extend_from_slice(&chunk[..n]);
        }
    }
}

struct TlsWriteHalf {
    session: Arc<Mutex<ClientConnection>>,
    stream: TcpStream,
}

impl Write for TlsWriteHalf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut session = self.session.lock().unwrap();
        let n = session.writer().write(buf)?;
        send_pending(&mut session, &self.stream)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut session = self.session.lock().unwrap();
        send_pending(&mut session, &self.stream)?;
        drop(session);
        (&self.stream).flush()
    }
}
