//! TCP transport: deferred-connect sockets and stream splitting.
//!
//! The socket is created (and a shutdown handle published) before the
//! TCP connect is issued, so another thread can close the connection
//! out from underneath a blocked connect or read.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

#[cfg(feature = "tls-rustls")]
pub(crate) mod tls;

/// Readable view of an established stream, owned by the reader role.
pub(crate) type ReadHalf = Box<dyn Read + Send>;
/// Writable view of an established stream, owned by the writer role.
pub(crate) type WriteHalf = Box<dyn Write + Send>;

/// Resolve `host:port` to the first usable socket address.
pub(crate) fn resolve(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    (host, port).to_socket_addrs()?.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("could not resolve host `{host}`"),
        )
    })
}

/// A TCP socket that has been created but not yet connected.
#[derive(Debug)]
pub(crate) struct PendingSocket {
    inner: Socket,
}

impl PendingSocket {
    /// Create an unconnected socket for `addr`'s address family together
    /// with a handle that can shut it down from another thread.
    pub(crate) fn new(addr: &SocketAddr) -> std::io::Result<(Self, SocketHandle)> {
        let socket = Socket::new(Domain::for_address(*addr), Type::STREAM, Some(Protocol::TCP))?;
        let handle = SocketHandle {
            inner: socket.try_clone()?,
        };
        Ok((Self { inner: socket }, handle))
    }

    /// Perform the blocking TCP connect.
    pub(crate) fn connect(self, addr: &SocketAddr) -> std::io::Result<TcpStream> {
        self.inner.connect(&SockAddr::from(*addr))?;
        Ok(self.inner.into())
    }
}

/// Cloned handle to a live socket, used solely for cancellation.
#[derive(Debug)]
pub(crate) struct SocketHandle {
    inner: Socket,
}

impl SocketHandle {
    /// Best-effort, idempotent shutdown of both directions. Unblocks a
    /// reader or writer stuck in kernel I/O on the same socket.
    pub(crate) fn close(&self) {
        let _ = self.inner.shutdown(Shutdown::Both);
    }
}

/// Split a plaintext stream into independently usable halves.
pub(crate) fn split_plain(stream: TcpStream) -> std::io::Result<(ReadHalf, WriteHalf)> {
    let reader = stream.try_clone()?;
    Ok((Box::new(reader), Box::new(stream)))
}
