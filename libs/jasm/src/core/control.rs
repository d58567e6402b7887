//! UDP control listener.
//!
//! Binds a datagram socket and drains whatever arrives on it, typically
//! OSC traffic from a show controller. Datagrams are logged and discarded
//! without being parsed; the socket exists so remote senders get a live
//! endpoint instead of ICMP errors while the graph runs.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::Duration;

use crate::core::error::JasmError;

/// Conventional control port.
pub const DEFAULT_CONTROL_PORT: u16 = 19999;

const READ_TIMEOUT: Duration = Duration::from_millis(100);
const MAX_DATAGRAM: usize = 1500;

pub struct ControlListener {
    local_addr: SocketAddr,
    shutdown_tx: crossbeam_channel::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ControlListener {
    /// Bind on all interfaces and start draining. Port 0 picks an
    /// ephemeral port, useful in tests.
    pub fn bind(port: u16) -> Result<Self, JasmError> {
        let socket = UdpSocket::bind(("0.0.0.0", port))?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        let local_addr = socket.local_addr()?;
        tracing::info!("control listener on udp/{}", local_addr.port());

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let thread = thread::Builder::new()
            .name(format!("control-udp-{}", local_addr.port()))
            .spawn(move || {
                let mut buf = [0u8; MAX_DATAGRAM];
                loop {
                    if shutdown_rx.try_recv().is_ok() {
                        break;
                    }
                    match socket.recv_from(&mut buf) {
                        Ok((len, peer)) => {
                            tracing::debug!("control: {} bytes from {}", len, peer);
                        }
                        Err(e)
                            if e.kind() == ErrorKind::WouldBlock
                                || e.kind() == ErrorKind::TimedOut => {}
                        Err(e) => {
                            tracing::warn!("control socket error: {}", e);
                        }
                    }
                }
                tracing::debug!("control listener stopped");
            })?;

        Ok(Self {
            local_addr,
            shutdown_tx,
            thread: Some(thread),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop the listener thread. Idempotent.
    pub fn shutdown(&mut self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::error!("control listener thread panicked");
            }
        }
    }
}

impl Drop for ControlListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_ephemeral_and_shutdown() {
        let mut listener = ControlListener::bind(0).unwrap();
        assert_ne!(listener.local_addr().port(), 0);
        listener.shutdown();
        // Second shutdown must be a no-op.
        listener.shutdown();
    }

    #[test]
    fn test_datagrams_are_drained() {
        let listener = ControlListener::bind(0).unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let target = SocketAddr::from(([127, 0, 0, 1], listener.local_addr().port()));
        sender.send_to(b"/jasm/ping", target).unwrap();
        // Give the listener a moment; the datagram is discarded, so the
        // only observable effect is that nothing blocks or panics.
        thread::sleep(Duration::from_millis(150));
    }

    #[test]
    fn test_two_listeners_on_distinct_ports() {
        let a = ControlListener::bind(0).unwrap();
        let b = ControlListener::bind(0).unwrap();
        assert_ne!(a.local_addr().port(), b.local_addr().port());
    }
}
