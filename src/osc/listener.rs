//! OSC listener — UDP socket on a dedicated thread, forwarding control
//! messages to the control loop. Also the feedback sender.

use std::io;
use std::net::{ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rosc::{decoder, encoder};

use super::config::OscConfig;
use super::mapping::{feedback_packet, packet_messages};
use super::OscError;
use crate::control::ControlSender;

/// Active OSC listener running on a background thread.
pub struct OscListener {
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    port: u16,
}

impl OscListener {
    /// Start listening for OSC messages on a UDP port.
    pub fn start(config: &OscConfig, sender: ControlSender) -> io::Result<Self> {
        let socket = UdpSocket::bind(("127.0.0.1", config.listen_port))?;
        // short timeout so the stop flag is checked periodically
        socket.set_read_timeout(Some(Duration::from_millis(100)))?;

        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();
        let port = socket.local_addr()?.port();

        let thread = thread::spawn(move || {
            let mut buf = [0u8; 4096];
            while !stop_clone.load(Ordering::Relaxed) {
                match socket.recv_from(&mut buf) {
                    Ok((size, addr)) => match decoder::decode_udp(&buf[..size]) {
                        Ok((_, packet)) => {
                            for message in packet_messages(&packet) {
                                if sender.send(message).is_err() {
                                    // control loop is gone
                                    return;
                                }
                            }
                        }
                        Err(e) => log::debug!("undecodable OSC packet from {addr}: {e:?}"),
                    },
                    Err(ref e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                        ) =>
                    {
                        continue;
                    }
                    Err(e) => {
                        log::warn!("OSC listener stopped: {e}");
                        break;
                    }
                }
            }
        });

        log::info!("listening for OSC on 127.0.0.1:{port}");
        Ok(Self {
            stop_flag,
            thread: Some(thread),
            port,
        })
    }

    /// Get the listening port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Signal the listener to stop and wait for its thread.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for OscListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sends control values back to a controller so its widgets follow local
/// changes.
pub struct OscFeedback {
    socket: UdpSocket,
    target: std::net::SocketAddr,
}

impl OscFeedback {
    pub fn connect(target: &str) -> Result<Self, OscError> {
        let target = target
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| OscError::Address(target.to_string()))?;
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        Ok(Self { socket, target })
    }

    /// Send one bundle with every value.
    pub fn send<'a>(
        &self,
        values: impl IntoIterator<Item = (&'a str, f32)>,
    ) -> Result<usize, OscError> {
        let bytes = encoder::encode(&feedback_packet(values)).map_err(OscError::Encode)?;
        Ok(self.socket.send_to(&bytes, self.target)?)
    }
}
