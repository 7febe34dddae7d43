//----------------------------------------------------------------------------------------------
// Module transport
// UDP/TCP framing adapter (C6): binds a socket, decodes incoming command frames via
// `Xcp::tl_command`, and drains the transmit queue back to the wire.
//
// Master-pinning (spec scenario S6: reject a second client address while connected) lives here,
// in the caller of `tl_command`, not inside `Xcp` itself - the same split used by the teacher's
// own async test harness (see tests/xcp_server_task.rs).

use std::net::{SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use super::Xcp;

const RECV_TIMEOUT: Duration = Duration::from_millis(10);
const RECV_BUF_SIZE: usize = 8000;

/// Blocking UDP server loop. Runs until `stop` is set.
pub fn serve_udp(xcp: &'static Xcp, socket: UdpSocket, stop: Arc<AtomicBool>) {
    if let Err(e) = socket.set_read_timeout(Some(RECV_TIMEOUT)) {
        error!("serve_udp: set_read_timeout failed: {}", e);
        return;
    }

    let mut client_addr: Option<SocketAddr> = None;
    let mut buf = vec![0u8; RECV_BUF_SIZE];

    while !stop.load(Ordering::Acquire) {
        match socket.recv_from(&mut buf) {
            Ok((size, addr)) => {
                if size == 0 {
                    continue;
                }
                if let Some(c) = client_addr {
                    if c != addr && xcp.is_connected() {
                        warn!("serve_udp: ignoring frame from {}, pinned to {}", addr, c);
                        continue;
                    }
                }
                client_addr = Some(addr);
                xcp.tl_command(&buf[..size]);
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                error!("serve_udp: recv_from failed: {}", e);
                return;
            }
        }

        if let Some(addr) = client_addr {
            while let Some(segment) = xcp.tl_transmit_queue_peek() {
                if let Err(e) = socket.send_to(&segment, addr) {
                    error!("serve_udp: send_to failed: {}", e);
                    return;
                }
                xcp.tl_transmit_queue_next();
            }
        }

        if !xcp.is_connected() {
            client_addr = None;
        }
    }
}

/// Blocking TCP server loop: accepts at most one connection at a time. Runs until `stop` is
/// set.
pub fn serve_tcp(xcp: &'static Xcp, listener: TcpListener, stop: Arc<AtomicBool>) {
    if let Err(e) = listener.set_nonblocking(true) {
        error!("serve_tcp: set_nonblocking failed: {}", e);
        return;
    }

    while !stop.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, addr)) => {
                info!("serve_tcp: accepted connection from {}", addr);
                serve_tcp_connection(xcp, stream, &stop);
                if !xcp.is_connected() {
                    continue;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(RECV_TIMEOUT);
            }
            Err(e) => {
                error!("serve_tcp: accept failed: {}", e);
                return;
            }
        }
    }
}

fn serve_tcp_connection(xcp: &'static Xcp, stream: TcpStream, stop: &Arc<AtomicBool>) {
    use std::io::{Read, Write};

    if let Err(e) = stream.set_read_timeout(Some(RECV_TIMEOUT)) {
        error!("serve_tcp: set_read_timeout failed: {}", e);
        return;
    }
    let mut reader = stream.try_clone().expect("tcp stream clone");
    let mut writer = stream;
    let mut buf = vec![0u8; RECV_BUF_SIZE];
    // TCP is a byte stream, not message-oriented like UDP: a frame's {dlc, ctr} header and its
    // dlc payload bytes can arrive split across reads, or several frames in one read. Accumulate
    // here and only hand complete frames to tl_command.
    let mut pending: Vec<u8> = Vec::new();

    while !stop.load(Ordering::Acquire) {
        match reader.read(&mut buf) {
            Ok(0) => {
                info!("serve_tcp: connection closed by peer");
                return;
            }
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                while pending.len() >= super::queue::HEADER {
                    let dlc = u16::from_le_bytes([pending[0], pending[1]]) as usize;
                    let frame_len = super::queue::HEADER + dlc;
                    if pending.len() < frame_len {
                        break;
                    }
                    xcp.tl_command(&pending[..frame_len]);
                    pending.drain(..frame_len);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                error!("serve_tcp: read failed: {}", e);
                return;
            }
        }

        while let Some(segment) = xcp.tl_transmit_queue_peek() {
            if let Err(e) = writer.write_all(&segment) {
                error!("serve_tcp: write failed: {}", e);
                return;
            }
            xcp.tl_transmit_queue_next();
        }

        if !xcp.is_connected() {
            return;
        }
    }
}
