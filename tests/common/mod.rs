// Minimal raw-socket XCP master, just enough to drive the protocol dispatcher from a test.
// No host-side client crate involved: every command is hand-framed and sent over a plain
// UdpSocket, and responses are decoded directly against the wire format in src/xcp/protocol.

#![allow(dead_code)]

use std::net::UdpSocket;
use std::time::Duration;

use xcp::protocol::commands;

/// {u16 dlc, u16 ctr} little-endian header in front of every CTO/DTO segment.
const HEADER: usize = 4;

pub struct RawXcpClient {
    socket: UdpSocket,
    ctr: u16,
}

impl RawXcpClient {
    pub fn connect(server_addr: &str) -> RawXcpClient {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("bind local socket");
        socket.connect(server_addr).expect("connect to server");
        socket.set_read_timeout(Some(Duration::from_millis(500))).unwrap();
        RawXcpClient { socket, ctr: 0 }
    }

    /// Sends one CTO command and returns its first response frame's payload (PID included).
    pub fn command(&mut self, cmd: u8, params: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(HEADER + 1 + params.len());
        let dlc = (1 + params.len()) as u16;
        frame.extend_from_slice(&dlc.to_le_bytes());
        frame.extend_from_slice(&self.ctr.to_le_bytes());
        self.ctr = self.ctr.wrapping_add(1);
        frame.push(cmd);
        frame.extend_from_slice(params);
        self.socket.send(&frame).expect("send command");
        self.recv_frame()
    }

    /// Reads one framed segment off the wire and returns its payload (still PID-prefixed).
    /// Retries on timeout so a DAQ packet interleaved before the response doesn't get mistaken
    /// for it -- this test client has no DAQ decoder, so it just skips anything that is not a
    /// command response/error.
    pub fn recv_frame(&mut self) -> Vec<u8> {
        let mut buf = vec![0u8; 8000];
        loop {
            let n = self.socket.recv(&mut buf).expect("recv response");
            assert!(n >= HEADER, "frame shorter than header");
            let dlc = u16::from_le_bytes([buf[0], buf[1]]) as usize;
            let payload = buf[HEADER..HEADER + dlc].to_vec();
            match payload.first() {
                Some(&commands::PID_RES) | Some(&commands::PID_ERR) => return payload,
                _ => continue, // DAQ or SERV_TEXT frame, not what we're waiting for
            }
        }
    }

    pub fn connect_cmd(&mut self) -> Vec<u8> {
        self.command(commands::CONNECT, &[0x00])
    }

    pub fn disconnect_cmd(&mut self) -> Vec<u8> {
        self.command(commands::DISCONNECT, &[])
    }

    pub fn get_status(&mut self) -> Vec<u8> {
        self.command(commands::GET_STATUS, &[])
    }

    pub fn get_id(&mut self, id_type: u8) -> Vec<u8> {
        self.command(commands::GET_ID, &[id_type])
    }

    pub fn set_mta(&mut self, ext: u8, addr: u32) -> Vec<u8> {
        let mut params = vec![0x00, 0x00, 0x00, ext];
        params.extend_from_slice(&addr.to_le_bytes());
        self.command(commands::SET_MTA, &params)
    }

    pub fn short_upload(&mut self, size: u8, ext: u8, addr: u32) -> Vec<u8> {
        let mut params = vec![size, 0x00, ext];
        params.extend_from_slice(&addr.to_le_bytes());
        self.command(commands::SHORT_UPLOAD, &params)
    }

    pub fn short_download(&mut self, ext: u8, addr: u32, data: &[u8]) -> Vec<u8> {
        let mut params = vec![data.len() as u8, 0x00, ext];
        params.extend_from_slice(&addr.to_le_bytes());
        params.extend_from_slice(data);
        self.command(commands::SHORT_DOWNLOAD, &params)
    }

    pub fn get_daq_clock(&mut self) -> Vec<u8> {
        self.command(commands::GET_DAQ_CLOCK, &[])
    }
}

/// Byte offset of `field` within `T`, for building SEG-addressed MTAs in tests.
pub fn field_offset<T, F>(base: &T, field: &F) -> u16 {
    ((field as *const F as usize) - (base as *const T as usize)) as u16
}
