//----------------------------------------------------------------------------------------------
// Module protocol
// XCP command decoder and dispatcher (C5)
//
// One `Protocol` is owned by the `Xcp` singleton and driven exclusively by the transport
// adapter's receiver thread: `dispatch()` decodes one command, executes it against the cal/DAQ
// engines, and pushes the response onto the transmit queue (responses share that queue with
// DAQ data, per spec). Since every mutation this dispatcher makes goes through a data structure
// that already serializes configuration against concurrent readers/dispatchers on its own
// mutex (the calibration engine, the DAQ engine), there is no separate single-slot "pending
// command" mailbox here: the mutex each engine already takes *is* the synchronization point a
// background event depends on, so deferring to "the next event's thread" the way the C core
// does buys nothing extra in this design.

pub mod commands;
pub mod mta;

use commands::Crc;
use mta::Mta;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::registry;
use crate::xcp::cal::CalPageKind;
use crate::xcp::Xcp;

/// Decoded `SET_CAL_PAGE` mode byte.
const CAL_PAGE_MODE_ECU: u8 = 0x01;
const CAL_PAGE_MODE_XCP: u8 = 0x02;
const CAL_PAGE_MODE_ALL: u8 = 0x80;

fn cal_page_kind(byte: u8) -> CalPageKind {
    if byte == 0 { CalPageKind::Ram } else { CalPageKind::Flash }
}

pub struct Protocol {
    connected: AtomicBool,
    mta: Mutex<Mta>,
}

impl Protocol {
    pub fn new() -> Protocol {
        Protocol {
            connected: AtomicBool::new(false),
            mta: Mutex::new(Mta::default()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }

    fn respond(&self, xcp: &Xcp, payload: &[u8]) {
        if payload.len() + 1 > commands::MAX_CTO as usize {
            error!("response exceeds MAX_CTO ({} bytes)", payload.len() + 1);
            return self.respond_err(xcp, Crc::Generic);
        }
        xcp.queue().push(1 + payload.len(), |buf| {
            buf[0] = commands::PID_RES;
            buf[1..].copy_from_slice(payload);
        });
    }

    fn respond_err(&self, xcp: &Xcp, crc: Crc) {
        xcp.queue().push(2, |buf| {
            buf[0] = commands::PID_ERR;
            buf[1] = crc.code();
        });
    }

    /// Decodes and executes one command packet (the XCP payload, transport framing already
    /// stripped) and queues its response. Malformed (too short) packets are silently ignored,
    /// matching §8 S5's "never a disconnection" rule for garbage input.
    pub fn dispatch(&self, xcp: &Xcp, request: &[u8]) {
        let Some(&cmd) = request.first() else { return };
        let params = &request[1..];

        use commands::*;
        let result = match cmd {
            CONNECT => self.cmd_connect(xcp, params),
            DISCONNECT => self.cmd_disconnect(xcp),
            GET_STATUS => self.cmd_get_status(xcp),
            SYNCH => Err(Crc::CmdSynch),
            GET_COMM_MODE_INFO => self.cmd_get_comm_mode_info(xcp),
            GET_ID => self.cmd_get_id(xcp, params),
            SET_REQUEST => self.cmd_set_request(xcp, params),
            GET_VERSION => self.cmd_get_version(xcp),

            SET_MTA => self.cmd_set_mta(params),
            UPLOAD => self.cmd_upload(xcp, params),
            SHORT_UPLOAD => self.cmd_short_upload(xcp, params),
            DOWNLOAD => self.cmd_download(xcp, params),
            SHORT_DOWNLOAD => self.cmd_short_download(xcp, params),
            BUILD_CHECKSUM => self.cmd_build_checksum(xcp, params),

            GET_CAL_PAGE => self.cmd_get_cal_page(xcp, params),
            SET_CAL_PAGE => self.cmd_set_cal_page(xcp, params),
            COPY_CAL_PAGE => self.cmd_copy_cal_page(xcp, params),
            GET_PAG_PROCESSOR_INFO => self.cmd_get_pag_processor_info(xcp),
            GET_SEGMENT_INFO => self.cmd_get_segment_info(xcp, params),
            GET_PAGE_INFO => self.cmd_get_page_info(xcp, params),
            SET_SEGMENT_MODE => self.cmd_set_segment_mode(xcp, params),
            GET_SEGMENT_MODE => self.cmd_get_segment_mode(xcp, params),

            FREE_DAQ => xcp.daq().free_daq().map(|_| Vec::new()).map_err(Crc::from),
            ALLOC_DAQ => self.cmd_alloc_daq(xcp, params),
            ALLOC_ODT => self.cmd_alloc_odt(xcp, params),
            ALLOC_ODT_ENTRY => self.cmd_alloc_odt_entry(xcp, params),
            SET_DAQ_PTR => self.cmd_set_daq_ptr(xcp, params),
            WRITE_DAQ => self.cmd_write_daq(xcp, params),
            WRITE_DAQ_MULTIPLE => self.cmd_write_daq_multiple(xcp, params),
            SET_DAQ_LIST_MODE => self.cmd_set_daq_list_mode(xcp, params),
            GET_DAQ_LIST_MODE => self.cmd_get_daq_list_mode(xcp, params),
            START_STOP_DAQ_LIST => self.cmd_start_stop_daq_list(xcp, params),
            START_STOP_SYNCH => self.cmd_start_stop_synch(xcp, params),
            GET_DAQ_PROCESSOR_INFO => self.cmd_get_daq_processor_info(xcp),
            GET_DAQ_RESOLUTION_INFO => self.cmd_get_daq_resolution_info(),
            GET_DAQ_CLOCK => self.cmd_get_daq_clock(),
            GET_DAQ_EVENT_INFO => self.cmd_get_daq_event_info(xcp, params),

            TIME_CORRELATION_PROPERTIES => self.cmd_time_correlation_properties(params),

            _ => {
                trace!("unknown or unimplemented command 0x{:02X}", cmd);
                Err(Crc::CmdUnknown)
            }
        };

        match result {
            Ok(payload) => self.respond(xcp, &payload),
            Err(crc) => self.respond_err(xcp, crc),
        }
    }

    //-------------------------------------------------------------------------------------
    // Session

    fn cmd_connect(&self, xcp: &Xcp, _params: &[u8]) -> Result<Vec<u8>, Crc> {
        // Re-connecting resets DAQ tables and re-enters a clean state (§8 boundary behavior).
        let _ = xcp.daq().free_daq();
        self.connected.store(true, Ordering::Release);
        *self.mta.lock().unwrap() = Mta::default();

        let max_dto: u16 = xcp.queue().max_segment_size().min(0xFFFF) as u16;
        let mut resp = vec![
            0x01, // resource: DAQ supported
            0x80, // comm mode basic: byte order little-endian, optional mode present
        ];
        resp.push(commands::MAX_CTO);
        resp.extend_from_slice(&max_dto.to_le_bytes());
        resp.push(commands::XCP_PROTOCOL_LAYER_VERSION);
        resp.push(commands::XCP_TRANSPORT_LAYER_VERSION);
        Ok(resp)
    }

    fn cmd_disconnect(&self, xcp: &Xcp) -> Result<Vec<u8>, Crc> {
        self.connected.store(false, Ordering::Release);
        xcp.daq().start_stop_synch(false);
        Ok(Vec::new())
    }

    fn cmd_get_status(&self, xcp: &Xcp) -> Result<Vec<u8>, Crc> {
        let status = xcp.session_status();
        Ok(vec![status.bits() as u8, (status.bits() >> 8) as u8, 0x00, 0x00])
    }

    fn cmd_get_comm_mode_info(&self, _xcp: &Xcp) -> Result<Vec<u8>, Crc> {
        Ok(vec![0x00, 0x00, 0x00, 0xFF, 0x00])
    }

    fn cmd_get_id(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        let id_type = *params.first().ok_or(Crc::CmdSyntax)?;
        let name: &str = match id_type {
            0x00 => xcp.get_app_name(),
            0x04 => xcp.get_epk_str(),
            _ => return Err(Crc::OutOfRange),
        };
        let bytes = name.as_bytes();
        let mut resp = vec![0x01]; // mode: transfer mode 0 = in response
        resp.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        resp.extend_from_slice(bytes);
        Ok(resp)
    }

    fn cmd_set_request(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        let mode = *params.first().ok_or(Crc::CmdSyntax)?;
        if mode & 0x01 != 0 {
            xcp.calseg_list_freeze_request();
        }
        if mode & 0x04 != 0 {
            xcp.calseg_list_init_request();
        }
        Ok(Vec::new())
    }

    fn cmd_get_version(&self, _xcp: &Xcp) -> Result<Vec<u8>, Crc> {
        Ok(vec![0x00, commands::XCP_PROTOCOL_LAYER_VERSION, 0x04, commands::XCP_TRANSPORT_LAYER_VERSION, 0x00])
    }

    //-------------------------------------------------------------------------------------
    // Memory

    fn cmd_set_mta(&self, params: &[u8]) -> Result<Vec<u8>, Crc> {
        if params.len() < 8 {
            return Err(Crc::CmdSyntax);
        }
        let ext = params[3];
        let addr = u32::from_le_bytes(params[4..8].try_into().unwrap());
        *self.mta.lock().unwrap() = Mta::new(ext, addr);
        Ok(Vec::new())
    }

    fn cmd_upload(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        let size = *params.first().ok_or(Crc::CmdSyntax)?;
        let mut mta = self.mta.lock().unwrap();
        let mut dst = vec![0u8; size as usize];
        read_memory(xcp, mta.ext, mta.addr, &mut dst)?;
        mta.advance(size as u32);
        Ok(dst)
    }

    fn cmd_short_upload(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        if params.len() < 7 {
            return Err(Crc::CmdSyntax);
        }
        let size = params[0];
        let ext = params[2];
        let addr = u32::from_le_bytes(params[3..7].try_into().unwrap());
        let mut dst = vec![0u8; size as usize];
        read_memory(xcp, ext, addr, &mut dst)?;
        Ok(dst)
    }

    fn cmd_download(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        let size = *params.first().ok_or(Crc::CmdSyntax)? as usize;
        let data = params.get(2..2 + size).ok_or(Crc::CmdSyntax)?;
        let mut mta = self.mta.lock().unwrap();
        write_memory(xcp, mta.ext, mta.addr, data)?;
        mta.advance(size as u32);
        Ok(Vec::new())
    }

    fn cmd_short_download(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        if params.len() < 7 {
            return Err(Crc::CmdSyntax);
        }
        let size = params[0] as usize;
        let ext = params[2];
        let addr = u32::from_le_bytes(params[3..7].try_into().unwrap());
        let data = params.get(7..7 + size).ok_or(Crc::CmdSyntax)?;
        write_memory(xcp, ext, addr, data)?;
        Ok(Vec::new())
    }

    fn cmd_build_checksum(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        if params.len() < 4 {
            return Err(Crc::CmdSyntax);
        }
        let size = u32::from_le_bytes(params[0..4].try_into().unwrap());
        let mta = *self.mta.lock().unwrap();
        let mut buf = vec![0u8; size as usize];
        read_memory(xcp, mta.ext, mta.addr, &mut buf)?;
        let checksum: u32 = buf.iter().fold(0u32, |acc, &b| acc.wrapping_add(b as u32));
        let mut resp = vec![0x01, 0x00, 0x00]; // checksum type: XCP_ADD_44-style additive, reserved
        resp.extend_from_slice(&checksum.to_le_bytes());
        Ok(resp)
    }

    //-------------------------------------------------------------------------------------
    // Paging

    fn cmd_get_cal_page(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        let segment = *params.get(1).ok_or(Crc::CmdSyntax)?;
        let (ecu, _xcp_page) = xcp.calseg_get_page(segment as usize).ok_or(Crc::SegmentNotValid)?;
        Ok(vec![0x00, ecu as u8])
    }

    fn cmd_set_cal_page(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        let (mode, segment, page) = (*params.first().ok_or(Crc::CmdSyntax)?, *params.get(1).ok_or(Crc::CmdSyntax)?, *params.get(2).ok_or(Crc::CmdSyntax)?);
        let kind = cal_page_kind(page);
        let ecu = if mode & CAL_PAGE_MODE_ECU != 0 { Some(kind) } else { None };
        let xcp_sel = if mode & CAL_PAGE_MODE_XCP != 0 { Some(kind) } else { None };
        if mode & CAL_PAGE_MODE_ALL != 0 {
            xcp.calseg_set_page_all(ecu, xcp_sel);
        } else if !xcp.calseg_set_page(segment as usize, ecu, xcp_sel) {
            return Err(Crc::SegmentNotValid);
        }
        Ok(Vec::new())
    }

    fn cmd_copy_cal_page(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        if params.len() < 4 {
            return Err(Crc::CmdSyntax);
        }
        let (src_seg, src_page, dst_seg, dst_page) = (params[0], params[1], params[2], params[3]);
        if src_seg != dst_seg || src_page != CalPageKind::Flash as u8 || dst_page != CalPageKind::Ram as u8 {
            return Err(Crc::WriteProtected);
        }
        if !xcp.calseg_copy_default_to_working(src_seg as usize) {
            return Err(Crc::SegmentNotValid);
        }
        Ok(Vec::new())
    }

    fn cmd_get_pag_processor_info(&self, xcp: &Xcp) -> Result<Vec<u8>, Crc> {
        Ok(vec![xcp.calseg_count().min(0xFF) as u8, 0x01]) // properties: freeze supported
    }

    /// `GET_SEGMENT_INFO`. Segment 0 is the reserved EPK pseudo-segment; segment N addresses
    /// calibration segment N-1. Mode 2 (mapping info) is not supported, matching the rest of
    /// this implementation having no memory-mapping extension.
    fn cmd_get_segment_info(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        if params.len() < 3 {
            return Err(Crc::CmdSyntax);
        }
        let mode = params[0];
        let segment = params[1];
        let seg_info = params[2];
        if segment as u16 > xcp.calseg_count() {
            return Err(Crc::OutOfRange);
        }
        match mode {
            0 => {
                // Basic info: address (seg_info 0) or length (seg_info 1). Name-by-MTA
                // (seg_info 2) needs a PTR address extension this implementation doesn't have.
                let basic_info: u32 = if segment == 0 {
                    match seg_info {
                        0 => registry::McAddress::XCP_EPK_ADDR,
                        1 => xcp.get_epk_str().len() as u32,
                        _ => return Err(Crc::OutOfRange),
                    }
                } else {
                    let index = (segment - 1) as usize;
                    match seg_info {
                        0 => mta::encode_seg(segment as u16, 0),
                        1 => xcp.calseg_size(index).ok_or(Crc::SegmentNotValid)? as u32,
                        _ => return Err(Crc::OutOfRange),
                    }
                };
                Ok(basic_info.to_le_bytes().to_vec())
            }
            1 => {
                let max_pages = if segment == 0 { 1 } else { 2 };
                Ok(vec![max_pages, mta::XCP_ADDR_EXT_SEG, 0x00, 0x00, 0x00])
            }
            2 => Err(Crc::OutOfRange),
            _ => Err(Crc::CmdSyntax),
        }
    }

    fn cmd_get_page_info(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        if params.len() < 2 {
            return Err(Crc::CmdSyntax);
        }
        let segment = params[0];
        let page = params[1];
        if segment as u16 > xcp.calseg_count() {
            return Err(Crc::OutOfRange);
        }
        if (segment == 0 && page > 0) || page > 1 {
            return Err(Crc::PageNotValid);
        }
        if segment == 0 {
            return Ok(vec![0x0F, 0x00]); // EPK segment: write not allowed, read don't care
        }
        let properties = if page == CalPageKind::Ram as u8 { 0x3F } else { 0x0F };
        Ok(vec![properties, CalPageKind::Flash as u8])
    }

    fn cmd_set_segment_mode(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        let mode = *params.first().ok_or(Crc::CmdSyntax)?;
        let segment = *params.get(1).ok_or(Crc::CmdSyntax)?;
        if segment == 0 || !xcp.calseg_set_mode((segment - 1) as usize, mode) {
            return Err(Crc::SegmentNotValid);
        }
        Ok(Vec::new())
    }

    fn cmd_get_segment_mode(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        let segment = *params.get(1).ok_or(Crc::CmdSyntax)?;
        if segment == 0 {
            return Err(Crc::SegmentNotValid);
        }
        let mode = xcp.calseg_get_mode((segment - 1) as usize).ok_or(Crc::SegmentNotValid)?;
        Ok(vec![0x00, mode])
    }

    //-------------------------------------------------------------------------------------
    // DAQ

    fn cmd_alloc_daq(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        let count = u16::from_le_bytes(params.get(1..3).ok_or(Crc::CmdSyntax)?.try_into().unwrap());
        xcp.daq().alloc_daq(count).map(|_| Vec::new()).map_err(Crc::from)
    }

    fn cmd_alloc_odt(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        let daq = u16::from_le_bytes(params.get(1..3).ok_or(Crc::CmdSyntax)?.try_into().unwrap());
        let count = *params.get(3).ok_or(Crc::CmdSyntax)?;
        xcp.daq().alloc_odt(daq, count).map(|_| Vec::new()).map_err(Crc::from)
    }

    fn cmd_alloc_odt_entry(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        let daq = u16::from_le_bytes(params.get(1..3).ok_or(Crc::CmdSyntax)?.try_into().unwrap());
        let odt = *params.get(3).ok_or(Crc::CmdSyntax)?;
        let count = *params.get(4).ok_or(Crc::CmdSyntax)?;
        xcp.daq().alloc_odt_entry(daq, odt, count).map(|_| Vec::new()).map_err(Crc::from)
    }

    fn cmd_set_daq_ptr(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        let daq = u16::from_le_bytes(params.get(1..3).ok_or(Crc::CmdSyntax)?.try_into().unwrap());
        let odt = *params.get(3).ok_or(Crc::CmdSyntax)?;
        let entry = *params.get(4).ok_or(Crc::CmdSyntax)?;
        xcp.daq().set_daq_ptr(daq, odt, entry).map(|_| Vec::new()).map_err(Crc::from)
    }

    fn cmd_write_daq(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        if params.len() < 7 {
            return Err(Crc::CmdSyntax);
        }
        let bit_offset = params[0];
        if bit_offset != 0xFF {
            return Err(Crc::CmdSyntax); // bit-level DAQ is out of scope
        }
        let size = params[1];
        let ext = params[2];
        let addr = u32::from_le_bytes(params[3..7].try_into().unwrap());
        xcp.daq().write_daq(ext, addr, size).map(|_| Vec::new()).map_err(Crc::from)
    }

    fn cmd_write_daq_multiple(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        let n = *params.first().ok_or(Crc::CmdSyntax)? as usize;
        for i in 0..n {
            let base = 1 + i * 8;
            let entry = params.get(base..base + 8).ok_or(Crc::CmdSyntax)?;
            let bit_offset = entry[0];
            if bit_offset != 0xFF {
                return Err(Crc::CmdSyntax);
            }
            let size = entry[1];
            let ext = entry[2];
            let addr = u32::from_le_bytes(entry[4..8].try_into().unwrap());
            xcp.daq().write_daq(ext, addr, size).map_err(Crc::from)?;
        }
        Ok(Vec::new())
    }

    fn cmd_set_daq_list_mode(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        if params.len() < 7 {
            return Err(Crc::CmdSyntax);
        }
        let mode = params[0];
        let daq = u16::from_le_bytes(params[1..3].try_into().unwrap());
        let event_id = u16::from_le_bytes(params[3..5].try_into().unwrap());
        let priority = params[6];
        xcp.daq().set_daq_list_mode(daq, event_id, mode & 0x10 != 0, priority).map(|_| Vec::new()).map_err(Crc::from)
    }

    fn cmd_get_daq_list_mode(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        let daq = u16::from_le_bytes(params.get(1..3).ok_or(Crc::CmdSyntax)?.try_into().unwrap());
        let (event_id, mode_timestamp, priority, running) = xcp.daq().list_mode(daq).ok_or(Crc::OutOfRange)?;
        let mode = if mode_timestamp { 0x10 } else { 0x00 } | if running { 0x01 } else { 0x00 };
        let mut resp = vec![mode, 0x00, 0x00];
        resp.extend_from_slice(&event_id.to_le_bytes());
        resp.push(1); // prescaler: always 1, no prescaling support
        resp.push(priority);
        Ok(resp)
    }

    fn cmd_start_stop_daq_list(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        let mode = *params.first().ok_or(Crc::CmdSyntax)?;
        let daq = u16::from_le_bytes(params.get(1..3).ok_or(Crc::CmdSyntax)?.try_into().unwrap());
        let start = mode == 0x02 || mode == 0x01;
        xcp.daq().start_stop_daq_list(daq, start).map(|_| vec![0x00]).map_err(Crc::from)
    }

    fn cmd_start_stop_synch(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        let mode = *params.first().ok_or(Crc::CmdSyntax)?;
        xcp.daq().start_stop_synch(mode == 0x01);
        Ok(Vec::new())
    }

    fn cmd_get_daq_processor_info(&self, xcp: &Xcp) -> Result<Vec<u8>, Crc> {
        let mut resp = vec![0x00]; // DAQ_PROPERTIES: no overload indication
        resp.extend_from_slice(&xcp.daq().list_count().to_le_bytes());
        resp.extend_from_slice(&0xFFFFu16.to_le_bytes()); // max event channel (dynamic)
        resp.push(0xFF); // min daq
        resp.push(0x00); // DAQ key byte: 2 byte ODT/DAQ header
        Ok(resp)
    }

    fn cmd_get_daq_resolution_info(&self) -> Result<Vec<u8>, Crc> {
        Ok(vec![1, 0x00, 1, 0x00, crate::clock::timestamp_unit(), 0x04])
    }

    fn cmd_get_daq_clock(&self) -> Result<Vec<u8>, Crc> {
        let mut resp = vec![0x00, 0x00, 0x00];
        resp.extend_from_slice(&(crate::clock::now() as u32).to_le_bytes());
        Ok(resp)
    }

    /// `GET_DAQ_EVENT_INFO`. Cycle time isn't tracked anywhere in this implementation (events
    /// are registered with `target_cycle_time_ns = 0`), so `time_cycle`/`time_unit` report the
    /// "sporadic, no fixed cycle" pair rather than a fabricated value.
    fn cmd_get_daq_event_info(&self, xcp: &Xcp, params: &[u8]) -> Result<Vec<u8>, Crc> {
        let event_id = u16::from_le_bytes(params.get(1..3).ok_or(Crc::CmdSyntax)?.try_into().unwrap());
        let name = xcp.event_name_by_id(event_id).ok_or(Crc::OutOfRange)?;
        Ok(vec![
            0x04, // properties: DAQ direction supported
            0xFF, // max_daq_list: unbounded
            name.len().min(0xFF) as u8,
            0x00, // time_cycle
            0x00, // time_unit
            0x00, // priority
        ])
    }

    fn cmd_time_correlation_properties(&self, _params: &[u8]) -> Result<Vec<u8>, Crc> {
        Ok(vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self::new()
    }
}

/// Dereferences `len` bytes at `(ext, addr)` into `dst`.
///
/// # Safety (ABS mode)
/// `ABS` addressing dereferences `addr` as a raw process address, exactly as the wire protocol
/// defines it; the host is trusted not to request unmapped memory. This is inherent to XCP's
/// ABS mode, not a bug in this implementation.
fn read_memory(xcp: &Xcp, ext: u8, addr: u32, dst: &mut [u8]) -> Result<(), Crc> {
    match ext {
        mta::XCP_ADDR_EXT_SEG => {
            let (index, offset) = mta::decode_seg(addr);
            if index == mta::EPK_SEGMENT_INDEX {
                let epk = xcp.get_epk_str().as_bytes();
                let (off, len) = (offset as usize, dst.len());
                let end = off.checked_add(len).ok_or(Crc::OutOfRange)?;
                dst.copy_from_slice(epk.get(off..end).ok_or(Crc::OutOfRange)?);
                Ok(())
            } else {
                let seg = (index - 1) as usize;
                if xcp.calseg_read(seg, offset, dst.len() as u8, dst) {
                    Ok(())
                } else {
                    Err(Crc::OutOfRange)
                }
            }
        }
        mta::XCP_ADDR_EXT_ABS => {
            // Safety: see function-level contract.
            let src = unsafe { std::slice::from_raw_parts(addr as usize as *const u8, dst.len()) };
            dst.copy_from_slice(src);
            Ok(())
        }
        _ => Err(Crc::AccessDenied),
    }
}

fn write_memory(xcp: &Xcp, ext: u8, addr: u32, src: &[u8]) -> Result<(), Crc> {
    match ext {
        mta::XCP_ADDR_EXT_SEG => {
            let (index, offset) = mta::decode_seg(addr);
            if index == mta::EPK_SEGMENT_INDEX {
                return Err(Crc::WriteProtected);
            }
            let seg = (index - 1) as usize;
            if xcp.calseg_write(seg, offset, src.len() as u8, src) {
                Ok(())
            } else {
                Err(Crc::WriteProtected)
            }
        }
        mta::XCP_ADDR_EXT_ABS => Err(Crc::AccessDenied),
        _ => Err(Crc::AccessDenied),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xcp::xcp_test;

    #[test]
    fn test_connect_get_status_disconnect() {
        let xcp = xcp_test::test_setup(log::LevelFilter::Info);
        let protocol = Protocol::new();
        protocol.dispatch(xcp, &[commands::CONNECT, 0x00]);
        assert!(protocol.is_connected());
        let seg = xcp.queue().peek_segment().unwrap();
        assert_eq!(seg[4], commands::PID_RES);

        protocol.dispatch(xcp, &[commands::GET_STATUS]);
        let seg = xcp.queue().peek_segment().unwrap();
        assert_eq!(seg[4], commands::PID_RES);

        protocol.dispatch(xcp, &[commands::DISCONNECT]);
        assert!(!protocol.is_connected());
    }

    #[test]
    fn test_synch_is_always_negative() {
        let xcp = xcp_test::test_setup(log::LevelFilter::Info);
        let protocol = Protocol::new();
        protocol.dispatch(xcp, &[commands::SYNCH]);
        let seg = xcp.queue().peek_segment().unwrap();
        assert_eq!(seg[4], commands::PID_ERR);
        assert_eq!(seg[5], Crc::CmdSynch.code());
    }

    #[test]
    fn test_unknown_command_does_not_disconnect() {
        let xcp = xcp_test::test_setup(log::LevelFilter::Info);
        let protocol = Protocol::new();
        protocol.dispatch(xcp, &[commands::CONNECT, 0x00]);
        xcp.queue().peek_segment(); // drain the CONNECT response
        protocol.dispatch(xcp, &[0xC1]);
        let seg = xcp.queue().peek_segment().unwrap();
        assert_eq!(seg[4], commands::PID_ERR);
        assert_eq!(seg[5], Crc::CmdUnknown.code());
        assert!(protocol.is_connected());
    }

    #[test]
    fn test_daq_one_event_scenario() {
        let xcp = xcp_test::test_setup(log::LevelFilter::Info);
        let protocol = Protocol::new();
        protocol.dispatch(xcp, &[commands::CONNECT, 0x00]);
        xcp.queue().peek_segment();

        let counter: u32 = 0x1122_3344;
        let addr = &counter as *const u32 as u32;

        protocol.dispatch(xcp, &[commands::FREE_DAQ]);
        protocol.dispatch(xcp, &[commands::ALLOC_DAQ, 0, 1, 0]);
        protocol.dispatch(xcp, &[commands::ALLOC_ODT, 0, 0, 0, 1]);
        protocol.dispatch(xcp, &[commands::ALLOC_ODT_ENTRY, 0, 0, 0, 0, 1]);
        protocol.dispatch(xcp, &[commands::SET_DAQ_PTR, 0, 0, 0, 0, 0]);
        // (ALLOC_DAQ: reserved,count_lo=1,count_hi=0; ALLOC_ODT: reserved,daq_lo=0,daq_hi=0,count=1;
        //  ALLOC_ODT_ENTRY: reserved,daq_lo=0,daq_hi=0,odt=0,count=1; SET_DAQ_PTR: reserved,daq_lo=0,daq_hi=0,odt=0,entry=0)
        let mut write_daq = vec![commands::WRITE_DAQ, 0xFF, 4, mta::XCP_ADDR_EXT_ABS];
        write_daq.extend_from_slice(&addr.to_le_bytes());
        protocol.dispatch(xcp, &write_daq);
        protocol.dispatch(xcp, &[commands::SET_DAQ_LIST_MODE, 0x10, 0, 0, 7, 0, 0, 0]);
        protocol.dispatch(xcp, &[commands::START_STOP_DAQ_LIST, 0x02, 0, 0]);
        protocol.dispatch(xcp, &[commands::START_STOP_SYNCH, 0x01]);
        // Drain the 6 positive acks before inspecting DAQ output.
        for _ in 0..6 {
            xcp.queue().peek_segment();
        }

        unsafe {
            xcp.daq().trigger_event(7, std::ptr::null(), std::ptr::null(), xcp.queue(), xcp.get_clock());
        }
        let seg = xcp.queue().peek_segment().unwrap();
        let payload = &seg[4..];
        assert_eq!(payload[0], 0); // ODT 0
        assert_eq!(payload[1], 0); // DAQ list 0
        assert_eq!(&payload[6..10], &counter.to_le_bytes());
    }
}
