//----------------------------------------------------------------------------------------------
// Module commands
// XCP command codes and the CRC_* error taxonomy (spec §7)

#![allow(dead_code)]

// Session
pub const CONNECT: u8 = 0xFF;
pub const DISCONNECT: u8 = 0xFE;
pub const GET_STATUS: u8 = 0xFD;
pub const SYNCH: u8 = 0xFC;
pub const GET_COMM_MODE_INFO: u8 = 0xFB;
pub const GET_ID: u8 = 0xFA;
pub const SET_REQUEST: u8 = 0xF9;

// Memory
pub const SET_MTA: u8 = 0xF6;
pub const UPLOAD: u8 = 0xF5;
pub const SHORT_UPLOAD: u8 = 0xF4;
pub const BUILD_CHECKSUM: u8 = 0xF3;
pub const DOWNLOAD: u8 = 0xF0;
pub const SHORT_DOWNLOAD: u8 = 0xED;

// Paging
pub const SET_CAL_PAGE: u8 = 0xEB;
pub const GET_CAL_PAGE: u8 = 0xEA;
pub const GET_PAG_PROCESSOR_INFO: u8 = 0xE9;
pub const GET_SEGMENT_INFO: u8 = 0xE8;
pub const GET_PAGE_INFO: u8 = 0xE7;
pub const SET_SEGMENT_MODE: u8 = 0xE6;
pub const GET_SEGMENT_MODE: u8 = 0xE5;
pub const COPY_CAL_PAGE: u8 = 0xE4;

// DAQ
pub const FREE_DAQ: u8 = 0xD6;
pub const ALLOC_DAQ: u8 = 0xD5;
pub const ALLOC_ODT: u8 = 0xD4;
pub const ALLOC_ODT_ENTRY: u8 = 0xD3;
pub const SET_DAQ_PTR: u8 = 0xE2;
pub const WRITE_DAQ: u8 = 0xE1;
pub const WRITE_DAQ_MULTIPLE: u8 = 0xC7;
pub const SET_DAQ_LIST_MODE: u8 = 0xE0;
pub const GET_DAQ_LIST_MODE: u8 = 0xDF;
pub const START_STOP_DAQ_LIST: u8 = 0xDE;
pub const START_STOP_SYNCH: u8 = 0xDD;
pub const GET_DAQ_CLOCK: u8 = 0xDC;
pub const GET_DAQ_PROCESSOR_INFO: u8 = 0xDA;
pub const GET_DAQ_RESOLUTION_INFO: u8 = 0xD9;
pub const GET_DAQ_EVENT_INFO: u8 = 0xD7;

// Time sync
pub const TIME_CORRELATION_PROPERTIES: u8 = 0xC6;

// Level 1
pub const GET_VERSION: u8 = 0xC0;

/// First byte of every response message.
pub const PID_RES: u8 = 0xFF;
/// First byte of every negative response.
pub const PID_ERR: u8 = 0xFE;
/// First byte of an asynchronously delivered event message.
pub const PID_EVENT: u8 = 0xFD;
/// First byte of an asynchronously delivered service message.
pub const PID_SERV: u8 = 0xFC;

pub const MAX_CTO: u8 = 248;

pub const XCP_PROTOCOL_LAYER_VERSION: u8 = 0x01;
pub const XCP_TRANSPORT_LAYER_VERSION: u8 = 0x01;

/// XCP standard error codes (spec §7), returned as the single byte after `PID_ERR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Crc {
    /// Negative response to `SYNCH`; also used to mean "command processor synchronized".
    CmdSynch = 0x00,
    CmdBusy = 0x10,
    DaqActive = 0x11,
    CmdUnknown = 0x20,
    CmdSyntax = 0x21,
    OutOfRange = 0x22,
    WriteProtected = 0x23,
    AccessDenied = 0x24,
    AccessLocked = 0x25,
    PageNotValid = 0x26,
    ModeNotValid = 0x27,
    SegmentNotValid = 0x28,
    Sequence = 0x29,
    DaqConfig = 0x2A,
    MemoryOverflow = 0x30,
    Generic = 0x31,
    ResourceTemporaryNotAccessible = 0x33,
    SubcmdUnknown = 0x34,
}

impl Crc {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<crate::xcp::daq::DaqError> for Crc {
    fn from(e: crate::xcp::daq::DaqError) -> Self {
        match e {
            crate::xcp::daq::DaqError::OutOfRange => Crc::OutOfRange,
            crate::xcp::daq::DaqError::MemoryOverflow => Crc::MemoryOverflow,
            crate::xcp::daq::DaqError::NotAllowed => Crc::DaqActive,
        }
    }
}
