//----------------------------------------------------------------------------------------------
// Module xcp

#![allow(unused_imports)]

use bitflags::bitflags;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU8, Ordering},
};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::registry::{self, McEvent};

//-----------------------------------------------------------------------------
// Submodules

// Submodule daq - dynamic DAQ engine (C4) and event capture macros
pub mod daq;

// Submodule cal - calibration segment engine (C3)
mod cal;
pub use cal::CalPageField;
pub use cal::CalPageTrait;
pub use cal::CalSeg;
pub use cal::CalSegList;
pub use cal::engine::CalPageKind;

// Submodule queue - MPSC transmit queue (C2)
pub mod queue;
pub use queue::Queue;

// Submodule protocol - command decoder / dispatcher (C5)
pub mod protocol;
pub use protocol::Protocol;

// Submodule transport - UDP/TCP wire adapter (C6)
pub mod transport;

//-----------------------------------------------------------------------------
// XCP println macro

/// Print formatted text to the client tool console
#[allow(unused_macros)]
#[macro_export]
macro_rules! xcp_println {
    ( $fmt:expr ) => {
        Xcp::get().print(&format!($fmt));
    };
    ( $fmt:expr, $( $arg:expr ),* ) => {
        Xcp::get().print(&format!($fmt, $( $arg ),*));
    };
}

//----------------------------------------------------------------------------------------------
// XCP error

use thiserror::Error;

#[derive(Error, Debug)]
pub enum XcpError {
    #[error("io error")]
    Io(#[from] std::io::Error),

    #[error("registry error: `{0}` ")]
    Registry(&'static str),

    #[error("unknown error")]
    Unknown,
}

//----------------------------------------------------------------------------------------------
// Log level

/// Log level for the XCP server, independent of the application's own `log` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XcpLogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<u8> for XcpLogLevel {
    fn from(item: u8) -> XcpLogLevel {
        match item {
            0 => XcpLogLevel::Off,
            1 => XcpLogLevel::Error,
            2 => XcpLogLevel::Warn,
            3 => XcpLogLevel::Info,
            4 => XcpLogLevel::Debug,
            5 => XcpLogLevel::Trace,
            _ => XcpLogLevel::Warn,
        }
    }
}

impl XcpLogLevel {
    /// Convert to a `log::LevelFilter`
    pub fn to_log_level_filter(self) -> log::LevelFilter {
        match self {
            XcpLogLevel::Off => log::LevelFilter::Off,
            XcpLogLevel::Error => log::LevelFilter::Error,
            XcpLogLevel::Warn => log::LevelFilter::Warn,
            XcpLogLevel::Info => log::LevelFilter::Info,
            XcpLogLevel::Debug => log::LevelFilter::Debug,
            XcpLogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

//----------------------------------------------------------------------------------------------
// Session status

bitflags! {
    /// Represents a set of flags for the XCP session status
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct XcpSessionStatus: u16 {
        const SS_DAQ            = 0x0040; // DAQ running
        const SS_INITIALIZED    = 0x8000;
        const SS_STARTED        = 0x4000;
        const SS_CONNECTED      = 0x2000;
    }
}

//----------------------------------------------------------------------------------------------
// XcpEvent

/// Represents a measurement event
/// Holds the raw u16 event number used in the XCP protocol and in A2L IF_DATA to identify an event
/// May have an index > 0 to express multiple events with the same name are instantiated in different thread local instances
#[derive(Debug, Clone, Copy)]
pub struct XcpEvent {
    id: u16,    // Number used in A2L and XCP protocol
    index: u16, // Instance index, 0 if single instance
}

impl XcpEvent {
    /// Maximum number of events
    pub const XCP_MAX_EVENTS: u16 = 1024;
    /// Maximum number of thread local event instances
    pub const XCP_MAX_EVENT_INSTS: u16 = 255;
    /// Undefined event id number
    pub const XCP_UNDEFINED_EVENT_ID: u16 = 0xFFFF;

    /// Uninitialized event
    pub const XCP_UNDEFINED_EVENT: XcpEvent = XcpEvent {
        id: XcpEvent::XCP_UNDEFINED_EVENT_ID,
        index: 0,
    };

    /// Create a new XCP event
    pub fn new(id: u16, index: u16) -> XcpEvent {
        assert!(id < XcpEvent::XCP_MAX_EVENTS, "Maximum number of events exceeded");
        XcpEvent { id, index }
    }

    /// Get the event name
    pub fn get_name(self) -> &'static str {
        XCP.event_list.lock().get_name(self).unwrap()
    }

    /// Get the event id as u16
    /// Event id is a unique number for each event
    pub fn get_id(self) -> u16 {
        self.id
    }

    /// Get the instance index
    /// Used to identify instances of the same function that generated this event with the same name
    pub fn get_index(self) -> u16 {
        self.index
    }

    /// Trigger a XCP event and provide a base pointer for relative addressing mode (XCP_ADDR_EXT_DYN or XCP_ADDR_EXT_REL)
    /// McAddress of the associated measurement variables must be relative to base
    ///
    /// # Safety
    /// `base` must be valid for reads for the lifetime of every registered entry's `(ext, addr,
    /// size)` triple, matching the addressing convention it was registered with.
    pub unsafe fn trigger_ext(self, base: *const u8) {
        let xcp = Xcp::get();
        unsafe {
            xcp.daq.trigger_event(self.get_id(), base, base, &xcp.queue, xcp.get_clock());
        }
    }
}

impl PartialEq for XcpEvent {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Default for XcpEvent {
    fn default() -> Self {
        XcpEvent::XCP_UNDEFINED_EVENT
    }
}

//----------------------------------------------------------------------------------------------
// EventList

struct XcpEventInfo {
    name: &'static str,
    event: XcpEvent,
}

struct EventList(Vec<XcpEventInfo>);

impl EventList {
    fn new() -> EventList {
        EventList(Vec::new())
    }

    fn clear(&mut self) {
        self.0.clear();
    }

    fn get_name(&self, event: XcpEvent) -> Option<&'static str> {
        for e in &self.0 {
            if e.event == event {
                return Some(e.name);
            }
        }
        None
    }

    /// `GET_DAQ_EVENT_INFO`: look up an event by its protocol-visible `id` number, ignoring
    /// the thread-local instance index.
    fn get_by_id(&self, id: u16) -> Option<&XcpEventInfo> {
        self.0.iter().find(|e| e.event.id == id)
    }

    fn sort_by_name_and_index(&mut self) {
        self.0.sort_by(|a, b| if a.name == b.name { a.event.index.cmp(&b.event.index) } else { a.name.cmp(b.name) });
    }

    // Register all events in the registry
    fn register(&mut self) {
        self.sort_by_name_and_index();
        let mut l = registry::get_lock();
        let r = l.as_mut().unwrap();
        self.0.iter().for_each(|e| {
            let _ = r.event_list.add_event(McEvent::new(e.name, e.event.index, e.event.id, 0));
        });
    }

    fn create_event_ext(&mut self, name: &'static str, indexed: bool) -> XcpEvent {
        // Allocate a new, sequential event id number
        let id: u16 = self.0.len() as u16;
        if id >= XcpEvent::XCP_MAX_EVENTS {
            error!("Maximum number of events exceeded");
            return XcpEvent::XCP_UNDEFINED_EVENT;
        }

        // In instance mode, check for other events in instance mode with duplicate name and create new instance index
        // otherwise check for unique event name
        let index: u16 = if indexed {
            (self.0.iter().filter(|e| e.name == name && e.event.get_index() > 0).count() + 1).try_into().unwrap()
        } else {
            if self.0.iter().filter(|e| e.name == name).count() > 0 {
                error!("Event name {} already exists", name);
                return XcpEvent::XCP_UNDEFINED_EVENT;
            }
            0
        };
        if index > XcpEvent::XCP_MAX_EVENT_INSTS {
            error!("Maximum number of event thread local instances exceeded");
            return XcpEvent::XCP_UNDEFINED_EVENT;
        }

        let event = XcpEvent::new(id, index);
        debug!("Create event {} id={}, index={}", name, event.get_id(), event.get_index());
        self.0.push(XcpEventInfo { name, event });
        event
    }
}

//------------------------------------------------------------------------------------------
// XcpCalPage

/// Calibration page selector, shared by `CalSegList`'s per-segment page switching.
pub type XcpCalPage = CalPageKind;

//------------------------------------------------------------------------------------------
// XcpTransportLayer

/// enum to specify the transport layer of the XCP server
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum XcpTransportLayer {
    /// UDP transport layer
    Udp,
    /// TCP transport layer
    Tcp,
}

impl XcpTransportLayer {
    /// Get the protocol name of the transport layer
    pub fn protocol_name(self) -> &'static str {
        match self {
            XcpTransportLayer::Tcp => "TCP",
            XcpTransportLayer::Udp => "UDP",
        }
    }
}

//------------------------------------------------------------------------------------------
// XcpBuilder

/// A builder pattern to start the singleton instance of the XCP server
#[derive(Debug)]
pub struct XcpBuilder {
    log_level: XcpLogLevel,
    name: &'static str,
    epk: &'static str,
}

impl XcpBuilder {
    /// Create a XcpBuilder
    pub fn new(name: &'static str) -> XcpBuilder {
        XcpBuilder {
            log_level: XcpLogLevel::Info,
            name,
            epk: "EPK_",
        }
    }

    /// Set the XCP server's own log level
    pub fn set_log_level(mut self, log_level: XcpLogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    /// Set the EPK to enable the client tool to check the A2L file matches the running code
    pub fn set_epk(mut self, epk: &'static str) -> Self {
        self.epk = epk;
        self
    }

    /// Start the XCP server, binding the given transport layer and address
    pub fn start_server<A>(self, tl: XcpTransportLayer, addr: A, port: u16) -> Result<&'static Xcp, XcpError>
    where
        A: Into<std::net::Ipv4Addr>,
    {
        let xcp = Xcp::get();
        xcp.set_log_level(self.log_level);
        xcp.set_app_name(self.name);
        xcp.set_app_revision(self.epk);
        xcp.start_server(tl, addr, port)
    }
}

//------------------------------------------------------------------------------------------
// Xcp singleton

/// A singleton instance of Xcp holds all XCP server data and states
/// The Xcp singleton is obtained with Xcp::get()
pub struct Xcp {
    registry_finalized: AtomicBool,
    event_list: Arc<Mutex<EventList>>,
    epk: Mutex<&'static str>,
    calseg_list: Arc<Mutex<CalSegList>>,

    log_level: Mutex<XcpLogLevel>,

    queue: Queue,
    daq: daq::DaqEngine,
    protocol: Protocol,

    server_started: AtomicBool,
    server_stop: Mutex<Option<Arc<AtomicBool>>>,
    server_thread: Mutex<Option<std::thread::JoinHandle<()>>>,
    pending_tx: Mutex<Option<Vec<u8>>>,
}

lazy_static! {
    static ref XCP: Xcp = Xcp::new();
}

impl Xcp {
    /// Addr of the EPK pseudo-segment
    pub const XCP_EPK_ADDR: u32 = 0x80000000;

    /// Default capacity (bytes) of the transmit queue's ring buffer.
    pub const DEFAULT_QUEUE_CAPACITY: usize = 1 << 16;
    /// Default maximum segment size handed to the transport adapter per drain.
    pub const DEFAULT_MAX_SEGMENT_SIZE: usize = 1400;

    // Lazy static initialization of the Xcp singleton
    fn new() -> Xcp {
        registry::init();

        Xcp {
            registry_finalized: AtomicBool::new(false),
            event_list: Arc::new(Mutex::new(EventList::new())),
            epk: Mutex::new("EPK_"),
            calseg_list: Arc::new(Mutex::new(CalSegList::new())),
            log_level: Mutex::new(XcpLogLevel::Info),
            queue: Queue::new(Xcp::DEFAULT_QUEUE_CAPACITY, Xcp::DEFAULT_MAX_SEGMENT_SIZE),
            daq: daq::DaqEngine::new(),
            protocol: Protocol::new(),
            server_started: AtomicBool::new(false),
            server_stop: Mutex::new(None),
            server_thread: Mutex::new(None),
            pending_tx: Mutex::new(None),
        }
    }

    /// Get the Xcp singleton instance
    #[inline]
    pub fn get() -> &'static Xcp {
        &XCP
    }

    /// Set the XCP server's own log level
    pub fn set_log_level(&self, level: XcpLogLevel) -> &'static Xcp {
        *self.log_level.lock() = level;
        &XCP
    }

    /// Set the project name (will be used as A2L file name and A2L project name)
    pub fn set_app_name(&self, app_name: &str) -> &'static Xcp {
        registry::get_lock().as_mut().unwrap().set_app_info(app_name.to_string(), "xcp", 0);
        &XCP
    }

    /// Set software version (will be used as A2L EPK string and for EPK memory segment)
    pub fn set_app_revision(&self, app_revision: &'static str) -> &'static Xcp {
        assert!(app_revision.len() % 4 == 0, "EPK string length must be a multiple of 4");
        *self.epk.lock() = app_revision;
        registry::get_lock().as_mut().unwrap().set_app_version(app_revision, Xcp::XCP_EPK_ADDR);
        &XCP
    }

    /// Set registry mode (flat or with typedefs, prefix names with app name)
    pub fn set_registry_mode(&self, flatten_typedefs: bool, prefix_names: bool) -> &'static Xcp {
        registry::get_lock().as_mut().unwrap().set_flatten_typedefs(flatten_typedefs);
        registry::get_lock().as_mut().unwrap().set_prefix_names(prefix_names);
        &XCP
    }

    /// Print a formatted text message to the XCP client tool console
    /// Queued as an XCP `SERV` text message, drained with ordinary DAQ/response traffic.
    pub fn print(&self, msg: &str) {
        let bytes = msg.as_bytes();
        let len = bytes.len().min(commands_max_cto());
        self.queue.push(2 + len, |buf| {
            buf[0] = protocol::commands::PID_SERV;
            buf[1] = 0x01; // SERV_TEXT
            buf[2..2 + len].copy_from_slice(&bytes[..len]);
        });
    }

    //------------------------------------------------------------------------------------------
    // XCP on Ethernet Server

    /// Start the XCP server's own blocking UDP/TCP accept-and-serve loop on a background thread.
    pub fn start_server<A>(&self, tl: XcpTransportLayer, addr: A, port: u16) -> Result<&'static Xcp, XcpError>
    where
        A: Into<std::net::Ipv4Addr>,
    {
        let ipv4_addr: std::net::Ipv4Addr = addr.into();
        let stop = Arc::new(AtomicBool::new(false));
        *self.server_stop.lock() = Some(stop.clone());

        let xcp: &'static Xcp = &XCP;
        let handle = match tl {
            XcpTransportLayer::Udp => {
                let socket = std::net::UdpSocket::bind((ipv4_addr, port))?;
                std::thread::Builder::new().name("xcp-udp-server".into()).spawn(move || transport::serve_udp(xcp, socket, stop))?
            }
            XcpTransportLayer::Tcp => {
                let listener = std::net::TcpListener::bind((ipv4_addr, port))?;
                std::thread::Builder::new().name("xcp-tcp-server".into()).spawn(move || transport::serve_tcp(xcp, listener, stop))?
            }
        };
        *self.server_thread.lock() = Some(handle);

        let mut reg = registry::get_lock();
        if let Some(reg) = reg.as_mut() {
            reg.set_xcp_params(tl.protocol_name(), ipv4_addr.into(), port);
        }
        self.server_started.store(true, Ordering::Release);
        info!("XCP server started on {}:{} ({})", ipv4_addr, port, tl.protocol_name());
        Ok(&XCP)
    }

    /// Check if the XCP server is running
    pub fn check_server(&self) -> bool {
        self.server_started.load(Ordering::Acquire)
    }

    /// Stop the XCP server and join its background thread
    pub fn stop_server(&self) {
        self.protocol.disconnect();
        if let Some(stop) = self.server_stop.lock().take() {
            stop.store(true, Ordering::Release);
        }
        if let Some(handle) = self.server_thread.lock().take() {
            let _ = handle.join();
        }
        self.server_started.store(false, Ordering::Release);
    }

    /// Signal the client to disconnect (no further transmit, session considered closed)
    pub fn disconnect_client(&self) {
        self.protocol.disconnect();
    }

    /// Whether a client is currently connected (`CONNECT` seen, no `DISCONNECT` since)
    pub fn is_connected(&self) -> bool {
        self.protocol.is_connected()
    }

    //------------------------------------------------------------------------------------------
    // Transport layer entry points, driven by the server loop (or a hand-rolled one, see tests)

    /// Decodes one wire frame (`{u16 dlc, u16 ctr, bytes[dlc]}`) and dispatches the command it
    /// carries. Frames too short to contain their declared payload are ignored (never a
    /// disconnect, matching the "garbage in never tears down the session" rule).
    pub fn tl_command(&self, frame: &[u8]) {
        if frame.len() < queue::HEADER {
            return;
        }
        let dlc = u16::from_le_bytes([frame[0], frame[1]]) as usize;
        let Some(payload) = frame.get(queue::HEADER..queue::HEADER + dlc) else {
            return;
        };
        self.dispatch_payload(payload);
    }

    pub(crate) fn dispatch_payload(&self, payload: &[u8]) {
        self.protocol.dispatch(self, payload);
    }

    /// Returns the transmit queue (used directly by DAQ event dispatch and the protocol layer).
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Returns the DAQ engine.
    pub fn daq(&self) -> &daq::DaqEngine {
        &self.daq
    }

    /// True if the transmit queue has at least one segment ready, fetching it into the
    /// one-slot pending buffer if not already held.
    pub fn tl_transmit_queue_has_msg(&self) -> bool {
        let mut pending = self.pending_tx.lock();
        if pending.is_none() {
            *pending = self.queue.peek_segment();
        }
        pending.is_some()
    }

    /// Returns a copy of the currently pending segment, if any.
    pub fn tl_transmit_queue_peek(&self) -> Option<Vec<u8>> {
        self.pending_tx.lock().clone()
    }

    /// Releases the currently pending segment so the next `has_msg`/`peek` fetches a new one.
    pub fn tl_transmit_queue_next(&self) {
        self.pending_tx.lock().take();
    }

    //------------------------------------------------------------------------------------------
    // Calibration segments

    /// Create a calibration segment
    /// # Panics
    /// If the calibration segment name already exists
    /// If the calibration page size exceeds 64k
    pub fn create_calseg<T>(&self, name: &'static str, default_page: &'static T) -> CalSeg<T>
    where
        T: CalPageTrait,
    {
        self.calseg_list.lock().create_calseg(name, default_page)
    }

    /// Get calibration segment index by name
    pub fn get_calseg_index(&self, name: &str) -> Option<usize> {
        self.calseg_list.lock().get_index(name)
    }

    /// Get calibration segment name by index
    fn get_calseg_name(&self, index: usize) -> &'static str {
        self.calseg_list.lock().get_name(index)
    }

    /// Number of calibration segments created so far.
    pub fn calseg_count(&self) -> u16 {
        self.calseg_list.lock().len() as u16
    }

    /// `GET_SEGMENT_INFO`: byte size of one segment's page, for the standard-info response.
    pub fn calseg_size(&self, index: usize) -> Option<usize> {
        let list = self.calseg_list.lock();
        if index >= list.len() {
            return None;
        }
        Some(list.engine(index).size())
    }

    /// `GET_CAL_PAGE`: current (ecu, xcp) page selection of one segment.
    pub fn calseg_get_page(&self, index: usize) -> Option<(CalPageKind, CalPageKind)> {
        self.calseg_list.lock().get_page(index)
    }

    /// `SET_CAL_PAGE`: selects the page a segment's ECU and/or XCP access goes through.
    pub fn calseg_set_page(&self, index: usize, ecu: Option<CalPageKind>, xcp: Option<CalPageKind>) -> bool {
        self.calseg_list.lock().set_page(index, ecu, xcp)
    }

    /// `SET_CAL_PAGE` with the `ALL` mode bit: applies the selection to every segment.
    pub fn calseg_set_page_all(&self, ecu: Option<CalPageKind>, xcp: Option<CalPageKind>) {
        self.calseg_list.lock().set_page_all(ecu, xcp);
    }

    /// `COPY_CAL_PAGE` restricted to default -> working.
    pub fn calseg_copy_default_to_working(&self, index: usize) -> bool {
        self.calseg_list.lock().copy_default_to_working(index)
    }

    /// `UPLOAD`/`SHORT_UPLOAD` of a calibration segment's working (or default, per XCP page
    /// selection) page.
    pub fn calseg_read(&self, index: usize, offset: u16, len: u8, dst: &mut [u8]) -> bool {
        self.calseg_list.lock().read_from(index, offset, len, dst)
    }

    /// `DOWNLOAD`/`SHORT_DOWNLOAD` into a calibration segment's working page. Republishes
    /// immediately so the write is visible to the application on its very next `sync()`.
    pub fn calseg_write(&self, index: usize, offset: u16, len: u8, src: &[u8]) -> bool {
        let ok = self.calseg_list.lock().write_to(index, offset, len, src);
        if ok {
            self.calseg_list.lock().flush();
        }
        ok
    }

    /// `SET_REQUEST` freeze bit: request all segments persist their working page.
    pub fn calseg_list_freeze_request(&self) {
        self.calseg_list.lock().set_freeze_request();
    }

    /// `SET_SEGMENT_MODE`: persists the freeze-enable mode byte for one segment.
    pub fn calseg_set_mode(&self, index: usize, mode: u8) -> bool {
        self.calseg_list.lock().set_mode(index, mode)
    }

    /// `GET_SEGMENT_MODE`: current mode byte of one segment.
    pub fn calseg_get_mode(&self, index: usize) -> Option<u8> {
        self.calseg_list.lock().get_mode(index)
    }

    /// `SET_REQUEST` init bit: request all segments reload their working page from storage.
    pub fn calseg_list_init_request(&self) {
        self.calseg_list.lock().set_init_request();
    }

    //------------------------------------------------------------------------------------------
    // XCP events

    /// Create XCP event
    /// index==0 single instance
    /// index>0 multi instance (instance number is attached to name)
    pub fn create_event_ext(&self, name: &'static str, indexed: bool) -> XcpEvent {
        let event = self.event_list.lock().create_event_ext(name, indexed);
        if event == XcpEvent::XCP_UNDEFINED_EVENT {
            panic!("Event name already exists or maximum number of events exceeded");
        }
        event
    }

    /// Create XCP event
    /// Single instance
    pub fn create_event(&self, name: &'static str) -> XcpEvent {
        let event = self.event_list.lock().create_event_ext(name, false);
        if event == XcpEvent::XCP_UNDEFINED_EVENT {
            panic!("Event name already exists or maximum number of events exceeded");
        }
        event
    }

    /// `GET_DAQ_EVENT_INFO`: name of the event with protocol id `event_id`, if any.
    pub fn event_name_by_id(&self, event_id: u16) -> Option<&'static str> {
        self.event_list.lock().get_by_id(event_id).map(|e| e.name)
    }

    //------------------------------------------------------------------------------------------
    // Registry
    // A2L file generation and provision for XCP upload

    /// Session status, computed from the current server/connection/DAQ state.
    pub fn session_status(&self) -> XcpSessionStatus {
        let mut s = XcpSessionStatus::SS_INITIALIZED;
        if self.server_started.load(Ordering::Relaxed) {
            s |= XcpSessionStatus::SS_STARTED;
        }
        if self.protocol.is_connected() {
            s |= XcpSessionStatus::SS_CONNECTED;
        }
        if self.daq.any_running() {
            s |= XcpSessionStatus::SS_DAQ;
        }
        s
    }

    /// EPK string, used for both the `GET_ID` EPK request and the `SEG` EPK pseudo-segment.
    pub fn get_epk_str(&self) -> &'static str {
        *self.epk.lock()
    }

    /// Application (project) name, used for `GET_ID` and the A2L file name.
    pub fn get_app_name(&self) -> &'static str {
        registry::get().get_app_name()
    }

    /// Finalize the registry and provide it to the client tool
    /// A2L is normally automatically finalized on the first `CONNECT`
    /// After this happens, creating registry content, like events and data objects, is not possible anymore
    pub fn finalize_registry(&self) -> Result<bool, XcpError> {
        if self.registry_finalized.load(Ordering::Relaxed) {
            return Ok(false);
        }
        assert!(!registry::is_closed());

        self.calseg_list.lock().register();
        self.event_list.lock().register();

        registry::get_lock().as_mut().unwrap().typedef_list.sort_by_name();
        registry::get_lock().as_mut().unwrap().instance_list.sort_by_name_and_event();

        registry::close();

        {
            let app_name = registry::get().get_app_name();
            assert!(!app_name.is_empty(), "App name not set");
            let mut path = std::path::PathBuf::new();
            path.set_file_name(app_name);
            path.set_extension("a2l");

            #[cfg(test)]
            let check = true;
            #[cfg(not(test))]
            let check = false;

            registry::get().write_a2l(&path, check)?;
        }

        self.registry_finalized.store(true, Ordering::Relaxed);
        Ok(true)
    }

    //------------------------------------------------------------------------------------------
    // Clock
    // The XCP 64 bit DAQ timestamp clock (C1). See `crate::clock` for resolution and epoch.

    pub fn get_clock(&self) -> u64 {
        crate::clock::now()
    }
}

fn commands_max_cto() -> usize {
    (protocol::commands::MAX_CTO as usize).saturating_sub(2)
}

//-------------------------------------------------------------------------------------------------
//-------------------------------------------------------------------------------------------------
// Test module

pub mod xcp_test {
    use super::*;
    use std::sync::Once;

    // Using log level Info for tests reduces the probability of finding threading issues !!!
    #[allow(dead_code)]
    static TEST_INIT: Once = Once::new();

    // Setup the test environment
    #[allow(dead_code)]
    pub fn test_setup(x: log::LevelFilter) -> &'static Xcp {
        TEST_INIT.call_once(|| {
            env_logger::Builder::new()
                .target(env_logger::Target::Stdout)
                .filter_level(x)
                .format_timestamp(None)
                .format_module_path(false)
                .format_target(false)
                .init();
        });
        test_reinit()
    }

    /// Reinit XCP singleton before the next test
    pub fn test_reinit() -> &'static Xcp {
        registry::reset_for_test();

        let xcp = &XCP;
        xcp.set_log_level(XcpLogLevel::Info);
        xcp.event_list.lock().clear();
        xcp.calseg_list.lock().clear();
        xcp.registry_finalized.store(false, Ordering::Relaxed);
        let _ = xcp.daq.free_daq();
        xcp.queue.clear();
        xcp.protocol.disconnect();
        xcp.pending_tx.lock().take();

        xcp
    }
}
