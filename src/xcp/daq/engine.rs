//----------------------------------------------------------------------------------------------
// Module engine
// Dynamic DAQ engine (C4)
//
// The host configures DAQ lists at runtime: ALLOC_DAQ reserves N lists, ALLOC_ODT reserves K
// ODTs in a list, ALLOC_ODT_ENTRY reserves M entries in an ODT, and a SET_DAQ_PTR / WRITE_DAQ
// sequence fills each entry with an (addr_ext, addr, size) triple describing one measurement
// value. All allocation is rejected once any list is RUNNING.
//
// Unlike the C reference, which carves all of this out of one fixed-size byte arena
// (DAQ_MEM_SIZE) with manual offset bookkeeping, each list/ODT/entry here is an ordinary Rust
// `Vec`. We keep the arena *budget* - the sum of entry storage is checked against
// `DAQ_MEM_SIZE` on every allocation - without reimplementing a bump allocator Rust's own
// allocator already gives us for free.
//
// Event dispatch (`trigger_event`) and configuration share one `Mutex`. Configuration commands
// only arrive from the single protocol thread; event dispatch can arrive concurrently from any
// application thread. A mutex keeps both paths trivially consistent - no DAQ list is ever
// observed half-configured - at the cost of dispatch contending with a concurrent reconfigure,
// which the spec permits as long as no application thread blocks forever.

use super::super::queue::Queue;
use super::super::protocol::mta;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Total bytes of ODT entry storage the engine will admit across all lists.
pub const DAQ_MEM_SIZE: usize = 0x10000;

/// Sentinel meaning "not bound to any event".
pub const XCP_UNDEFINED_EVENT_ID: u16 = 0xFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaqListState {
    /// Freshly allocated or just `FREE_DAQ`'d; ODTs/entries may still be (re)allocated.
    StoppedUnselected,
    /// `SET_DAQ_LIST_MODE` has bound an event; armed to start on the next `START_STOP_SYNCH`.
    StoppedSelected,
    /// Actively sampled on every occurrence of its bound event.
    Running,
}

/// One measurement value inside an ODT: `size` bytes read from `addr` under `addr_ext` at
/// dispatch time.
#[derive(Debug, Clone, Copy, Default)]
struct OdtEntry {
    addr_ext: u8,
    addr: u32,
    size: u8,
}

#[derive(Debug, Default)]
struct Odt {
    entries: Vec<OdtEntry>,
}

impl Odt {
    /// `ODT` + `DAQ8` header bytes, plus an optional 4-byte timestamp, plus entry payload.
    fn payload_len(&self, include_timestamp: bool) -> usize {
        2 + if include_timestamp { 4 } else { 0 } + self.entries.iter().map(|e| e.size as usize).sum::<usize>()
    }
}

#[derive(Debug)]
struct DaqList {
    state: DaqListState,
    event_id: u16,
    mode_timestamp: bool,
    priority: u8,
    odts: Vec<Odt>,
}

impl DaqList {
    fn new() -> DaqList {
        DaqList {
            state: DaqListState::StoppedUnselected,
            event_id: XCP_UNDEFINED_EVENT_ID,
            mode_timestamp: true,
            priority: 0,
            odts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaqError {
    /// A list/ODT/entry index did not exist.
    OutOfRange,
    /// The arena budget (`DAQ_MEM_SIZE`) would be exceeded.
    MemoryOverflow,
    /// The requested mutation is not legal while any list is `Running` (or this list is).
    NotAllowed,
}

struct DaqPtr {
    daq: usize,
    odt: usize,
    entry: usize,
}

struct Inner {
    lists: Vec<DaqList>,
    mem_used: usize,
    ptr: Option<DaqPtr>,
    /// event_id -> indices of lists currently bound and running for that event, kept in sync
    /// on every mode/start/stop change so dispatch never has to scan all lists.
    by_event: HashMap<u16, Vec<usize>>,
}

impl Inner {
    fn rebuild_event_index(&mut self) {
        self.by_event.clear();
        for (i, l) in self.lists.iter().enumerate() {
            if l.state == DaqListState::Running {
                self.by_event.entry(l.event_id).or_default().push(i);
            }
        }
    }

    fn any_running(&self) -> bool {
        self.lists.iter().any(|l| l.state == DaqListState::Running)
    }
}

/// The DAQ engine. One instance is owned by the `Xcp` singleton.
pub struct DaqEngine {
    inner: Mutex<Inner>,
}

impl DaqEngine {
    pub fn new() -> DaqEngine {
        DaqEngine {
            inner: Mutex::new(Inner {
                lists: Vec::new(),
                mem_used: 0,
                ptr: None,
                by_event: HashMap::new(),
            }),
        }
    }

    /// `FREE_DAQ`: releases all lists. Refused while any list is running.
    pub fn free_daq(&self) -> Result<(), DaqError> {
        let mut inner = self.inner.lock();
        if inner.any_running() {
            return Err(DaqError::NotAllowed);
        }
        inner.lists.clear();
        inner.mem_used = 0;
        inner.ptr = None;
        inner.by_event.clear();
        Ok(())
    }

    /// `ALLOC_DAQ`: reserves `count` empty DAQ lists, discarding any existing configuration.
    pub fn alloc_daq(&self, count: u16) -> Result<(), DaqError> {
        let mut inner = self.inner.lock();
        if inner.any_running() {
            return Err(DaqError::NotAllowed);
        }
        inner.lists = (0..count).map(|_| DaqList::new()).collect();
        inner.mem_used = 0;
        inner.ptr = None;
        inner.by_event.clear();
        Ok(())
    }

    /// `ALLOC_ODT`: reserves `count` ODTs in list `daq`.
    pub fn alloc_odt(&self, daq: u16, count: u8) -> Result<(), DaqError> {
        let mut inner = self.inner.lock();
        if inner.any_running() {
            return Err(DaqError::NotAllowed);
        }
        let list = inner.lists.get_mut(daq as usize).ok_or(DaqError::OutOfRange)?;
        list.odts = (0..count).map(|_| Odt::default()).collect();
        Ok(())
    }

    /// `ALLOC_ODT_ENTRY`: reserves `count` entries in ODT `odt` of list `daq`.
    pub fn alloc_odt_entry(&self, daq: u16, odt: u8, count: u8) -> Result<(), DaqError> {
        let mut inner = self.inner.lock();
        if inner.any_running() {
            return Err(DaqError::NotAllowed);
        }
        let added = count as usize * std::mem::size_of::<OdtEntry>();
        if inner.mem_used + added > DAQ_MEM_SIZE {
            return Err(DaqError::MemoryOverflow);
        }
        inner.mem_used += added;
        let list = inner.lists.get_mut(daq as usize).ok_or(DaqError::OutOfRange)?;
        let odt = list.odts.get_mut(odt as usize).ok_or(DaqError::OutOfRange)?;
        odt.entries = (0..count).map(|_| OdtEntry::default()).collect();
        Ok(())
    }

    /// `SET_DAQ_PTR`: points the write cursor at entry `entry` of ODT `odt` in list `daq`.
    pub fn set_daq_ptr(&self, daq: u16, odt: u8, entry: u8) -> Result<(), DaqError> {
        let mut inner = self.inner.lock();
        let list = inner.lists.get(daq as usize).ok_or(DaqError::OutOfRange)?;
        let o = list.odts.get(odt as usize).ok_or(DaqError::OutOfRange)?;
        if entry as usize >= o.entries.len() {
            return Err(DaqError::OutOfRange);
        }
        inner.ptr = Some(DaqPtr { daq: daq as usize, odt: odt as usize, entry: entry as usize });
        Ok(())
    }

    /// `WRITE_DAQ`: fills the entry at the current cursor and advances it by one.
    pub fn write_daq(&self, addr_ext: u8, addr: u32, size: u8) -> Result<(), DaqError> {
        let mut inner = self.inner.lock();
        if inner.any_running() {
            return Err(DaqError::NotAllowed);
        }
        let ptr = inner.ptr.as_ref().ok_or(DaqError::OutOfRange)?;
        let (daq, odt, entry) = (ptr.daq, ptr.odt, ptr.entry);
        let list = inner.lists.get_mut(daq).ok_or(DaqError::OutOfRange)?;
        let o = list.odts.get_mut(odt).ok_or(DaqError::OutOfRange)?;
        let e = o.entries.get_mut(entry).ok_or(DaqError::OutOfRange)?;
        *e = OdtEntry { addr_ext, addr, size };
        if let Some(p) = inner.ptr.as_mut() {
            p.entry += 1;
        }
        Ok(())
    }

    /// `SET_DAQ_LIST_MODE`: binds list `daq` to `event_id`, selecting it (armed, not yet
    /// running) for the next `START_STOP_SYNCH`.
    pub fn set_daq_list_mode(&self, daq: u16, event_id: u16, mode_timestamp: bool, priority: u8) -> Result<(), DaqError> {
        let mut inner = self.inner.lock();
        if inner.lists.get(daq as usize).map(|l| l.state) == Some(DaqListState::Running) {
            return Err(DaqError::NotAllowed);
        }
        let list = inner.lists.get_mut(daq as usize).ok_or(DaqError::OutOfRange)?;
        list.event_id = event_id;
        list.mode_timestamp = mode_timestamp;
        list.priority = priority;
        list.state = DaqListState::StoppedSelected;
        Ok(())
    }

    /// `START_STOP_DAQ_LIST`: starts or stops a single list without affecting others.
    pub fn start_stop_daq_list(&self, daq: u16, start: bool) -> Result<(), DaqError> {
        let mut inner = self.inner.lock();
        {
            let list = inner.lists.get_mut(daq as usize).ok_or(DaqError::OutOfRange)?;
            if start {
                if list.event_id == XCP_UNDEFINED_EVENT_ID {
                    return Err(DaqError::NotAllowed);
                }
                list.state = DaqListState::Running;
            } else {
                list.state = DaqListState::StoppedSelected;
            }
        }
        inner.rebuild_event_index();
        Ok(())
    }

    /// `START_STOP_SYNCH`: starts every `StoppedSelected` list (select all) or stops every
    /// running list (stop all), synchronized to one command.
    pub fn start_stop_synch(&self, start: bool) {
        let mut inner = self.inner.lock();
        for list in inner.lists.iter_mut() {
            if start {
                if list.state == DaqListState::StoppedSelected {
                    list.state = DaqListState::Running;
                }
            } else if list.state == DaqListState::Running {
                list.state = DaqListState::StoppedSelected;
            }
        }
        inner.rebuild_event_index();
    }

    pub fn list_count(&self) -> u16 {
        self.inner.lock().lists.len() as u16
    }

    pub fn odt_count(&self, daq: u16) -> Option<u8> {
        self.inner.lock().lists.get(daq as usize).map(|l| l.odts.len() as u8)
    }

    pub fn is_running(&self, daq: u16) -> Option<bool> {
        self.inner.lock().lists.get(daq as usize).map(|l| l.state == DaqListState::Running)
    }

    /// `GET_DAQ_LIST_MODE`: current `(event_id, mode_timestamp, priority, running)` of one list.
    pub fn list_mode(&self, daq: u16) -> Option<(u16, bool, u8, bool)> {
        self.inner
            .lock()
            .lists
            .get(daq as usize)
            .map(|l| (l.event_id, l.mode_timestamp, l.priority, l.state == DaqListState::Running))
    }

    /// True if any allocated DAQ list is currently running.
    pub fn any_running(&self) -> bool {
        self.inner.lock().any_running()
    }

    /// Event dispatch: samples every `Running` list bound to `event_id` and pushes one
    /// transmit-queue message per ODT. `dyn_base`/`rel_base` are the application-supplied base
    /// pointers for `DYN`/`REL` addressed entries; `abs` entries dereference `addr` directly.
    ///
    /// # Safety
    /// Every entry's `(addr_ext, addr, size)` must describe memory that is live and readable
    /// for the duration of this call, under the addressing convention the host configured it
    /// with (see `mta`). This holds if and only if the application registered its variables
    /// honestly through `DaqEvent`/`CalSeg`, which is the sole legitimate path to `WRITE_DAQ`.
    pub unsafe fn trigger_event(&self, event_id: u16, dyn_base: *const u8, rel_base: *const u8, queue: &Queue, clock: u64) {
        let inner = self.inner.lock();
        let Some(indices) = inner.by_event.get(&event_id) else { return };
        for &i in indices {
            let list = &inner.lists[i];
            for (odt_index, odt) in list.odts.iter().enumerate() {
                let include_timestamp = odt_index == 0 && list.mode_timestamp;
                let len = odt.payload_len(include_timestamp);
                queue.push(len, |buf| {
                    buf[0] = odt_index as u8;
                    buf[1] = i as u8;
                    let mut off = 2;
                    if include_timestamp {
                        buf[off..off + 4].copy_from_slice(&(clock as u32).to_le_bytes());
                        off += 4;
                    }
                    for e in &odt.entries {
                        let size = e.size as usize;
                        if size == 0 {
                            continue;
                        }
                        // Safety: see function-level contract.
                        let src = unsafe { resolve(e.addr_ext, e.addr, dyn_base, rel_base) };
                        let src = unsafe { std::slice::from_raw_parts(src, size) };
                        buf[off..off + size].copy_from_slice(src);
                        off += size;
                    }
                });
            }
        }
    }
}

impl Default for DaqEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves an ODT entry's address to a readable pointer given the event's base pointers.
///
/// # Safety
/// The caller must ensure the resulting pointer is valid for reads of the entry's `size` for
/// the addressing mode it was configured with.
unsafe fn resolve(addr_ext: u8, addr: u32, dyn_base: *const u8, rel_base: *const u8) -> *const u8 {
    match addr_ext {
        mta::XCP_ADDR_EXT_DYN => {
            let (_event_id, offset) = mta::decode_dyn(addr);
            unsafe { dyn_base.offset(offset as isize) }
        }
        mta::XCP_ADDR_EXT_REL => {
            let offset = mta::decode_rel(addr);
            unsafe { rel_base.offset(offset as isize) }
        }
        _ => addr as usize as *const u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_one_entry_list(engine: &DaqEngine, event_id: u16, addr_ext: u8, addr: u32, size: u8) {
        engine.alloc_daq(1).unwrap();
        engine.alloc_odt(0, 1).unwrap();
        engine.alloc_odt_entry(0, 0, 1).unwrap();
        engine.set_daq_ptr(0, 0, 0).unwrap();
        engine.write_daq(addr_ext, addr, size).unwrap();
        engine.set_daq_list_mode(0, event_id, true, 0).unwrap();
        engine.start_stop_daq_list(0, true).unwrap();
    }

    #[test]
    fn test_state_machine_and_dispatch() {
        let engine = DaqEngine::new();
        let value: u32 = 0xAABBCCDD;
        let base = &value as *const u32 as *const u8;
        setup_one_entry_list(&engine, 7, mta::XCP_ADDR_EXT_DYN, mta::encode_dyn(7, 0), 4);
        assert!(engine.is_running(0).unwrap());

        let queue = Queue::new(4096, 1400);
        unsafe {
            engine.trigger_event(7, base, std::ptr::null(), &queue, 1234);
        }
        // No list bound to a different event fires.
        unsafe {
            engine.trigger_event(8, base, std::ptr::null(), &queue, 1234);
        }

        let seg = queue.peek_segment().unwrap();
        // header(4) + odt(1) + daq(1) + timestamp(4) + value(4)
        assert_eq!(seg.len(), 4 + 1 + 1 + 4 + 4);
        let payload = &seg[4..];
        assert_eq!(payload[0], 0); // odt number
        assert_eq!(payload[1], 0); // daq list number
        assert_eq!(&payload[6..10], &value.to_le_bytes());
    }

    #[test]
    fn test_alloc_refused_while_running() {
        let engine = DaqEngine::new();
        setup_one_entry_list(&engine, 1, mta::XCP_ADDR_EXT_REL, 0, 1);
        assert_eq!(engine.alloc_daq(2), Err(DaqError::NotAllowed));
        assert_eq!(engine.free_daq(), Err(DaqError::NotAllowed));
    }

    #[test]
    fn test_memory_overflow() {
        let engine = DaqEngine::new();
        engine.alloc_daq(1).unwrap();
        engine.alloc_odt(0, 1).unwrap();
        // Each call consumes budget like a bump allocator, even though it re-sizes the same
        // ODT; repeating it eventually exhausts DAQ_MEM_SIZE.
        let mut last = Ok(());
        for _ in 0..64 {
            last = engine.alloc_odt_entry(0, 0, 255);
            if last.is_err() {
                break;
            }
        }
        assert_eq!(last, Err(DaqError::MemoryOverflow));
    }

    #[test]
    fn test_start_stop_synch() {
        let engine = DaqEngine::new();
        engine.alloc_daq(2).unwrap();
        engine.set_daq_list_mode(0, 1, true, 0).unwrap();
        engine.set_daq_list_mode(1, 1, true, 0).unwrap();
        engine.start_stop_synch(true);
        assert!(engine.is_running(0).unwrap());
        assert!(engine.is_running(1).unwrap());
        engine.start_stop_synch(false);
        assert!(!engine.is_running(0).unwrap());
        assert!(!engine.is_running(1).unwrap());
    }
}
