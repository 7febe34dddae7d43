#![allow(dead_code)]

//----------------------------------------------------------------------------------------------
// Module cal_seg
// Typed, per-thread handle onto a calibration segment

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use super::engine::{CalPageKind, SegmentEngine};
use super::RegisterFieldsTrait;
use crate::xcp::Xcp;
use std::ops::Deref;
use std::sync::Arc;

//----------------------------------------------------------------------------------------------
// CalPageField, calseg_field! - manual field registration for calibration pages that don't
// derive XcpTypeDescription.

/// Manually described calibration page field, used by the `calseg_field!` macro.
#[derive(Debug, Clone, Copy)]
pub struct CalPageField {
    pub name: &'static str,
    pub datatype: crate::registry::McValueType,
    pub offset: u16,
    pub dim: (usize, usize),
    pub comment: Option<&'static str>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub unit: Option<&'static str>,
}

#[macro_export]
macro_rules! calseg_field {
    ( $name:ident.$field:ident ) => {{
        let offset = (&($name.$field) as *const _ as *const u8 as u64).wrapping_sub(&$name as *const _ as *const u8 as u64);
        CalPageField {
            name: stringify!($field),
            datatype: $name.$field.get_type(),
            offset: offset.try_into().expect("offset too large"),
            dim: (1, 1),
            comment: None,
            min: None,
            max: None,
            unit: None,
        }
    }};
}

//-----------------------------------------------------------------------------
// CalPageTrait - calibration pages must be plain-old-data, Send + Sync + Copy + 'static

#[cfg(feature = "serde")]
pub trait CalPageTrait: Sized + Send + Sync + Copy + Clone + 'static + serde::Serialize + serde::de::DeserializeOwned {}
#[cfg(feature = "serde")]
impl<T> CalPageTrait for T where T: Sized + Send + Sync + Copy + Clone + 'static + serde::Serialize + serde::de::DeserializeOwned {}

#[cfg(not(feature = "serde"))]
pub trait CalPageTrait: Sized + Send + Sync + Copy + Clone + 'static {}
#[cfg(not(feature = "serde"))]
impl<T> CalPageTrait for T where T: Sized + Send + Sync + Copy + Clone + 'static {}

//----------------------------------------------------------------------------------------------
// CalSeg<T>
//
// A typed, Send (not Sync) handle onto a calibration segment. Deref gives read access to
// whichever page is currently active for the application; `sync()` pulls the latest published
// page (see `SegmentEngine`) into this handle's thread-local typed copy. Each clone keeps its
// own typed copy so that Deref never needs to take a lock; only `sync()` does.

pub struct CalSeg<T>
where
    T: CalPageTrait,
{
    index: usize,
    default_page: &'static T,
    engine: Arc<SegmentEngine>,
    local_page: T,
    local_generation: u64,
}

impl<T> CalSeg<T>
where
    T: CalPageTrait,
{
    pub(crate) fn new(index: usize, engine: Arc<SegmentEngine>, default_page: &'static T) -> CalSeg<T> {
        CalSeg {
            index,
            default_page,
            engine,
            local_page: *default_page,
            local_generation: 0,
        }
    }

    /// The calibration segment's index in the registry / A2L `IF_DATA` segment list.
    pub fn get_index(&self) -> usize {
        self.index
    }

    /// The calibration segment's name, as registered at creation.
    pub fn get_name(&self) -> &'static str {
        Xcp::get().get_calseg_name(self.index)
    }

    /// Number of live handles sharing this segment's engine (this clone plus all others).
    pub fn get_clone_count(&self) -> usize {
        Arc::strong_count(&self.engine)
    }

    /// Pulls the latest published page into this handle's local typed copy, if it changed
    /// since the last sync. Returns `true` if the local copy was updated.
    pub fn sync(&mut self) -> bool {
        let generation = self.engine.generation();
        if generation == self.local_generation && self.engine.get_ecu_access() == CalPageKind::Ram {
            return false;
        }
        if self.engine.get_ecu_access() == CalPageKind::Flash {
            self.local_page = *self.default_page;
        } else {
            let page = self.engine.lock();
            debug_assert_eq!(page.len(), std::mem::size_of::<T>());
            // Safety: the engine guarantees `page` holds exactly `size_of::<T>()` bytes laid
            // out identically to `default_page`, since it was seeded from that same value.
            unsafe {
                std::ptr::copy_nonoverlapping(page.as_ptr(), &mut self.local_page as *mut T as *mut u8, std::mem::size_of::<T>());
            }
        }
        self.local_generation = generation;
        true
    }
}

impl<T> CalSeg<T>
where
    T: CalPageTrait + RegisterFieldsTrait,
{
    /// Registers all fields of this calibration page (via `XcpTypeDescription`) in the registry.
    pub fn register_fields(&self) -> &Self {
        self.default_page.register_fields(self.get_name());
        self
    }
}

#[cfg(feature = "serde")]
impl<T> CalSeg<T>
where
    T: CalPageTrait,
{
    /// Loads the working page from a JSON file, replacing the current working page.
    pub fn load<P: AsRef<std::path::Path>>(&self, filename: P) -> Result<(), std::io::Error> {
        let path = filename.as_ref();
        info!("Load {} from file {}", self.get_name(), path.display());
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let page: T = serde_json::from_reader(reader)?;
        let bytes = unsafe { std::slice::from_raw_parts(&page as *const T as *const u8, std::mem::size_of::<T>()) };
        self.engine.load_working_page(bytes);
        Ok(())
    }

    /// Saves the current working page to a JSON file.
    pub fn save<P: AsRef<std::path::Path>>(&self, filename: P) -> Result<(), std::io::Error> {
        let path = filename.as_ref();
        info!("Save {} to file {}", self.get_name(), path.display());
        let bytes = self.engine.working_page_bytes();
        // Safety: `bytes.len() == size_of::<T>()`, seeded from a `T` at segment creation.
        let page: T = unsafe { std::ptr::read(bytes.as_ptr() as *const T) };
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        let s = serde_json::to_string(&page).map_err(|e| std::io::Error::other(format!("serde_json::to_string failed: {}", e)))?;
        std::io::Write::write_all(&mut writer, s.as_ref())?;
        Ok(())
    }
}

impl<T> Deref for CalSeg<T>
where
    T: CalPageTrait,
{
    type Target = T;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.local_page
    }
}

impl<T> Clone for CalSeg<T>
where
    T: CalPageTrait,
{
    fn clone(&self) -> Self {
        CalSeg {
            index: self.index,
            default_page: self.default_page,
            engine: self.engine.clone(),
            local_page: self.local_page,
            local_generation: self.local_generation,
        }
    }
}

impl<T> std::fmt::Debug for CalSeg<T>
where
    T: CalPageTrait + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalSeg").field("index", &self.index).field("page", &self.local_page).finish()
    }
}

//----------------------------------------------------------------------------------------------
// CalSegTrait - object-safe facade used by the protocol layer to address segments generically

pub trait CalSegTrait: Send {
    fn engine(&self) -> &Arc<SegmentEngine>;
}

impl<T> CalSegTrait for CalSeg<T>
where
    T: CalPageTrait,
{
    fn engine(&self) -> &Arc<SegmentEngine> {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xcp::xcp_test;
    use xcp_type_description::prelude::*;

    #[derive(Debug, Clone, Copy, XcpTypeDescription)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    struct CalPageTest {
        byte1: u8,
        byte2: u8,
        byte3: u8,
        byte4: u8,
    }
    const CAL_PAGE_TEST: CalPageTest = CalPageTest { byte1: 0, byte2: 0, byte3: 0, byte4: 0 };

    #[test]
    fn test_calseg_deref_and_sync() {
        let xcp = xcp_test::test_setup(log::LevelFilter::Info);
        let mut calseg = xcp.create_calseg("CalPageTest", &CAL_PAGE_TEST);
        assert_eq!(calseg.byte1, 0);
        calseg.engine().write(0, 1, &[1]);
        calseg.engine().flush();
        assert!(calseg.sync());
        assert_eq!(calseg.byte1, 1);
    }
}
