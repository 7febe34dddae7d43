//-----------------------------------------------------------------------------
// Module cal
// Calibration segment list: creation, registry wiring, and the engine each segment owns.

pub mod cal_seg;
pub mod engine;

pub use cal_seg::CalPageField;
pub use cal_seg::CalPageTrait;
pub use cal_seg::CalSeg;
pub use engine::CalPageKind;
use cal_seg::CalSegTrait;
use engine::SegmentEngine;

use std::sync::Arc;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::registry;
use crate::registry::{McAddress, McDimType, McObjectType, McSupportData, McValueType};

//-----------------------------------------------------------------------------
// RegisterFieldsTrait - auto-registers all fields of a calibration page type that derives
// XcpTypeDescription into the registry as A2L characteristics.

pub trait RegisterFieldsTrait
where
    Self: Sized + Send + Sync + Copy + Clone + 'static + xcp_type_description::XcpTypeDescription,
{
    fn register_fields(&self, calseg_name: &'static str) -> &Self;
}

impl<T> RegisterFieldsTrait for T
where
    T: Sized + Send + Sync + Copy + Clone + 'static + xcp_type_description::XcpTypeDescription,
{
    fn register_fields(&self, calseg_name: &'static str) -> &Self {
        trace!("Register all fields in {}", calseg_name);
        for field in self.type_description().unwrap().iter() {
            let support = McSupportData::new(McObjectType::Characteristic)
                .set_comment(field.comment())
                .set_unit(field.unit())
                .set_min(Some(field.min()))
                .set_max(Some(field.max()));

            let dim_type = McDimType::new_with_metadata(
                McValueType::from_rust_type(field.datatype()),
                if field.x_dim() == 0 { 1 } else { field.x_dim() as u16 },
                if field.y_dim() == 0 { 1 } else { field.y_dim() as u16 },
                support,
            );
            let address = McAddress::new_calseg_rel(calseg_name, field.offset() as i32);

            registry::get_lock()
                .as_mut()
                .unwrap()
                .instance_list
                .add_instance(field.name().to_string(), dim_type, address)
                .expect("duplicate characteristic");
        }
        self
    }
}

//-----------------------------------------------------------------------------
// CalSegDescriptor / CalSegList

struct CalSegDescriptor {
    name: &'static str,
    engine: Arc<SegmentEngine>,
}

/// List of all calibration segments created through the `Xcp` singleton.
pub struct CalSegList(Vec<CalSegDescriptor>);

impl CalSegList {
    pub fn new() -> CalSegList {
        CalSegList(Vec::new())
    }

    /// Creates a calibration segment for page type `T`.
    /// # Panics
    /// If the name already exists, or the page size is zero or exceeds 64k.
    pub fn create_calseg<T>(&mut self, name: &'static str, default_page: &'static T) -> CalSeg<T>
    where
        T: CalPageTrait,
    {
        let size = std::mem::size_of::<T>();
        assert!(size != 0 && size <= 0x10000, "CalSeg {} page size is 0 or exceeds 64k", name);
        assert!(self.0.iter().all(|s| s.name != name), "CalSeg {} already exists", name);

        let index = self.0.len();
        let bytes = unsafe { std::slice::from_raw_parts(default_page as *const T as *const u8, size) };
        let engine = Arc::new(SegmentEngine::new(bytes.to_vec()));
        self.0.push(CalSegDescriptor { name, engine: engine.clone() });

        info!("Create CalSeg {} index={} size={}", name, index, size);
        CalSeg::new(index, engine, default_page)
    }

    pub fn get_name(&self, index: usize) -> &'static str {
        self.0[index].name
    }

    pub fn get_index(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|s| s.name == name)
    }

    pub fn engine(&self, index: usize) -> &Arc<SegmentEngine> {
        &self.0[index].engine
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Registers all calibration segments (in creation order) in the registry.
    pub fn register(&mut self) {
        for (i, d) in self.0.iter().enumerate() {
            trace!("Register CalSeg {}, size={}", d.name, d.engine.size());
            let _ = registry::get_lock()
                .as_mut()
                .unwrap()
                .cal_seg_list
                .add_cal_seg(d.name, i.try_into().unwrap(), d.engine.size().try_into().unwrap());
        }
    }

    pub fn set_freeze_request(&self) {
        self.0.iter().for_each(|d| d.engine.set_freeze_request());
    }

    pub fn set_init_request(&self) {
        self.0.iter().for_each(|d| d.engine.set_init_request());
    }

    /// Reads from the segment's engine for a `DOWNLOAD`/`UPLOAD`-class command.
    pub fn read_from(&self, index: usize, offset: u16, len: u8, dst: &mut [u8]) -> bool {
        self.0.get(index).is_some_and(|d| d.engine.read(offset, len, dst))
    }

    /// Writes into the segment's working page for a `DOWNLOAD`-class command.
    pub fn write_to(&self, index: usize, offset: u16, len: u8, src: &[u8]) -> bool {
        self.0.get(index).is_some_and(|d| d.engine.write(offset, len, src))
    }

    /// Flushes pending writes of all segments, forcing immediate republication.
    pub fn flush(&self) {
        self.0.iter().for_each(|d| d.engine.flush());
    }

    /// `GET_CAL_PAGE`: current (ecu, xcp) page selection of one segment.
    pub fn get_page(&self, index: usize) -> Option<(CalPageKind, CalPageKind)> {
        self.0.get(index).map(|d| (d.engine.get_ecu_access(), d.engine.get_xcp_access()))
    }

    /// `SET_CAL_PAGE`: selects the page a segment's ECU and/or XCP access goes through.
    pub fn set_page(&self, index: usize, ecu: Option<CalPageKind>, xcp: Option<CalPageKind>) -> bool {
        let Some(d) = self.0.get(index) else { return false };
        if let Some(k) = ecu {
            d.engine.set_ecu_access(k);
        }
        if let Some(k) = xcp {
            d.engine.set_xcp_access(k);
        }
        true
    }

    /// `SET_CAL_PAGE` with the `ALL` mode bit: applies the same selection to every segment.
    pub fn set_page_all(&self, ecu: Option<CalPageKind>, xcp: Option<CalPageKind>) {
        for d in &self.0 {
            if let Some(k) = ecu {
                d.engine.set_ecu_access(k);
            }
            if let Some(k) = xcp {
                d.engine.set_xcp_access(k);
            }
        }
    }

    /// `COPY_CAL_PAGE` restricted to default -> working (spec open question (b)).
    pub fn copy_default_to_working(&self, index: usize) -> bool {
        let Some(d) = self.0.get(index) else { return false };
        d.engine.copy_default_to_working();
        true
    }

    /// `SET_SEGMENT_MODE`: persists the freeze-enable mode byte for one segment.
    pub fn set_mode(&self, index: usize, mode: u8) -> bool {
        let Some(d) = self.0.get(index) else { return false };
        d.engine.set_mode(mode);
        true
    }

    /// `GET_SEGMENT_MODE`: current mode byte of one segment.
    pub fn get_mode(&self, index: usize) -> Option<u8> {
        self.0.get(index).map(|d| d.engine.get_mode())
    }
}

impl Default for CalSegList {
    fn default() -> Self {
        Self::new()
    }
}

// Silence an unused-import warning when the `CalSegTrait` object-safety marker isn't otherwise
// referenced outside this module.
#[allow(unused)]
fn _assert_object_safe(_: &dyn CalSegTrait) {}
