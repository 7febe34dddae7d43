//-----------------------------------------------------------------------------
// Module daq
// Dynamic DAQ: event-triggered sampling into the transmit queue.

pub mod daq_event;
pub mod engine;

pub use daq_event::DaqEvent;
pub use engine::{DaqEngine, DaqError};
