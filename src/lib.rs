#![cfg(not(doctest))]
//#![warn(missing_docs)]

//-----------------------------------------------------------------------------
// Crate xcp
// Path: src/lib.rs

//
// Note that the tests can not be executed in parallel
// Use cargo test -- --test-threads=1 --features=serde --nocapture

//! A lightweight XCP on Ethernet implementation
//! The 'xcp' crate provides an XCP on ETH implementation,a wrapper type for calibration variables and
//! a registry to describe events, meaesurement and calibration objects for A2L generation.
//!
//! ## Example
//!
//! ```
//!
//! use xcp::*;
//! use xcp_type_description::prelude::*;
//!
//! #[derive(XcpTypeDescription)]
//! #[derive(serde::Serialize, serde::Deserialize)]
//! #[derive(Debug, Clone, Copy)]
//! struct CalPage {
//!     #[type_description(comment = "Amplitude")]
//!     #[type_description(unit = "Volt")]
//!     #[type_description(min = "0")]
//!     #[type_description(max = "400")]
//!     ampl: f64,
//!
//!     #[type_description(comment = "Period")]
//!     #[type_description(unit = "s")]
//!     #[type_description(min = "0")]
//!     #[type_description(max = "1000")]
//!     period: f64,
//! }
//!
//!
//! const CAL_PAGE: CalPage = CalPage {
//!     ampl: 100.0,
//!     period: 1.0,
//! };
//!
//! // Initialize XCP
//! let xcp = XcpBuilder::new("xcp_lite").start_server(XcpTransportLayer::Tcp, [127,0,0,1], 5555)?;
//!
//! // Create a calibration segment and auto register its fields as calibration variables
//! let cal_page = xcp.create_calseg("CalPage", &CAL_PAGE);
//!
//! // Create an event
//! let event = daq_create_event!("task1");
//!
//! let mut signal: f64 = 0.0;
//!
//! // Register a variable of basic type to be captured directly from stack
//! daq_register!(signal, event, "", "", 1.0, 0.0);
//!
//! loop {
//!
//!     signal += 0.1;
//!     if signal > cal_page.ampl { signal = 0.0; } // calibration parameter access to ampl
//!
//!     // Trigger event "task1" for data acquisition, reading variable signal from stack happens here
//!     event.trigger();
//!
//!     // Sync the calibration segment with modifications from the XCP client
//!     cal_page.sync();
//! }
//!
//! ```
//!
//!
//!

// This crate is a library
#![crate_type = "lib"]
// The library crate is named "xcp"
#![crate_name = "xcp"]

//-----------------------------------------------------------------------------

// Submodule clock
mod clock;

// Submodule daemon - optional Unix daemonization wrapper for running the server as a background process
#[cfg(unix)]
pub mod daemon;

// Submodule xcp
mod xcp;
pub use xcp::CalPageField;
pub use xcp::CalSeg;
pub use xcp::daq::daq_event::DaqEvent;
pub use xcp::Xcp;
pub use xcp::XcpBuilder;
pub use xcp::XcpCalPage;
pub use xcp::XcpError;
pub use xcp::XcpEvent;
pub use xcp::XcpLogLevel;
pub use xcp::XcpSessionStatus;
pub use xcp::XcpTransportLayer;

// @@@@ Reexport for integration tests
pub use xcp::xcp_test::test_reinit;
pub use xcp::protocol;

// Submodule registry
pub mod registry;
pub use registry::McValueType;
pub use registry::McValueTypeTrait;

