// Integration test driving a live XCP server over a real UDP socket, end to end from CONNECT
// through calibration download/upload to DISCONNECT. No host-side client crate: every command
// is hand-framed with the wire format from src/xcp/protocol and decoded back by hand.

use std::thread;
use std::time::Duration;

use xcp::protocol::commands;
use xcp::*;
use xcp_type_description::prelude::*;

mod common;
use common::{RawXcpClient, field_offset};

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, XcpTypeDescription)]
struct CalPage {
    #[type_description(comment = "Wrapping counter limit")]
    #[type_description(min = "0", max = "65535")]
    counter_max: u32,

    #[type_description(comment = "Enable flag")]
    run: bool,
}

const CAL_PAR: CalPage = CalPage { counter_max: 100, run: true };

#[test]
fn test_connect_calibrate_disconnect() {
    let _ = env_logger::builder().is_test(true).try_init();

    let xcp = XcpBuilder::new("protocol_wire_test")
        .set_log_level(XcpLogLevel::Warn)
        .set_epk("EPK_TEST")
        .start_server(XcpTransportLayer::Udp, [127, 0, 0, 1], 5556)
        .expect("start_server failed");

    let mut cal_seg = xcp.create_calseg("cal_seg", &CAL_PAR);
    cal_seg.register_fields();
    xcp.finalize_registry().expect("finalize_registry failed");

    let mut client = RawXcpClient::connect("127.0.0.1:5556");

    // CONNECT
    let resp = client.connect_cmd();
    assert_eq!(resp[0], commands::PID_RES);
    assert!(xcp.is_connected());

    // GET_STATUS
    let resp = client.get_status();
    assert_eq!(resp[0], commands::PID_RES);

    // GET_ID: application name
    let resp = client.get_id(0x00);
    assert_eq!(resp[0], commands::PID_RES);
    let len = u32::from_le_bytes(resp[2..6].try_into().unwrap()) as usize;
    let name = std::str::from_utf8(&resp[6..6 + len]).unwrap();
    assert_eq!(name, "protocol_wire_test");

    // Upload EPK through the reserved segment-0 EPK window (addr 0x80000000, ext SEG)
    let resp = client.short_upload(8, 0, 0x80000000);
    assert_eq!(resp[0], commands::PID_RES);
    assert_eq!(&resp[1..], b"EPK_TEST");

    // Calibrate counter_max via SHORT_DOWNLOAD, using the SEG address encoding
    // (segment index + 1 in the high bits, field byte offset in the low bits, per mta::encode_seg).
    let seg_index = (cal_seg.get_index() + 1) as u32;
    let page_instance = CAL_PAR;
    let offset = field_offset(&page_instance, &page_instance.counter_max) as u32;
    let addr = (seg_index << 16) | offset;

    let new_value: u32 = 4242;
    let resp = client.short_download(0, addr, &new_value.to_le_bytes());
    assert_eq!(resp[0], commands::PID_RES);

    cal_seg.sync();
    assert_eq!(cal_seg.counter_max, new_value);

    // Read it back over the wire too
    let resp = client.short_upload(4, 0, addr);
    assert_eq!(resp[0], commands::PID_RES);
    assert_eq!(u32::from_le_bytes(resp[1..5].try_into().unwrap()), new_value);

    // GET_DAQ_CLOCK: two calls a known delay apart should be monotonic and roughly consistent
    let t1 = client.get_daq_clock();
    thread::sleep(Duration::from_millis(5));
    let t2 = client.get_daq_clock();
    let ts1 = u32::from_le_bytes(t1[4..8].try_into().unwrap());
    let ts2 = u32::from_le_bytes(t2[4..8].try_into().unwrap());
    assert!(ts2 >= ts1);

    // DISCONNECT
    let resp = client.disconnect_cmd();
    assert_eq!(resp[0], commands::PID_RES);
    assert!(!xcp.is_connected());

    xcp.stop_server();
}
