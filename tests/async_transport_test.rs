// Proves the protocol/DAQ/calibration core (Xcp::tl_command + the transmit queue) is transport
// agnostic: here it is driven by the tokio-based loop in xcp_server_task.rs instead of the
// crate's own blocking `start_server`, over a raw UDP socket, without any host-side client crate.

use std::thread;

use xcp::*;

mod common;
mod xcp_server_task;

use common::RawXcpClient;

#[tokio::test]
async fn test_async_transport_drives_protocol() {
    let _ = env_logger::builder().is_test(true).try_init();

    let xcp = Xcp::get();
    xcp.set_app_name("async_transport_test");
    xcp.set_app_revision("ASYN");
    xcp.finalize_registry().expect("finalize_registry failed");

    tokio::spawn(async move {
        xcp_server_task::xcp_task(xcp, [127, 0, 0, 1], 5557).await.ok();
    });

    // Give the tokio task a moment to bind before the client starts sending.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let joined = thread::spawn(|| {
        let mut client = RawXcpClient::connect("127.0.0.1:5557");

        let resp = client.connect_cmd();
        assert_eq!(resp[0], xcp::protocol::commands::PID_RES);

        let resp = client.get_status();
        assert_eq!(resp[0], xcp::protocol::commands::PID_RES);

        let resp = client.disconnect_cmd();
        assert_eq!(resp[0], xcp::protocol::commands::PID_RES);
    });
    joined.join().unwrap();

    assert!(!xcp.is_connected());
}
