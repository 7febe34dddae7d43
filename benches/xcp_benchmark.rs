// cargo bench
//
// Benchmarks the hot paths a running XCP slave actually exercises at runtime: calibration
// segment deref/sync, DAQ event trigger overhead and transmit queue drain throughput. Commands
// are dispatched directly through `Xcp::tl_command`, the same entry point the transport layer
// calls after stripping the wire header, so no socket or host-side client is involved.

use log::info;

use std::{thread, time::Duration};

use xcp::*;
use xcp_type_description::prelude::*;

use criterion::{criterion_group, criterion_main, Criterion};

//-----------------------------------------------------------------------------
// Calibration parameters

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, XcpTypeDescription)]
struct CalPage {
    #[type_description(comment = "Amplitude value")]
    #[type_description(min = "0")]
    #[type_description(max = "10000.0")]
    ampl: f64,

    delay: u32,
}

const CAL_PAGE: CalPage = CalPage { ampl: 123.456, delay: 100 };

//-----------------------------------------------------------------------------
// Frames the wire format from src/xcp/protocol, fed straight into Xcp::tl_command

const HEADER: usize = 4;

fn frame(cmd: u8, params: &[u8], ctr: u16) -> Vec<u8> {
    let mut f = Vec::with_capacity(HEADER + 1 + params.len());
    let dlc = (1 + params.len()) as u16;
    f.extend_from_slice(&dlc.to_le_bytes());
    f.extend_from_slice(&ctr.to_le_bytes());
    f.push(cmd);
    f.extend_from_slice(params);
    f
}

fn short_download_frame(ext: u8, addr: u32, data: &[u8], ctr: u16) -> Vec<u8> {
    let mut params = vec![data.len() as u8, 0x00, ext];
    params.extend_from_slice(&addr.to_le_bytes());
    params.extend_from_slice(data);
    frame(xcp::protocol::commands::SHORT_DOWNLOAD, &params, ctr)
}

//-----------------------------------------------------------------------------

fn xcp_benchmark(c: &mut Criterion) {
    println!("XCP Benchmark");

    env_logger::Builder::new()
        .target(env_logger::Target::Stdout)
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .try_init()
        .ok();

    // Start XCP server
    let xcp = XcpBuilder::new("xcp_benchmark")
        .set_log_level(XcpLogLevel::Warn)
        .set_epk("EPK_")
        .start_server(XcpTransportLayer::Udp, [127, 0, 0, 1], 5560)
        .unwrap();

    // Create a calibration segment
    let mut cal_page = xcp.create_calseg("CalPage", &CAL_PAGE);
    cal_page.register_fields();
    xcp.finalize_registry().unwrap();

    // Measurement signals
    let mut signal1: u32 = 0;
    let mut signal2: u64 = 0;
    let mut signal3: u8 = 0;
    let mut signal4: u8 = 0;
    let mut signal5: u16 = 0;
    let mut signal6: u32 = 0;
    let mut signal7: u64 = 0;
    let mut signal8: u32 = 0;

    // Register a measurement event and bind it to the signals
    let event = daq_create_event!("mainloop");
    daq_register!(signal1, event);
    daq_register!(signal2, event);
    daq_register!(signal3, event);
    daq_register!(signal4, event);
    daq_register!(signal5, event);
    daq_register!(signal6, event);
    daq_register!(signal7, event);
    daq_register!(signal8, event);

    thread::sleep(Duration::from_millis(200));

    // Bench calibration segment deref performance
    info!("Start calibration segment deref bench");
    {
        let mut deref_bench = c.benchmark_group("calibration segment deref");

        deref_bench.bench_function("deref no sync", |b| {
            b.iter(|| {
                let _x = cal_page.ampl;
            })
        });

        deref_bench.bench_function("deref with sync", |b| {
            b.iter(|| {
                cal_page.sync();
                let _x = cal_page.ampl;
            })
        });
    }

    // Bench calibration writes dispatched straight through Xcp::tl_command, and the
    // resulting sync() pickup on the application thread's local copy
    info!("Start calibration bench");
    let seg_index = (cal_page.get_index() + 1) as u32;
    let offset = {
        let page = CAL_PAGE;
        ((&page.ampl as *const f64 as usize) - (&page as *const CalPage as usize)) as u32
    };
    let addr = (seg_index << 16) | offset;
    let mut ctr: u16 = 0;
    let mut v: f64 = 0.0;
    c.bench_function("calibration download + sync", |b| {
        b.iter(|| {
            v += 0.1;
            let f = short_download_frame(0, addr, &v.to_le_bytes(), ctr);
            ctr = ctr.wrapping_add(1);
            xcp.tl_command(&f);
            cal_page.sync();
        })
    });
    info!("Calibration bench done, ampl = {}", cal_page.ampl);

    thread::sleep(Duration::from_millis(50));
    xcp.queue().clear();

    // Bench measurement trigger, the path that copies the bound signals into the transmit queue
    signal1 += 1;
    signal2 += 1;
    signal3 += 1;
    signal4 += 1;
    signal5 += 1;
    signal6 += 1;
    signal7 += 1;
    signal8 += 1;
    info!("Start measurement trigger bench");
    c.bench_function("trigger", |b| {
        b.iter(|| event.trigger())
    });
    info!("Measurement trigger bench done, packets lost = {}", xcp.queue().take_packets_lost());

    // Bench transmit queue drain throughput directly, without a transport layer in the loop
    info!("Start queue drain bench");
    for _ in 0..1000 {
        event.trigger();
    }
    c.bench_function("queue drain", |b| {
        b.iter(|| {
            if xcp.queue().has_data() {
                let _segment = xcp.queue().peek_segment();
            } else {
                event.trigger();
            }
        })
    });
    xcp.queue().clear();

    // Stop and shutdown the XCP server
    info!("Stop XCP server");
    xcp.stop_server();
    info!("Server stopped");
}

criterion_group!(benches, xcp_benchmark);
criterion_main!(benches);
