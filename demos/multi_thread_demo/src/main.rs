// multi_thread_demo - one calibration segment shared (by clone) between several measurement tasks

#![allow(unused_imports)]

use anyhow::Result;
use log::{debug, error, info, trace, warn};
use std::net::Ipv4Addr;
use std::{
    f64::consts::PI,
    fmt::Debug,
    thread,
    time::{Duration, Instant},
};

use xcp::registry::*;
use xcp::*;

// Static application start time
lazy_static::lazy_static! {
    static ref START_TIME: Instant = Instant::now();
}

//-----------------------------------------------------------------------------
// Parameters

const APP_NAME: &str = "multi_thread_demo";

const MAINLOOP_CYCLE_TIME_US: u32 = 10000; // 10ms
const TASK_COUNT: u32 = 10;

//-----------------------------------------------------------------------------
// Command line arguments

const DEFAULT_LOG_LEVEL: u8 = 3; // Info
const DEFAULT_BIND_ADDR: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);
const DEFAULT_PORT: u16 = 5555;
const DEFAULT_TCP: bool = false; // UDP

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Log level (Off=0, Error=1, Warn=2, Info=3, Debug=4, Trace=5)
    #[arg(short, long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: u8,

    /// Bind address, default is ANY
    #[arg(short, long, default_value_t = DEFAULT_BIND_ADDR)]
    bind: Ipv4Addr,

    /// Use TCP as transport layer, default is UDP
    #[arg(short, long, default_value_t = DEFAULT_TCP)]
    tcp: bool,

    /// Port number
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Application name
    #[arg(short, long, default_value_t = String::from(APP_NAME))]
    name: String,
}

//-----------------------------------------------------------------------------
// Demo calibration parameters

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, XcpTypeDescription)]
struct Params {
    #[type_description(comment = "Task delay time in us")]
    #[type_description(min = "0", max = "2000000", unit = "us")]
    delay: u32,

    #[type_description(comment = "Amplitude of the sine signal")]
    #[type_description(unit = "Volt")]
    #[type_description(min = "0")]
    #[type_description(max = "500")]
    ampl: f64,

    #[type_description(comment = "Period of the sine signal")]
    #[type_description(unit = "s")]
    #[type_description(min = "0.001")]
    #[type_description(max = "10")]
    period: f64,

    #[type_description(comment = "Counter maximum value")]
    #[type_description(min = "0", max = "255")]
    counter_max: u32,
}

const CALPAGE1: Params = Params {
    delay: MAINLOOP_CYCLE_TIME_US,
    ampl: 100.0,
    period: 5.0,
    counter_max: 100,
};

//-----------------------------------------------------------------------------
// Demo task

// A task executed in multiple threads, each holding its own clone of the shared calibration segment
fn task(id: u32, mut calseg: CalSeg<Params>) {
    // Create a thread local event instance, with 16 byte capture buffer
    let mut event = daq_create_event_tli!("task", 16);
    println!("Task {id} started");

    // Demo signals
    let mut counter: u32 = 0;
    let mut sine: f64;

    loop {
        calseg.sync();

        thread::sleep(Duration::from_micros(calseg.delay as u64));

        // A counter wrapping at a value specified by a calibration parameter
        counter += 1;
        if counter > calseg.counter_max {
            counter = 0
        }

        // A sine signal with amplitude and period from calibration parameters and an offset from thread id
        let time = START_TIME.elapsed().as_micros() as f64 * 0.000001; // s
        sine = (id as f64) * 10.0 + calseg.ampl * ((PI * time) / calseg.period).sin();

        // Capture the values into the thread-local event's buffer and associate them with it
        daq_capture_tli!(counter, event);
        daq_capture_tli!(sine, event, "sine wave signal", "Volt", 1.0, 0.0);

        // Trigger the measurement event: takes a timestamp and sends the captured data
        event.trigger();
    }
}

//-----------------------------------------------------------------------------
// Demo application main

fn main() -> Result<()> {
    println!("XCP Multi Thread Demo");

    // Args
    let args = Args::parse();
    let log_level = match args.log_level {
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        5 => log::LevelFilter::Trace,
        _ => log::LevelFilter::Error,
    };

    // Logging
    env_logger::Builder::new()
        .target(env_logger::Target::Stdout)
        .filter_level(log_level)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    // XCP: Initialize the XCP server
    let app_name = args.name.as_str();
    let xcp = Xcp::get().set_app_name(app_name).set_log_level(args.log_level).start_server(
        if args.tcp { XcpTransportLayer::Tcp } else { XcpTransportLayer::Udp },
        args.bind.octets(),
        args.port,
    )?;

    // Create a calibration segment (a MEMORY_SEGMENT in A2L) from the const struct CALPAGE1.
    // Calibration segments have 2 pages, a constant default "FLASH" page and a mutable "RAM" page;
    // FLASH or XCP can be switched at runtime (XCP SET_CAL_PAGE), saved to json (feature serde)
    // and reinitialized from FLASH (XCP COPY_CAL_PAGE).
    let params = xcp.create_calseg("multi_thread_params", &CALPAGE1);
    params.register_fields(); // Register all struct fields (with metadata from annotations) in the A2L registry

    // Start multiple instances of the demo task, each with its own clone of the calibration segment
    let mut t = Vec::new();
    for i in 0..TASK_COUNT {
        let calseg = CalSeg::clone(&params);
        t.push(thread::spawn(move || {
            task(i, calseg);
        }));
    }

    // Wait some time until all threads have registered their measurement signals and events
    thread::sleep(Duration::from_millis(1000));
    xcp.finalize_registry().unwrap();

    // Wait for the threads to finish (they run until the process is killed)
    t.into_iter().for_each(|t| t.join().unwrap());

    // Stop the XCP server
    xcp.stop_server();

    Ok(())
}
