//----------------------------------------------------------------------------------------------
// Module clock
// Monotonic clock source for the XCP protocol (C1)
//
// Exposes a 64 bit, monotonically non-decreasing tick count. The unit (1ns or 1us) is a
// build-time constant; the host never needs to assume a particular unit because it reads
// it from GET_DAQ_RESOLUTION_INFO / TIME_CORRELATION_PROPERTIES.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Tick resolution reported to the host in `GET_DAQ_RESOLUTION_INFO`.
/// `0x03` = 1ns per XCP's `DAQ_TIMESTAMP_UNIT` encoding, `0x06` = 1us.
pub const XCP_TIMESTAMP_UNIT_NS: u8 = 0x03;

/// Selects the fixed tick resolution for this build. XCPlite targets default to nanoseconds
/// on platforms with a cheap high resolution monotonic source.
const TICK_NANOS: u64 = 1;

struct ClockBase {
    start: Instant,
    last: AtomicU64,
}

impl ClockBase {
    fn new() -> ClockBase {
        ClockBase {
            start: Instant::now(),
            last: AtomicU64::new(0),
        }
    }

    /// Monotonic, non-decreasing 64 bit tick count since process start.
    /// Successive calls from the same thread never go backwards: on platforms where
    /// `Instant` could (in theory) stall or alias, we clamp to the last observed value.
    fn now(&self) -> u64 {
        let elapsed = self.start.elapsed();
        let ticks = (elapsed.as_nanos() / TICK_NANOS as u128) as u64;
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            if ticks <= last {
                return last;
            }
            match self.last.compare_exchange_weak(last, ticks, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return ticks,
                Err(observed) => last = observed,
            }
        }
    }
}

lazy_static::lazy_static! {
    static ref CLOCK: ClockBase = ClockBase::new();
}

/// Returns the current XCP timestamp tick count.
pub fn now() -> u64 {
    CLOCK.now()
}

/// Reports the tick unit of this build (for `GET_DAQ_RESOLUTION_INFO`).
pub fn timestamp_unit() -> u8 {
    XCP_TIMESTAMP_UNIT_NS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic() {
        let mut last = now();
        for _ in 0..1000 {
            let t = now();
            assert!(t >= last);
            last = t;
        }
    }
}
