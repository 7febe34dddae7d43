//----------------------------------------------------------------------------------------------
// Module queue
// Multi-producer / single-consumer transmit queue (C2)
//
// Producers (protocol responses, DAQ event dispatch from any application thread) reserve a
// buffer, fill it, and commit it; the consumer (the transport adapter's send loop) drains
// committed messages, coalesced into transport segments bounded by MAX_SEGMENT_SIZE.
//
// Each queued message is framed exactly like it appears on the wire: `{u16 dlc, u16 ctr,
// bytes[dlc]}`, dlc/ctr little-endian, so a drained segment can be written to the socket
// without any further copying of the header.
//
// The spec admits three equivalent consistency strategies for the consumer's view of
// (head, tail): a mutex, a seqlock, or a lock-free design that clears released memory. We use
// a single `parking_lot::Mutex` guarding the ring buffer and cursors: a producer's entire
// acquire-write-commit sequence is one critical section (satisfying "producers never block on
// each other longer than one mutex acquisition"), which keeps the implementation auditable
// without unsafe lock-free bookkeeping we cannot test by running it.

use parking_lot::Mutex;

/// Size of the wire-visible message header: `u16 dlc`, `u16 ctr`.
pub const HEADER: usize = 4;

/// Marks a reserved-but-not-yet-committed header slot; never observed by the consumer.
const CTR_RESERVED: u16 = 0xFFFF;
/// Marks a committed header slot whose final outbound sequence number is not assigned yet.
const CTR_COMMITTED: u16 = 0xFFFE;
/// Marks a padding entry filling the unused tail of the ring before a wrap; `peek_segment`
/// releases it without ever exposing it to the consumer.
const CTR_PADDING: u16 = 0xFFFD;

/// Byte alignment every queued entry is padded to.
pub const PACKET_ALIGNMENT: usize = 4;

fn aligned_len(payload_len: usize) -> usize {
    let total = HEADER + payload_len;
    (total + PACKET_ALIGNMENT - 1) / PACKET_ALIGNMENT * PACKET_ALIGNMENT
}

struct QueueState {
    buf: Vec<u8>,
    /// Byte offset of the first unreleased entry.
    tail: usize,
    /// Byte offset one past the last reserved entry.
    head: usize,
    /// Bytes in flight (reserved or committed, not yet released).
    used: usize,
    packets_lost: u64,
    next_ctr_out: u16,
    flush: bool,
}

/// MPSC byte-stream queue of framed XCP messages.
pub struct Queue {
    state: Mutex<QueueState>,
    capacity: usize,
    max_segment_size: usize,
}

impl Queue {
    /// Creates a queue with the given total byte capacity and maximum segment size handed to
    /// the consumer in one `peek_segment()` call.
    pub fn new(capacity: usize, max_segment_size: usize) -> Queue {
        Queue {
            state: Mutex::new(QueueState {
                buf: vec![0u8; capacity],
                tail: 0,
                head: 0,
                used: 0,
                packets_lost: 0,
                next_ctr_out: 0,
                flush: false,
            }),
            capacity,
            max_segment_size,
        }
    }

    /// Reserves space for a message of `payload_len` bytes, calls `fill` with the writable
    /// payload slice, then commits it. Returns `false` (and counts a loss) if the queue has no
    /// room. `payload_len` must not exceed `max_segment_size - HEADER`.
    pub fn push(&self, payload_len: usize, fill: impl FnOnce(&mut [u8])) -> bool {
        let needed = aligned_len(payload_len);
        let mut s = self.state.lock();
        let mut off = s.head % self.capacity;
        // The ring never splits a single entry across its physical end. If this entry would
        // straddle it, waste the leftover tail bytes as a padding entry the consumer skips, and
        // place the real entry at the front instead - rather than rejecting it outright even
        // when the ring has ample free space elsewhere.
        let mut gap = 0usize;
        if off + needed > self.capacity {
            gap = self.capacity - off;
            if gap < HEADER {
                // Not enough room even for a padding header; only possible if capacity isn't a
                // multiple of PACKET_ALIGNMENT.
                s.packets_lost += 1;
                return false;
            }
            off = 0;
        }
        if s.used + gap + needed > self.capacity {
            s.packets_lost += 1;
            return false;
        }
        if gap > 0 {
            let pad_off = s.head % self.capacity;
            let pad = &mut s.buf[pad_off..pad_off + gap];
            pad[0..2].copy_from_slice(&((gap - HEADER) as u16).to_le_bytes());
            pad[2..4].copy_from_slice(&CTR_PADDING.to_le_bytes());
        }
        s.head += gap + needed;
        s.used += gap + needed;

        let entry = &mut s.buf[off..off + needed];
        entry[0..2].copy_from_slice(&(payload_len as u16).to_le_bytes());
        entry[2..4].copy_from_slice(&CTR_RESERVED.to_le_bytes());
        fill(&mut entry[HEADER..HEADER + payload_len]);
        // Commit: release-ordered with respect to the payload write above because both happen
        // while still holding the mutex.
        entry[2..4].copy_from_slice(&CTR_COMMITTED.to_le_bytes());
        true
    }

    /// Requests that the next `peek_segment()` return immediately even if little data has
    /// accumulated.
    pub fn flush(&self) {
        self.state.lock().flush = true;
    }

    /// Returns the accumulated packet loss count since the last call and resets it to zero.
    pub fn take_packets_lost(&self) -> u64 {
        let mut s = self.state.lock();
        std::mem::take(&mut s.packets_lost)
    }

    pub fn max_segment_size(&self) -> usize {
        self.max_segment_size
    }

    pub fn has_data(&self) -> bool {
        let s = self.state.lock();
        s.used > 0
    }

    /// Resets the queue to empty, discarding any pending or committed entries. Used by test
    /// setup to isolate runs sharing the singleton queue.
    pub fn clear(&self) {
        let mut s = self.state.lock();
        s.buf.iter_mut().for_each(|b| *b = 0);
        s.tail = 0;
        s.head = 0;
        s.used = 0;
        s.packets_lost = 0;
        s.next_ctr_out = 0;
        s.flush = false;
    }

    /// Drains the largest prefix of committed messages (up to `max_segment_size`), assigning
    /// each one the next outbound sequence number, and returns it as one contiguous byte
    /// buffer ready to hand to the socket. Returns `None` if nothing is ready.
    pub fn peek_segment(&self) -> Option<Vec<u8>> {
        let mut s = self.state.lock();
        if s.used == 0 {
            s.flush = false;
            return None;
        }

        let mut out = Vec::new();
        let mut walked = 0usize;
        loop {
            if s.used - walked == 0 {
                break;
            }
            let off = (s.tail + walked) % self.capacity;
            if off + HEADER > self.capacity {
                break; // would wrap mid header, stop segment here
            }
            let dlc = u16::from_le_bytes([s.buf[off], s.buf[off + 1]]) as usize;
            let ctr = u16::from_le_bytes([s.buf[off + 2], s.buf[off + 3]]);
            if ctr == CTR_RESERVED {
                break; // producer still writing, stop here
            }
            if ctr == CTR_PADDING {
                walked += HEADER + dlc; // release the wrap padding, never part of the output
                continue;
            }
            let entry_len = aligned_len(dlc);
            if out.len() + entry_len > self.max_segment_size {
                break;
            }
            // Assign the real outbound sequence number now, at dequeue time.
            let seq = s.next_ctr_out;
            s.next_ctr_out = s.next_ctr_out.wrapping_add(1);
            s.buf[off + 2..off + 4].copy_from_slice(&seq.to_le_bytes());

            out.extend_from_slice(&s.buf[off..off + HEADER + dlc]);
            walked += entry_len;
        }

        s.flush = false;
        if out.is_empty() {
            None
        } else {
            // Zero the drained region so stale bytes can never masquerade as a reservation.
            for i in 0..walked {
                let off = (s.tail + i) % self.capacity;
                s.buf[off] = 0;
            }
            s.tail += walked;
            s.used -= walked;
            Some(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let q = Queue::new(4096, 1400);
        for i in 0u8..10 {
            assert!(q.push(4, |buf| buf.copy_from_slice(&[i, i, i, i])));
        }
        let seg = q.peek_segment().unwrap();
        let mut off = 0;
        let mut expect = 0u8;
        while off < seg.len() {
            let dlc = u16::from_le_bytes([seg[off], seg[off + 1]]) as usize;
            let payload = &seg[off + HEADER..off + HEADER + dlc];
            assert_eq!(payload, &[expect, expect, expect, expect]);
            expect += 1;
            off += aligned_len(dlc);
        }
        assert_eq!(expect, 10);
    }

    #[test]
    fn test_loss_accounting() {
        let q = Queue::new(32, 32);
        let mut pushed = 0;
        for i in 0u8..20 {
            if q.push(4, |buf| buf.copy_from_slice(&[i, i, i, i])) {
                pushed += 1;
            }
        }
        assert!(pushed < 20);
        let _ = q.peek_segment();
        assert_eq!(q.take_packets_lost(), (20 - pushed) as u64);
        assert_eq!(q.take_packets_lost(), 0);
    }

    #[test]
    fn test_push_relocates_across_wrap_when_space_allows() {
        // Capacity 100 does not divide evenly by the 8-byte aligned entry size, so head lands
        // at 96 after 12 pushes: the next entry would straddle the physical wrap point even
        // though the whole ring is free.
        let q = Queue::new(100, 100);
        for i in 0u8..12 {
            assert!(q.push(4, |buf| buf.copy_from_slice(&[i; 4])));
        }
        let seg = q.peek_segment().unwrap();
        assert_eq!(seg.len(), 12 * 8);

        assert!(q.push(4, |buf| buf.copy_from_slice(&[0xAA; 4])));
        assert_eq!(q.take_packets_lost(), 0);
        let seg = q.peek_segment().unwrap();
        assert_eq!(&seg[HEADER..HEADER + 4], &[0xAA; 4]);
    }

    #[test]
    fn test_segment_size_cap() {
        let q = Queue::new(4096, 16);
        for i in 0u8..4 {
            assert!(q.push(8, |buf| buf.fill(i)));
        }
        let seg = q.peek_segment().unwrap();
        assert!(seg.len() <= 16);
    }
}
