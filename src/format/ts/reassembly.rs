use super::types::TSPacket;
use log::{debug, warn};
use std::collections::HashMap;

/// A logical unit whose accumulation has ended: the packet that started it
/// plus every payload byte collected since.
#[derive(Debug)]
pub struct CompletedUnit {
    /// The unit-start packet, kept for routing context (PID, flags)
    pub first_packet: TSPacket,
    /// Reassembled payload bytes
    pub payload: Vec<u8>,
}

/// What a single `feed` call produced.
#[derive(Debug, Default)]
pub struct FeedOutcome {
    /// A previously accumulating unit closed out by a new unit start.
    pub superseded: Option<CompletedUnit>,
    /// Packets the reassembler no longer references, for pooling.
    pub recycled: Vec<TSPacket>,
}

/// Per-PID accumulation state. Created lazily on the first packet for a PID
/// and kept for the demuxer's lifetime; only its buffer drains when a unit
/// completes.
#[derive(Debug, Default)]
struct ReassemblyEntry {
    last_counter: Option<u8>,
    discontinuity: bool,
    first_packet: Option<TSPacket>,
    buffer: Vec<u8>,
}

/// Accumulates logical units across consecutive packets sharing a PID.
///
/// The transport does not guarantee delivery, so the policy here is lossy by
/// design: a unit start supersedes an unfinished unit, a continuity gap
/// discards the open buffer, and continuation bytes arriving before any unit
/// start are unrecoverable and dropped.
#[derive(Debug, Default)]
pub struct UnitReassembler {
    entries: HashMap<u16, ReassemblyEntry>,
}

impl UnitReassembler {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Feeds one packet into its PID's accumulator.
    pub fn feed(&mut self, packet: TSPacket) -> FeedOutcome {
        let mut outcome = FeedOutcome::default();
        let pid = packet.header.pid;
        let counter = packet.header.continuity_counter;
        let entry = self.entries.entry(pid).or_default();

        // An unchanged counter is the format's permitted retransmission;
        // the duplicate contributes nothing to reassembly
        if entry.last_counter == Some(counter) {
            debug!("pid {pid:#06x}: duplicate packet (counter {counter}), ignored");
            outcome.recycled.push(packet);
            return outcome;
        }

        if packet.header.payload_unit_start {
            entry.discontinuity = false;
            entry.last_counter = Some(counter);
            if let Some(first_packet) = entry.first_packet.take() {
                outcome.superseded = Some(CompletedUnit {
                    first_packet,
                    payload: std::mem::take(&mut entry.buffer),
                });
            }
            entry.buffer.extend_from_slice(&packet.payload);
            entry.first_packet = Some(packet);
            return outcome;
        }

        match entry.last_counter {
            None => {
                // Continuation before any unit start: unrecoverable fragment
                debug!("pid {pid:#06x}: payload before first unit start, dropped");
                outcome.recycled.push(packet);
            }
            Some(last) if counter != (last + 1) % 16 => {
                // Lost at least one packet; partial units are not decodable,
                // so discard and wait for the next unit start
                warn!(
                    "pid {pid:#06x}: continuity gap ({last} -> {counter}), \
                     discarding {} buffered bytes",
                    entry.buffer.len()
                );
                entry.discontinuity = true;
                entry.last_counter = Some(counter);
                entry.buffer.clear();
                if let Some(first_packet) = entry.first_packet.take() {
                    outcome.recycled.push(first_packet);
                }
                outcome.recycled.push(packet);
            }
            Some(_) => {
                entry.last_counter = Some(counter);
                if entry.first_packet.is_some() {
                    entry.buffer.extend_from_slice(&packet.payload);
                } else {
                    // No unit open (completed or discarded earlier)
                    debug!("pid {pid:#06x}: payload outside any unit, dropped");
                }
                outcome.recycled.push(packet);
            }
        }
        outcome
    }

    /// The bytes accumulated for `pid`'s open unit, if one is open.
    pub fn buffered(&self, pid: u16) -> Option<&[u8]> {
        let entry = self.entries.get(&pid)?;
        entry.first_packet.as_ref()?;
        Some(&entry.buffer)
    }

    /// Drains `pid`'s open unit.
    pub fn take(&mut self, pid: u16) -> Option<CompletedUnit> {
        let entry = self.entries.get_mut(&pid)?;
        let first_packet = entry.first_packet.take()?;
        Some(CompletedUnit {
            first_packet,
            payload: std::mem::take(&mut entry.buffer),
        })
    }

    /// Drops every accumulator and its in-flight bytes.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
