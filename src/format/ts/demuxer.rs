use super::parser::{detect_packet_size, PacketBuffer, TSPacketParser};
use super::pool::PacketPool;
use super::program::ProgramMap;
use super::psi::{PsiParser, PsiSection};
use super::reassembly::{CompletedUnit, UnitReassembler};
use super::types::*;
use crate::config;
use crate::error::{Result, TsioError};
use bytes::Bytes;
use log::debug;
use std::collections::{HashSet, VecDeque};
use std::io::SeekFrom;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tokio_util::sync::CancellationToken;

/// How many bytes the synchronizer reads to establish the frame grid:
/// enough for two frames of the largest candidate size plus one byte to
/// confirm the second sync position.
const PACKET_PROBE_SIZE: usize = 2 * 204 + 1;

/// Per-packet hook applied before reassembly.
///
/// May mutate the packet; returning `false` drops it. Useful for stripping
/// forward-error-correction artifacts or thinning test fixtures.
pub type PacketFilter = Box<dyn FnMut(&mut TSPacket) -> bool + Send>;

/// Options recognized by [`TSDemuxer::with_options`].
#[derive(Default)]
pub struct TSDemuxerOptions {
    /// Fixed packet size; skips auto-detection. Defaults to the process-wide
    /// configuration (`TSIO_PACKET_SIZE` / config file) when unset.
    pub packet_size: Option<usize>,
    /// PIDs whose reassembled units are emitted as raw passthrough data.
    pub passthrough_pids: HashSet<u16>,
    /// Emit sections with table IDs this crate does not interpret as raw
    /// data instead of skipping them.
    pub emit_unknown_sections: bool,
    /// Cooperative cancellation, checked before every blocking read.
    pub cancellation: Option<CancellationToken>,
    /// Per-packet filter/transform applied before reassembly.
    pub packet_filter: Option<PacketFilter>,
}

impl TSDemuxerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a fixed packet size, skipping auto-detection.
    pub fn with_packet_size(mut self, size: usize) -> Self {
        self.packet_size = Some(size);
        self
    }

    /// Requests raw passthrough data for units reassembled on `pid`.
    pub fn with_passthrough_pid(mut self, pid: u16) -> Self {
        self.passthrough_pids.insert(pid);
        self
    }

    /// Emits unknown table sections as raw data instead of skipping them.
    pub fn with_unknown_sections(mut self) -> Self {
        self.emit_unknown_sections = true;
        self
    }

    /// Attaches a cancellation token checked before every read.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Installs a per-packet filter invoked before reassembly.
    pub fn with_packet_filter(mut self, filter: PacketFilter) -> Self {
        self.packet_filter = Some(filter);
        self
    }
}

/// The decoded content of one [`DemuxerData`] unit.
#[derive(Debug, Clone, PartialEq)]
pub enum DataPayload {
    /// A decoded Program Association Table section
    Pat(PAT),
    /// A decoded Program Map Table section
    Pmt(PMT),
    /// A reassembled unit passed through raw (passthrough PIDs, unknown
    /// table sections)
    Raw(Bytes),
}

/// One externally observable demultiplexing result.
///
/// When a single buffer yields several sections, one `DemuxerData` is
/// emitted per section, in the order the sections appear in the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct DemuxerData {
    /// The packet that started the unit, kept for context (PID, flags)
    pub first_packet: TSPacket,
    /// Exactly one decoded result
    pub payload: DataPayload,
}

/// MPEG Transport Stream demuxer.
///
/// Pulls framed packets and fully reassembled data units from an ordered
/// byte source:
/// - packet synchronization with 188/192/204 frame-size auto-detection
/// - per-PID unit reassembly across packets, tolerant of duplicates and
///   lossy on continuity gaps
/// - PAT/PMT section parsing, including several sections packed into one
///   packet and sections split across packets
/// - rewind support on seekable sources
///
/// Owned by a single consumer; demultiplex independent streams with
/// independent instances.
pub struct TSDemuxer<R> {
    reader: R,
    parser: TSPacketParser,
    psi: PsiParser,
    packet_buffer: PacketBuffer,
    pool: PacketPool,
    reassembler: UnitReassembler,
    programs: ProgramMap,
    pending: VecDeque<DemuxerData>,
    passthrough_pids: HashSet<u16>,
    emit_unknown_sections: bool,
    cancellation: Option<CancellationToken>,
    packet_filter: Option<PacketFilter>,
    packet_size_override: Option<usize>,
    exhausted: bool,
    frame: Vec<u8>,
}

impl<R: AsyncRead + Unpin + Send> TSDemuxer<R> {
    /// Creates a demuxer with default options.
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, TSDemuxerOptions::default())
    }

    /// Creates a demuxer with explicit options.
    pub fn with_options(reader: R, options: TSDemuxerOptions) -> Self {
        let packet_size = options.packet_size.or_else(config::get_packet_size);
        Self {
            reader,
            parser: TSPacketParser::new(),
            psi: PsiParser::new(),
            packet_buffer: PacketBuffer::new(packet_size),
            pool: PacketPool::new(),
            reassembler: UnitReassembler::new(),
            programs: ProgramMap::new(),
            pending: VecDeque::new(),
            passthrough_pids: options.passthrough_pids,
            emit_unknown_sections: options.emit_unknown_sections,
            cancellation: options.cancellation,
            packet_filter: options.packet_filter,
            packet_size_override: packet_size,
            exhausted: false,
            frame: Vec::new(),
        }
    }

    /// The packet size in effect, once configured or detected.
    pub fn packet_size(&self) -> Option<usize> {
        self.packet_buffer.packet_size()
    }

    /// Program knowledge gathered from PAT sections so far.
    pub fn programs(&self) -> &ProgramMap {
        &self.programs
    }

    /// Mutable program knowledge, e.g. to pre-seed a PMT PID or clear the
    /// map before replaying a stream.
    pub fn programs_mut(&mut self) -> &mut ProgramMap {
        &mut self.programs
    }

    /// Reads the next framed packet.
    ///
    /// Returns [`TsioError::NoMorePackets`] once the source is exhausted at
    /// a packet boundary; every later call keeps returning it until
    /// `rewind`. A source ending mid-packet is malformed.
    pub async fn next_packet(&mut self) -> Result<TSPacket> {
        if let Some(token) = &self.cancellation {
            if token.is_cancelled() {
                return Err(TsioError::Cancelled);
            }
        }
        if self.exhausted {
            return Err(TsioError::NoMorePackets);
        }

        let packet_size = match self.packet_buffer.packet_size() {
            Some(size) => size,
            None => self.negotiate_packet_size().await?,
        };

        let mut frame = std::mem::take(&mut self.frame);
        frame.resize(packet_size, 0);
        let filled = fill_frame(&mut self.reader, &mut self.packet_buffer, &mut frame).await;

        let result = match filled {
            Err(err) => Err(err),
            Ok(0) => {
                self.exhausted = true;
                Err(TsioError::NoMorePackets)
            }
            Ok(n) if n < packet_size => Err(TsioError::MalformedPacket(format!(
                "stream ends mid-packet ({n} of {packet_size} bytes)"
            ))),
            Ok(_) => {
                let mut packet = self.pool.acquire();
                match self.parser.parse_packet(&frame, &mut packet) {
                    Ok(()) => Ok(packet),
                    Err(err) => {
                        self.pool.release(packet);
                        Err(err)
                    }
                }
            }
        };
        self.frame = frame;
        result
    }

    /// Returns the next fully-formed data unit.
    ///
    /// Drains previously produced units first, then keeps pulling packets
    /// until a unit completes. Propagates [`TsioError::NoMorePackets`] when
    /// the packets run out before any data does.
    pub async fn next_data(&mut self) -> Result<DemuxerData> {
        loop {
            if let Some(data) = self.pending.pop_front() {
                return Ok(data);
            }

            let mut packet = self.next_packet().await?;
            if packet.header.transport_error {
                self.pool.release(packet);
                continue;
            }
            if let Some(filter) = &mut self.packet_filter {
                if !filter(&mut packet) {
                    self.pool.release(packet);
                    continue;
                }
            }
            if !packet.header.contains_payload {
                self.pool.release(packet);
                continue;
            }

            let pid = packet.header.pid;
            let is_psi = pid == PID_PAT || self.programs.contains(pid);
            if !is_psi && !self.passthrough_pids.contains(&pid) {
                // Nobody asked for this PID
                self.pool.release(packet);
                continue;
            }

            let outcome = self.reassembler.feed(packet);
            for recycled in outcome.recycled {
                self.pool.release(recycled);
            }
            if let Some(unit) = outcome.superseded {
                if is_psi {
                    // A table superseded mid-accumulation never became
                    // decodable
                    debug!("pid {pid:#06x}: incomplete PSI unit superseded, dropped");
                    self.pool.release(unit.first_packet);
                } else {
                    self.pending.push_back(DemuxerData {
                        first_packet: unit.first_packet,
                        payload: DataPayload::Raw(Bytes::from(unit.payload)),
                    });
                }
            }

            if is_psi {
                let complete = match self.reassembler.buffered(pid) {
                    Some(buffered) => self.psi.is_complete(buffered),
                    None => false,
                };
                if complete {
                    let unit = self
                        .reassembler
                        .take(pid)
                        .expect("open unit disappeared between peek and take");
                    self.route_sections(unit)?;
                }
            }
        }
    }

    /// Decodes a completed PSI unit and queues one data item per section,
    /// in buffer order. PAT results update the program map before anything
    /// is handed out.
    fn route_sections(&mut self, unit: CompletedUnit) -> Result<()> {
        let sections = self.psi.parse_sections(&unit.payload)?;
        let first_packet = unit.first_packet;
        let mut emitted = false;

        for section in sections {
            let payload = match section {
                PsiSection::Pat(pat) => {
                    for entry in &pat.entries {
                        // Program number 0 names the NIT, which has no PMT
                        if entry.program_number != 0 {
                            self.programs
                                .set(entry.program_map_pid, entry.program_number);
                        }
                    }
                    DataPayload::Pat(pat)
                }
                PsiSection::Pmt(pmt) => DataPayload::Pmt(pmt),
                PsiSection::Unknown { table_id, data } => {
                    if !self.emit_unknown_sections {
                        debug!("table {table_id:#04x}: no consumer, section skipped");
                        continue;
                    }
                    DataPayload::Raw(data)
                }
            };
            self.pending.push_back(DemuxerData {
                first_packet: first_packet.clone(),
                payload,
            });
            emitted = true;
        }

        if !emitted {
            self.pool.release(first_packet);
        }
        Ok(())
    }

    /// Probes the stream head for the sync-byte grid and locks the frame
    /// size for the demuxer's lifetime (until `rewind`).
    async fn negotiate_packet_size(&mut self) -> Result<usize> {
        let mut probe = vec![0u8; PACKET_PROBE_SIZE];
        let filled = fill_frame(&mut self.reader, &mut self.packet_buffer, &mut probe).await?;
        if filled == 0 {
            self.exhausted = true;
            return Err(TsioError::NoMorePackets);
        }
        probe.truncate(filled);

        let at_eof = filled < PACKET_PROBE_SIZE;
        let (lead, size) = detect_packet_size(&probe, at_eof)?;
        debug!("detected packet size {size} (lead bytes: {lead})");
        self.packet_buffer.set_packet_size(size);
        self.packet_buffer.stash(&probe[lead..]);
        Ok(size)
    }
}

impl<R: AsyncRead + AsyncSeek + Unpin + Send> TSDemuxer<R> {
    /// Seeks the source back to its start and resets per-stream state: the
    /// pending data queue, the packet pool, in-flight reassembly and the
    /// detected packet size (an explicitly configured size is kept).
    ///
    /// Program knowledge is preserved; callers wanting a cold replay clear
    /// it with [`TSDemuxer::programs_mut`]. Returns the resulting absolute
    /// offset, 0 on success.
    pub async fn rewind(&mut self) -> Result<u64> {
        let offset = self.reader.seek(SeekFrom::Start(0)).await?;
        self.pending.clear();
        self.pool.reset();
        self.reassembler.clear();
        self.packet_buffer.reset(self.packet_size_override);
        self.exhausted = false;
        Ok(offset)
    }
}

/// Fills `out` from the stashed lookahead first, then the reader. Returns
/// how many bytes landed; fewer than `out.len()` means EOF.
async fn fill_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    packet_buffer: &mut PacketBuffer,
    out: &mut [u8],
) -> Result<usize> {
    let mut filled = packet_buffer.drain(out);
    while filled < out.len() {
        let n = reader.read(&mut out[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
