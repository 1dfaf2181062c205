//! # MPEG Transport Stream (TS) Demultiplexing
//!
//! This module implements the demultiplexing side of MPEG Transport Stream
//! (ITU-T H.222.0 / ISO/IEC 13818-1), including support for:
//!
//! - Packet synchronization with 188/192/204 frame-size auto-detection
//! - Per-PID payload reassembly across packets (continuity counters,
//!   unit-start boundaries)
//! - Program Specific Information (PSI) tables: PAT and PMT, with multiple
//!   sections packed into one packet or split across packets
//! - A pull-based iteration API with rewind support
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tsio::format::ts::{DataPayload, TSDemuxer};
//! use tsio::TsioError;
//!
//! # async fn demux() -> Result<(), Box<dyn std::error::Error>> {
//! let file = tokio::fs::File::open("stream.ts").await?;
//! let mut demuxer = TSDemuxer::new(file);
//!
//! loop {
//!     match demuxer.next_data().await {
//!         Ok(data) => match data.payload {
//!             DataPayload::Pat(pat) => println!("PAT: {} programs", pat.entries.len()),
//!             DataPayload::Pmt(pmt) => println!("PMT for program {}", pmt.program_number),
//!             DataPayload::Raw(raw) => println!("raw unit: {} bytes", raw.len()),
//!         },
//!         Err(TsioError::NoMorePackets) => break,
//!         Err(err) => return Err(err.into()),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// TS demuxer implementation: iteration, routing and rewind
pub mod demuxer;

/// Low-level packet framing and sync-byte handling
pub mod parser;

/// Reusable packet storage
pub mod pool;

/// PMT PID to program number mapping
pub mod program;

/// PSI section parsing (PAT/PMT)
pub mod psi;

/// Per-PID unit reassembly
pub mod reassembly;

/// Core TS types and constants
pub mod types;

// Re-export commonly used types and constants
pub use demuxer::{DataPayload, DemuxerData, PacketFilter, TSDemuxer, TSDemuxerOptions};
pub use parser::TSPacketParser;
pub use pool::PacketPool;
pub use program::ProgramMap;
pub use psi::{PsiParser, PsiSection};
pub use reassembly::UnitReassembler;
pub use types::{
    AdaptationField,
    Descriptor,
    ElementaryStreamInfo,
    TSHeader,
    TSPacket,
    PAT,
    PATEntry,
    PID_PAT,
    PMT,
    STREAM_TYPE_AAC,
    STREAM_TYPE_H264,
    STREAM_TYPE_H265,
    SYNC_BYTE,
    TS_PACKET_SIZE,
};

#[cfg(test)]
pub(crate) mod test_support {
    use super::types::*;
    use crate::utils::Crc32Mpeg2;

    /// Builds a syntax section: 3-byte header, 5-byte extended header,
    /// `body`, CRC32.
    pub fn syntax_section(table_id: u8, table_id_extension: u16, body: &[u8]) -> Vec<u8> {
        let section_length = 5 + body.len() + 4;
        let mut section = Vec::with_capacity(3 + section_length);
        section.push(table_id);
        section.push(0xB0 | ((section_length >> 8) as u8 & 0x0F));
        section.push(section_length as u8);
        section.push((table_id_extension >> 8) as u8);
        section.push(table_id_extension as u8);
        section.push(0xC1); // version 0, current
        section.push(0x00); // section number
        section.push(0x00); // last section number
        section.extend_from_slice(body);
        let crc = Crc32Mpeg2::new().calculate(&section);
        section.extend_from_slice(&crc.to_be_bytes());
        section
    }

    /// A PAT section over `(program_number, pid)` entries. Program number 0
    /// declares the NIT PID.
    pub fn pat_section(entries: &[(u16, u16)]) -> Vec<u8> {
        let mut body = Vec::new();
        for &(program_number, pid) in entries {
            body.push((program_number >> 8) as u8);
            body.push(program_number as u8);
            body.push(0xE0 | ((pid >> 8) as u8 & 0x1F));
            body.push(pid as u8);
        }
        syntax_section(TABLE_ID_PAT, 0x0001, &body)
    }

    /// A PMT section over `(stream_type, elementary_pid, descriptors)`
    /// entries, descriptors as `(tag, data)` pairs.
    pub fn pmt_section(
        program_number: u16,
        pcr_pid: u16,
        streams: &[(u8, u16, Vec<(u8, Vec<u8>)>)],
    ) -> Vec<u8> {
        let mut body = Vec::new();
        body.push(0xE0 | ((pcr_pid >> 8) as u8 & 0x1F));
        body.push(pcr_pid as u8);
        body.push(0xF0); // no program descriptors
        body.push(0x00);
        for (stream_type, pid, descriptors) in streams {
            let mut es_info = Vec::new();
            for (tag, data) in descriptors {
                es_info.push(*tag);
                es_info.push(data.len() as u8);
                es_info.extend_from_slice(data);
            }
            body.push(*stream_type);
            body.push(0xE0 | ((pid >> 8) as u8 & 0x1F));
            body.push(*pid as u8);
            body.push(0xF0 | ((es_info.len() >> 8) as u8 & 0x0F));
            body.push(es_info.len() as u8);
            body.extend_from_slice(&es_info);
        }
        syntax_section(TABLE_ID_PMT, program_number, &body)
    }

    /// A private section (syntax indicator 0) with an opaque body.
    pub fn private_section(table_id: u8, body_len: usize) -> Vec<u8> {
        let mut section = vec![
            table_id,
            0x30 | ((body_len >> 8) as u8 & 0x0F),
            body_len as u8,
        ];
        section.extend((0..body_len).map(|i| i as u8));
        section
    }

    /// Pointer field plus packed sections, ready for a unit-start payload.
    pub fn psi_payload(sections: &[Vec<u8>]) -> Vec<u8> {
        let mut payload = vec![0u8];
        for section in sections {
            payload.extend_from_slice(section);
        }
        payload
    }

    /// Frames `payload` into one 188-byte packet, stuffed with 0xFF.
    pub fn ts_packet(pid: u16, counter: u8, unit_start: bool, payload: &[u8]) -> Vec<u8> {
        assert!(payload.len() <= TS_PACKET_SIZE - TS_HEADER_SIZE);
        let mut frame = vec![0xFFu8; TS_PACKET_SIZE];
        frame[0] = SYNC_BYTE;
        frame[1] = ((pid >> 8) as u8) & 0x1F;
        if unit_start {
            frame[1] |= 0x40;
        }
        frame[2] = pid as u8;
        frame[3] = 0x10 | (counter & 0x0F);
        frame[4..4 + payload.len()].copy_from_slice(payload);
        frame
    }
}
