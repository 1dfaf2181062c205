use super::types::*;
use crate::error::{Result, TsioError};
use crate::utils::Crc32Mpeg2;
use bytes::Bytes;
use log::warn;

/// Table-specific header plus the 12-bit section length field.
const SECTION_HEADER_SIZE: usize = 3;
/// Syntax sections end with a 32-bit CRC.
const SECTION_CRC_SIZE: usize = 4;
/// Extended header of a syntax section (table ID extension, version,
/// section numbers).
const SECTION_SYNTAX_HEADER_SIZE: usize = 5;

/// One decoded PSI section.
///
/// A closed variant: new table kinds are added here, not via downcasting.
/// `Unknown` carries the raw section bytes for tables this crate does not
/// interpret (their length was still honored so the walker can skip them).
#[derive(Debug, Clone, PartialEq)]
pub enum PsiSection {
    /// Program Association Table
    Pat(PAT),
    /// Program Map Table
    Pmt(PMT),
    /// Any other table, length-skipped and passed through raw
    Unknown {
        /// The section's table ID
        table_id: u8,
        /// The complete section bytes, header and CRC included
        data: Bytes,
    },
}

/// Parses reassembled PSI payloads into sections.
///
/// A PSI payload starts with a one-byte pointer field (offset to the first
/// section, skipping stuffing); sections are then packed back-to-back, each
/// self-delimited by its declared length, with 0xff stuffing after the last
/// one. The same walk answers both "is this buffer complete yet" while
/// packets are still arriving, and "what sections does it hold" once it is.
pub struct PsiParser {
    crc: Crc32Mpeg2,
}

impl PsiParser {
    pub fn new() -> Self {
        Self {
            crc: Crc32Mpeg2::new(),
        }
    }

    /// Whether every section the buffer declares is fully present.
    ///
    /// False means the buffer is still waiting on bytes from a future packet.
    pub fn is_complete(&self, payload: &[u8]) -> bool {
        if payload.is_empty() {
            return false;
        }
        let mut pos = 1 + payload[0] as usize;
        if pos > payload.len() {
            return false;
        }
        loop {
            if pos >= payload.len() || payload[pos] == TABLE_ID_STUFFING {
                return true;
            }
            if pos + SECTION_HEADER_SIZE > payload.len() {
                return false;
            }
            let total = SECTION_HEADER_SIZE + section_length(&payload[pos..]);
            if pos + total > payload.len() {
                return false;
            }
            pos += total;
        }
    }

    /// Decodes every section in a complete buffer, in buffer order.
    ///
    /// PAT and PMT sections failing their CRC are dropped with a warning and
    /// the walk resumes at the next declared boundary; lengths that overrun
    /// the buffer are not recoverable and fail the whole parse.
    pub fn parse_sections(&self, payload: &[u8]) -> Result<Vec<PsiSection>> {
        let mut sections = Vec::new();
        if payload.is_empty() {
            return Ok(sections);
        }
        let mut pos = 1 + payload[0] as usize;
        if pos > payload.len() {
            return Err(TsioError::MalformedSection(
                "pointer field past end of payload".into(),
            ));
        }

        while pos + SECTION_HEADER_SIZE <= payload.len() {
            let table_id = payload[pos];
            if table_id == TABLE_ID_STUFFING {
                break;
            }
            let total = SECTION_HEADER_SIZE + section_length(&payload[pos..]);
            if pos + total > payload.len() {
                return Err(TsioError::MalformedSection(format!(
                    "table {table_id:#04x}: declared length overruns payload"
                )));
            }
            let section = &payload[pos..pos + total];
            pos += total;

            match table_id {
                TABLE_ID_PAT | TABLE_ID_PMT => {
                    // A syntax section hashes to zero over its own CRC
                    if self.crc.calculate(section) != 0 {
                        warn!("table {table_id:#04x}: section CRC mismatch, dropped");
                        continue;
                    }
                    if table_id == TABLE_ID_PAT {
                        sections.push(PsiSection::Pat(parse_pat(section)?));
                    } else {
                        sections.push(PsiSection::Pmt(parse_pmt(section)?));
                    }
                }
                _ => sections.push(PsiSection::Unknown {
                    table_id,
                    data: Bytes::copy_from_slice(section),
                }),
            }
        }
        Ok(sections)
    }
}

impl Default for PsiParser {
    fn default() -> Self {
        Self::new()
    }
}

fn section_length(data: &[u8]) -> usize {
    (((data[1] & 0x0F) as usize) << 8) | data[2] as usize
}

fn parse_pat(section: &[u8]) -> Result<PAT> {
    let min = SECTION_HEADER_SIZE + SECTION_SYNTAX_HEADER_SIZE + SECTION_CRC_SIZE;
    if section.len() < min {
        return Err(TsioError::MalformedSection("PAT section too short".into()));
    }

    let mut pat = PAT::new();
    let mut pos = SECTION_HEADER_SIZE + SECTION_SYNTAX_HEADER_SIZE;
    let end = section.len() - SECTION_CRC_SIZE;

    while pos + 4 <= end {
        let program_number = ((section[pos] as u16) << 8) | section[pos + 1] as u16;
        let pid = (((section[pos + 2] & 0x1F) as u16) << 8) | section[pos + 3] as u16;
        pat.entries.push(PATEntry {
            program_number,
            network_pid: if program_number == 0 { pid } else { 0 },
            program_map_pid: if program_number != 0 { pid } else { 0 },
        });
        pos += 4;
    }

    Ok(pat)
}

fn parse_pmt(section: &[u8]) -> Result<PMT> {
    let min = SECTION_HEADER_SIZE + SECTION_SYNTAX_HEADER_SIZE + 4 + SECTION_CRC_SIZE;
    if section.len() < min {
        return Err(TsioError::MalformedSection("PMT section too short".into()));
    }

    let mut pmt = PMT::new();
    // Program number rides in the table ID extension
    pmt.program_number = ((section[3] as u16) << 8) | section[4] as u16;

    let mut pos = SECTION_HEADER_SIZE + SECTION_SYNTAX_HEADER_SIZE;
    let end = section.len() - SECTION_CRC_SIZE;

    pmt.pcr_pid = (((section[pos] & 0x1F) as u16) << 8) | section[pos + 1] as u16;
    pos += 2;

    let program_info_length = ((section[pos] as usize & 0x0F) << 8) | section[pos + 1] as usize;
    pos += 2;

    if pos + program_info_length > end {
        return Err(TsioError::MalformedSection(
            "program info overruns PMT section".into(),
        ));
    }
    pmt.program_descriptors = parse_descriptors(&section[pos..pos + program_info_length])?;
    pos += program_info_length;

    while pos + 5 <= end {
        let stream_type = section[pos];
        let elementary_pid = (((section[pos + 1] & 0x1F) as u16) << 8) | section[pos + 2] as u16;
        let es_info_length = ((section[pos + 3] as usize & 0x0F) << 8) | section[pos + 4] as usize;
        pos += 5;

        if pos + es_info_length > end {
            return Err(TsioError::MalformedSection(
                "ES info overruns PMT section".into(),
            ));
        }
        let descriptors = parse_descriptors(&section[pos..pos + es_info_length])?;
        pos += es_info_length;

        pmt.elementary_stream_infos.push(ElementaryStreamInfo {
            stream_type,
            elementary_pid,
            descriptors,
        });
    }

    Ok(pmt)
}

fn parse_descriptors(data: &[u8]) -> Result<Vec<Descriptor>> {
    let mut descriptors = Vec::new();
    let mut pos = 0;

    while pos + 2 <= data.len() {
        let tag = data[pos];
        let length = data[pos + 1] as usize;
        pos += 2;

        if pos + length > data.len() {
            return Err(TsioError::MalformedSection(
                "descriptor overruns its loop".into(),
            ));
        }
        descriptors.push(Descriptor {
            tag,
            data: data[pos..pos + length].to_vec(),
        });
        pos += length;
    }

    Ok(descriptors)
}
