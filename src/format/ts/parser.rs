use super::types::*;
use crate::error::{Result, TsioError};

/// Decodes framed chunks into [`TSPacket`]s.
///
/// A chunk is `packet_size` bytes long and starts at a sync byte. Frames
/// longer than 188 bytes (192, 204) carry per-frame trailer data such as
/// timecodes or FEC parity; only the leading 188 bytes are the packet.
pub struct TSPacketParser;

impl TSPacketParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses one framed chunk into `packet`, reusing its storage.
    pub fn parse_packet(&self, chunk: &[u8], packet: &mut TSPacket) -> Result<()> {
        packet.clear();

        if chunk.len() < TS_PACKET_SIZE {
            return Err(TsioError::MalformedPacket(format!(
                "packet shorter than {} bytes",
                TS_PACKET_SIZE
            )));
        }
        if chunk[0] != SYNC_BYTE {
            return Err(TsioError::MalformedPacket(format!(
                "invalid sync byte 0x{:02x}",
                chunk[0]
            )));
        }

        packet.header = self.parse_header(chunk)?;

        let frame = &chunk[..TS_PACKET_SIZE];
        let mut payload_offset = TS_HEADER_SIZE;
        if packet.header.adaptation_field_exists {
            match self.parse_adaptation_field(frame, payload_offset)? {
                Some(field) => {
                    payload_offset += field.length + 1;
                    packet.adaptation_field = Some(field);
                }
                // A zero-length field is a lone stuffing byte
                None => payload_offset += 1,
            }
        }
        if payload_offset > frame.len() {
            return Err(TsioError::MalformedPacket(
                "adaptation field overruns packet".into(),
            ));
        }

        if packet.header.contains_payload {
            packet.payload.extend_from_slice(&frame[payload_offset..]);
        }
        Ok(())
    }

    pub fn parse_header(&self, data: &[u8]) -> Result<TSHeader> {
        if data.len() < TS_HEADER_SIZE {
            return Err(TsioError::MalformedPacket("TS packet too short".into()));
        }

        Ok(TSHeader {
            sync_byte: data[0],
            transport_error: (data[1] & 0x80) != 0,
            payload_unit_start: (data[1] & 0x40) != 0,
            transport_priority: (data[1] & 0x20) != 0,
            pid: (((data[1] & 0x1F) as u16) << 8) | data[2] as u16,
            scrambling_control: (data[3] >> 6) & 0x03,
            adaptation_field_exists: (data[3] & 0x20) != 0,
            contains_payload: (data[3] & 0x10) != 0,
            continuity_counter: data[3] & 0x0F,
        })
    }

    pub fn parse_adaptation_field(
        &self,
        data: &[u8],
        offset: usize,
    ) -> Result<Option<AdaptationField>> {
        if data.len() <= offset {
            return Err(TsioError::MalformedPacket(
                "adaptation field length missing".into(),
            ));
        }

        let adaptation_field_length = data[offset] as usize;
        if adaptation_field_length == 0 {
            return Ok(None);
        }

        if data.len() < offset + adaptation_field_length + 1 {
            return Err(TsioError::MalformedPacket(
                "adaptation field too short".into(),
            ));
        }

        let flags = data[offset + 1];
        let mut field = AdaptationField {
            length: adaptation_field_length,
            discontinuity: (flags & 0x80) != 0,
            random_access: (flags & 0x40) != 0,
            es_priority: (flags & 0x20) != 0,
            pcr_flag: (flags & 0x10) != 0,
            opcr_flag: (flags & 0x08) != 0,
            splicing_point_flag: (flags & 0x04) != 0,
            private_data_flag: (flags & 0x02) != 0,
            extension_flag: (flags & 0x01) != 0,
            pcr: None,
            opcr: None,
            splice_countdown: None,
            private_data: None,
        };

        let end = offset + adaptation_field_length + 1;
        let mut pos = offset + 2;

        if field.pcr_flag {
            if end < pos + 6 {
                return Err(TsioError::MalformedPacket("PCR data too short".into()));
            }
            field.pcr = Some(decode_pcr(&data[pos..pos + 6]));
            pos += 6;
        }

        if field.opcr_flag {
            if end < pos + 6 {
                return Err(TsioError::MalformedPacket("OPCR data too short".into()));
            }
            field.opcr = Some(decode_pcr(&data[pos..pos + 6]));
            pos += 6;
        }

        if field.splicing_point_flag {
            if end < pos + 1 {
                return Err(TsioError::MalformedPacket(
                    "splice countdown too short".into(),
                ));
            }
            field.splice_countdown = Some(data[pos] as i8);
            pos += 1;
        }

        if field.private_data_flag {
            if end < pos + 1 {
                return Err(TsioError::MalformedPacket(
                    "private data length byte missing".into(),
                ));
            }
            let private_data_length = data[pos] as usize;
            pos += 1;
            if end < pos + private_data_length {
                return Err(TsioError::MalformedPacket("private data too short".into()));
            }
            field.private_data = Some(data[pos..pos + private_data_length].to_vec());
        }

        Ok(Some(field))
    }
}

impl Default for TSPacketParser {
    fn default() -> Self {
        Self::new()
    }
}

/// 33-bit base at 90 kHz plus 9-bit extension at 27 MHz, as a 27 MHz count.
fn decode_pcr(data: &[u8]) -> u64 {
    let base = ((data[0] as u64) << 25)
        | ((data[1] as u64) << 17)
        | ((data[2] as u64) << 9)
        | ((data[3] as u64) << 1)
        | ((data[4] & 0x80) as u64 >> 7);
    let ext = (((data[4] & 0x01) as u64) << 8) | (data[5] as u64);
    base * 300 + ext
}

/// Locates the first sync byte in `probe` and confirms the frame grid by
/// finding a second sync byte one candidate size further.
///
/// Returns `(lead_offset, packet_size)`. When the probe ended at EOF, a
/// candidate whose second sync byte would sit exactly at the probe's end is
/// accepted, so a single-packet stream still resolves.
pub(crate) fn detect_packet_size(probe: &[u8], at_eof: bool) -> Result<(usize, usize)> {
    for (i, &byte) in probe.iter().enumerate() {
        if byte != SYNC_BYTE {
            continue;
        }
        for &size in &CANDIDATE_PACKET_SIZES {
            let next = i + size;
            if next < probe.len() && probe[next] == SYNC_BYTE {
                return Ok((i, size));
            }
            if at_eof && next == probe.len() {
                return Ok((i, size));
            }
        }
    }
    Err(TsioError::MalformedPacket(
        "no sync byte pattern found while probing packet size".into(),
    ))
}

/// Stream-level framing state.
///
/// Holds the packet size once negotiated and any probe bytes the detector
/// read past the first frame boundary. Persists across `next_packet` calls;
/// reset by `rewind`.
#[derive(Debug, Default)]
pub(crate) struct PacketBuffer {
    packet_size: Option<usize>,
    lookahead: Vec<u8>,
    consumed: usize,
}

impl PacketBuffer {
    pub fn new(packet_size: Option<usize>) -> Self {
        Self {
            packet_size,
            lookahead: Vec::new(),
            consumed: 0,
        }
    }

    pub fn packet_size(&self) -> Option<usize> {
        self.packet_size
    }

    pub fn set_packet_size(&mut self, size: usize) {
        self.packet_size = Some(size);
    }

    /// Stores probe bytes to be drained before the source is read again.
    pub fn stash(&mut self, bytes: &[u8]) {
        self.lookahead.extend_from_slice(bytes);
    }

    /// Copies stashed bytes into `out`, returning how many were copied.
    pub fn drain(&mut self, out: &mut [u8]) -> usize {
        let available = self.lookahead.len() - self.consumed;
        let n = available.min(out.len());
        out[..n].copy_from_slice(&self.lookahead[self.consumed..self.consumed + n]);
        self.consumed += n;
        if self.consumed == self.lookahead.len() {
            self.lookahead.clear();
            self.consumed = 0;
        }
        n
    }

    /// Forgets the negotiated size and any stashed bytes.
    pub fn reset(&mut self, packet_size: Option<usize>) {
        self.packet_size = packet_size;
        self.lookahead.clear();
        self.consumed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ts_header() {
        let parser = TSPacketParser::new();
        let data = [
            0x47, // Sync byte
            0x40, // Payload unit start indicator set
            0x00, // PID (low bits)
            0x1A, // Payload flag + continuity counter
        ];

        let header = parser.parse_header(&data).unwrap();
        assert_eq!(header.sync_byte, 0x47);
        assert!(header.payload_unit_start);
        assert!(!header.transport_error);
        assert_eq!(header.pid, 0);
        assert!(header.contains_payload);
        assert_eq!(header.continuity_counter, 0x0A);
    }

    #[test]
    fn test_parse_packet_with_adaptation_field() {
        let parser = TSPacketParser::new();
        let mut chunk = vec![0xFFu8; TS_PACKET_SIZE];
        chunk[0] = 0x47;
        chunk[1] = 0x40; // unit start
        chunk[2] = 0x64; // PID 0x64
        chunk[3] = 0x35; // adaptation field + payload, counter 5
        chunk[4] = 0x07; // adaptation field length
        chunk[5] = 0x10; // PCR flag
        // PCR base 2, ext 0
        chunk[6..12].copy_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x00, 0x00]);
        chunk[12] = 0xAB; // first payload byte

        let mut packet = TSPacket::new();
        parser.parse_packet(&chunk, &mut packet).unwrap();

        assert_eq!(packet.header.pid, 0x64);
        assert_eq!(packet.header.continuity_counter, 5);
        let field = packet.adaptation_field.as_ref().unwrap();
        assert_eq!(field.length, 7);
        assert_eq!(field.pcr, Some(2 * 300));
        assert_eq!(packet.payload.len(), TS_PACKET_SIZE - 4 - 8);
        assert_eq!(packet.payload[0], 0xAB);
    }

    #[test]
    fn test_parse_packet_bad_sync_byte() {
        let parser = TSPacketParser::new();
        let chunk = vec![0x48u8; TS_PACKET_SIZE];
        let mut packet = TSPacket::new();
        let err = parser.parse_packet(&chunk, &mut packet).unwrap_err();
        assert!(matches!(err, TsioError::MalformedPacket(_)));
    }

    #[test]
    fn test_parse_packet_ignores_frame_trailer() {
        let parser = TSPacketParser::new();
        let mut chunk = vec![0u8; 192];
        chunk[0] = 0x47;
        chunk[3] = 0x10; // payload only
        chunk[4..188].fill(0x11);
        chunk[188..].fill(0x47); // trailer bytes must not leak into the payload

        let mut packet = TSPacket::new();
        parser.parse_packet(&chunk, &mut packet).unwrap();
        assert_eq!(packet.payload.len(), 184);
        assert!(packet.payload.iter().all(|&b| b == 0x11));
    }

    #[test]
    fn test_detect_packet_size_plain() {
        let mut probe = vec![0u8; 188 * 2];
        probe[0] = 0x47;
        probe[188] = 0x47;
        assert_eq!(detect_packet_size(&probe, false).unwrap(), (0, 188));
    }

    #[test]
    fn test_detect_packet_size_with_lead_bytes() {
        // Four timecode bytes precede every sync byte
        let mut probe = vec![0u8; 192 * 2];
        probe[4] = 0x47;
        probe[196] = 0x47;
        assert_eq!(detect_packet_size(&probe, false).unwrap(), (4, 192));
    }

    #[test]
    fn test_detect_packet_size_single_packet_at_eof() {
        let mut probe = vec![0u8; 188];
        probe[0] = 0x47;
        assert_eq!(detect_packet_size(&probe, true).unwrap(), (0, 188));
    }

    #[test]
    fn test_detect_packet_size_no_sync() {
        let probe = vec![0u8; 400];
        assert!(matches!(
            detect_packet_size(&probe, false),
            Err(TsioError::MalformedPacket(_))
        ));
    }

    #[test]
    fn test_packet_buffer_drain() {
        let mut buffer = PacketBuffer::new(None);
        buffer.stash(&[1, 2, 3, 4, 5]);

        let mut out = [0u8; 3];
        assert_eq!(buffer.drain(&mut out), 3);
        assert_eq!(out, [1, 2, 3]);
        assert_eq!(buffer.drain(&mut out), 2);
        assert_eq!(out[..2], [4, 5]);
        assert_eq!(buffer.drain(&mut out), 0);
    }
}
