// PIDs
pub const PID_PAT: u16 = 0x0000;
pub const PID_NULL: u16 = 0x1fff;

// Table IDs
pub const TABLE_ID_PAT: u8 = 0x00;
pub const TABLE_ID_PMT: u8 = 0x02;
pub const TABLE_ID_STUFFING: u8 = 0xff;

// Elementary Stream Types
pub const STREAM_TYPE_H264: u8 = 0x1b;
pub const STREAM_TYPE_H265: u8 = 0x24;
pub const STREAM_TYPE_AAC: u8 = 0x0f;

// Constants
pub const SYNC_BYTE: u8 = 0x47;
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;

/// Packet sizes the synchronizer tries during auto-detection. 188 is the
/// bare format; 192 and 204 carry 4 timecode / 16 FEC extra bytes per frame.
pub const CANDIDATE_PACKET_SIZES: [usize; 3] = [188, 192, 204];

/// One entry of the Program Association Table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PATEntry {
    pub program_number: u16,
    /// PID of the Network Information Table when `program_number` is 0
    pub network_pid: u16,
    pub program_map_pid: u16,
}

/// Program Association Table: program numbers and their PMT PIDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PAT {
    pub entries: Vec<PATEntry>,
}

impl PAT {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

/// A descriptor attached to a program or an elementary stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub tag: u8,
    pub data: Vec<u8>,
}

/// One elementary stream declared by a PMT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementaryStreamInfo {
    pub stream_type: u8,
    pub elementary_pid: u16,
    pub descriptors: Vec<Descriptor>,
}

/// Program Map Table: the elementary streams making up one program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PMT {
    /// Program this table describes (the section's table ID extension)
    pub program_number: u16,
    pub pcr_pid: u16,
    pub program_descriptors: Vec<Descriptor>,
    pub elementary_stream_infos: Vec<ElementaryStreamInfo>,
}

impl PMT {
    pub fn new() -> Self {
        Self {
            program_number: 0,
            pcr_pid: 0,
            program_descriptors: Vec::new(),
            elementary_stream_infos: Vec::new(),
        }
    }
}

/// Optional header extension carrying timing and stuffing data.
///
/// When present it consumes the leading bytes of the packet's payload area.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptationField {
    pub length: usize,
    pub discontinuity: bool,
    pub random_access: bool,
    pub es_priority: bool,
    pub pcr_flag: bool,
    pub opcr_flag: bool,
    pub splicing_point_flag: bool,
    pub private_data_flag: bool,
    pub extension_flag: bool,
    pub pcr: Option<u64>,
    pub opcr: Option<u64>,
    pub splice_countdown: Option<i8>,
    pub private_data: Option<Vec<u8>>,
}

/// The four header bytes of a TS packet, decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct TSHeader {
    pub sync_byte: u8, // Always 0x47
    pub transport_error: bool,
    pub payload_unit_start: bool,
    pub transport_priority: bool,
    pub pid: u16,
    pub scrambling_control: u8,
    pub adaptation_field_exists: bool,
    pub contains_payload: bool,
    pub continuity_counter: u8,
}

impl Default for TSHeader {
    fn default() -> Self {
        Self {
            sync_byte: SYNC_BYTE,
            transport_error: false,
            payload_unit_start: false,
            transport_priority: false,
            pid: 0,
            scrambling_control: 0,
            adaptation_field_exists: false,
            contains_payload: true,
            continuity_counter: 0,
        }
    }
}

/// One framed transport stream packet.
///
/// Storage is pooled: `clear` resets the fields but keeps the payload
/// allocation so sequential iteration does not churn the allocator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TSPacket {
    pub header: TSHeader,
    pub adaptation_field: Option<AdaptationField>,
    pub payload: Vec<u8>,
}

impl TSPacket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the packet for reuse, keeping the payload buffer's capacity.
    pub fn clear(&mut self) {
        self.header = TSHeader::default();
        self.adaptation_field = None;
        self.payload.clear();
    }
}
