/// CRC32 implementation specifically for MPEG-2 TS PSI tables
/// Based on ITU-T H.222.0 / ISO/IEC 13818-1
/// Polynomial: x32 + x26 + x23 + x22 + x16 + x12 + x11 + x10 + x8 + x7 + x5 + x4 + x2 + x + 1
/// Initial value: 0xFFFFFFFF

const CRC32_MPEG2: u32 = 0x04C11DB7;

/// MPEG-2 CRC32 calculator used to validate PSI sections (PAT/PMT)
///
/// Every syntax section carries its checksum in the last four bytes; the
/// demuxer recomputes it over the preceding bytes before trusting the section.
pub struct Crc32Mpeg2 {
    /// Lookup table for fast CRC calculation
    table: [u32; 256],
}

impl Crc32Mpeg2 {
    /// Creates a new CRC32 calculator with pre-computed lookup table
    pub fn new() -> Self {
        let mut table = [0u32; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let mut crc = (i as u32) << 24;
            for _ in 0..8 {
                crc = if (crc & 0x8000_0000) != 0 {
                    (crc << 1) ^ CRC32_MPEG2
                } else {
                    crc << 1
                };
            }
            *entry = crc;
        }
        Self { table }
    }

    /// Calculates the CRC32 checksum for the given data using the MPEG-2 algorithm
    ///
    /// # Examples
    ///
    /// ```
    /// use tsio::utils::Crc32Mpeg2;
    ///
    /// let crc = Crc32Mpeg2::new();
    /// let checksum = crc.calculate(&[0x01, 0x02, 0x03]);
    /// ```
    pub fn calculate(&self, data: &[u8]) -> u32 {
        let mut crc = 0xFFFF_FFFF;
        for &byte in data {
            let index = ((crc >> 24) ^ (byte as u32)) & 0xFF;
            crc = (crc << 8) ^ self.table[index as usize];
        }
        crc
    }
}

impl Default for Crc32Mpeg2 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_mpeg2_known_vector() {
        let crc = Crc32Mpeg2::new();

        // Test vector from STMicroelectronics community forum post
        let test_data = [0x01, 0x01];
        assert_eq!(
            crc.calculate(&test_data),
            0xD66FB816,
            "CRC32 MPEG-2 calculation failed for test vector [0x01, 0x01]"
        );
    }

    #[test]
    fn test_crc32_mpeg2_section_roundtrip() {
        let crc = Crc32Mpeg2::new();

        // A PAT section body (excluding its CRC field)
        let pat_data = [
            0x00, // Table ID (PAT)
            0xB0, // Section syntax indicator = 1, Private bit = 0, Reserved = 3
            0x0D, // Section length
            0x00, 0x01, // Transport stream ID
            0xC1, // Reserved = 3, Version = 0, Current/Next = 1
            0x00, 0x00, // Section number = 0, Last section number = 0
            0x00, 0x01, // Program number
            0xE1, 0x00, // Program map PID
        ];

        let checksum = crc.calculate(&pat_data);
        assert_ne!(checksum, 0);

        // Appending the computed checksum makes the whole section hash to 0
        let mut section = pat_data.to_vec();
        section.extend_from_slice(&checksum.to_be_bytes());
        assert_eq!(crc.calculate(&section), 0);
    }
}
