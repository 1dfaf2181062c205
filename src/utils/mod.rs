//! Common utilities shared across the crate.

/// MPEG-2 CRC32 used by PSI section validation
pub mod crc;

pub use crc::Crc32Mpeg2;
