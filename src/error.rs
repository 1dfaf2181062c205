use thiserror::Error;

/// Errors produced while demultiplexing a transport stream.
#[derive(Error, Debug)]
pub enum TsioError {
    /// Underlying I/O failure while reading or seeking the byte source.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The source is exhausted exactly at a packet boundary.
    ///
    /// This is a sentinel, not a failure: callers branch on it to stop
    /// iterating. A source that ends mid-packet yields `MalformedPacket`
    /// instead.
    #[error("no more packets")]
    NoMorePackets,

    /// Sync byte mismatch or truncated packet read. The demuxer does not
    /// attempt to re-synchronize after this.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// A PSI section declared lengths its body cannot satisfy.
    #[error("malformed section: {0}")]
    MalformedSection(String),

    /// The cancellation token was triggered before a read was issued.
    #[error("demuxing cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TsioError>;
