use crate::Result;

pub mod ts;

/// Common trait for format demuxers
#[async_trait::async_trait]
pub trait Demuxer: Send {
    /// Read the next framed packet from the stream
    async fn next_packet(&mut self) -> Result<ts::TSPacket>;

    /// Read the next fully-formed data unit from the stream
    async fn next_data(&mut self) -> Result<ts::DemuxerData>;
}

#[async_trait::async_trait]
impl<R: tokio::io::AsyncRead + Unpin + Send> Demuxer for ts::TSDemuxer<R> {
    async fn next_packet(&mut self) -> Result<ts::TSPacket> {
        // Resolves to the inherent method
        self.next_packet().await
    }

    async fn next_data(&mut self) -> Result<ts::DemuxerData> {
        self.next_data().await
    }
}

pub use self::ts::{DataPayload, DemuxerData, TSDemuxer};
