#![doc(html_root_url = "https://docs.rs/tsio/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::missing_crate_level_docs)]

//! # tsio - Rust Transport Stream I/O
//!
//! `tsio` is a toolkit for demultiplexing MPEG Transport Streams (ITU-T
//! H.222.0 / ISO/IEC 13818-1) in Rust. It turns an ordered byte source into
//! framed TS packets and fully reassembled data units - decoded PAT/PMT
//! tables and raw elementary payloads - through a pull-based API.
//!
//! ## Features
//!
//! ### Packet layer
//! - Sync-byte location and 188/192/204 frame-size auto-detection
//! - Header and adaptation field decoding (PCR, splice countdown, private data)
//! - Pooled packet storage to bound allocation churn
//!
//! ### Data layer
//! - Per-PID unit reassembly with continuity-counter checking
//! - PAT/PMT section parsing with CRC validation, handling sections packed
//!   back-to-back in one packet as well as sections split across packets
//! - Program map tracking (PMT PID to program number) driven by PAT decode
//! - Raw passthrough for caller-selected PIDs and unknown table types
//!
//! ### Iteration
//! - `next_packet` / `next_data` pull APIs with a clean end-of-stream
//!   sentinel, rewind on seekable sources, cooperative cancellation
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tsio = "0.1.0"
//! ```
//!
//! ### Demuxing a file
//!
//! ```rust,no_run
//! use tsio::format::ts::{DataPayload, TSDemuxer};
//! use tsio::TsioError;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let file = tokio::fs::File::open("stream.ts").await?;
//!     let mut demuxer = TSDemuxer::new(file);
//!
//!     loop {
//!         match demuxer.next_data().await {
//!             Ok(data) => match data.payload {
//!                 DataPayload::Pat(pat) => {
//!                     println!("PAT: {} programs", pat.entries.len());
//!                 }
//!                 DataPayload::Pmt(pmt) => {
//!                     println!(
//!                         "program {}: {} elementary streams",
//!                         pmt.program_number,
//!                         pmt.elementary_stream_infos.len()
//!                     );
//!                 }
//!                 DataPayload::Raw(raw) => println!("raw unit: {} bytes", raw.len()),
//!             },
//!             Err(TsioError::NoMorePackets) => break,
//!             Err(err) => return Err(err.into()),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Cancellation and options
//!
//! ```rust,no_run
//! use tokio_util::sync::CancellationToken;
//! use tsio::format::ts::{TSDemuxer, TSDemuxerOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let token = CancellationToken::new();
//! let file = tokio::fs::File::open("stream.ts").await?;
//! let mut demuxer = TSDemuxer::with_options(
//!     file,
//!     TSDemuxerOptions::new()
//!         .with_packet_size(188)
//!         .with_passthrough_pid(0x0100)
//!         .with_cancellation(token.clone()),
//! );
//!
//! // Some other task may call token.cancel(); the next read fails fast
//! let packet = demuxer.next_packet().await?;
//! println!("pid {:#06x}", packet.header.pid);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - `format`: container demultiplexing; `format::ts` holds the transport
//!   stream implementation (packet framing, reassembly, PSI tables, the
//!   demuxer itself)
//! - `error`: the [`TsioError`] taxonomy and [`Result`] alias
//! - `utils`: MPEG-2 CRC32 used for PSI section validation
//! - `config`: process-wide defaults read from the environment or a config
//!   file

/// Error types and utilities
pub mod error;

/// Media format implementations (currently MPEG-TS)
pub mod format;

/// Common utilities and helper functions
pub mod utils;

/// Configuration module
pub mod config;

pub use error::{Result, TsioError};
