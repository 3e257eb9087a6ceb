//! # LZW file compression
//!
//! Lossless compression using LZW with a fixed code width (14 bits by default)
//! and an open-addressing hash dictionary.  The compressed stream is a bare sequence
//! of big-endian packed codes, terminated by the all-ones code and a zero flush code.
//! There is no header, so both ends must agree on the code width.
//!
//! The main entry points are in the `lzw` module:
//! ```
//! use lzw14::lzw;
//! let data = "TOBEORNOTTOBEORTOBEORNOT".as_bytes();
//! let compressed = lzw::compress_slice(data,&lzw::STD_OPTIONS).expect("compression failed");
//! let expanded = lzw::decompress_slice(&compressed,&lzw::STD_OPTIONS).expect("expansion failed");
//! assert_eq!(data.to_vec(),expanded);
//! ```

mod tools;
pub mod lzw;

pub use lzw::{Options,Sizes,STD_OPTIONS};

/// Codec Errors
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stream ended in the middle of a code")]
    TruncatedStream,
    #[error("bad LZW code {code}, next available is {next}")]
    BadCode { code: usize, next: usize },
    #[error("string chain exceeds dictionary size")]
    ChainTooLong,
    #[error("stream ended before the end-of-stream code")]
    MissingSentinel,
    #[error("stream length {found} does not match the end-of-stream trailer, expected {expected}")]
    TrailerMismatch { found: u64, expected: u64 },
    #[error("code width {0} not supported")]
    UnsupportedWidth(usize)
}

impl Error {
    /// true if the error means the compressed input is corrupt or foreign
    pub fn is_malformed(&self) -> bool {
        match self {
            Error::TruncatedStream | Error::BadCode {..} | Error::ChainTooLong |
            Error::MissingSentinel | Error::TrailerMismatch {..} => true,
            Error::Io(_) | Error::UnsupportedWidth(_) => false
        }
    }
}

pub type Result<T> = std::result::Result<T,Error>;
