//! Building blocks used by the `lzw` module.

pub mod bit_channel;
pub mod dictionary;
