//! Byte-level and structured I/O on the backing image (C1, C2).

pub mod block;
pub mod byte;

pub use block::*;
