//! MBOX parsing: streaming message reader.

pub mod mbox;
