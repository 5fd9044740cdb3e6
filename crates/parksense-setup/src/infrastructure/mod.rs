//! Infrastructure layer for the bootstrap: external programs and the
//! operator console.

pub mod prompt;
pub mod toolchain;
