//! CLI command implementations.

pub mod common;
pub mod qrng;
pub mod run;
pub mod sdc;
pub mod serve;
pub mod teleport;
pub mod version;
