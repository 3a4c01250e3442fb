//! CLI command implementations.

pub mod bands;
pub mod common;
pub mod deconvolve;
pub mod info;
pub mod init_config;
pub mod optimize;
pub mod refine;
pub mod safeguard;
