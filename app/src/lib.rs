#![doc = include_str!("../README.md")]

pub mod audio;
pub mod config;
pub mod dcd;
pub mod demod;
pub mod error;
pub mod kiss_session;
pub mod modem;
pub mod ptt;
pub mod serial;
pub mod soundcard;
pub mod station;
pub mod transport;

#[cfg(test)]
mod test_util;

pub use error::AppError;
