//! Core transport and error types for kontrol-sync device crates.
//!
//! This crate provides:
//! - The `Transport` trait, the byte-level boundary every device session talks through
//! - A hidapi backed implementation and lookup by vendor/product id
//! - `DeviceInfo` static descriptions and the shared `DeviceError`

mod error;
mod transport;

pub use error::{DeviceError, Result};
pub use transport::{open_device, DeviceInfo, Transport};
