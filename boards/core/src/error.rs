//! Errors shared by every device crate.

/// Errors that can occur while talking to a device
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// No connected device matched the requested ids
    #[error("device not found (vendor {vendor_id:#06x}, product {product_id:#06x})")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    /// The device sent a non-empty report shorter than the fixed report size
    #[error("truncated input report: got {len} bytes, expected {expected}")]
    TruncatedReport { len: usize, expected: usize },

    /// The transport accepted fewer bytes than the output report holds
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// Key index outside of the fixed key sequence
    #[error("key index {index} out of range (device has {len} keys)")]
    KeyIndexOutOfRange { index: usize, len: usize },

    /// Key name that is not part of the key sequence
    #[error("unknown key: {0}")]
    UnknownKey(String),

    /// HID communication error
    #[error("hid error: {0}")]
    Hid(#[from] hidapi::HidError),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
