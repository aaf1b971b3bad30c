//! Byte-level device transport.

use hidapi::{HidApi, HidDevice};
use tracing::debug;

use crate::{DeviceError, Result};

/// Static information about a device type for lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: &'static str,
    pub vendor_id: u16,
    pub product_id: u16,
}

/// Raw report transport.
///
/// `read_timeout` returns the number of bytes placed in `buf`, and `0` when no report
/// arrived before the timeout elapsed. `write` returns the number of bytes accepted.
pub trait Transport {
    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize>;
    fn write(&mut self, data: &[u8]) -> Result<usize>;
}

impl Transport for HidDevice {
    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize> {
        Ok(HidDevice::read_timeout(self, buf, timeout_ms)?)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(HidDevice::write(self, data)?)
    }
}

/// Find and open the first hid device matching the vendor and product id
pub fn open_device(vendor_id: u16, product_id: u16) -> Result<HidDevice> {
    let api = HidApi::new()?;
    let info = api
        .device_list()
        .find(|d| d.vendor_id() == vendor_id && d.product_id() == product_id)
        .ok_or(DeviceError::DeviceNotFound {
            vendor_id,
            product_id,
        })?;
    debug!(
        path = ?info.path(),
        product = info.product_string().unwrap_or("unknown"),
        "opening hid device {vendor_id:04x}:{product_id:04x}"
    );
    Ok(info.open_device(&api)?)
}
