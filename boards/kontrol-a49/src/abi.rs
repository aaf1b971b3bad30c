//! Output report encoding.
//!
//! Lights are a single report: `0x80` followed by one brightness byte per key.
//!
//! The display is written as two reports, one per 128x16 half. Each half is a 9 byte
//! header followed by two 128 byte bands. A band covers 8 rows; byte `x` of a band holds
//! column `x`, with bit `y % 8` set when pixel `(x, y)` is lit.

use crate::bitmap::{PixelSource, SCREEN_WIDTH};
use crate::types::{LightState, KEY_COUNT};

/// Report id of the light command
pub const LIGHTS_COMMAND: u8 = 0x80;
/// Size of the light report
pub const LIGHTS_REPORT_LEN: usize = 1 + KEY_COUNT;

/// Header for the top half of the display (rows 0-15)
pub const IMAGE_TOP_HEADER: [u8; 9] = [0xe0, 0x00, 0x00, 0x00, 0x00, 0x80, 0x00, 0x02, 0x00];
/// Header for the bottom half of the display (rows 16-31)
pub const IMAGE_BOTTOM_HEADER: [u8; 9] = [0xe0, 0x00, 0x00, 0x02, 0x00, 0x80, 0x00, 0x02, 0x00];

/// Rows packed into each band byte
pub const BAND_ROWS: u32 = 8;
/// Bytes per band, one per column
pub const BAND_LEN: usize = SCREEN_WIDTH as usize;
/// Pixel payload of one display half
pub const HALF_PAYLOAD_LEN: usize = 2 * BAND_LEN;
/// Size of one image report, header included
pub const IMAGE_REPORT_LEN: usize = IMAGE_TOP_HEADER.len() + HALF_PAYLOAD_LEN;

/// Construct the light report from the full light state
pub fn lights(state: &LightState) -> [u8; LIGHTS_REPORT_LEN] {
    let mut buf = [0u8; LIGHTS_REPORT_LEN];
    buf[0] = LIGHTS_COMMAND;
    buf[1..].copy_from_slice(state.levels());
    buf
}

/// Pack the 8 rows starting at `top` into one byte per column
pub fn pack_band(source: &impl PixelSource, top: u32) -> [u8; BAND_LEN] {
    let mut band = [0u8; BAND_LEN];
    for (x, byte) in (0..SCREEN_WIDTH).zip(band.iter_mut()) {
        for bit in 0..BAND_ROWS {
            if source.pixel(x, top + bit) != 0 {
                *byte |= 1 << bit;
            }
        }
    }
    band
}

fn image_half(source: &impl PixelSource, header: [u8; 9], top: u32) -> [u8; IMAGE_REPORT_LEN] {
    let mut buf = [0u8; IMAGE_REPORT_LEN];
    let (head, payload) = buf.split_at_mut(header.len());
    head.copy_from_slice(&header);
    payload[..BAND_LEN].copy_from_slice(&pack_band(source, top));
    payload[BAND_LEN..].copy_from_slice(&pack_band(source, top + BAND_ROWS));
    buf
}

/// Construct both display reports, top half first
pub fn image(source: &impl PixelSource) -> ([u8; IMAGE_REPORT_LEN], [u8; IMAGE_REPORT_LEN]) {
    (
        image_half(source, IMAGE_TOP_HEADER, 0),
        image_half(source, IMAGE_BOTTOM_HEADER, 2 * BAND_ROWS),
    )
}
