//! Input report decoding.
//!
//! Reports are 30 bytes. The first byte is the report id and is skipped, the remaining 29
//! bytes are the payload:
//!
//! | payload byte | contents                                         |
//! |--------------|--------------------------------------------------|
//! | 0..5         | key mask, 40 bits, least significant bit first   |
//! | 27           | rotary encoder                                   |
//! | 28           | octave/transpose                                 |

use tracing::trace;

use crate::types::{Event, Key, KEY_COUNT};

/// Total size of an input report, including the leading report id byte
pub const INPUT_REPORT_LEN: usize = 30;
/// Number of key mask bits scanned in each report
pub const KEY_MASK_BITS: usize = 40;
/// Mask bit that reports the joystick press a second time
pub const JOYSTICK_PRESS_ALIAS_BIT: usize = 33;

/// Map a key mask bit to its logical key
pub fn key_for_bit(bit: usize) -> Option<Key> {
    match bit {
        JOYSTICK_PRESS_ALIAS_BIT => Some(Key::ALL[KEY_COUNT - 1]),
        bit => Key::from_index(bit),
    }
}

/// Stateful decoder turning raw reports into press/release/rotary/transpose events.
///
/// Each decoder owns its own key and control state, so two sessions never share it.
#[derive(Clone, Debug, Default)]
pub struct ReportDecoder {
    pressed: [bool; KEY_COUNT],
    rotary: u8,
    transpose: u8,
}

impl ReportDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one report, returning the events caused by changes since the previous one.
    ///
    /// Key events come first in mask bit order, followed by rotary then transpose.
    /// Bit 33 shares state with the joystick press, so toggling only that bit still
    /// produces press and release events for it.
    pub fn decode(&mut self, report: &[u8; INPUT_REPORT_LEN]) -> Vec<Event> {
        trace!("input report {:02x?}", report);
        let payload = &report[1..];
        let mut events = Vec::new();

        for bit in 0..KEY_MASK_BITS {
            let Some(key) = key_for_bit(bit) else {
                continue;
            };
            let down = payload[bit / 8] & (1 << (bit % 8)) != 0;
            let state = &mut self.pressed[key.index()];
            if *state != down {
                *state = down;
                events.push(if down {
                    Event::KeyPressed(key)
                } else {
                    Event::KeyReleased(key)
                });
            }
        }

        let rotary = payload[payload.len() - 2];
        if rotary != self.rotary {
            self.rotary = rotary;
            events.push(Event::RotaryChanged(rotary));
        }
        let transpose = payload[payload.len() - 1];
        if transpose != self.transpose {
            self.transpose = transpose;
            events.push(Event::TransposeChanged(transpose));
        }

        events
    }

    /// Whether the key was held in the last decoded report
    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed[key.index()]
    }

    pub fn rotary(&self) -> u8 {
        self.rotary
    }

    pub fn transpose(&self) -> u8 {
        self.transpose
    }
}
