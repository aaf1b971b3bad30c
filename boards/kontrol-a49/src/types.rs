use std::fmt::{self, Display};
use std::str::FromStr;

use kontrol_core::DeviceError;

macro_rules! define_keys {
    [$(
        $( #[doc = $doc:expr] )*
        $variant:ident = $name:literal,
    )+] => {
        /// Named controls on the keyboard, in hardware order.
        ///
        /// The discriminant is both the bit position in the input report key mask and the
        /// byte offset in the light output report.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum Key {
            $(
                $( #[doc = $doc] )*
                $variant,
            )+
        }

        impl Key {
            /// Every key in hardware order
            pub const ALL: [Key; KEY_COUNT] = [$( Key::$variant ),+];

            /// Upper case name as printed on the device
            pub const fn name(self) -> &'static str {
                match self {
                    $( Key::$variant => $name, )+
                }
            }
        }
    };
}

/// Number of named keys
pub const KEY_COUNT: usize = 26;

define_keys![
    Shift = "SHIFT",
    Scale = "SCALE",
    Arp = "ARP",
    Undo = "UNDO",
    Quantize = "QUANTIZE",
    Ideas = "IDEAS",
    Loop = "LOOP",
    Metro = "METRO",
    Tempo = "TEMPO",
    Play = "PLAY",
    Rec = "REC",
    Stop = "STOP",
    PresetUp = "PRESET_UP",
    PresetDown = "PRESET_DOWN",
    /// Mute
    M = "M",
    /// Solo
    S = "S",
    Browser = "BROWSER",
    PluginMidi = "PLUGIN_MIDI",
    Track = "TRACK",
    OctaveDown = "OCTAVE_DOWN",
    OctaveUp = "OCTAVE_UP",
    JoystickUp = "JOYSTICK_UP",
    JoystickLeft = "JOYSTICK_LEFT",
    JoystickRight = "JOYSTICK_RIGHT",
    JoystickDown = "JOYSTICK_DOWN",
    JoystickPress = "JOYSTICK_PRESS",
];

impl Key {
    /// Position in the hardware key order
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look up a key by its position in the hardware order
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Key {
    type Err = DeviceError;

    /// Parse a key name, ignoring case. Dashes are accepted in place of underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        Key::ALL
            .into_iter()
            .find(|k| k.name() == normalized)
            .ok_or_else(|| DeviceError::UnknownKey(s.to_string()))
    }
}

/// Decoded input event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    KeyPressed(Key),
    KeyReleased(Key),
    /// Raw value of the rotary encoder byte
    RotaryChanged(u8),
    /// Raw value of the octave/transpose byte
    TransposeChanged(u8),
}

/// Brightness of every key light. Always sent to the device as a whole.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LightState([u8; KEY_COUNT]);

impl LightState {
    pub fn get(&self, key: Key) -> u8 {
        self.0[key.index()]
    }

    pub fn set(&mut self, key: Key, level: u8) {
        self.0[key.index()] = level;
    }

    pub fn fill(&mut self, level: u8) {
        self.0 = [level; KEY_COUNT];
    }

    /// Levels in hardware key order
    pub fn levels(&self) -> &[u8; KEY_COUNT] {
        &self.0
    }
}
