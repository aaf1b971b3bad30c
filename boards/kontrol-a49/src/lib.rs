//! High level hidapi abstraction for Komplete Kontrol A49 keyboards.
//!
//! The session polls input reports for key, rotary and octave events, and writes the key
//! lights and the 128x32 monochrome display. All state lives in the session; nothing is
//! shared between two open devices.

use hidapi::HidDevice;
use kontrol_core::{open_device, DeviceError, DeviceInfo, Result, Transport};
use tracing::{debug, warn};

pub mod abi;
pub mod bitmap;
pub mod report;
pub mod types;

pub use bitmap::{Bitmap, PixelSource, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use report::{ReportDecoder, INPUT_REPORT_LEN};
pub use types::{Event, Key, LightState, KEY_COUNT};

pub mod consts {
    pub const A49_VENDOR_ID: u16 = 0x17cc;
    pub const A49_PRODUCT_ID: u16 = 0x1740;
    /// Per-read timeout used while draining input reports
    pub const DEFAULT_READ_TIMEOUT_MS: i32 = 10;
}

/// Static device info for lookup
pub static INFO: DeviceInfo = DeviceInfo {
    name: "Komplete Kontrol A49",
    vendor_id: consts::A49_VENDOR_ID,
    product_id: consts::A49_PRODUCT_ID,
};

type KeyHandler = Box<dyn FnMut(Key)>;
type ValueHandler = Box<dyn FnMut(u8)>;

/// One optional handler per event kind
#[derive(Default)]
struct Handlers {
    key_press: Option<KeyHandler>,
    key_release: Option<KeyHandler>,
    rotary: Option<ValueHandler>,
    octave: Option<ValueHandler>,
}

impl Handlers {
    fn dispatch(&mut self, event: Event) {
        match event {
            Event::KeyPressed(key) => {
                if let Some(f) = self.key_press.as_mut() {
                    f(key)
                }
            },
            Event::KeyReleased(key) => {
                if let Some(f) = self.key_release.as_mut() {
                    f(key)
                }
            },
            Event::RotaryChanged(value) => {
                if let Some(f) = self.rotary.as_mut() {
                    f(value)
                }
            },
            Event::TransposeChanged(value) => {
                if let Some(f) = self.octave.as_mut() {
                    f(value)
                }
            },
        }
    }
}

/// High level abstraction for an open Komplete Kontrol A49.
///
/// The transport is released when the session is dropped.
pub struct KontrolA49<T: Transport = HidDevice> {
    pub device: T,
    decoder: ReportDecoder,
    lights: LightState,
    handlers: Handlers,
    pending_error: Option<DeviceError>,
    read_timeout_ms: i32,
    buf: [u8; INPUT_REPORT_LEN],
}

impl KontrolA49 {
    /// Find and open the keyboard using the default vendor and product ids
    pub fn open() -> Result<Self> {
        Self::open_with_ids(INFO.vendor_id, INFO.product_id)
    }

    /// Find and open a keyboard with explicit ids
    pub fn open_with_ids(vendor_id: u16, product_id: u16) -> Result<Self> {
        let device = open_device(vendor_id, product_id)?;
        Ok(Self::new(device))
    }
}

impl<T: Transport> KontrolA49<T> {
    /// Start a session on an already open transport
    pub fn new(device: T) -> Self {
        Self {
            device,
            decoder: ReportDecoder::new(),
            lights: LightState::default(),
            handlers: Handlers::default(),
            pending_error: None,
            read_timeout_ms: consts::DEFAULT_READ_TIMEOUT_MS,
            buf: [0u8; INPUT_REPORT_LEN],
        }
    }

    /// Set how long each read waits for a report
    pub fn set_read_timeout(&mut self, timeout_ms: i32) {
        self.read_timeout_ms = timeout_ms;
    }

    /// Replace the key press handler
    pub fn on_key_press(&mut self, f: impl FnMut(Key) + 'static) {
        self.handlers.key_press = Some(Box::new(f));
    }

    /// Replace the key release handler
    pub fn on_key_release(&mut self, f: impl FnMut(Key) + 'static) {
        self.handlers.key_release = Some(Box::new(f));
    }

    /// Replace the rotary encoder handler, called with the raw encoder byte
    pub fn on_rotary(&mut self, f: impl FnMut(u8) + 'static) {
        self.handlers.rotary = Some(Box::new(f));
    }

    /// Replace the octave/transpose handler, called with the raw transpose byte
    pub fn on_octave(&mut self, f: impl FnMut(u8) + 'static) {
        self.handlers.octave = Some(Box::new(f));
    }

    /// Remove every registered handler
    pub fn clear_handlers(&mut self) {
        self.handlers = Handlers::default();
    }

    /// Read and decode a single report without dispatching it.
    ///
    /// Returns `None` when the read timed out with no data.
    pub fn read_report(&mut self) -> Result<Option<Vec<Event>>> {
        let len = self.device.read_timeout(&mut self.buf, self.read_timeout_ms)?;
        if len == 0 {
            return Ok(None);
        }
        let report: &[u8; INPUT_REPORT_LEN] = self.buf[..len].try_into().map_err(|_| {
            DeviceError::TruncatedReport {
                len,
                expected: INPUT_REPORT_LEN,
            }
        })?;
        Ok(Some(self.decoder.decode(report)))
    }

    /// Drain every queued report, dispatching events to the registered handlers.
    ///
    /// Returns once a read comes back empty. The dispatched events are also returned in
    /// order. A failed read stops the drain. If events were already dispatched they are
    /// returned first and the error is reported by the next call.
    pub fn poll(&mut self) -> Result<Vec<Event>> {
        if let Some(err) = self.pending_error.take() {
            return Err(err);
        }

        let mut drained = Vec::new();
        loop {
            let events = match self.read_report() {
                Ok(Some(events)) => events,
                Ok(None) => break,
                Err(err) if drained.is_empty() => return Err(err),
                Err(err) => {
                    warn!("poll stopped after {} events: {err}", drained.len());
                    self.pending_error = Some(err);
                    break;
                },
            };
            for event in &events {
                self.handlers.dispatch(*event);
            }
            drained.extend(events);
        }
        Ok(drained)
    }

    /// Whether the key was held in the last decoded report
    pub fn is_pressed(&self, key: Key) -> bool {
        self.decoder.is_pressed(key)
    }

    /// Last observed rotary encoder byte
    pub fn rotary_value(&self) -> u8 {
        self.decoder.rotary()
    }

    /// Last observed octave/transpose byte
    pub fn transpose_value(&self) -> u8 {
        self.decoder.transpose()
    }

    /// Current light levels, as last set (not necessarily sent)
    pub fn light_state(&self) -> &LightState {
        &self.lights
    }

    /// Internal method to write an output report
    fn send(&mut self, report: &[u8]) -> Result<()> {
        debug!(len = report.len(), "writing report {:02x?}", &report[..9.min(report.len())]);
        let written = self.device.write(report)?;
        if written < report.len() {
            return Err(DeviceError::ShortWrite {
                written,
                expected: report.len(),
            });
        }
        Ok(())
    }

    /// Set a single key light, sending the whole light state if `send` is true
    pub fn set_key_light(&mut self, key: Key, level: u8, send: bool) -> Result<()> {
        self.lights.set(key, level);
        if send {
            self.send_key_lights()?;
        }
        Ok(())
    }

    /// Set a key light by its position in the hardware key order
    pub fn set_key_by_index(&mut self, index: usize, level: u8, send: bool) -> Result<()> {
        let key = Key::from_index(index).ok_or(DeviceError::KeyIndexOutOfRange {
            index,
            len: KEY_COUNT,
        })?;
        self.set_key_light(key, level, send)
    }

    /// Set every key light to the same level
    pub fn set_all_keys(&mut self, level: u8, send: bool) -> Result<()> {
        self.lights.fill(level);
        if send {
            self.send_key_lights()?;
        }
        Ok(())
    }

    /// Send the complete light state
    pub fn send_key_lights(&mut self) -> Result<()> {
        let report = abi::lights(&self.lights);
        self.send(&report)
    }

    /// Draw an image on the display, top half first
    pub fn send_image(&mut self, image: &impl PixelSource) -> Result<()> {
        let (top, bottom) = abi::image(image);
        self.send(&top)?;
        self.send(&bottom)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use hidapi::HidError;

    use super::*;

    /// In-memory transport replaying queued reads and recording writes
    #[derive(Default)]
    struct FakeTransport {
        reads: VecDeque<Vec<u8>>,
        writes: Vec<Vec<u8>>,
        accept: Option<usize>,
        fail_writes: bool,
    }

    impl FakeTransport {
        fn with_reports(reports: impl IntoIterator<Item = Vec<u8>>) -> Self {
            Self {
                reads: reports.into_iter().collect(),
                ..Default::default()
            }
        }
    }

    impl Transport for FakeTransport {
        fn read_timeout(&mut self, buf: &mut [u8], _timeout_ms: i32) -> Result<usize> {
            let Some(report) = self.reads.pop_front() else {
                return Ok(0);
            };
            let len = report.len().min(buf.len());
            buf[..len].copy_from_slice(&report[..len]);
            Ok(len)
        }

        fn write(&mut self, data: &[u8]) -> Result<usize> {
            if self.fail_writes {
                return Err(DeviceError::Hid(HidError::HidApiError {
                    message: "device disconnected".into(),
                }));
            }
            self.writes.push(data.to_vec());
            Ok(self.accept.unwrap_or(data.len()))
        }
    }

    fn report(f: impl FnOnce(&mut [u8])) -> Vec<u8> {
        let mut buf = vec![0u8; INPUT_REPORT_LEN];
        f(&mut buf);
        buf
    }

    #[test]
    fn poll_drains_and_dispatches() {
        let fake = FakeTransport::with_reports([
            report(|r| r[1] = 0b1),
            report(|r| {
                r[1] = 0b1;
                r[28] = 4;
            }),
            report(|r| r[29] = 1),
        ]);
        let mut session = KontrolA49::new(fake);

        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        session.on_key_press(move |k| l.borrow_mut().push(format!("press {k}")));
        let l = log.clone();
        session.on_key_release(move |k| l.borrow_mut().push(format!("release {k}")));
        let l = log.clone();
        session.on_rotary(move |v| l.borrow_mut().push(format!("rotary {v}")));
        let l = log.clone();
        session.on_octave(move |v| l.borrow_mut().push(format!("octave {v}")));

        let events = session.poll().unwrap();
        assert_eq!(
            events,
            vec![
                Event::KeyPressed(Key::Shift),
                Event::RotaryChanged(4),
                Event::KeyReleased(Key::Shift),
                Event::RotaryChanged(0),
                Event::TransposeChanged(1),
            ]
        );
        assert_eq!(
            *log.borrow(),
            ["press SHIFT", "rotary 4", "release SHIFT", "rotary 0", "octave 1"]
        );
        assert!(session.device.reads.is_empty());
        assert_eq!(session.transpose_value(), 1);

        // queue is empty, nothing more to do
        assert!(session.poll().unwrap().is_empty());
    }

    #[test]
    fn poll_without_handlers() {
        let fake = FakeTransport::with_reports([report(|r| r[2] = 0b10)]);
        let mut session = KontrolA49::new(fake);
        assert_eq!(session.poll().unwrap(), vec![Event::KeyPressed(Key::Play)]);
        assert!(session.is_pressed(Key::Play));
    }

    #[test]
    fn registering_replaces_handler() {
        let fake = FakeTransport::with_reports([report(|r| r[1] = 0b1)]);
        let mut session = KontrolA49::new(fake);
        let hits = Rc::new(RefCell::new((0, 0)));
        let h = hits.clone();
        session.on_key_press(move |_| h.borrow_mut().0 += 1);
        let h = hits.clone();
        session.on_key_press(move |_| h.borrow_mut().1 += 1);
        session.poll().unwrap();
        assert_eq!(*hits.borrow(), (0, 1));

        session.clear_handlers();
        session.device.reads.push_back(report(|_| {}));
        session.device.reads.push_back(report(|r| r[1] = 0b1));
        session.poll().unwrap();
        assert_eq!(*hits.borrow(), (0, 1));
    }

    #[test]
    fn truncated_report_is_an_error() {
        let fake = FakeTransport::with_reports([vec![0u8; 12]]);
        let mut session = KontrolA49::new(fake);
        assert!(matches!(
            session.poll(),
            Err(DeviceError::TruncatedReport {
                len: 12,
                expected: 30
            })
        ));
    }

    #[test]
    fn truncated_report_after_events_keeps_events() {
        let fake = FakeTransport::with_reports([report(|r| r[1] = 0b1), vec![0u8; 12]]);
        let mut session = KontrolA49::new(fake);

        assert_eq!(session.poll().unwrap(), vec![Event::KeyPressed(Key::Shift)]);
        assert!(session.is_pressed(Key::Shift));
        assert!(matches!(
            session.poll(),
            Err(DeviceError::TruncatedReport {
                len: 12,
                expected: 30
            })
        ));

        // the error is reported once, then polling carries on
        session.device.reads.push_back(report(|_| {}));
        assert_eq!(session.poll().unwrap(), vec![Event::KeyReleased(Key::Shift)]);
    }

    #[test]
    fn all_keys_on() {
        let mut session = KontrolA49::new(FakeTransport::default());
        session.set_all_keys(0xff, false).unwrap();
        assert!(session.device.writes.is_empty());
        session.send_key_lights().unwrap();

        let mut expected = vec![0x80];
        expected.extend([0xff; KEY_COUNT]);
        assert_eq!(session.device.writes, vec![expected]);
    }

    #[test]
    fn set_key_light_sends_full_state() {
        let mut session = KontrolA49::new(FakeTransport::default());
        session.set_key_light(Key::Play, 0xff, false).unwrap();
        session.set_key_light(Key::Stop, 0x40, true).unwrap();

        let writes = &session.device.writes;
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].len(), abi::LIGHTS_REPORT_LEN);
        assert_eq!(writes[0][1 + Key::Play.index()], 0xff);
        assert_eq!(writes[0][1 + Key::Stop.index()], 0x40);
        assert_eq!(session.light_state().get(Key::Play), 0xff);
    }

    #[test]
    fn set_key_by_index() {
        let mut session = KontrolA49::new(FakeTransport::default());
        session.set_key_by_index(0, 0x11, true).unwrap();
        assert_eq!(session.light_state().get(Key::Shift), 0x11);

        let before = session.light_state().clone();
        assert!(matches!(
            session.set_key_by_index(KEY_COUNT, 0xff, true),
            Err(DeviceError::KeyIndexOutOfRange { index: 26, len: 26 })
        ));
        assert_eq!(session.light_state(), &before);
        assert_eq!(session.device.writes.len(), 1);
    }

    #[test]
    fn send_image_writes_both_halves() {
        let mut session = KontrolA49::new(FakeTransport::default());
        let mut bitmap = Bitmap::new();
        bitmap.set(1, 17, true);
        session.send_image(&bitmap).unwrap();

        let writes = &session.device.writes;
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0][..9], abi::IMAGE_TOP_HEADER);
        assert_eq!(writes[1][..9], abi::IMAGE_BOTTOM_HEADER);
        assert!(writes[0][9..].iter().all(|&b| b == 0));
        assert_eq!(writes[1][9 + 1], 0b10);
    }

    #[test]
    fn write_failures_surface() {
        let mut session = KontrolA49::new(FakeTransport {
            fail_writes: true,
            ..Default::default()
        });
        assert!(matches!(
            session.set_all_keys(0xff, true),
            Err(DeviceError::Hid(_))
        ));
        assert!(matches!(
            session.send_image(&Bitmap::new()),
            Err(DeviceError::Hid(_))
        ));

        let mut session = KontrolA49::new(FakeTransport {
            accept: Some(3),
            ..Default::default()
        });
        assert!(matches!(
            session.send_key_lights(),
            Err(DeviceError::ShortWrite {
                written: 3,
                expected: 27
            })
        ));
    }

    #[test]
    fn sessions_do_not_share_state() {
        let mut a = KontrolA49::new(FakeTransport::with_reports([report(|r| r[28] = 9)]));
        let b = KontrolA49::new(FakeTransport::default());
        a.poll().unwrap();
        assert_eq!(a.rotary_value(), 9);
        assert_eq!(b.rotary_value(), 0);
    }
}
