//! Keyboard input translation.
//!
//! Native consoles deliver batched input records; applications written for a
//! terminal expect a stream of key codes. This module sits between the two:
//!
//! - **keys**: application key codes
//! - **keymap**: virtual key code to application key code table
//! - **term_events**: input source backed by `crossterm` events
//!
//! The Win32 input source lives next to the Win32 console in `core::win32`.
//!
//! # Polling
//!
//! ```text
//! event loop ── input ready ──> KeyTranslator::read_keys
//!                                 ├── pending_events()   (never blocks)
//!                                 ├── read_events(128)
//!                                 └── first key-down ──> KeyMap ──> KeySink
//! ```

pub mod keymap;
pub mod keys;
pub mod term_events;

use std::sync::mpsc::Sender;

use bitflags::bitflags;

use crate::core::console::Result;

pub use keymap::VirtualKeyMap;
pub use keys::KeyCode;
pub use term_events::TermEvents;

/// Records read from the source per poll. Anything beyond stays queued.
pub const EVENT_BATCH: usize = 128;

bitflags! {
    /// Modifier and lock state attached to a key record
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ControlKeyState: u32 {
        const RIGHT_ALT_PRESSED  = 0x0001;
        const LEFT_ALT_PRESSED   = 0x0002;
        const RIGHT_CTRL_PRESSED = 0x0004;
        const LEFT_CTRL_PRESSED  = 0x0008;
        const SHIFT_PRESSED      = 0x0010;
        const NUMLOCK_ON         = 0x0020;
        const SCROLLLOCK_ON      = 0x0040;
        const CAPSLOCK_ON        = 0x0080;
        /// Navigation-cluster duplicate of a keypad key
        const ENHANCED_KEY       = 0x0100;
    }
}

/// A keyboard record as the native console reports it
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyRecord {
    pub key_down: bool,
    pub virtual_key: u16,
    /// UTF-16 unit the key produced, 0 for none
    pub unicode_char: u16,
    pub control_state: ControlKeyState,
}

impl KeyRecord {
    pub fn is_extended(&self) -> bool {
        self.control_state.contains(ControlKeyState::ENHANCED_KEY)
    }
}

/// One native input record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputRecord {
    Key(KeyRecord),
    Mouse { column: u16, row: u16 },
    WindowBufferSize { cols: u16, rows: u16 },
    Focus { gained: bool },
    Menu { command_id: u32 },
}

/// A batched, non-blocking queue of input records
pub trait InputSource {
    /// Number of records waiting. Must not block.
    fn pending_events(&mut self) -> Result<usize>;

    /// Dequeue up to `max` records
    fn read_events(&mut self, max: usize) -> Result<Vec<InputRecord>>;
}

/// Virtual key to application key lookup
pub trait KeyMap {
    fn lookup(&self, virtual_key: u16, extended: bool) -> Option<KeyCode>;
}

impl<F> KeyMap for F
where
    F: Fn(u16, bool) -> Option<KeyCode>,
{
    fn lookup(&self, virtual_key: u16, extended: bool) -> Option<KeyCode> {
        self(virtual_key, extended)
    }
}

/// Receiver of translated keys
pub trait KeySink {
    fn put_key(&mut self, key: KeyCode);
}

impl KeySink for Vec<KeyCode> {
    fn put_key(&mut self, key: KeyCode) {
        self.push(key);
    }
}

impl KeySink for Sender<KeyCode> {
    fn put_key(&mut self, key: KeyCode) {
        if self.send(key).is_err() {
            tracing::debug!("Key receiver gone, dropped {:?}", key);
        }
    }
}

/// Turns native key records into application key codes, one per poll
#[derive(Clone, Debug, Default)]
pub struct KeyTranslator<M> {
    keymap: M,
}

impl<M: KeyMap> KeyTranslator<M> {
    pub fn new(keymap: M) -> Self {
        Self { keymap }
    }

    /// Take the next key from `source`, if one is ready.
    ///
    /// Only the first key-down record of the batch is used; the rest of the
    /// batch is dropped. Read failures count as "nothing yet".
    pub fn poll<S: InputSource + ?Sized>(&self, source: &mut S) -> Option<KeyCode> {
        let pending = match source.pending_events() {
            Ok(n) => n,
            Err(e) => {
                tracing::trace!("Input event count failed: {}", e);
                return None;
            }
        };
        if pending == 0 {
            return None;
        }

        let records = match source.read_events(EVENT_BATCH) {
            Ok(records) => records,
            Err(e) => {
                tracing::trace!("Input read failed: {}", e);
                return None;
            }
        };

        records.iter().find_map(|record| match record {
            InputRecord::Key(key) if key.key_down => Some(self.translate(key)),
            _ => None,
        })?
    }

    /// Map one key-down record, falling back to its character
    pub fn translate(&self, key: &KeyRecord) -> Option<KeyCode> {
        if let Some(code) = self.keymap.lookup(key.virtual_key, key.is_extended()) {
            return Some(code);
        }
        if key.unicode_char != 0 {
            return Some(KeyCode(u32::from(key.unicode_char)));
        }
        tracing::debug!(
            "Unmapped key: vk={:#04x}, extended={}",
            key.virtual_key,
            key.is_extended()
        );
        None
    }

    /// Event-loop callback: deliver at most one key to `sink`.
    ///
    /// Returns whether a key was delivered. The source is never reported as
    /// closed; a failed read just means trying again on the next wakeup.
    pub fn read_keys<S, K>(&self, source: &mut S, sink: &mut K) -> bool
    where
        S: InputSource + ?Sized,
        K: KeySink + ?Sized,
    {
        match self.poll(source) {
            Some(key) => {
                sink.put_key(key);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::keymap::vk;
    use super::*;
    use crate::core::console::ConsoleError;
    use std::collections::VecDeque;

    /// Scripted source: a queue of records plus failure switches
    #[derive(Default)]
    struct Script {
        queue: VecDeque<InputRecord>,
        fail_count: bool,
        fail_read: bool,
        reads: usize,
    }

    impl Script {
        fn with(records: &[InputRecord]) -> Self {
            Self {
                queue: records.iter().copied().collect(),
                ..Default::default()
            }
        }
    }

    impl InputSource for Script {
        fn pending_events(&mut self) -> Result<usize> {
            if self.fail_count {
                return Err(ConsoleError::Read("count".to_string()));
            }
            Ok(self.queue.len())
        }

        fn read_events(&mut self, max: usize) -> Result<Vec<InputRecord>> {
            self.reads += 1;
            if self.fail_read {
                return Err(ConsoleError::Read("read".to_string()));
            }
            let n = max.min(self.queue.len());
            Ok(self.queue.drain(..n).collect())
        }
    }

    fn key(down: bool, virtual_key: u16, ch: char) -> InputRecord {
        InputRecord::Key(KeyRecord {
            key_down: down,
            virtual_key,
            unicode_char: ch as u16,
            control_state: ControlKeyState::empty(),
        })
    }

    fn extended(virtual_key: u16) -> InputRecord {
        InputRecord::Key(KeyRecord {
            key_down: true,
            virtual_key,
            unicode_char: 0,
            control_state: ControlKeyState::ENHANCED_KEY,
        })
    }

    fn translator() -> KeyTranslator<VirtualKeyMap> {
        KeyTranslator::new(VirtualKeyMap)
    }

    #[test]
    fn test_no_pending_events_does_not_read() {
        let mut source = Script::default();
        assert_eq!(translator().poll(&mut source), None);
        assert_eq!(source.reads, 0);
    }

    #[test]
    fn test_mapped_key() {
        let mut source = Script::with(&[extended(vk::LEFT)]);
        assert_eq!(translator().poll(&mut source), Some(keys::LEFT));
    }

    #[test]
    fn test_extended_flag_selects_mapping() {
        let mut source = Script::with(&[key(true, vk::RETURN, '\r')]);
        assert_eq!(translator().poll(&mut source), Some(keys::ENTER));

        let mut source = Script::with(&[extended(vk::RETURN)]);
        assert_eq!(translator().poll(&mut source), Some(keys::KP_ENTER));
    }

    #[test]
    fn test_character_fallback() {
        let mut source = Script::with(&[key(true, 0x41, 'a')]);
        assert_eq!(translator().poll(&mut source), Some(KeyCode('a' as u32)));

        let mut source = Script::with(&[key(true, 0, '\u{e9}')]);
        assert_eq!(translator().poll(&mut source), Some(KeyCode(0xe9)));
    }

    #[test]
    fn test_unmapped_without_character_yields_nothing() {
        // Shift alone: no mapping, no character, and the scan stops there
        let mut source = Script::with(&[key(true, 0x10, '\0'), key(true, 0x42, 'b')]);
        assert_eq!(translator().poll(&mut source), None);
        assert!(source.queue.is_empty());
    }

    #[test]
    fn test_key_up_and_other_records_skipped() {
        let mut source = Script::with(&[
            InputRecord::Focus { gained: true },
            key(false, 0x41, 'a'),
            InputRecord::Mouse { column: 3, row: 4 },
            InputRecord::WindowBufferSize { cols: 80, rows: 25 },
            InputRecord::Menu { command_id: 7 },
            key(true, 0x5A, 'z'),
        ]);
        assert_eq!(translator().poll(&mut source), Some(KeyCode('z' as u32)));
    }

    #[test]
    fn test_non_key_batch_does_not_block_next_poll() {
        let mut source = Script::with(&[InputRecord::Focus { gained: false }]);
        let translator = translator();
        assert_eq!(translator.poll(&mut source), None);

        source.queue.push_back(key(true, 0x51, 'q'));
        assert_eq!(translator.poll(&mut source), Some(KeyCode('q' as u32)));
    }

    #[test]
    fn test_rest_of_batch_dropped() {
        let mut source = Script::with(&[key(true, 0x41, 'a'), key(true, 0x42, 'b')]);
        let translator = translator();
        assert_eq!(translator.poll(&mut source), Some(KeyCode('a' as u32)));
        assert_eq!(translator.poll(&mut source), None);
    }

    #[test]
    fn test_batch_limit_leaves_records_queued() {
        let mut records = vec![InputRecord::Focus { gained: true }; EVENT_BATCH];
        records.push(key(true, 0x43, 'c'));
        let mut source = Script::with(&records);
        let translator = translator();

        assert_eq!(translator.poll(&mut source), None);
        assert_eq!(source.queue.len(), 1);
        assert_eq!(translator.poll(&mut source), Some(KeyCode('c' as u32)));
    }

    #[test]
    fn test_failures_are_transient() {
        let translator = translator();
        let mut source = Script::with(&[key(true, 0x41, 'a')]);

        source.fail_count = true;
        assert_eq!(translator.poll(&mut source), None);

        source.fail_count = false;
        source.fail_read = true;
        assert_eq!(translator.poll(&mut source), None);

        source.fail_read = false;
        assert_eq!(translator.poll(&mut source), Some(KeyCode('a' as u32)));
    }

    #[test]
    fn test_injected_keymap() {
        let translator = KeyTranslator::new(|code: u16, _ext: bool| (code == 0x41).then_some(KeyCode(999)));
        let mut source = Script::with(&[key(true, 0x41, 'a')]);
        assert_eq!(translator.poll(&mut source), Some(KeyCode(999)));
    }

    #[test]
    fn test_read_keys_feeds_sink() {
        let translator = translator();
        let mut source = Script::with(&[extended(vk::UP)]);
        let mut sink = Vec::new();

        assert!(translator.read_keys(&mut source, &mut sink));
        assert!(!translator.read_keys(&mut source, &mut sink));
        assert_eq!(sink, vec![keys::UP]);
    }

    #[test]
    fn test_read_keys_channel_sink() {
        let (mut tx, rx) = std::sync::mpsc::channel::<KeyCode>();
        let mut source = Script::with(&[key(true, vk::ESCAPE, '\x1b')]);
        translator().read_keys(&mut source, &mut tx);
        assert_eq!(rx.try_recv().ok(), Some(keys::ESC));
    }
}
