//! Virtual key code table
//!
//! The extended flag separates the navigation cluster and the keypad Enter
//! from their keypad twins. Keypad keys without num lock report navigation
//! virtual keys without the flag.

use super::keys::{self, KeyCode};
use super::KeyMap;

/// Native virtual key codes
pub mod vk {
    pub const BACK: u16 = 0x08;
    pub const TAB: u16 = 0x09;
    pub const CLEAR: u16 = 0x0C;
    pub const RETURN: u16 = 0x0D;
    pub const PAUSE: u16 = 0x13;
    pub const ESCAPE: u16 = 0x1B;
    pub const PRIOR: u16 = 0x21;
    pub const NEXT: u16 = 0x22;
    pub const END: u16 = 0x23;
    pub const HOME: u16 = 0x24;
    pub const LEFT: u16 = 0x25;
    pub const UP: u16 = 0x26;
    pub const RIGHT: u16 = 0x27;
    pub const DOWN: u16 = 0x28;
    pub const SNAPSHOT: u16 = 0x2C;
    pub const INSERT: u16 = 0x2D;
    pub const DELETE: u16 = 0x2E;
    pub const APPS: u16 = 0x5D;
    pub const NUMPAD0: u16 = 0x60;
    pub const NUMPAD9: u16 = 0x69;
    pub const MULTIPLY: u16 = 0x6A;
    pub const ADD: u16 = 0x6B;
    pub const SUBTRACT: u16 = 0x6D;
    pub const DECIMAL: u16 = 0x6E;
    pub const DIVIDE: u16 = 0x6F;
    pub const F1: u16 = 0x70;
    pub const F24: u16 = 0x87;
}

/// Default [`KeyMap`] for native virtual key codes
#[derive(Clone, Copy, Debug, Default)]
pub struct VirtualKeyMap;

impl VirtualKeyMap {
    fn extended(virtual_key: u16) -> Option<KeyCode> {
        let code = match virtual_key {
            vk::LEFT => keys::LEFT,
            vk::UP => keys::UP,
            vk::RIGHT => keys::RIGHT,
            vk::DOWN => keys::DOWN,
            vk::INSERT => keys::INSERT,
            vk::DELETE => keys::DELETE,
            vk::HOME => keys::HOME,
            vk::END => keys::END,
            vk::PRIOR => keys::PAGE_UP,
            vk::NEXT => keys::PAGE_DOWN,
            vk::RETURN => keys::KP_ENTER,
            // Keypad '/' is extended too
            vk::DIVIDE => keys::KP_DIVIDE,
            _ => return None,
        };
        Some(code)
    }

    fn standard(virtual_key: u16) -> Option<KeyCode> {
        let code = match virtual_key {
            vk::ESCAPE => keys::ESC,
            vk::BACK => keys::BACKSPACE,
            vk::TAB => keys::TAB,
            vk::RETURN => keys::ENTER,
            vk::PAUSE => keys::PAUSE,
            vk::SNAPSHOT => keys::PRINT,
            vk::APPS => keys::MENU,

            vk::F1..=vk::F24 => KeyCode::function(u32::from(virtual_key - vk::F1) + 1),

            vk::NUMPAD0..=vk::NUMPAD9 => KeyCode::keypad(u32::from(virtual_key - vk::NUMPAD0)),
            vk::DECIMAL => keys::KP_DEC,
            vk::ADD => keys::KP_ADD,
            vk::SUBTRACT => keys::KP_SUBTRACT,
            vk::MULTIPLY => keys::KP_MULTIPLY,
            vk::DIVIDE => keys::KP_DIVIDE,

            // Keypad with num lock off
            vk::INSERT => keys::KP_INS,
            vk::DELETE => keys::KP_DEL,
            vk::HOME => keys::KP_HOME,
            vk::END => keys::KP_END,
            vk::PRIOR => keys::KP_PGUP,
            vk::NEXT => keys::KP_PGDWN,
            vk::LEFT => keys::KP_LEFT,
            vk::RIGHT => keys::KP_RIGHT,
            vk::UP => keys::KP_UP,
            vk::DOWN => keys::KP_DOWN,
            vk::CLEAR => keys::KP_BEGIN,
            _ => return None,
        };
        Some(code)
    }
}

impl KeyMap for VirtualKeyMap {
    fn lookup(&self, virtual_key: u16, extended: bool) -> Option<KeyCode> {
        if extended {
            Self::extended(virtual_key)
        } else {
            Self::standard(virtual_key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_vs_keypad() {
        let map = VirtualKeyMap;
        assert_eq!(map.lookup(vk::HOME, true), Some(keys::HOME));
        assert_eq!(map.lookup(vk::HOME, false), Some(keys::KP_HOME));
        assert_eq!(map.lookup(vk::RETURN, true), Some(keys::KP_ENTER));
        assert_eq!(map.lookup(vk::RETURN, false), Some(keys::ENTER));
    }

    #[test]
    fn test_function_keys() {
        let map = VirtualKeyMap;
        assert_eq!(map.lookup(vk::F1, false), Some(KeyCode::function(1)));
        assert_eq!(map.lookup(vk::F24, false), Some(KeyCode::function(24)));
        assert_eq!(map.lookup(vk::F1, true), None);
    }

    #[test]
    fn test_keypad_digits() {
        let map = VirtualKeyMap;
        assert_eq!(map.lookup(vk::NUMPAD0, false), Some(KeyCode::keypad(0)));
        assert_eq!(map.lookup(vk::NUMPAD9, false), Some(KeyCode::keypad(9)));
    }

    #[test]
    fn test_characters_unmapped() {
        let map = VirtualKeyMap;
        // Letters, digits, space and modifiers fall through to the character
        for key in [0x41, 0x5A, 0x30, 0x20, 0x10, 0x11] {
            assert_eq!(map.lookup(key, false), None, "vk {:#x}", key);
        }
    }
}
