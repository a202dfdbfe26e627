//! Application key codes
//!
//! Printable keys are their Unicode scalar value. Control keys that have an
//! ASCII meaning keep it; everything else lives above [`KEY_BASE`].

use std::fmt;

/// An application-level key code
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u32);

/// First code outside the Unicode range used for special keys
pub const KEY_BASE: u32 = 1 << 21;

const fn special(n: u32) -> KeyCode {
    KeyCode(KEY_BASE + n)
}

pub const BACKSPACE: KeyCode = KeyCode(8);
pub const TAB: KeyCode = KeyCode(9);
pub const ENTER: KeyCode = KeyCode(13);
pub const ESC: KeyCode = KeyCode(27);

pub const PAUSE: KeyCode = special(0x01);
pub const PRINT: KeyCode = special(0x02);
pub const MENU: KeyCode = special(0x03);

pub const INSERT: KeyCode = special(0x10);
pub const DELETE: KeyCode = special(0x11);
pub const HOME: KeyCode = special(0x12);
pub const END: KeyCode = special(0x13);
pub const PAGE_UP: KeyCode = special(0x14);
pub const PAGE_DOWN: KeyCode = special(0x15);
pub const LEFT: KeyCode = special(0x16);
pub const RIGHT: KeyCode = special(0x17);
pub const UP: KeyCode = special(0x18);
pub const DOWN: KeyCode = special(0x19);

/// `F1` is `function(1)`
const F_BASE: u32 = 0x40;
pub const F_MAX: u32 = 24;

pub const KP0: KeyCode = special(0x80);
pub const KP_DEC: KeyCode = special(0x8A);
pub const KP_ENTER: KeyCode = special(0x8B);
pub const KP_ADD: KeyCode = special(0x8C);
pub const KP_SUBTRACT: KeyCode = special(0x8D);
pub const KP_MULTIPLY: KeyCode = special(0x8E);
pub const KP_DIVIDE: KeyCode = special(0x8F);
pub const KP_INS: KeyCode = special(0x90);
pub const KP_DEL: KeyCode = special(0x91);
pub const KP_HOME: KeyCode = special(0x92);
pub const KP_END: KeyCode = special(0x93);
pub const KP_PGUP: KeyCode = special(0x94);
pub const KP_PGDWN: KeyCode = special(0x95);
pub const KP_LEFT: KeyCode = special(0x96);
pub const KP_RIGHT: KeyCode = special(0x97);
pub const KP_UP: KeyCode = special(0x98);
pub const KP_DOWN: KeyCode = special(0x99);
pub const KP_BEGIN: KeyCode = special(0x9A);

impl KeyCode {
    /// Function key `F<n>`, 1-based
    pub const fn function(n: u32) -> KeyCode {
        special(F_BASE + n)
    }

    /// Keypad digit key
    pub const fn keypad(digit: u32) -> KeyCode {
        KeyCode(KP0.0 + digit)
    }

    /// Name of a special key
    pub fn name(self) -> Option<&'static str> {
        const NAMES: &[(KeyCode, &str)] = &[
            (BACKSPACE, "BS"),
            (TAB, "TAB"),
            (ENTER, "ENTER"),
            (ESC, "ESC"),
            (PAUSE, "PAUSE"),
            (PRINT, "PRINT"),
            (MENU, "MENU"),
            (INSERT, "INS"),
            (DELETE, "DEL"),
            (HOME, "HOME"),
            (END, "END"),
            (PAGE_UP, "PGUP"),
            (PAGE_DOWN, "PGDWN"),
            (LEFT, "LEFT"),
            (RIGHT, "RIGHT"),
            (UP, "UP"),
            (DOWN, "DOWN"),
            (KP_DEC, "KP_DEC"),
            (KP_ENTER, "KP_ENTER"),
            (KP_ADD, "KP_ADD"),
            (KP_SUBTRACT, "KP_SUBTRACT"),
            (KP_MULTIPLY, "KP_MULTIPLY"),
            (KP_DIVIDE, "KP_DIVIDE"),
            (KP_INS, "KP_INS"),
            (KP_DEL, "KP_DEL"),
            (KP_HOME, "KP_HOME"),
            (KP_END, "KP_END"),
            (KP_PGUP, "KP_PGUP"),
            (KP_PGDWN, "KP_PGDWN"),
            (KP_LEFT, "KP_LEFT"),
            (KP_RIGHT, "KP_RIGHT"),
            (KP_UP, "KP_UP"),
            (KP_DOWN, "KP_DOWN"),
            (KP_BEGIN, "KP_BEGIN"),
        ];
        NAMES.iter().find(|(code, _)| *code == self).map(|(_, name)| *name)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name() {
            return f.write_str(name);
        }
        let n = self.0;
        if (KeyCode::function(1).0..=KeyCode::function(F_MAX).0).contains(&n) {
            return write!(f, "F{}", n - KeyCode::function(0).0);
        }
        if (KP0.0..KP0.0 + 10).contains(&n) {
            return write!(f, "KP{}", n - KP0.0);
        }
        match char::from_u32(n) {
            Some(ch) if !ch.is_control() => write!(f, "{}", ch),
            _ => write!(f, "0x{:x}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(KeyCode('x' as u32).to_string(), "x");
        assert_eq!(ENTER.to_string(), "ENTER");
        assert_eq!(KeyCode::function(12).to_string(), "F12");
        assert_eq!(KeyCode::keypad(7).to_string(), "KP7");
        assert_eq!(KeyCode(3).to_string(), "0x3");
    }

    #[test]
    fn test_special_codes_outside_unicode() {
        assert!(char::from_u32(LEFT.0).is_none());
        assert!(KeyCode::function(F_MAX).0 < KP0.0);
    }
}
