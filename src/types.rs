//! Common types used both by decoder and encoder
use serde::{Deserialize, Serialize};

/// Disposal method
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum DisposalMethod {
    /// Decoder is not required to take any action.
    Any = 0,
    /// Do not dispose.
    Keep = 1,
    /// Restore to background color.
    Background = 2,
    /// Restore to previous.
    Previous = 3,
}

impl DisposalMethod {
    pub fn from_u8(n: u8) -> Option<DisposalMethod> {
        match n {
            0 => Some(DisposalMethod::Any),
            1 => Some(DisposalMethod::Keep),
            2 => Some(DisposalMethod::Background),
            3 => Some(DisposalMethod::Previous),
            _ => None,
        }
    }
}

impl Default for DisposalMethod {
    fn default() -> DisposalMethod {
        DisposalMethod::Any
    }
}

enum_from_primitive! {
/// Known block types
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Block {
    Image = 0x2C,
    Extension = 0x21,
    Trailer = 0x3B
}
}

enum_from_primitive! {
/// Known GIF extensions
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Extension {
    Text = 0x01,
    Control = 0xF9,
    Comment = 0xFE,
    Application = 0xFF
}
}

/// How often a player should run through the animation.
///
/// `Finite(0)` plays the frames once and writes no looping extension.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    Infinite,
    Finite(u16),
}

impl Repeat {
    /// Loop count stored in the NETSCAPE2.0 extension, `None` if the
    /// extension is omitted.
    pub fn loop_count(self) -> Option<u16> {
        match self {
            Repeat::Infinite => Some(0),
            Repeat::Finite(0) => None,
            Repeat::Finite(n) => Some(n),
        }
    }
}

impl Default for Repeat {
    fn default() -> Repeat {
        Repeat::Infinite
    }
}
