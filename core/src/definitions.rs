use std::fmt;

/// Index of a placement zone on the portal. The toy pad has three of them.
pub type PadIndex = u8;

pub const PAD_COUNT: PadIndex = 3;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn bytes(self) -> [u8; 3] {
        [self.0, self.1, self.2]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

pub const OFF: Rgb = Rgb(0, 0, 0);
pub const RED: Rgb = Rgb(255, 0, 0);
pub const GREEN: Rgb = Rgb(0, 255, 0);
pub const BLUE: Rgb = Rgb(0, 0, 255);
pub const PINK: Rgb = Rgb(255, 192, 203);
pub const ORANGE: Rgb = Rgb(255, 165, 0);
pub const PURPLE: Rgb = Rgb(255, 0, 255);
pub const LIGHT_BLUE: Rgb = Rgb(173, 216, 230);
pub const OLIVE: Rgb = Rgb(128, 128, 0);

/// Colours the lightshow picks from.
pub const LIGHTSHOW_PALETTE: [Rgb; 8] = [RED, GREEN, BLUE, PINK, ORANGE, PURPLE, LIGHT_BLUE, OLIVE];

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TagEventKind {
    Added,
    Removed,
}

/// A tag placed on or lifted from a pad, decoded from one inbound portal frame.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TagEvent {
    pub kind: TagEventKind,
    pub pad: PadIndex,
    pub identifier: String,
}

impl fmt::Display for TagEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            TagEventKind::Added => "added",
            TagEventKind::Removed => "removed",
        };
        write!(f, "{}:{}:{}", kind, self.pad, self.identifier)
    }
}

/// Local playback state as reported by the player.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}
