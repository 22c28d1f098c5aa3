// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::definitions::{PadIndex, Rgb};

/// First byte of every host-to-portal command.
pub const COMMAND_MARKER: u8 = 0x55;

/// Text the portal expects in the wake-up command before it reports any tag.
pub const WAKE_TEXT: &[u8] = b"(c) LEGO 2014";

/// Represents the opcodes understood by the portal.
///
/// The opcode is the third byte of a command, right after the marker and the
/// length byte. Each opcode is followed by a correlation byte which the portal
/// echoes back in its replies; the host never matches replies, so the values
/// are fixed per opcode.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(unused)]
pub enum PortalRequestCode {
    /// `wake`: payload is [`WAKE_TEXT`].
    Wake = 0xb0,
    /// `switchPad`: payload is pad, r, g, b.
    SwitchPad = 0xc0,
    /// `fadePad`: payload is pad, pulse time, pulse count, r, g, b.
    FadePad = 0xc2,
    /// `flashPad`: payload is pad, on length, off length, pulse count, r, g, b.
    FlashPad = 0xc3,
}

impl PortalRequestCode {
    pub fn correlation_id(self) -> u8 {
        match self {
            PortalRequestCode::Wake => 0x01,
            PortalRequestCode::SwitchPad => 0x02,
            PortalRequestCode::FadePad => 0x0f,
            PortalRequestCode::FlashPad => 0x03,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortalCommand {
    Wake,
    SwitchPad {
        pad: PadIndex,
        colour: Rgb,
    },
    FadePad {
        pad: PadIndex,
        pulse_time: u8,
        pulse_count: u8,
        colour: Rgb,
    },
    FlashPad {
        pad: PadIndex,
        on_length: u8,
        off_length: u8,
        pulse_count: u8,
        colour: Rgb,
    },
}

impl PortalCommand {
    pub fn request_code(&self) -> PortalRequestCode {
        match self {
            PortalCommand::Wake => PortalRequestCode::Wake,
            PortalCommand::SwitchPad { .. } => PortalRequestCode::SwitchPad,
            PortalCommand::FadePad { .. } => PortalRequestCode::FadePad,
            PortalCommand::FlashPad { .. } => PortalRequestCode::FlashPad,
        }
    }

    fn payload(&self) -> Vec<u8> {
        match *self {
            PortalCommand::Wake => WAKE_TEXT.to_vec(),
            PortalCommand::SwitchPad { pad, colour } => {
                let [r, g, b] = colour.bytes();
                vec![pad, r, g, b]
            }
            PortalCommand::FadePad { pad, pulse_time, pulse_count, colour } => {
                let [r, g, b] = colour.bytes();
                vec![pad, pulse_time, pulse_count, r, g, b]
            }
            PortalCommand::FlashPad { pad, on_length, off_length, pulse_count, colour } => {
                let [r, g, b] = colour.bytes();
                vec![pad, on_length, off_length, pulse_count, r, g, b]
            }
        }
    }

    /// Command bytes without checksum and padding:
    /// `[0x55, length, opcode, correlation, payload...]` where `length` counts
    /// every byte after itself.
    pub fn to_bytes(&self) -> Vec<u8> {
        let code = self.request_code();
        let payload = self.payload();
        let mut bytes = Vec::with_capacity(payload.len() + 4);
        bytes.push(COMMAND_MARKER);
        bytes.push((payload.len() + 2) as u8);
        bytes.push(code as u8);
        bytes.push(code.correlation_id());
        bytes.extend_from_slice(&payload);
        bytes
    }
}
