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

use crate::definitions::{TagEvent, TagEventKind};
use crate::usb::errors::FrameError;

/// Every transfer to and from the portal is exactly this long.
pub const FRAME_LEN: usize = 32;

/// First byte of a portal-to-host frame reporting a tag.
pub const TAG_EVENT_MARKER: u8 = 0x56;

const PAD_OFFSET: usize = 2;
const REMOVED_OFFSET: usize = 5;
const UID_OFFSET: usize = 6;
const UID_LEN: usize = 7;

/// The portal reports shorter tag UIDs left-padded with this group.
const UID_ZERO_GROUP: &str = "000000";

pub type Frame = [u8; FRAME_LEN];

pub fn checksum(command: &[u8]) -> u8 {
    command.iter().fold(0u8, |sum, byte| sum.wrapping_add(*byte))
}

/// Appends the checksum to `command` and zero-pads the result to a full frame.
pub fn encode_frame(command: &[u8]) -> Result<Frame, FrameError> {
    if command.len() >= FRAME_LEN {
        return Err(FrameError::TooLong {
            max: FRAME_LEN - 1,
            actual: command.len(),
        });
    }
    let mut frame = [0u8; FRAME_LEN];
    frame[..command.len()].copy_from_slice(command);
    frame[command.len()] = checksum(command);
    Ok(frame)
}

/// Interprets an inbound frame. Anything that is not a tag report yields `None`.
pub fn decode_tag_event(frame: &[u8]) -> Option<TagEvent> {
    if frame.len() < UID_OFFSET + UID_LEN || frame[0] != TAG_EVENT_MARKER {
        return None;
    }
    let pad = frame[PAD_OFFSET];
    let kind = if frame[REMOVED_OFFSET] != 0 {
        TagEventKind::Removed
    } else {
        TagEventKind::Added
    };
    let uid = hex::encode(&frame[UID_OFFSET..UID_OFFSET + UID_LEN]);
    let identifier = uid.strip_prefix(UID_ZERO_GROUP).map(str::to_owned).unwrap_or(uid);

    Some(TagEvent { kind, pad, identifier })
}
