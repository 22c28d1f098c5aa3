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

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use log::{debug, info, trace, warn};
use crate::definitions::{PadIndex, Rgb, TagEvent};
use crate::usb::errors::PortalError;
use crate::usb::frame::{decode_tag_event, encode_frame, Frame};
use crate::usb::requests::PortalCommand;

/// Raw frame I/O to the portal. Implemented over nusb for the real device.
#[async_trait]
pub trait PortalTransport: Send + Sync {
    async fn write_frame(&self, frame: &Frame) -> Result<(), PortalError>;

    /// Waits at most `timeout` for one inbound frame. `Ok(None)` means nothing arrived.
    async fn read_frame(&self, timeout: Duration) -> Result<Option<Vec<u8>>, PortalError>;
}

/// Portal driver. The command channel is best effort: write failures are
/// logged and never reach the caller. A portal without transport (hardware
/// missing) accepts every call and reports no events.
#[derive(Clone)]
pub struct Portal {
    transport: Option<Arc<dyn PortalTransport>>,
}

impl Portal {
    pub fn disabled() -> Self {
        Self { transport: None }
    }

    pub fn with_transport(transport: Arc<dyn PortalTransport>) -> Self {
        Self { transport: Some(transport) }
    }

    /// Wraps an already claimed transport and sends the wake-up command.
    pub async fn activate(transport: Arc<dyn PortalTransport>) -> Self {
        let portal = Self::with_transport(transport);
        portal.send_command(&PortalCommand::Wake).await;
        info!("Portal activated");
        portal
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    pub async fn send_command(&self, command: &PortalCommand) {
        let Some(transport) = &self.transport else {
            return;
        };
        let frame = match encode_frame(&command.to_bytes()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping portal command {:?}: {}", command, e);
                return;
            }
        };
        trace!("Portal <- {:02x?}", frame);
        if let Err(e) = transport.write_frame(&frame).await {
            warn!("USB write error: {}", e);
        }
    }

    pub async fn switch_pad(&self, pad: PadIndex, colour: Rgb) {
        self.send_command(&PortalCommand::SwitchPad { pad, colour }).await
    }

    pub async fn fade_pad(&self, pad: PadIndex, pulse_time: u8, pulse_count: u8, colour: Rgb) {
        self.send_command(&PortalCommand::FadePad { pad, pulse_time, pulse_count, colour }).await
    }

    pub async fn flash_pad(&self, pad: PadIndex, on_length: u8, off_length: u8, pulse_count: u8, colour: Rgb) {
        self.send_command(&PortalCommand::FlashPad { pad, on_length, off_length, pulse_count, colour }).await
    }

    /// Waits up to `timeout` for a tag report. Timeouts, foreign frames and
    /// read errors all come back as `None`.
    pub async fn poll_event(&self, timeout: Duration) -> Option<TagEvent> {
        let Some(transport) = &self.transport else {
            tokio::time::sleep(timeout).await;
            return None;
        };
        match transport.read_frame(timeout).await {
            Ok(Some(frame)) => {
                trace!("Portal -> {:02x?}", frame);
                let event = decode_tag_event(&frame);
                if let Some(event) = &event {
                    debug!("Tag event {}", event);
                }
                event
            }
            Ok(None) => None,
            Err(e) => {
                warn!("USB read error: {}", e);
                None
            }
        }
    }
}
