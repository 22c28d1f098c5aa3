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

use std::time::Duration;
use async_trait::async_trait;
use nusb::Interface;
use nusb::transfer::{Queue, RequestBuffer};
use tokio::sync::Mutex;
use crate::usb::errors::PortalError;
use crate::usb::frame::{Frame, FRAME_LEN};
use crate::usb::portal::PortalTransport;

pub const OUT_ENDPOINT: u8 = 0x01;
pub const IN_ENDPOINT: u8 = 0x81;

const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Interrupt-endpoint transport to a claimed portal interface.
///
/// One IN transfer is kept in flight at all times, so a poll that times out
/// leaves the request queued and the next poll picks up whatever arrives.
pub struct PortalUsbInterface {
    interface: Interface,
    in_queue: Mutex<Queue<RequestBuffer>>,
}

impl PortalUsbInterface {
    pub fn new(interface: Interface) -> Self {
        let in_queue = interface.interrupt_in_queue(IN_ENDPOINT);
        Self {
            interface,
            in_queue: Mutex::new(in_queue),
        }
    }
}

#[async_trait]
impl PortalTransport for PortalUsbInterface {
    async fn write_frame(&self, frame: &Frame) -> Result<(), PortalError> {
        let transfer = self.interface.interrupt_out(OUT_ENDPOINT, frame.to_vec());
        match tokio::time::timeout(WRITE_TIMEOUT, transfer).await {
            Ok(completion) => {
                completion.into_result()?;
                Ok(())
            }
            Err(_) => Err(PortalError::OtherError(format!(
                "write to endpoint {:#04x} timed out after {:?}",
                OUT_ENDPOINT, WRITE_TIMEOUT
            ))),
        }
    }

    async fn read_frame(&self, timeout: Duration) -> Result<Option<Vec<u8>>, PortalError> {
        let mut queue = self.in_queue.lock().await;
        if queue.pending() == 0 {
            queue.submit(RequestBuffer::new(FRAME_LEN));
        }
        match tokio::time::timeout(timeout, queue.next_complete()).await {
            Ok(completion) => {
                let data = completion.into_result()?;
                Ok(Some(data))
            }
            Err(_) => Ok(None),
        }
    }
}
