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
use log::{error, info};
use nusb::DeviceInfo;
use crate::usb::errors::PortalError;
use crate::usb::portal::Portal;
use crate::usb::portal_usb_interface::PortalUsbInterface;

pub mod errors;
pub mod frame;
pub mod portal;
pub mod portal_usb_interface;
pub mod requests;

pub const PORTAL_VENDOR_ID: u16 = 0x0e6f;
pub const PORTAL_PRODUCT_ID: u16 = 0x0241;
pub const PORTAL_INTERFACE_NUMBER: u8 = 0;

fn is_portal(device_info: &DeviceInfo) -> bool {
    device_info.vendor_id() == PORTAL_VENDOR_ID && device_info.product_id() == PORTAL_PRODUCT_ID
}

pub fn find_portal() -> Result<DeviceInfo, PortalError> {
    nusb::list_devices()?
        .find(is_portal)
        .ok_or(PortalError::DeviceNotFound {
            vendor_id: PORTAL_VENDOR_ID,
            product_id: PORTAL_PRODUCT_ID,
        })
}

/// Claims the portal interface. A kernel driver bound to it is detached first
/// on Linux; elsewhere this is a plain claim.
pub async fn open_interface(device_info: &DeviceInfo, interface_number: u8) -> Result<nusb::Interface, PortalError> {
    let device = device_info.open()?;
    let interface = device.detach_and_claim_interface(interface_number)?;
    Ok(interface)
}

pub async fn create_and_activate_portal() -> Result<Portal, PortalError> {
    let device_info = find_portal()?;
    let interface = open_interface(&device_info, PORTAL_INTERFACE_NUMBER).await?;
    info!("Portal interface claimed: \"{}\" ({:04x}:{:04x})",
          device_info.product_string().unwrap_or("Unknown"),
          device_info.vendor_id(),
          device_info.product_id());
    Ok(Portal::activate(Arc::new(PortalUsbInterface::new(interface))).await)
}

/// Opens the portal, degrading to a disabled driver when the hardware is
/// missing or cannot be claimed.
pub async fn open_portal() -> Portal {
    match create_and_activate_portal().await {
        Ok(portal) => portal,
        Err(e) => {
            error!("Failed to initialize USB device: {}", e);
            Portal::disabled()
        }
    }
}
