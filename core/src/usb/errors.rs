use std::io;
use nusb::transfer::TransferError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Command is too long for a portal frame: {actual} bytes, at most {max} allowed")]
    TooLong {
        max: usize,
        actual: usize,
    },
}

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Portal {vendor_id:04x}:{product_id:04x} not found")]
    DeviceNotFound {
        vendor_id: u16,
        product_id: u16,
    },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("USB transfer failed: {0}")]
    TransferError(#[from] TransferError),

    #[error("Invalid frame: {0}")]
    FrameError(#[from] FrameError),

    #[error("Other error: {0}")]
    OtherError(String),
}

impl From<String> for PortalError {
    fn from(other: String) -> Self {
        PortalError::OtherError(other)
    }
}
