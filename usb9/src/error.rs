//! Errors of the control pipe
//!
//! None of these is fatal: the dispatcher answers every one of them with a
//! stall on endpoint 0 and the pipe accepts the next setup packet.
use thiserror::Error;

use crate::protocol::DeviceState;

/// Why a class driver did not complete a request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The class driver does not provide this capability
    #[error("capability not provided by the class driver")]
    Unsupported,
    /// The class driver refused the request
    #[error("request refused by the class driver")]
    Stall,
}

/// A setup packet the device cannot honour
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unsupported request {0:#04x}")]
    UnsupportedRequest(u8),
    #[error("request type {0:#04x} not accepted for this request")]
    InvalidRequestType(u8),
    #[error("recipient not accepted for this request")]
    InvalidRecipient,
    #[error("no endpoint at index {0:#06x}")]
    InvalidEndpoint(u16),
    #[error("unknown descriptor type {0:#04x}")]
    UnknownDescriptor(u8),
    #[error("no string descriptor at index {0}")]
    UnknownString(u8),
    #[error("configuration {0} out of range")]
    InvalidConfiguration(u16),
    #[error("request not allowed in the {0:?} state")]
    InvalidState(DeviceState),
    #[error("data stage without a pending OUT request")]
    UnexpectedDataStage,
    #[error("class driver: {0}")]
    Capability(#[from] RequestError),
}
