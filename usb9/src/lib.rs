//! USB full-speed control transfers
//!
//! Interprets the chapter 9 standard requests arriving on endpoint 0, walks
//! the device through its enumeration states and hands class and vendor
//! requests to the bound class driver.
//!
//! The register-level driver implements [`Transceiver`]; the class driver
//! implements [`DeviceInterface`]. [`Usb9`] sits between the two.
//!
//! ## Usage
//!
//! ```ignore
//! use usb9::{SetupPacket, Usb9};
//!
//! let mut serial = cdc_serial::CdcSerial::new(Default::default());
//! let mut usb = Usb9::new(&mut serial);
//!
//! // from the transceiver's SETUP interrupt
//! let setup = SetupPacket::from_bytes(&packet);
//! usb.handle_setup_request(&mut transceiver, &setup);
//! ```
#![no_std]

#[cfg(test)]
extern crate std;

#[cfg(target_endian = "big")]
compile_error!("descriptors are serialised from memory and require a little-endian target");

#[macro_use]
mod macros;

mod device;
pub mod endpoint;
pub mod error;
pub mod interface;
pub mod protocol;

pub use device::Usb9;
pub use endpoint::{EndpointAddress, EndpointStateTable};
pub use error::{ProtocolError, RequestError};
pub use interface::{DeviceInterface, Transceiver};
pub use protocol::{DeviceState, SetupPacket};
