//! USB serial adapter class driver
//!
//! Presents a PL2303-compatible device: one vendor-class interface with an
//! interrupt notification endpoint and a pair of bulk data endpoints. The
//! CDC line coding and control line requests are answered on endpoint 0.
//!
//! ## Usage
//!
//! ```ignore
//! use cdc_serial::{CdcSerial, CdcSerialConfig};
//! use usb9::{EndpointStateTable, Usb9};
//!
//! let endpoints = EndpointStateTable::new(3, &CdcSerial::ENDPOINTS);
//! let mut serial = CdcSerial::new(CdcSerialConfig {
//!     serial_number: Some("0001"),
//!     ..Default::default()
//! });
//! let mut usb = Usb9::new(&mut serial);
//! ```
#![no_std]

pub mod descriptors;
pub mod line_coding;
#[cfg(feature = "vendor-table")]
mod vendor;

use arrayvec::ArrayVec;
use log::{debug, info, warn};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use usb9::protocol::{DeviceDescriptor, DeviceStatus, Direction, SetupPacket, StringDescriptor};
use usb9::{DeviceInterface, EndpointAddress, RequestError, Transceiver};

use descriptors::{CdcConfiguration, CONFIGURATION};
pub use line_coding::{ControlLineState, LineCoding, Parity, StopBits, LINE_CODING_SIZE};

const MAX_STRINGS: usize = 4;

/// Class requests of the abstract control model that the adapter answers
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum CdcRequest {
    SetLineCoding = 0x20,
    GetLineCoding = 0x21,
    SetControlLineState = 0x22,
}

/// Identity and defaults of the adapter
#[derive(Clone, Debug)]
pub struct CdcSerialConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    /// `bcdDevice`
    pub device_release: u16,
    pub language_id: u16,
    pub manufacturer: &'static str,
    pub product: &'static str,
    pub serial_number: Option<&'static str>,
    /// Endpoint 0 packet size: 8, 16, 32 or 64
    pub max_packet_size_0: u8,
    pub line_coding: LineCoding,
}

impl Default for CdcSerialConfig {
    fn default() -> Self {
        Self {
            vendor_id: 0x067B,
            product_id: 0x2303,
            device_release: 0x0400,
            language_id: 0x0409,
            manufacturer: "Prolific Technology Inc. ",
            product: "USB-Serial Controller D",
            serial_number: None,
            max_packet_size_0: 64,
            line_coding: LineCoding::default(),
        }
    }
}

pub struct CdcSerial {
    device: DeviceDescriptor,
    configuration: CdcConfiguration,
    strings: ArrayVec<StringDescriptor, MAX_STRINGS>,
    selected: u8,
    line_coding: LineCoding,
    control_lines: ControlLineState,
}

impl CdcSerial {
    /// Endpoints the transceiver must provide besides endpoint 0
    pub const ENDPOINTS: [EndpointAddress; 3] = [
        descriptors::NOTIFICATION_ENDPOINT,
        descriptors::DATA_IN_ENDPOINT,
        descriptors::DATA_OUT_ENDPOINT,
    ];

    pub fn new(config: CdcSerialConfig) -> Self {
        let max_packet_size_0 = match config.max_packet_size_0 {
            size @ (8 | 16 | 32 | 64) => size,
            size => {
                warn!("invalid endpoint 0 packet size {}, using 64", size);
                64
            }
        };
        let mut strings = ArrayVec::new();
        strings.push(StringDescriptor::languages(&[config.language_id]));
        strings.push(StringDescriptor::new(config.manufacturer));
        strings.push(StringDescriptor::new(config.product));
        if let Some(serial_number) = config.serial_number {
            strings.push(StringDescriptor::new(serial_number));
        }
        Self {
            device: descriptors::device(
                config.vendor_id,
                config.product_id,
                config.device_release,
                max_packet_size_0,
                config.serial_number.is_some(),
            ),
            configuration: CONFIGURATION,
            strings,
            selected: 0,
            line_coding: config.line_coding,
            control_lines: ControlLineState::empty(),
        }
    }

    pub fn line_coding(&self) -> LineCoding {
        self.line_coding
    }

    pub fn control_lines(&self) -> ControlLineState {
        self.control_lines
    }

    /// Host has opened the port
    pub fn dtr(&self) -> bool {
        self.control_lines.contains(ControlLineState::DTR)
    }
}

impl DeviceInterface for CdcSerial {
    fn device_descriptor(&self) -> &DeviceDescriptor {
        &self.device
    }

    fn configuration_descriptor(&self) -> &[u8] {
        usb9::protocol::Descriptor::as_bytes(&self.configuration)
    }

    fn string_descriptor(&self, index: u8) -> Option<&[u8]> {
        self.strings.get(index as usize).map(StringDescriptor::as_bytes)
    }

    fn configuration(&self) -> u8 {
        self.selected
    }

    fn device_status(&self) -> DeviceStatus {
        DeviceStatus::empty()
    }

    fn set_configuration(&mut self, index: u8) {
        info!("configuration {} selected", index);
        if index == 0 {
            self.control_lines = ControlLineState::empty();
        }
        self.selected = index;
    }

    fn alt_interface(&self, interface: u16) -> Result<u8, RequestError> {
        match interface {
            0 => Ok(0),
            _ => Err(RequestError::Stall),
        }
    }

    fn set_alt_interface(&mut self, interface: u16, alternate_setting: u16) -> Result<(), RequestError> {
        match (interface, alternate_setting) {
            (0, 0) => Ok(()),
            _ => Err(RequestError::Stall),
        }
    }

    fn class_request(
        &mut self,
        transceiver: &mut dyn Transceiver,
        setup: &SetupPacket,
    ) -> Result<(), RequestError> {
        match (CdcRequest::from_u8(setup.request), setup.direction()) {
            (Some(CdcRequest::GetLineCoding), Direction::In) => {
                let bytes = self.line_coding.to_bytes();
                let length = bytes.len().min(setup.length as usize);
                transceiver.prepare_data_transmit(EndpointAddress::EP0, &bytes[..length]);
                Ok(())
            }
            // stored once the data stage arrives
            (Some(CdcRequest::SetLineCoding), Direction::Out)
                if setup.length as usize == LINE_CODING_SIZE =>
            {
                Ok(())
            }
            (Some(CdcRequest::SetControlLineState), Direction::Out) => {
                self.control_lines = ControlLineState::from_bits_truncate(setup.value);
                debug!("control lines {:?}", self.control_lines);
                Ok(())
            }
            _ => {
                debug!("CDC request {:#04x} not handled", setup.request);
                Err(RequestError::Stall)
            }
        }
    }

    fn class_data_out(
        &mut self,
        _transceiver: &mut dyn Transceiver,
        setup: &SetupPacket,
        data: &[u8],
    ) -> Result<(), RequestError> {
        match CdcRequest::from_u8(setup.request) {
            Some(CdcRequest::SetLineCoding) => {
                self.line_coding = LineCoding::from_bytes(data).ok_or(RequestError::Stall)?;
                debug!("line coding {:?}", self.line_coding);
                Ok(())
            }
            _ => Err(RequestError::Stall),
        }
    }

    #[cfg(feature = "vendor-table")]
    fn vendor_request(
        &mut self,
        transceiver: &mut dyn Transceiver,
        setup: &SetupPacket,
    ) -> Result<(), RequestError> {
        vendor::vendor_request(transceiver, setup)
    }

    #[cfg(feature = "vendor-table")]
    fn vendor_data_out(
        &mut self,
        _transceiver: &mut dyn Transceiver,
        setup: &SetupPacket,
        data: &[u8],
    ) -> Result<(), RequestError> {
        debug!("vendor write {:#06x}, {} bytes dropped", setup.value, data.len());
        Ok(())
    }
}
