//! Chapter 9 request dispatcher
use log::{debug, trace, warn};

use crate::endpoint::{EndpointAddress, Stage};
use crate::error::{ProtocolError, RequestError};
use crate::interface::{DeviceInterface, Transceiver};
use crate::protocol::{
    Descriptor, DescriptorType, DeviceState, Direction, Request, RequestRecipient, RequestType, SetupPacket,
    CLASS_INTERFACE_IN, CLASS_INTERFACE_OUT, STANDARD_DEVICE_IN,
};

const DEVICE_ADDRESS_MASK: u16 = 0x7F;

/// Endpoint 0 request handling for one bound class driver
///
/// Every setup packet ends in exactly one terminal action on the
/// transceiver: queued data, a stall, or a bare status stage. Errors never
/// leave this type; they become stalls and the pipe stays usable.
pub struct Usb9<'a> {
    interface: &'a mut dyn DeviceInterface,
    state: DeviceState,
    address: u8,
    pending_out: Option<SetupPacket>,
}

impl<'a> Usb9<'a> {
    /// Binds the class driver for the lifetime of the dispatcher
    pub fn new(interface: &'a mut dyn DeviceInterface) -> Self {
        Self {
            interface,
            state: DeviceState::Default,
            address: 0,
            pending_out: None,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Address latched by the last SET_ADDRESS
    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn interface(&self) -> &dyn DeviceInterface {
        &*self.interface
    }

    pub fn interface_mut(&mut self) -> &mut (dyn DeviceInterface + 'a) {
        &mut *self.interface
    }

    /// Bus reset seen by the transceiver: back to the default state
    pub fn bus_reset(&mut self) {
        debug!("bus reset in {:?} state", self.state);
        if self.interface.configuration() != 0 {
            self.interface.set_configuration(0);
        }
        self.state = DeviceState::Default;
        self.address = 0;
        self.pending_out = None;
    }

    pub fn handle_setup_request(&mut self, transceiver: &mut dyn Transceiver, setup: &SetupPacket) {
        self.pending_out = None;
        match setup.kind() {
            RequestType::Standard => {
                debug!(
                    "STDREQ: {:#04x} type {:#04x} value {:#06x} index {:#06x} length {}",
                    setup.request, setup.request_type, setup.value, setup.index, setup.length
                );
                let result = self.handle_standard_request(transceiver, setup);
                Self::complete(transceiver, result);
            }
            RequestType::Class => {
                let result = if setup.request_type == CLASS_INTERFACE_IN
                    || setup.request_type == CLASS_INTERFACE_OUT
                {
                    debug!("CLASSREQ: {:#04x}", setup.request);
                    self.interface
                        .class_request(transceiver, setup)
                        .map_err(ProtocolError::from)
                } else {
                    Err(ProtocolError::InvalidRequestType(setup.request_type))
                };
                self.complete_delegated(transceiver, setup, result);
            }
            RequestType::Vendor => {
                debug!("VENDREQ: {:#04x} value {:#06x}", setup.request, setup.value);
                match self.interface.vendor_request(transceiver, setup) {
                    Err(RequestError::Unsupported) => {
                        debug!("no vendor handler, request {:#04x} ignored", setup.request)
                    }
                    result => {
                        self.complete_delegated(transceiver, setup, result.map_err(ProtocolError::from))
                    }
                }
            }
            RequestType::Reserved => {
                Self::stall(transceiver, ProtocolError::InvalidRequestType(setup.request_type))
            }
        }
    }

    /// Data stage of the last class or vendor OUT request
    pub fn handle_control_out(&mut self, transceiver: &mut dyn Transceiver, data: &[u8]) {
        let setup = match self.pending_out.take() {
            Some(setup) => setup,
            None => return Self::stall(transceiver, ProtocolError::UnexpectedDataStage),
        };
        let data = &data[..data.len().min(setup.length as usize)];
        trace!("control OUT data stage, {} bytes for {:#04x}", data.len(), setup.request);
        let result = match setup.kind() {
            RequestType::Class => self.interface.class_data_out(transceiver, &setup, data),
            RequestType::Vendor => self.interface.vendor_data_out(transceiver, &setup, data),
            _ => Err(RequestError::Unsupported),
        };
        match result {
            Ok(()) => transceiver.update_endpoint_state(EndpointAddress::EP0, false, true),
            Err(error) => Self::stall(transceiver, error.into()),
        }
    }

    fn handle_standard_request(
        &mut self,
        transceiver: &mut dyn Transceiver,
        setup: &SetupPacket,
    ) -> Result<(), ProtocolError> {
        let request = setup
            .standard_request()
            .ok_or(ProtocolError::UnsupportedRequest(setup.request))?;
        match request {
            Request::SetAddress => {
                let address = (setup.value & DEVICE_ADDRESS_MASK) as u8;
                debug!("SET_ADDRESS {:#04x}", address);
                transceiver.set_device_address(address);
                self.address = address;
                self.state = match (self.state, address) {
                    (DeviceState::Configured, _) => DeviceState::Configured,
                    (_, 0) => DeviceState::Default,
                    _ => DeviceState::Addressed,
                };
                Ok(())
            }
            Request::GetDescriptor => self.get_descriptor(transceiver, setup),
            Request::GetConfiguration => {
                debug!("GET_CONFIGURATION");
                transceiver.prepare_data_transmit(EndpointAddress::EP0, &[self.interface.configuration()]);
                Ok(())
            }
            Request::GetStatus => self.get_status(transceiver, setup),
            Request::ClearFeature => {
                debug!("CLEAR_FEATURE {:#06x}", setup.index);
                Self::set_endpoint_halt(transceiver, setup, false)
            }
            Request::SetFeature => {
                debug!("SET_FEATURE {:#06x}", setup.index);
                Self::set_endpoint_halt(transceiver, setup, true)
            }
            Request::SetConfiguration => self.set_configuration(setup),
            Request::GetInterface => {
                debug!("GET_INTERFACE {}", setup.index);
                self.require_state(DeviceState::Configured)?;
                let alternate_setting = self.interface.alt_interface(setup.index)?;
                transceiver.prepare_data_transmit(EndpointAddress::EP0, &[alternate_setting]);
                Ok(())
            }
            Request::SetInterface => {
                debug!("SET_INTERFACE {} alt {}", setup.index, setup.value);
                self.require_state(DeviceState::Configured)?;
                self.interface.set_alt_interface(setup.index, setup.value)?;
                Ok(())
            }
            Request::SetDescriptor | Request::SynchFrame => {
                Err(ProtocolError::UnsupportedRequest(setup.request))
            }
        }
    }

    fn get_descriptor(
        &self,
        transceiver: &mut dyn Transceiver,
        setup: &SetupPacket,
    ) -> Result<(), ProtocolError> {
        if setup.request_type != STANDARD_DEVICE_IN {
            return Err(ProtocolError::InvalidRequestType(setup.request_type));
        }
        let requested = setup.length as usize;
        match setup.descriptor_type() {
            Some(DescriptorType::Device) => {
                debug!("GET_DESCRIPTOR ->DEVICE");
                let descriptor = self.interface.device_descriptor();
                let declared = descriptor.bLength as usize;
                transmit_descriptor(transceiver, descriptor.as_bytes(), declared, requested);
                Ok(())
            }
            Some(DescriptorType::Configuration) => {
                debug!("GET_DESCRIPTOR ->CONFIG");
                let bytes = self.interface.configuration_descriptor();
                if bytes.len() < 4 {
                    return Err(ProtocolError::UnknownDescriptor(DescriptorType::Configuration as u8));
                }
                let declared = read_le_u16!(bytes, 2) as usize;
                transmit_descriptor(transceiver, bytes, declared, requested);
                Ok(())
            }
            Some(DescriptorType::String) => {
                let index = setup.descriptor_index();
                debug!("GET_DESCRIPTOR ->STRING {}", index);
                let bytes = self
                    .interface
                    .string_descriptor(index)
                    .filter(|bytes| !bytes.is_empty())
                    .ok_or(ProtocolError::UnknownString(index))?;
                transmit_descriptor(transceiver, bytes, bytes[0] as usize, requested);
                Ok(())
            }
            _ => Err(ProtocolError::UnknownDescriptor((setup.value >> 8) as u8)),
        }
    }

    fn get_status(
        &self,
        transceiver: &mut dyn Transceiver,
        setup: &SetupPacket,
    ) -> Result<(), ProtocolError> {
        let status = match setup.recipient() {
            Some(RequestRecipient::Endpoint) => {
                debug!("GET_STATUS ENDPOINT {:#06x}", setup.index);
                let endpoints = transceiver.endpoint_states();
                let endpoint = endpoints.resolve(setup.index)?;
                [endpoints.is_stalled(endpoint) as u8, 0]
            }
            Some(RequestRecipient::Device) => {
                debug!("GET_STATUS DEVICE");
                self.interface.device_status().bits().to_le_bytes()
            }
            Some(RequestRecipient::Interface) => {
                debug!("GET_STATUS INTERFACE");
                [0, 0]
            }
            _ => return Err(ProtocolError::InvalidRecipient),
        };
        transceiver.prepare_data_transmit(EndpointAddress::EP0, &status);
        Ok(())
    }

    // Remote wakeup and self powered are not supported, only endpoint halt is
    fn set_endpoint_halt(
        transceiver: &mut dyn Transceiver,
        setup: &SetupPacket,
        stall: bool,
    ) -> Result<(), ProtocolError> {
        match setup.recipient() {
            Some(RequestRecipient::Endpoint) => {
                let endpoint = transceiver.endpoint_states().resolve(setup.index)?;
                transceiver.control_endpoint_stall(endpoint, stall);
                Ok(())
            }
            _ => Err(ProtocolError::InvalidRecipient),
        }
    }

    fn set_configuration(&mut self, setup: &SetupPacket) -> Result<(), ProtocolError> {
        debug!("SET_CONFIGURATION {}", setup.value);
        self.require_state(DeviceState::Addressed)?;
        let configurations = self.interface.device_descriptor().bNumConfigurations;
        if setup.value > configurations as u16 {
            return Err(ProtocolError::InvalidConfiguration(setup.value));
        }
        let index = setup.value as u8;
        self.interface.set_configuration(index);
        self.state = if index != 0 {
            DeviceState::Configured
        } else {
            DeviceState::Addressed
        };
        Ok(())
    }

    fn require_state(&self, minimum: DeviceState) -> Result<(), ProtocolError> {
        if self.state < minimum {
            Err(ProtocolError::InvalidState(self.state))
        } else {
            Ok(())
        }
    }

    fn complete_delegated(
        &mut self,
        transceiver: &mut dyn Transceiver,
        setup: &SetupPacket,
        result: Result<(), ProtocolError>,
    ) {
        match result {
            Ok(()) if setup.direction() == Direction::Out && setup.length > 0 => {
                trace!("waiting for {} bytes of OUT data", setup.length);
                self.pending_out = Some(*setup);
            }
            Ok(()) => Self::complete(transceiver, Ok(())),
            Err(error) => Self::stall(transceiver, error),
        }
    }

    fn complete(transceiver: &mut dyn Transceiver, result: Result<(), ProtocolError>) {
        let error = match result {
            Ok(()) => false,
            Err(error) => {
                warn!("EP0 stall: {}", error);
                true
            }
        };
        let idle = transceiver
            .endpoint_states()
            .stage(EndpointAddress::EP0)
            .map_or(true, |stage| stage == Stage::Idle);
        transceiver.update_endpoint_state(EndpointAddress::EP0, error, idle);
    }

    fn stall(transceiver: &mut dyn Transceiver, error: ProtocolError) {
        warn!("EP0 stall: {}", error);
        transceiver.update_endpoint_state(EndpointAddress::EP0, true, false);
    }
}

fn transmit_descriptor(transceiver: &mut dyn Transceiver, bytes: &[u8], declared: usize, requested: usize) {
    let length = declared.min(bytes.len()).min(requested);
    trace!("descriptor: {} declared, {} requested, {} sent", declared, requested, length);
    transceiver.prepare_data_transmit(EndpointAddress::EP0, &bytes[..length]);
}
