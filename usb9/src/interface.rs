//! The two seams of the control core
//!
//! [`Transceiver`] is implemented by the register-level driver and carries
//! the dispatcher's decisions to the hardware. [`DeviceInterface`] is
//! implemented by the class driver and publishes its descriptors and request
//! handlers.
use crate::endpoint::{EndpointAddress, EndpointStateTable};
use crate::error::RequestError;
use crate::protocol::{DeviceDescriptor, DeviceStatus, SetupPacket};

/// Endpoint services of the transceiver driver
pub trait Transceiver {
    /// Queue `data` for the next IN transactions on `endpoint`
    fn prepare_data_transmit(&mut self, endpoint: EndpointAddress, data: &[u8]);

    /// Latch the address assigned by SET_ADDRESS
    ///
    /// The hardware applies it once the status stage of the current transfer
    /// has completed.
    fn set_device_address(&mut self, address: u8);

    /// Set or clear the halt condition of `endpoint`
    fn control_endpoint_stall(&mut self, endpoint: EndpointAddress, stall: bool);

    /// Close the current control transfer on `endpoint`
    ///
    /// `error` answers the host with a stall. `force_status_stage` is set when
    /// no data stage was queued and a zero-length status stage must be sent.
    fn update_endpoint_state(&mut self, endpoint: EndpointAddress, error: bool, force_status_stage: bool);

    fn endpoint_states(&self) -> &EndpointStateTable;
}

/// Capabilities a class driver publishes to the dispatcher
///
/// The optional capabilities default to [`RequestError::Unsupported`]; the
/// dispatcher treats that as "not provided" rather than as a fault.
pub trait DeviceInterface {
    fn device_descriptor(&self) -> &DeviceDescriptor;

    /// The configuration descriptor followed by its interface and endpoint
    /// descriptors, `wTotalLength` bytes in all
    fn configuration_descriptor(&self) -> &[u8];

    /// String descriptor `index`; index 0 is the language table
    fn string_descriptor(&self, index: u8) -> Option<&[u8]>;

    /// Configuration value currently selected, 0 when unconfigured
    fn configuration(&self) -> u8;

    fn device_status(&self) -> DeviceStatus;

    /// Called on SET_CONFIGURATION once the value has been validated
    fn set_configuration(&mut self, index: u8);

    /// Alternate setting of `interface`; `Stall` for an unknown interface
    fn alt_interface(&self, _interface: u16) -> Result<u8, RequestError> {
        Err(RequestError::Unsupported)
    }

    fn set_alt_interface(&mut self, _interface: u16, _alternate_setting: u16) -> Result<(), RequestError> {
        Err(RequestError::Unsupported)
    }

    /// A class request addressed to the control interface
    ///
    /// The handler queues any IN data on `transceiver`; the dispatcher then
    /// closes the transfer.
    fn class_request(
        &mut self,
        _transceiver: &mut dyn Transceiver,
        _setup: &SetupPacket,
    ) -> Result<(), RequestError> {
        Err(RequestError::Unsupported)
    }

    /// Data stage of a class OUT request accepted by [`class_request`](Self::class_request)
    fn class_data_out(
        &mut self,
        _transceiver: &mut dyn Transceiver,
        _setup: &SetupPacket,
        _data: &[u8],
    ) -> Result<(), RequestError> {
        Err(RequestError::Unsupported)
    }

    fn vendor_request(
        &mut self,
        _transceiver: &mut dyn Transceiver,
        _setup: &SetupPacket,
    ) -> Result<(), RequestError> {
        Err(RequestError::Unsupported)
    }

    fn vendor_data_out(
        &mut self,
        _transceiver: &mut dyn Transceiver,
        _setup: &SetupPacket,
        _data: &[u8],
    ) -> Result<(), RequestError> {
        Err(RequestError::Unsupported)
    }
}
