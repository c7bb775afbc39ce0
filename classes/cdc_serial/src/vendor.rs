//! Vendor requests of the PL2303 driver, answered from a fixed table
use log::debug;
use usb9::protocol::{Direction, SetupPacket};
use usb9::{EndpointAddress, RequestError, Transceiver};

const ZERO_LENGTH_VALUE: u16 = 0x0606;

/// `wValue` of a vendor read and the byte returned for it
const VENDOR_TABLE: [(u16, u8); 7] = [
    (0x0080, 0x01),
    (0x0081, 0x00),
    (0x0082, 0x44),
    (0x8383, 0xFF),
    (0x8484, 0x02),
    (0x8686, 0xAA),
    (0x9494, 0x00),
];

pub(crate) fn vendor_request(
    transceiver: &mut dyn Transceiver,
    setup: &SetupPacket,
) -> Result<(), RequestError> {
    if setup.direction() == Direction::Out {
        debug!("vendor write {:#06x} = {:#06x}", setup.value, setup.index);
        return Ok(());
    }
    if setup.value == ZERO_LENGTH_VALUE {
        transceiver.prepare_data_transmit(EndpointAddress::EP0, &[]);
        return Ok(());
    }
    let (_, data) = VENDOR_TABLE
        .iter()
        .find(|(value, _)| *value == setup.value)
        .ok_or(RequestError::Stall)?;
    transceiver.prepare_data_transmit(EndpointAddress::EP0, core::slice::from_ref(data));
    Ok(())
}
