//! Descriptor tables of the serial adapter
use usb9::protocol::{
    ConfigurationDescriptor, Descriptor, DescriptorType, DeviceDescriptor, EndpointDescriptor,
    InterfaceDescriptor,
};
use usb9::EndpointAddress;

/// Interrupt IN endpoint carrying serial state notifications
pub const NOTIFICATION_ENDPOINT: EndpointAddress = EndpointAddress::from_index(0x83);
/// Bulk IN endpoint, device to host serial data
pub const DATA_IN_ENDPOINT: EndpointAddress = EndpointAddress::from_index(0x81);
/// Bulk OUT endpoint, host to device serial data
pub const DATA_OUT_ENDPOINT: EndpointAddress = EndpointAddress::from_index(0x02);

pub const NOTIFICATION_MAX_PACKET_SIZE: u16 = 16;
pub const DATA_MAX_PACKET_SIZE: u16 = 64;

const ENDPOINT_TYPE_BULK: u8 = 0x02;
const ENDPOINT_TYPE_INTERRUPT: u8 = 0x03;
const INTERFACE_CLASS_VENDOR: u8 = 0xFF;
const BUS_POWERED: u8 = 0x80;
// in 2 mA units
const MAX_POWER: u8 = 0x64;

pub const CONFIGURATION_VALUE: u8 = 1;

/// The configuration descriptor with everything `wTotalLength` covers
#[repr(C)]
#[repr(packed)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CdcConfiguration {
    pub configuration: ConfigurationDescriptor,
    pub interface: InterfaceDescriptor,
    pub notification: EndpointDescriptor,
    pub data_in: EndpointDescriptor,
    pub data_out: EndpointDescriptor,
}
static_assertions::assert_eq_size!(CdcConfiguration, [u8; 39]);
unsafe impl Descriptor for CdcConfiguration {}

pub const CONFIGURATION: CdcConfiguration = CdcConfiguration {
    configuration: ConfigurationDescriptor {
        bLength: core::mem::size_of::<ConfigurationDescriptor>() as u8,
        bDescriptorType: DescriptorType::Configuration,
        wTotalLength: core::mem::size_of::<CdcConfiguration>() as u16,
        bNumInterfaces: 1,
        bConfigurationValue: CONFIGURATION_VALUE,
        iConfiguration: 0,
        bmAttributes: BUS_POWERED,
        bMaxPower: MAX_POWER,
    },
    interface: InterfaceDescriptor {
        bLength: core::mem::size_of::<InterfaceDescriptor>() as u8,
        bDescriptorType: DescriptorType::Interface,
        bInterfaceNumber: 0,
        bAlternateSetting: 0,
        bNumEndpoints: 3,
        bInterfaceClass: INTERFACE_CLASS_VENDOR,
        bInterfaceSubClass: 0,
        bInterfaceProtocol: 0,
        iInterface: 0,
    },
    notification: endpoint(NOTIFICATION_ENDPOINT, ENDPOINT_TYPE_INTERRUPT, NOTIFICATION_MAX_PACKET_SIZE, 1),
    data_in: endpoint(DATA_IN_ENDPOINT, ENDPOINT_TYPE_BULK, DATA_MAX_PACKET_SIZE, 0),
    data_out: endpoint(DATA_OUT_ENDPOINT, ENDPOINT_TYPE_BULK, DATA_MAX_PACKET_SIZE, 0),
};

const fn endpoint(address: EndpointAddress, attributes: u8, max_packet_size: u16, interval: u8) -> EndpointDescriptor {
    EndpointDescriptor {
        bLength: core::mem::size_of::<EndpointDescriptor>() as u8,
        bDescriptorType: DescriptorType::Endpoint,
        bEndpointAddress: address.to_u8(),
        bmAttributes: attributes,
        wMaxPacketSize: max_packet_size,
        bInterval: interval,
    }
}

/// Device descriptor for the given identity; strings 1 and 2 are always
/// present, the serial number string is index 3 when there is one
pub const fn device(
    vendor_id: u16,
    product_id: u16,
    device_release: u16,
    max_packet_size_0: u8,
    serial_number: bool,
) -> DeviceDescriptor {
    DeviceDescriptor {
        bLength: core::mem::size_of::<DeviceDescriptor>() as u8,
        bDescriptorType: DescriptorType::Device,
        bcdUSB: 0x0110,
        bDeviceClass: 0,
        bDeviceSubClass: 0,
        bDeviceProtocol: 0,
        bMaxPacketSize0: max_packet_size_0,
        idVendor: vendor_id,
        idProduct: product_id,
        bcdDevice: device_release,
        iManufacturer: 1,
        iProduct: 2,
        iSerialNumber: if serial_number { 3 } else { 0 },
        bNumConfigurations: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_is_bit_exact() {
        assert_eq!(
            CONFIGURATION.as_bytes(),
            &[
                9, 2, 0x27, 0x00, 1, 1, 0, 0x80, 0x64, //
                9, 4, 0, 0, 3, 0xFF, 0, 0, 0, //
                7, 5, 0x83, 0x03, 16, 0, 1, //
                7, 5, 0x81, 0x02, 64, 0, 0, //
                7, 5, 0x02, 0x02, 64, 0, 0,
            ]
        );
    }

    #[test]
    fn serial_number_index() {
        assert_eq!(device(0x067B, 0x2303, 0x0400, 64, false).iSerialNumber, 0);
        assert_eq!(device(0x067B, 0x2303, 0x0400, 64, true).iSerialNumber, 3);
    }
}
