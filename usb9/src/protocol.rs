//! The USB Protocol
//!
//! Wire types of the default control pipe: the 8-byte setup packet, the
//! standard request codes and the descriptor layouts a host parses
//! positionally.
use arrayvec::ArrayVec;
use bitflags::bitflags;
use log::warn;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Size of a setup packet on the wire
pub const SETUP_PACKET_SIZE: usize = 8;

/// Longest string descriptor that still fits `bLength`
pub const MAX_STRING_DESCRIPTOR_LENGTH: usize = 254;

/// `bmRequestType` of GET_DESCRIPTOR: standard, device to host, device
pub const STANDARD_DEVICE_IN: u8 = 0x80;
/// `bmRequestType` of a class request reading from the control interface
pub const CLASS_INTERFACE_IN: u8 = 0xA1;
/// `bmRequestType` of a class request writing to the control interface
pub const CLASS_INTERFACE_OUT: u8 = 0x21;

/// Feature selector of SET_FEATURE / CLEAR_FEATURE on an endpoint
pub const FEATURE_ENDPOINT_HALT: u16 = 0;
/// Feature selector of SET_FEATURE / CLEAR_FEATURE on the device
pub const FEATURE_DEVICE_REMOTE_WAKEUP: u16 = 1;

const DIRECTION_BIT: u8 = 1 << 7;
const REQUEST_TYPE_MASK: u8 = 0x60;
const REQUEST_TYPE_SHIFT: u8 = 5;
const RECIPIENT_MASK: u8 = 0x1F;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Host to device
    Out,
    /// Device to host
    In,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum RequestType {
    Standard = 0,
    Class = 1,
    Vendor = 2,
    Reserved = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum RequestRecipient {
    Device = 0,
    Interface = 1,
    Endpoint = 2,
    Other = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum Request {
    GetStatus = 0x00,
    ClearFeature = 0x01,
    SetFeature = 0x03,
    SetAddress = 0x05,
    GetDescriptor = 0x06,
    SetDescriptor = 0x07,
    GetConfiguration = 0x08,
    SetConfiguration = 0x09,
    GetInterface = 0x0A,
    SetInterface = 0x0B,
    SynchFrame = 0x0C,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum DescriptorType {
    Device = 1,
    Configuration = 2,
    String = 3,
    Interface = 4,
    Endpoint = 5,
    DeviceQualifier = 6,
    OtherSpeedConfiguration = 7,
    InterfacePower = 8,
}

/// Enumeration progress of the device as seen by the host
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeviceState {
    Default,
    Addressed,
    Configured,
}

bitflags! {
    /// The status word returned by GET_STATUS for the device recipient
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DeviceStatus: u16 {
        const SELF_POWERED = 1 << 0;
        const REMOTE_WAKEUP = 1 << 1;
    }
}

/// The 8-byte packet opening every control transfer
///
/// Field names follow the wire layout; the 16-bit fields are little-endian
/// on the bus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    pub const fn from_bytes(bytes: &[u8; SETUP_PACKET_SIZE]) -> Self {
        Self {
            request_type: bytes[0],
            request: bytes[1],
            value: u16::from_le_bytes([bytes[2], bytes[3]]),
            index: u16::from_le_bytes([bytes[4], bytes[5]]),
            length: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }

    pub fn to_bytes(&self) -> [u8; SETUP_PACKET_SIZE] {
        let mut bytes = [0; SETUP_PACKET_SIZE];
        bytes[0] = self.request_type;
        bytes[1] = self.request;
        bytes[2..4].copy_from_slice(&self.value.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.index.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.length.to_le_bytes());
        bytes
    }

    pub const fn direction(&self) -> Direction {
        if self.request_type & DIRECTION_BIT == 0 {
            Direction::Out
        } else {
            Direction::In
        }
    }

    pub fn kind(&self) -> RequestType {
        RequestType::from_u8((self.request_type & REQUEST_TYPE_MASK) >> REQUEST_TYPE_SHIFT)
            .unwrap_or(RequestType::Reserved)
    }

    /// `None` for the reserved recipients 4..=31
    pub fn recipient(&self) -> Option<RequestRecipient> {
        RequestRecipient::from_u8(self.request_type & RECIPIENT_MASK)
    }

    /// Standard request code, `None` when unknown
    pub fn standard_request(&self) -> Option<Request> {
        Request::from_u8(self.request)
    }

    pub fn descriptor_type(&self) -> Option<DescriptorType> {
        DescriptorType::from_u16(self.value >> 8)
    }

    pub const fn descriptor_index(&self) -> u8 {
        (self.value & 0xFF) as u8
    }

    pub const fn get_status(recipient: RequestRecipient, index: u16) -> Self {
        Self {
            request_type: DIRECTION_BIT | recipient as u8,
            request: Request::GetStatus as u8,
            value: 0,
            index,
            length: 2,
        }
    }

    pub const fn clear_feature(recipient: RequestRecipient, feature: u16, index: u16) -> Self {
        Self {
            request_type: recipient as u8,
            request: Request::ClearFeature as u8,
            value: feature,
            index,
            length: 0,
        }
    }

    pub const fn set_feature(recipient: RequestRecipient, feature: u16, index: u16) -> Self {
        Self {
            request_type: recipient as u8,
            request: Request::SetFeature as u8,
            value: feature,
            index,
            length: 0,
        }
    }

    pub const fn set_address(address: u8) -> Self {
        Self {
            request_type: 0b0000_0000,
            request: Request::SetAddress as u8,
            value: address as u16,
            index: 0,
            length: 0,
        }
    }

    pub const fn get_descriptor(kind: DescriptorType, index: u8, language: u16, length: u16) -> Self {
        Self {
            request_type: STANDARD_DEVICE_IN,
            request: Request::GetDescriptor as u8,
            value: ((kind as u16) << 8) | (index as u16),
            index: language,
            length,
        }
    }

    pub const fn get_configuration() -> Self {
        Self {
            request_type: STANDARD_DEVICE_IN,
            request: Request::GetConfiguration as u8,
            value: 0,
            index: 0,
            length: 1,
        }
    }

    pub const fn set_configuration(value: u8) -> Self {
        Self {
            request_type: 0b0000_0000,
            request: Request::SetConfiguration as u8,
            value: value as u16,
            index: 0,
            length: 0,
        }
    }

    pub const fn get_interface(interface: u8) -> Self {
        Self {
            request_type: DIRECTION_BIT | RequestRecipient::Interface as u8,
            request: Request::GetInterface as u8,
            value: 0,
            index: interface as u16,
            length: 1,
        }
    }

    pub const fn set_interface(interface: u8, alternate_setting: u8) -> Self {
        Self {
            request_type: RequestRecipient::Interface as u8,
            request: Request::SetInterface as u8,
            value: alternate_setting as u16,
            index: interface as u16,
            length: 0,
        }
    }
}

/// A descriptor whose in-memory layout is its wire layout
///
/// # Safety
///
/// Implementors must be `#[repr(C, packed)]` and built only from integers,
/// `#[repr(u8)]` enums and other such descriptors, so that every byte is
/// initialized and there is no padding. Multi-byte fields are sent in target
/// byte order, which the crate restricts to little-endian.
pub unsafe trait Descriptor: Sized {
    fn as_bytes(&self) -> &[u8] {
        unsafe {
            core::slice::from_raw_parts(
                self as *const Self as *const u8,
                core::mem::size_of::<Self>(),
            )
        }
    }
}

#[repr(C)]
#[repr(packed)]
#[allow(non_snake_case)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub bLength: u8,
    pub bDescriptorType: DescriptorType,
    pub bcdUSB: u16,
    pub bDeviceClass: u8,
    pub bDeviceSubClass: u8,
    pub bDeviceProtocol: u8,
    pub bMaxPacketSize0: u8,
    pub idVendor: u16,
    pub idProduct: u16,
    pub bcdDevice: u16,
    pub iManufacturer: u8,
    pub iProduct: u8,
    pub iSerialNumber: u8,
    pub bNumConfigurations: u8,
}
wire_descriptor!(DeviceDescriptor, 18);

#[repr(C)]
#[repr(packed)]
#[allow(non_snake_case)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigurationDescriptor {
    pub bLength: u8,
    pub bDescriptorType: DescriptorType,
    pub wTotalLength: u16,
    pub bNumInterfaces: u8,
    pub bConfigurationValue: u8,
    pub iConfiguration: u8,
    pub bmAttributes: u8,
    pub bMaxPower: u8,
}
wire_descriptor!(ConfigurationDescriptor, 9);

#[repr(C)]
#[repr(packed)]
#[allow(non_snake_case)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub bLength: u8,
    pub bDescriptorType: DescriptorType,
    pub bInterfaceNumber: u8,
    pub bAlternateSetting: u8,
    pub bNumEndpoints: u8,
    pub bInterfaceClass: u8,
    pub bInterfaceSubClass: u8,
    pub bInterfaceProtocol: u8,
    pub iInterface: u8,
}
wire_descriptor!(InterfaceDescriptor, 9);

#[repr(C)]
#[repr(packed)]
#[allow(non_snake_case)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub bLength: u8,
    pub bDescriptorType: DescriptorType,
    pub bEndpointAddress: u8,
    pub bmAttributes: u8,
    pub wMaxPacketSize: u16,
    pub bInterval: u8,
}
wire_descriptor!(EndpointDescriptor, 7);

/// A string descriptor encoded as UTF-16LE
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringDescriptor {
    bytes: ArrayVec<u8, MAX_STRING_DESCRIPTOR_LENGTH>,
}

impl StringDescriptor {
    pub fn new(text: &str) -> Self {
        let mut descriptor = Self::empty();
        for word in text.encode_utf16() {
            if descriptor.push_word(word).is_err() {
                warn!("string descriptor truncated: {:?}", text);
                break;
            }
        }
        descriptor
    }

    /// Descriptor zero: the list of supported USB language codes
    pub fn languages(lang_ids: &[u16]) -> Self {
        let mut descriptor = Self::empty();
        for lang_id in lang_ids {
            if descriptor.push_word(*lang_id).is_err() {
                warn!("language table truncated at {} entries", descriptor.bytes.len() / 2 - 1);
                break;
            }
        }
        descriptor
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn empty() -> Self {
        let mut bytes = ArrayVec::new();
        bytes.extend([2, DescriptorType::String as u8]);
        Self { bytes }
    }

    fn push_word(&mut self, word: u16) -> Result<(), arrayvec::CapacityError> {
        self.bytes.try_extend_from_slice(&word.to_le_bytes())?;
        self.bytes[0] = self.bytes.len() as u8;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_packet_wire_layout() {
        let bytes = [0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x12, 0x00];
        let setup = SetupPacket::from_bytes(&bytes);
        assert_eq!(setup, SetupPacket::get_descriptor(DescriptorType::Device, 0, 0, 18));
        assert_eq!(setup.direction(), Direction::In);
        assert_eq!(setup.kind(), RequestType::Standard);
        assert_eq!(setup.recipient(), Some(RequestRecipient::Device));
        assert_eq!(setup.standard_request(), Some(Request::GetDescriptor));
        assert_eq!(setup.descriptor_type(), Some(DescriptorType::Device));
        assert_eq!(setup.to_bytes(), bytes);
    }

    #[test]
    fn request_type_fields() {
        let class_in = SetupPacket {
            request_type: CLASS_INTERFACE_IN,
            ..Default::default()
        };
        assert_eq!(class_in.kind(), RequestType::Class);
        assert_eq!(class_in.recipient(), Some(RequestRecipient::Interface));
        assert_eq!(class_in.direction(), Direction::In);

        let vendor_other = SetupPacket {
            request_type: 0x43,
            ..Default::default()
        };
        assert_eq!(vendor_other.kind(), RequestType::Vendor);
        assert_eq!(vendor_other.recipient(), Some(RequestRecipient::Other));
        assert_eq!(vendor_other.direction(), Direction::Out);

        let reserved = SetupPacket {
            request_type: 0x65,
            ..Default::default()
        };
        assert_eq!(reserved.kind(), RequestType::Reserved);
        assert_eq!(reserved.recipient(), None);
    }

    #[test]
    fn unknown_codes_decode_to_none() {
        let setup = SetupPacket {
            request: 0x02,
            value: 0x2200,
            ..Default::default()
        };
        assert_eq!(setup.standard_request(), None);
        assert_eq!(setup.descriptor_type(), None);
    }

    #[test]
    fn device_descriptor_bytes() {
        let descriptor = DeviceDescriptor {
            bLength: 18,
            bDescriptorType: DescriptorType::Device,
            bcdUSB: 0x0110,
            bDeviceClass: 0,
            bDeviceSubClass: 0,
            bDeviceProtocol: 0,
            bMaxPacketSize0: 64,
            idVendor: 0x067B,
            idProduct: 0x2303,
            bcdDevice: 0x0400,
            iManufacturer: 1,
            iProduct: 2,
            iSerialNumber: 0,
            bNumConfigurations: 1,
        };
        assert_eq!(
            descriptor.as_bytes(),
            &[18, 1, 0x10, 0x01, 0, 0, 0, 64, 0x7B, 0x06, 0x03, 0x23, 0x00, 0x04, 1, 2, 0, 1]
        );
    }

    #[test]
    fn endpoint_descriptor_bytes() {
        let descriptor = EndpointDescriptor {
            bLength: 7,
            bDescriptorType: DescriptorType::Endpoint,
            bEndpointAddress: 0x83,
            bmAttributes: 0x03,
            wMaxPacketSize: 16,
            bInterval: 1,
        };
        assert_eq!(descriptor.as_bytes(), &[7, 5, 0x83, 0x03, 16, 0, 1]);
    }

    #[test]
    fn string_descriptor_is_utf16le() {
        let descriptor = StringDescriptor::new("Ab");
        assert_eq!(descriptor.as_bytes(), &[6, 3, b'A', 0, b'b', 0]);

        let languages = StringDescriptor::languages(&[0x0409]);
        assert_eq!(languages.as_bytes(), &[4, 3, 0x09, 0x04]);
    }

    #[test]
    fn string_descriptor_truncates_at_capacity() {
        const LONG: &str = concat!(
            "0123456789012345678901234567890123456789012345678901234567890123",
            "0123456789012345678901234567890123456789012345678901234567890123",
            "0123456789"
        );
        let descriptor = StringDescriptor::new(LONG);
        assert_eq!(descriptor.as_bytes().len(), MAX_STRING_DESCRIPTOR_LENGTH);
        assert_eq!(descriptor.as_bytes()[0] as usize, MAX_STRING_DESCRIPTOR_LENGTH);
    }
}
