/// Marks a `#[repr(C, packed)]` descriptor as wire-encodable and pins its size
macro_rules! wire_descriptor {
    ($descriptor_type:ty, $size:expr) => {
        static_assertions::assert_eq_size!($descriptor_type, [u8; $size]);
        unsafe impl $crate::protocol::Descriptor for $descriptor_type {}
    };
}

/// Reads a little-endian `u16` out of a descriptor or packet byte slice
macro_rules! read_le_u16 {
    ($bytes:expr, $offset:expr) => {
        u16::from_le_bytes([$bytes[$offset], $bytes[$offset + 1]])
    };
}
