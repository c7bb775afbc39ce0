//! Endpoint addressing and the per-endpoint state the transceiver keeps
//!
//! Slots are keyed by endpoint number and direction. Endpoint 0 is a single
//! bidirectional slot; every other number has independent IN and OUT slots,
//! so `0x82` and `0x02` never share state.
use arrayvec::ArrayVec;
use log::warn;

use crate::error::ProtocolError;
use crate::protocol::Direction;

/// Highest endpoint number the address field can carry
pub const MAX_ENDPOINT_NUMBER: u8 = 15;

/// Endpoint 0 plus an IN and an OUT slot for every other number
pub const MAX_ENDPOINT_SLOTS: usize = 1 + 2 * MAX_ENDPOINT_NUMBER as usize;

const ENDPOINT_NUMBER_MASK: u16 = 0x0F;
const ENDPOINT_DIRECTION_BIT: u16 = 0x80;

/// An endpoint number together with its direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EndpointAddress {
    number: u8,
    direction: Direction,
}

impl EndpointAddress {
    /// The default control pipe
    pub const EP0: Self = Self {
        number: 0,
        direction: Direction::Out,
    };

    /// `None` if `number` does not fit the address field
    pub const fn new(number: u8, direction: Direction) -> Option<Self> {
        if number > MAX_ENDPOINT_NUMBER {
            None
        } else if number == 0 {
            Some(Self::EP0)
        } else {
            Some(Self { number, direction })
        }
    }

    /// Decodes `wIndex` of an endpoint-recipient request, or a
    /// `bEndpointAddress` byte
    pub const fn from_index(index: u16) -> Self {
        let number = (index & ENDPOINT_NUMBER_MASK) as u8;
        if number == 0 {
            Self::EP0
        } else if index & ENDPOINT_DIRECTION_BIT != 0 {
            Self {
                number,
                direction: Direction::In,
            }
        } else {
            Self {
                number,
                direction: Direction::Out,
            }
        }
    }

    pub const fn number(&self) -> u8 {
        self.number
    }

    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// The `bEndpointAddress` encoding
    pub const fn to_u8(&self) -> u8 {
        match self.direction {
            Direction::In => self.number | ENDPOINT_DIRECTION_BIT as u8,
            Direction::Out => self.number,
        }
    }
}

impl From<u8> for EndpointAddress {
    fn from(address: u8) -> Self {
        Self::from_index(address as u16)
    }
}

impl From<EndpointAddress> for u8 {
    fn from(address: EndpointAddress) -> Self {
        address.to_u8()
    }
}

/// Progress of the transfer currently owning an endpoint
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Idle,
    DataIn,
    DataOut,
    StatusPending,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EndpointState {
    pub stalled: bool,
    pub stage: Stage,
}

/// State of every endpoint the transceiver implements
///
/// Built once from the controller's endpoint layout and kept for its
/// lifetime; [`reset`](Self::reset) returns every slot to idle.
#[derive(Clone, Debug)]
pub struct EndpointStateTable {
    max_number: u8,
    slots: ArrayVec<(EndpointAddress, EndpointState), MAX_ENDPOINT_SLOTS>,
}

impl EndpointStateTable {
    /// Endpoint 0 is always present. Addresses above `max_number` are skipped.
    pub fn new(max_number: u8, endpoints: &[EndpointAddress]) -> Self {
        let max_number = max_number.min(MAX_ENDPOINT_NUMBER);
        let mut table = Self {
            max_number,
            slots: ArrayVec::new(),
        };
        table.insert(EndpointAddress::EP0);
        for endpoint in endpoints {
            if endpoint.number() > max_number {
                warn!(
                    "endpoint {:#04x} beyond controller maximum {}, skipped",
                    endpoint.to_u8(),
                    max_number
                );
                continue;
            }
            table.insert(*endpoint);
        }
        table
    }

    fn insert(&mut self, endpoint: EndpointAddress) {
        if self.get(endpoint).is_none() {
            // numbers are bounded by MAX_ENDPOINT_NUMBER, so the slots never run out
            let _ = self.slots.try_push((endpoint, EndpointState::default()));
        }
    }

    pub fn max_number(&self) -> u8 {
        self.max_number
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Resolves `wIndex` of an endpoint-recipient request to a slot
    pub fn resolve(&self, index: u16) -> Result<EndpointAddress, ProtocolError> {
        if (index & ENDPOINT_NUMBER_MASK) as u8 > self.max_number {
            return Err(ProtocolError::InvalidEndpoint(index));
        }
        let endpoint = EndpointAddress::from_index(index);
        match self.get(endpoint) {
            Some(_) => Ok(endpoint),
            None => Err(ProtocolError::InvalidEndpoint(index)),
        }
    }

    pub fn get(&self, endpoint: EndpointAddress) -> Option<&EndpointState> {
        self.slots
            .iter()
            .find(|(address, _)| *address == endpoint)
            .map(|(_, state)| state)
    }

    pub fn get_mut(&mut self, endpoint: EndpointAddress) -> Option<&mut EndpointState> {
        self.slots
            .iter_mut()
            .find(|(address, _)| *address == endpoint)
            .map(|(_, state)| state)
    }

    pub fn is_stalled(&self, endpoint: EndpointAddress) -> bool {
        self.get(endpoint).map_or(false, |state| state.stalled)
    }

    pub fn stage(&self, endpoint: EndpointAddress) -> Option<Stage> {
        self.get(endpoint).map(|state| state.stage)
    }

    pub fn set_stalled(&mut self, endpoint: EndpointAddress, stalled: bool) -> Result<(), ProtocolError> {
        let state = self
            .get_mut(endpoint)
            .ok_or(ProtocolError::InvalidEndpoint(endpoint.to_u8() as u16))?;
        state.stalled = stalled;
        Ok(())
    }

    pub fn set_stage(&mut self, endpoint: EndpointAddress, stage: Stage) -> Result<(), ProtocolError> {
        let state = self
            .get_mut(endpoint)
            .ok_or(ProtocolError::InvalidEndpoint(endpoint.to_u8() as u16))?;
        state.stage = stage;
        Ok(())
    }

    /// Controller reset: every slot idle and not stalled
    pub fn reset(&mut self) {
        for (_, state) in self.slots.iter_mut() {
            *state = EndpointState::default();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (EndpointAddress, &EndpointState)> {
        self.slots.iter().map(|(address, state)| (*address, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(byte: u8) -> EndpointAddress {
        EndpointAddress::from(byte)
    }

    fn table() -> EndpointStateTable {
        EndpointStateTable::new(4, &[address(0x81), address(0x82), address(0x83), address(0x02)])
    }

    #[test]
    fn in_and_out_of_same_number_are_distinct() {
        let mut table = table();
        let ep2_in = table.resolve(0x82).unwrap();
        let ep2_out = table.resolve(0x02).unwrap();
        assert_ne!(ep2_in, ep2_out);

        table.set_stalled(ep2_in, true).unwrap();
        assert!(table.is_stalled(ep2_in));
        assert!(!table.is_stalled(ep2_out));
    }

    #[test]
    fn endpoint_zero_is_one_slot() {
        let table = table();
        assert_eq!(table.resolve(0x00), Ok(EndpointAddress::EP0));
        assert_eq!(table.resolve(0x80), Ok(EndpointAddress::EP0));
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn numbers_beyond_maximum_are_rejected() {
        let table = table();
        assert_eq!(table.resolve(0x85), Err(ProtocolError::InvalidEndpoint(0x85)));
        assert_eq!(table.resolve(0x0F), Err(ProtocolError::InvalidEndpoint(0x0F)));
    }

    #[test]
    fn unimplemented_slots_are_rejected() {
        let table = table();
        // EP1 only exists as IN, EP4 not at all
        assert_eq!(table.resolve(0x01), Err(ProtocolError::InvalidEndpoint(0x01)));
        assert_eq!(table.resolve(0x84), Err(ProtocolError::InvalidEndpoint(0x84)));
    }

    #[test]
    fn layout_entries_beyond_maximum_are_skipped() {
        let table = EndpointStateTable::new(2, &[address(0x81), address(0x83), address(0x81)]);
        assert_eq!(table.len(), 2);
        assert!(table.get(address(0x83)).is_none());
    }

    #[test]
    fn reset_clears_stall_and_stage() {
        let mut table = table();
        let ep1_in = address(0x81);
        table.set_stalled(ep1_in, true).unwrap();
        table.set_stage(EndpointAddress::EP0, Stage::DataIn).unwrap();
        table.reset();
        assert!(table.iter().all(|(_, state)| *state == EndpointState::default()));
    }

    #[test]
    fn address_byte_round_trip() {
        assert_eq!(u8::from(address(0x83)), 0x83);
        assert_eq!(address(0x02).direction(), Direction::Out);
        assert_eq!(EndpointAddress::new(16, Direction::In), None);
        assert_eq!(EndpointAddress::new(0, Direction::In), Some(EndpointAddress::EP0));
    }
}
