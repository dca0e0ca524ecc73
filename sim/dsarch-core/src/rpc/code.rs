use crate::DsarchError;
use std::fmt::{self, Display};

/// Number of low bits reserved for the codes of one interface, including the
/// response bit.
pub const BITS_PER_INTERFACE: u32 = 8;

/// Number of bits holding the method slot.
pub const METHOD_BITS: u32 = BITS_PER_INTERFACE - 1;

/// Methods per interface. Slot 0 means "no method".
pub const MAX_METHODS: usize = (1 << METHOD_BITS) - 1;

/// Interfaces per protocol. Slot 0 means "no interface".
pub const MAX_INTERFACES: usize = (1 << (32 - BITS_PER_INTERFACE)) - 1;

/// A 32-bit endpoint code naming an interface, a method and a direction.
///
/// ```text
///  31                      8 7             1   0
/// +-------------------------+---------------+----+
/// |     interface slot      |  method slot  |resp|
/// +-------------------------+---------------+----+
/// ```
///
/// Both slots are 1-based, so the zero code never names anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RpcCode(u32);

impl RpcCode {
    /// The reserved "absent" code.
    pub const NONE: Self = Self(0);

    /// Selects the response bit.
    pub const RESPONSE_MASK: u32 = 1;

    /// Selects the method slot and the response bit.
    pub const ENDPOINT_MASK: u32 = (1 << BITS_PER_INTERFACE) - 1;

    /// Selects the method slot.
    pub const METHOD_MASK: u32 = Self::ENDPOINT_MASK - 1;

    /// Selects the interface slot.
    pub const INTERFACE_MASK: u32 = !Self::ENDPOINT_MASK;

    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    /// Builds the code of the interface in 0-based position `index`.
    pub(crate) const fn for_interface(index: usize) -> Self {
        Self(((index as u32) + 1) << BITS_PER_INTERFACE)
    }

    /// Builds the code of the method in 0-based position `index` of this
    /// interface.
    pub(crate) const fn for_method(self, index: usize) -> Self {
        Self((self.0 & Self::INTERFACE_MASK) | (((index as u32) + 1) << 1))
    }

    pub fn into_inner(self) -> u32 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn is_response(self) -> bool {
        self.0 & Self::RESPONSE_MASK != 0
    }

    /// The request direction of this endpoint.
    pub fn request(self) -> Self {
        Self(self.0 & !Self::RESPONSE_MASK)
    }

    /// The response direction of this endpoint.
    pub fn response(self) -> Self {
        Self(self.0 | Self::RESPONSE_MASK)
    }

    /// The code of the interface this endpoint belongs to.
    pub fn interface(self) -> Self {
        Self(self.0 & Self::INTERFACE_MASK)
    }

    /// The raw 1-based method slot, 0 when absent.
    pub fn method_slot(self) -> u32 {
        (self.0 & Self::METHOD_MASK) >> 1
    }

    /// True when the masked bits of both codes agree.
    pub fn matches(self, other: Self, mask: u32) -> bool {
        self.0 & mask == other.0 & mask
    }

    /// Decodes the 0-based interface position.
    pub fn interface_index(self) -> Result<usize, DsarchError> {
        if self.0 & Self::INTERFACE_MASK == 0 {
            return Err(DsarchError::InvalidCode {
                kind: "interface",
                code: self.0,
            });
        }
        Ok(((self.0 >> BITS_PER_INTERFACE) - 1) as usize)
    }

    /// Decodes the 0-based method position within its interface.
    pub fn method_index(self) -> Result<usize, DsarchError> {
        if self.0 & Self::METHOD_MASK == 0 {
            return Err(DsarchError::InvalidCode {
                kind: "method",
                code: self.0,
            });
        }
        Ok((self.method_slot() - 1) as usize)
    }
}

impl From<u32> for RpcCode {
    fn from(n: u32) -> Self {
        Self(n)
    }
}

impl From<RpcCode> for u32 {
    fn from(code: RpcCode) -> Self {
        code.0
    }
}

impl Display for RpcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        let ifc = RpcCode::for_interface(0);
        assert_eq!(ifc.into_inner(), 0x100);
        let meth = ifc.for_method(2);
        assert_eq!(meth.into_inner(), 0x106);
        assert_eq!(meth.method_slot(), 3);
        assert_eq!(meth.interface(), ifc);
        assert!(meth.response().is_response());
        assert_eq!(meth.response().request(), meth);
        assert_eq!(meth.interface_index(), Ok(0));
        assert_eq!(meth.method_index(), Ok(2));
    }

    #[test]
    fn zero_fields_are_invalid() {
        assert!(RpcCode::NONE.interface_index().is_err());
        assert!(RpcCode::for_interface(4).method_index().is_err());
        assert!(RpcCode::new(0x6).interface_index().is_err());
    }

    #[test]
    fn limits() {
        assert_eq!(MAX_METHODS, 127);
        assert_eq!(MAX_INTERFACES, (1 << 24) - 1);
        let last = RpcCode::for_interface(MAX_INTERFACES - 1);
        assert_eq!(last.interface_index(), Ok(MAX_INTERFACES - 1));
        assert_eq!(last.for_method(MAX_METHODS - 1).method_slot(), 127);
    }
}
