//! Sizing of simulated messages.
//!
//! Nothing is ever serialized. A payload only has to say how many bytes it
//! would take on the wire, through [`ByteSize`].

use crate::HostId;
use std::mem::size_of;

/// The number of bytes a value takes when transmitted.
pub trait ByteSize {
    fn byte_size(&self) -> usize;
}

macro_rules! byte_size_of {
    ($($t:ty),*) => {
        $(
            impl ByteSize for $t {
                fn byte_size(&self) -> usize {
                    size_of::<$t>()
                }
            }
        )*
    };
}

byte_size_of!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64, bool, char);

impl ByteSize for usize {
    fn byte_size(&self) -> usize {
        size_of::<u64>()
    }
}

impl ByteSize for isize {
    fn byte_size(&self) -> usize {
        size_of::<i64>()
    }
}

impl ByteSize for () {
    fn byte_size(&self) -> usize {
        0
    }
}

impl ByteSize for str {
    fn byte_size(&self) -> usize {
        self.len()
    }
}

impl ByteSize for String {
    fn byte_size(&self) -> usize {
        self.len()
    }
}

impl<T: ByteSize> ByteSize for [T] {
    fn byte_size(&self) -> usize {
        self.iter().map(ByteSize::byte_size).sum()
    }
}

impl<T: ByteSize> ByteSize for Vec<T> {
    fn byte_size(&self) -> usize {
        self.as_slice().byte_size()
    }
}

impl<T: ByteSize> ByteSize for Option<T> {
    fn byte_size(&self) -> usize {
        self.as_ref().map_or(0, ByteSize::byte_size)
    }
}

impl<T: ByteSize + ?Sized> ByteSize for &T {
    fn byte_size(&self) -> usize {
        (**self).byte_size()
    }
}

impl<T: ByteSize + ?Sized> ByteSize for Box<T> {
    fn byte_size(&self) -> usize {
        (**self).byte_size()
    }
}

/// The sender of a call, passed along for free.
///
/// Context like this is part of the middleware cost of a message, which the
/// cost model accounts for through the message count rather than the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sender(pub HostId);

impl ByteSize for Sender {
    fn byte_size(&self) -> usize {
        0
    }
}

/// Sums the [`ByteSize`] of every argument.
///
/// ```
/// use dsarch_core::message_size;
/// assert_eq!(message_size!(1u32, String::from("hi")), 6);
/// assert_eq!(message_size!(), 0);
/// ```
#[macro_export]
macro_rules! message_size {
    () => { 0usize };
    ($($arg:expr),+ $(,)?) => {
        0usize $(+ $crate::message::ByteSize::byte_size(&$arg))+
    };
}

/// The response of a remote method that may decline to answer.
///
/// A suppressed response is not charged to the response channel at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack<T> {
    Acknowledged(T),
    Suppressed,
}

impl<T> Ack<T> {
    pub fn is_ack(&self) -> bool {
        matches!(self, Ack::Acknowledged(_))
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            Ack::Acknowledged(payload) => Some(payload),
            Ack::Suppressed => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Ack::Acknowledged(payload) => Some(payload),
            Ack::Suppressed => None,
        }
    }
}

impl<T: ByteSize> Ack<T> {
    /// The size charged to the response channel, if anything is charged.
    pub fn response_size(&self) -> Option<usize> {
        self.payload().map(ByteSize::byte_size)
    }
}

impl<T: ByteSize> ByteSize for Ack<T> {
    fn byte_size(&self) -> usize {
        self.response_size().unwrap_or(0)
    }
}

impl<T> From<T> for Ack<T> {
    fn from(payload: T) -> Self {
        Ack::Acknowledged(payload)
    }
}
