//! Attribute byte strings and their transcript encoding.

/// A single attribute in an ordered attribute set.
///
/// This is a byte slice that is less than 2^16 bytes in length, so that the
/// length-prefixed key-derivation transcript stays unambiguous. It can be
/// constructed with the `TryFrom<&[u8]>` implementation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct Attribute<'a>(&'a [u8]);

/// Error indicating that an attribute is too long.
///
/// This is returned when attempting to create an `Attribute` from a byte
/// slice with length greater than `u16::MAX` bytes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TooLong;

impl core::fmt::Display for TooLong {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "the attribute exceeds the length bound")
    }
}

impl core::error::Error for TooLong {}

impl<'a> TryFrom<&'a [u8]> for Attribute<'a> {
    type Error = TooLong;

    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        if value.len() > u16::MAX as usize {
            return Err(TooLong);
        }
        Ok(Attribute(value))
    }
}

impl<'a> AsRef<[u8]> for Attribute<'a> {
    fn as_ref(&self) -> &[u8] {
        self.0
    }
}

impl<'a> From<Attribute<'a>> for &'a [u8] {
    fn from(attribute: Attribute<'a>) -> Self {
        attribute.0
    }
}

/// Borrow a list of raw byte strings as attributes, in order.
pub fn from_slices(raw: &[Vec<u8>]) -> Result<Vec<Attribute<'_>>, TooLong> {
    raw.iter()
        .map(|bytes| Attribute::try_from(bytes.as_slice()))
        .collect()
}

/// The key-derivation transcript: every attribute in order, each prefixed
/// with its big-endian `u16` length.
pub(crate) fn transcript(attributes: &[Attribute<'_>]) -> Vec<u8> {
    let mut out =
        Vec::with_capacity(attributes.iter().map(|a| a.as_ref().len() + 2).sum::<usize>());
    for attribute in attributes {
        out.extend_from_slice(&(attribute.as_ref().len() as u16).to_be_bytes());
        out.extend_from_slice(attribute.as_ref());
    }
    out
}
