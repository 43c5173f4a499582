//! Fixed-width wire codecs for scalars, elements, and shared secrets.
//!
//! Deserialization here is the only place where lengths and canonicity are
//! checked; everything past this boundary works with well-formed values.

use group::{GroupEncoding, ff::PrimeField, prime::PrimeGroup};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// Width of the shared secret derived at finalize, in bytes.
pub const SHARED_SECRET_LEN: usize = 64;

/// The byte sequence is not a canonical encoding.
///
/// Returned when decoding a scalar that is not reduced, an element that is
/// not a valid canonical encoding (or encodes the identity), or any input of
/// the wrong length.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InvalidEncoding;

impl core::fmt::Display for InvalidEncoding {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "the byte sequence is not a canonical encoding")
    }
}

impl core::error::Error for InvalidEncoding {}

/// Serialize a scalar to its canonical fixed-width encoding.
pub fn serialize_scalar<T: PrimeField>(scalar: &T) -> T::Repr {
    scalar.to_repr()
}

/// Deserialize a scalar, rejecting non-canonical bytes and wrong lengths.
pub fn deserialize_scalar<T: PrimeField>(bytes: &[u8]) -> Result<T, InvalidEncoding> {
    let mut repr = T::Repr::default();
    if bytes.len() != repr.as_ref().len() {
        return Err(InvalidEncoding);
    }
    repr.as_mut().copy_from_slice(bytes);
    T::from_repr(repr).into_option().ok_or(InvalidEncoding)
}

/// Serialize a group element to its canonical fixed-width encoding.
pub fn serialize_element<G: GroupEncoding>(element: &G) -> G::Repr {
    element.to_bytes()
}

/// Deserialize a group element, rejecting non-canonical bytes, wrong
/// lengths, and the identity.
///
/// The identity never appears in an honest protocol run; accepting it from
/// the wire would let a misbehaving peer mask an evaluation failure.
pub fn deserialize_element<G: PrimeGroup + GroupEncoding>(
    bytes: &[u8],
) -> Result<G, InvalidEncoding> {
    let mut repr = G::Repr::default();
    if bytes.len() != repr.as_ref().len() {
        return Err(InvalidEncoding);
    }
    repr.as_mut().copy_from_slice(bytes);
    let element = G::from_bytes(&repr).into_option().ok_or(InvalidEncoding)?;
    if element.is_identity().into() {
        return Err(InvalidEncoding);
    }
    Ok(element)
}

/// The 64-byte secret shared between client and server after finalize.
///
/// This is the redemption witness. Comparison is constant-time, and the
/// bytes are wiped on drop.
#[derive(Clone)]
pub struct SharedSecret([u8; SHARED_SECRET_LEN]);

impl SharedSecret {
    pub fn from_bytes(bytes: [u8; SHARED_SECRET_LEN]) -> Self {
        SharedSecret(bytes)
    }

    /// Decode a shared secret from the wire, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, InvalidEncoding> {
        let bytes: [u8; SHARED_SECRET_LEN] = bytes.try_into().map_err(|_| InvalidEncoding)?;
        Ok(SharedSecret(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_LEN] {
        &self.0
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SharedSecret {}

impl core::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Redacted: the secret is the redemption witness.
        write!(f, "SharedSecret([..])")
    }
}

impl Zeroize for SharedSecret {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.zeroize();
    }
}
