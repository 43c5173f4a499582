//! The Ristretto255 / SHA-512 ciphersuite.

use core::num::NonZeroU16;

use curve25519_dalek::{RistrettoPoint, Scalar};
use digest::consts::U32;
use hash2curve::{ExpandMsg, ExpandMsgXmd, Expander};
use sha2::Sha512;

use crate::Suite;

/// Ristretto255 over Curve25519, with SHA-512 as the protocol hash.
///
/// The only suite the default build ships; the group has prime order with
/// canonical 32-byte encodings for both scalars and elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ristretto255;

impl Suite for Ristretto255 {
    const IDENTIFIER: &'static [u8] = b"ristretto255-SHA512";

    type Group = RistrettoPoint;

    type Hash = Sha512;

    fn hash_to_group(input: &[&[u8]], domain: &[&[u8]]) -> RistrettoPoint {
        RistrettoPoint::from_uniform_bytes(&expand(input, domain))
    }

    fn hash_to_scalar(input: &[&[u8]], domain: &[&[u8]]) -> Scalar {
        Scalar::from_bytes_mod_order_wide(&expand(input, domain))
    }
}

/// `expand_message_xmd` with SHA-512, producing the 64 uniform bytes both
/// hash routines reduce from.
fn expand(input: &[&[u8]], domain: &[&[u8]]) -> [u8; 64] {
    let mut expander = <ExpandMsgXmd<Sha512> as ExpandMsg<U32>>::expand_message(
        input,
        domain,
        NonZeroU16::new(64).expect("64 is non-zero"),
    )
    .expect("instantiation is valid");
    let mut uniform_bytes = [0u8; 64];
    expander
        .fill_bytes(&mut uniform_bytes)
        .expect("filling correct size");
    uniform_bytes
}
