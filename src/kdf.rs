//! Attribute-indexed key derivation.
//!
//! The server holds one primary key pair `(sk, pk)`. For an ordered set of
//! attributes hashed to a scalar `x`, the derived secret key is `sk · x⁻¹`,
//! so `x · pk_derived = pk`. Knowledge of the derived key therefore proves
//! descent from the primary key, and the derivation comes with a
//! discrete-log-equality proof over `(G, pk_derived, x·G, pk)` that a
//! client can check against the published primary key.

use group::{Group, ff::Field};
use rand_core::Rng;
use zeroize::Zeroize;

use crate::{
    Scalar, Suite, VerifyingKey,
    attribute::{self, Attribute},
    dleq::{self, Proof},
    domain_tag,
    wire::{self, InvalidEncoding},
};

/// The attribute-indexed key-derivation function.
///
/// Owns the primary secret key for the lifetime of the server process. The
/// key is immutable after construction and wiped on drop; derived key pairs
/// are recomputed on demand and never stored.
pub struct Kdf<S: Suite> {
    master_key: Scalar<S>,
    public_key: VerifyingKey<S::Group>,
}

impl<S: Suite> zeroize::Zeroize for Kdf<S> {
    fn zeroize(&mut self) {
        self.master_key = Scalar::<S>::ZERO;
    }
}

impl<S: Suite> Drop for Kdf<S> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl<S: Suite> Kdf<S> {
    /// Initialize with a random primary key.
    pub fn random(rng: &mut impl Rng) -> Self {
        Self::from_secret_key(Scalar::<S>::random(rng))
    }

    /// Deterministically derive the primary key from a seed of at least 32
    /// bytes.
    ///
    /// The seed is hashed to a scalar; in the negligible event that the
    /// result is zero, a counter is bumped and the hash repeated.
    pub fn from_seed(seed: &[u8]) -> Result<Self, InvalidSeed> {
        if seed.len() < 32 {
            return Err(InvalidSeed);
        }

        let mut counter = 0u8;
        let mut master_key = Scalar::<S>::ZERO;
        while master_key.is_zero().into() {
            master_key =
                S::hash_to_scalar(&[seed, &[counter]], &domain_tag!(b"DeriveKeyPair-"; <S>));
            counter = counter.checked_add(1).ok_or(InvalidSeed)?;
        }

        Ok(Self::from_secret_key(master_key))
    }

    /// Initialize from the canonical 32-byte encoding of the primary secret
    /// scalar.
    ///
    /// Rejects non-canonical bytes and the zero scalar.
    pub fn from_secret_scalar(bytes: &[u8]) -> Result<Self, InvalidEncoding> {
        let master_key: Scalar<S> = wire::deserialize_scalar(bytes)?;
        if master_key.is_zero().into() {
            return Err(InvalidEncoding);
        }
        Ok(Self::from_secret_key(master_key))
    }

    fn from_secret_key(master_key: Scalar<S>) -> Self {
        let public_key = VerifyingKey(S::Group::mul_by_generator(&master_key));
        Kdf {
            master_key,
            public_key,
        }
    }

    /// The primary public key.
    pub fn public_key(&self) -> VerifyingKey<S::Group> {
        self.public_key
    }

    /// Derive the secret key for an attribute set, without a proof.
    ///
    /// This is what redemption needs: recomputing the pseudorandom function
    /// requires the derived scalar but nothing a client would verify.
    pub fn derive_secret_key(
        &self,
        attributes: &[Attribute<'_>],
    ) -> Result<Scalar<S>, KdfError> {
        Ok(self.derived_parts(attributes)?.1)
    }

    /// Derive the key pair for an attribute set, plus the proof linking the
    /// derived public key to the primary one.
    ///
    /// The same attributes always derive the same key pair; only the proof
    /// nonce is fresh per call.
    pub fn derive_key_pair(
        &self,
        attributes: &[Attribute<'_>],
        rng: &mut impl Rng,
    ) -> Result<DerivedKeyPair<S>, KdfError> {
        let (index, secret_key) = self.derived_parts(attributes)?;
        let public_key = S::Group::mul_by_generator(&secret_key);
        let blinded_generator = S::Group::mul_by_generator(&index);

        // The witness is the derived key: it takes the generator to the
        // derived public key, and x·G to the primary public key.
        let proof = dleq::prove::<S>(
            &secret_key,
            &S::Group::generator(),
            &public_key,
            &blinded_generator,
            &self.public_key.0,
            rng,
        );

        Ok(DerivedKeyPair {
            secret_key,
            public_key: VerifyingKey(public_key),
            proof,
        })
    }

    /// The attribute scalar and derived secret key for an attribute set.
    fn derived_parts(
        &self,
        attributes: &[Attribute<'_>],
    ) -> Result<(Scalar<S>, Scalar<S>), KdfError> {
        if attributes.is_empty() {
            return Err(KdfError::NoAttributes);
        }
        let index = attribute_scalar::<S>(attributes);
        let inverse = index
            .invert()
            .into_option()
            .ok_or(KdfError::DerivationFailure)?;
        Ok((index, self.master_key * inverse))
    }
}

/// Check that `derived_key` was derived from `primary_key` for exactly these
/// attributes.
///
/// Recomputes the attribute scalar and runs the discrete-log-equality
/// verifier; any failure, including an empty attribute set, is `false`.
pub fn verify_public_key<S: Suite>(
    primary_key: &VerifyingKey<S::Group>,
    derived_key: &VerifyingKey<S::Group>,
    attributes: &[Attribute<'_>],
    proof: &Proof<Scalar<S>>,
) -> bool {
    if attributes.is_empty() {
        return false;
    }
    let index = attribute_scalar::<S>(attributes);
    let blinded_generator = S::Group::mul_by_generator(&index);

    dleq::verify::<S>(
        &S::Group::generator(),
        &derived_key.0,
        &blinded_generator,
        &primary_key.0,
        proof,
    )
}

/// Hash the length-prefixed attribute transcript to the derivation scalar.
fn attribute_scalar<S: Suite>(attributes: &[Attribute<'_>]) -> Scalar<S> {
    let transcript = attribute::transcript(attributes);
    S::hash_to_scalar(&[&transcript], &domain_tag!(b"KdfScalar-"; <S>))
}

/// A key pair derived for one attribute set.
///
/// Ephemeral: recomputed on demand, never stored server-side, and the
/// secret half is wiped on drop.
pub struct DerivedKeyPair<S: Suite> {
    secret_key: Scalar<S>,
    public_key: VerifyingKey<S::Group>,
    proof: Proof<Scalar<S>>,
}

impl<S: Suite> DerivedKeyPair<S> {
    /// The derived secret key.
    ///
    /// Be careful with it!
    pub fn secret_key(&self) -> &Scalar<S> {
        &self.secret_key
    }

    /// The derived public key.
    pub fn public_key(&self) -> VerifyingKey<S::Group> {
        self.public_key
    }

    /// The proof linking the derived public key to the primary one.
    pub fn proof(&self) -> &Proof<Scalar<S>> {
        &self.proof
    }
}

impl<S: Suite> zeroize::Zeroize for DerivedKeyPair<S> {
    fn zeroize(&mut self) {
        self.secret_key = Scalar::<S>::ZERO;
    }
}

impl<S: Suite> Drop for DerivedKeyPair<S> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Key-derivation failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KdfError {
    /// The attribute set is empty.
    ///
    /// Deriving a key for no attributes would alias the primary key pair
    /// itself, so the empty set is rejected outright.
    NoAttributes,
    /// The attribute set hashed to the zero scalar.
    ///
    /// Zero has no inverse, and there is nothing to resample. Practically
    /// impossible; roughly equivalent to finding a preimage of zero.
    DerivationFailure,
}

impl core::fmt::Display for KdfError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            KdfError::NoAttributes => write!(f, "the attribute set is empty"),
            KdfError::DerivationFailure => {
                write!(f, "the attribute set does not derive a usable key")
            }
        }
    }
}

impl core::error::Error for KdfError {}

/// Deterministic key-derivation error.
///
/// The seed is shorter than 32 bytes, or (practically impossible) every
/// counter value hashed to zero, which implies a broken `hash_to_scalar`
/// implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidSeed;

impl core::fmt::Display for InvalidSeed {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "the seed does not generate a valid secret key")
    }
}

impl core::error::Error for InvalidSeed {}
