//! Cryptographic core of an anonymous credential service.
//!
//! A server holds a long-lived primary key pair. For every ordered set of
//! attribute strings it can derive a per-attribute key pair together with a
//! proof that the derived public key descends from the primary one
//! ([`kdf`]). Under a derived key it evaluates a verifiable oblivious
//! pseudorandom function over client-chosen tokens ([`server`]); the client
//! blinds its token, checks the evaluation proof, unblinds, and ends up with
//! a 64-byte shared secret the server can recompute. The server never sees
//! the token during issuance, so issuance and redemption are unlinkable
//! ([`client`]).
//!
//! Both the key-derivation proof and the evaluation proof are Chaum-Pedersen
//! discrete-log-equality proofs ([`dleq`]), verified by the same verifier.
//!
//! The group, the scalar field, and the hash routines are abstracted behind
//! the [`Suite`] trait; [`ristretto::Ristretto255`] is the suite the default
//! build ships. The thin request/response surface composing all of this into
//! four operations lives in [`service`].

pub mod attribute;
pub mod client;
pub mod config;
pub mod dleq;
pub mod kdf;
pub mod ristretto;
pub mod server;
pub mod service;
pub mod wire;

use digest::{Digest, OutputSizeUser, consts::U64};
use group::{Group, GroupEncoding, prime::PrimeGroup};
use rand_core::Rng;

use crate::wire::SharedSecret;

/// A ciphersuite for the credential protocol.
///
/// Bundles a prime-order group with the hash routines the protocol needs:
/// an indifferentiable hash onto the group, a uniform hash onto the scalar
/// field, plus a 64-byte digest for deriving shared secrets.
pub trait Suite {
    /// The identifier for this ciphersuite, mixed into every domain tag.
    const IDENTIFIER: &'static [u8];

    /// The prime-order group used in this ciphersuite.
    type Group: PrimeGroup + GroupEncoding;

    /// The hash function producing shared secrets. Its output is pinned to
    /// 64 bytes, the width of the redemption witness.
    type Hash: Digest + OutputSizeUser<OutputSize = U64>;

    /// Hash to group routine used by this ciphersuite.
    fn hash_to_group(input: &[&[u8]], domain: &[&[u8]]) -> Self::Group;

    /// Hash to scalar routine used by this ciphersuite.
    fn hash_to_scalar(input: &[&[u8]], domain: &[&[u8]]) -> <Self::Group as Group>::Scalar;
}

/// The scalar field of a [`Suite`]'s group.
pub type Scalar<S> = <<S as Suite>::Group as Group>::Scalar;

/// A blinded element.
///
/// What the client sends to the server for evaluation, so that the server
/// does not learn the token being signed.
///
/// This is a simple wrapper to help distinguish between blinded, evaluated,
/// and key elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Blinded<E>(pub E);

/// An evaluated element.
///
/// What the server sends back to the client after evaluating the blinded
/// element under its (derived) secret key.
///
/// This is a simple wrapper to help distinguish between blinded, evaluated,
/// and key elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Evaluated<E>(pub E);

/// An unblinded element, equal to the evaluation of the unblinded token.
///
/// Produced by the client after checking the evaluation proof; hashed into
/// the shared secret and then discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Unblinded<E>(pub E);

/// A public key of the server: either the primary key or one derived for an
/// attribute set.
///
/// This is a simple wrapper to help distinguish between blinded, evaluated,
/// and key elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifyingKey<E>(pub E);

/// A credential token: 32 client-chosen random bytes.
///
/// The token stays client-local through issuance and is only revealed at
/// redemption, together with the shared secret derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token([u8; 32]);

impl Token {
    /// Sample a fresh token.
    pub fn random(rng: &mut impl Rng) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Token(bytes)
    }

    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }
}

impl From<[u8; 32]> for Token {
    fn from(bytes: [u8; 32]) -> Self {
        Token(bytes)
    }
}

impl AsRef<[u8]> for Token {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Composes the domain-separation tag for one use of a hash routine.
///
/// Every tag is fixed for the lifetime of the protocol: changing one
/// invalidates all outstanding credentials.
macro_rules! domain_tag {
    ($label:literal; <$suite:ty>) => {
        [
            b"anoncred/v1-",
            $label,
            <$suite as $crate::Suite>::IDENTIFIER,
        ]
    };
}
pub(crate) use domain_tag;

/// Helper for hashing a token onto the group with the fixed domain.
pub(crate) fn hash_to_group<S: Suite>(input: &[&[u8]]) -> S::Group {
    S::hash_to_group(input, &domain_tag!(b"HashToGroup-"; <S>))
}

/// The shared-secret hash: binds the token to the unblinded evaluation.
///
/// Both sides of the protocol call this. The client passes the element it
/// unblinded, the server its own evaluation of the hashed token; agreement
/// of the two outputs is what redemption checks.
pub(crate) fn finalize_output<S: Suite>(token: &[u8], unblinded: &S::Group) -> SharedSecret {
    let element = unblinded.to_bytes();

    let mut digest = S::Hash::new();
    digest.update((token.len() as u16).to_be_bytes());
    digest.update(token);
    digest.update((element.as_ref().len() as u16).to_be_bytes());
    digest.update(element.as_ref());
    digest.update(b"anoncred/v1-Finalize-");
    digest.update(S::IDENTIFIER);

    let mut output = [0u8; wire::SHARED_SECRET_LEN];
    output.copy_from_slice(digest.finalize().as_slice());
    SharedSecret::from_bytes(output)
}
