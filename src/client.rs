//! Client side of the credential protocol.
//!
//! This module contains the per-credential state machine ([`Credential`]),
//! the driver composing it with key verification ([`CredentialClient`]),
//! and the errors the client may return.

use group::{Group, ff::Field};
use rand_core::Rng;

use crate::{
    Blinded, Evaluated, Scalar, Suite, Token, Unblinded, VerifyingKey,
    attribute::Attribute,
    dleq::{self, Proof},
    finalize_output, hash_to_group,
    kdf,
    wire::SharedSecret,
};

/// Client-held state for one outstanding credential.
///
/// Walks the state machine `blind → evaluate (server) → verifiable_unblind
/// → finalize`. A failed proof is fatal for the credential: discard the
/// state and restart from [`Credential::blind`] with a fresh token. The
/// blinding factor is wiped when the state is dropped.
pub struct Credential<S: Suite> {
    token: Token,
    blind: Scalar<S>,
    blinded: Blinded<S::Group>,
}

impl<S: Suite> zeroize::Zeroize for Credential<S> {
    fn zeroize(&mut self) {
        self.blind = Scalar::<S>::ZERO;
    }
}

impl<S: Suite> Drop for Credential<S> {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.zeroize();
    }
}

impl<S: Suite> Credential<S> {
    /// Blind a token for evaluation.
    ///
    /// Hashes the token onto the group and multiplies it by a fresh nonzero
    /// blinding factor, so the server sees a uniformly random element.
    pub fn blind(
        token: Token,
        rng: &mut impl Rng,
    ) -> Result<(Self, Blinded<S::Group>), InvalidToken> {
        let hashed = hash_to_group::<S>(&[token.as_ref()]);
        if hashed.is_identity().into() {
            return Err(InvalidToken);
        }

        let mut blind = Scalar::<S>::random(&mut *rng);
        while blind.is_zero().into() {
            blind = Scalar::<S>::random(&mut *rng);
        }

        let blinded = Blinded(hashed * blind);
        Ok((
            Credential {
                token,
                blind,
                blinded,
            },
            blinded,
        ))
    }

    /// The token this credential was issued for.
    pub fn token(&self) -> Token {
        self.token
    }

    /// The blinded element, as sent to the server.
    pub fn blinded(&self) -> Blinded<S::Group> {
        self.blinded
    }

    /// Check the evaluation proof and strip the blinding factor.
    ///
    /// The proof ties the evaluation to `verifying_key` over the blinded
    /// element this state holds; only if it checks out is the evaluation
    /// unblinded. The result equals the server's evaluation of the hashed
    /// token itself.
    pub fn verifiable_unblind(
        &self,
        evaluated: Evaluated<S::Group>,
        proof: &Proof<Scalar<S>>,
        verifying_key: VerifyingKey<S::Group>,
    ) -> Result<Unblinded<S::Group>, InvalidProof> {
        if !dleq::verify::<S>(
            &S::Group::generator(),
            &verifying_key.0,
            &self.blinded.0,
            &evaluated.0,
            proof,
        ) {
            return Err(InvalidProof);
        }
        // An identity evaluation cannot come from a nonzero key and a
        // non-identity blinded element, proof or not.
        if evaluated.0.is_identity().into() {
            return Err(InvalidProof);
        }

        let inverse = self.blind.invert().expect("blind is non-zero");
        Ok(Unblinded(evaluated.0 * inverse))
    }

    /// Finalize the credential into the 64-byte shared secret.
    ///
    /// Consumes the state; the blinding factor is wiped on the way out.
    pub fn finalize(self, unblinded: &Unblinded<S::Group>) -> SharedSecret {
        finalize_output::<S>(self.token.as_ref(), &unblinded.0)
    }
}

/// Protocol driver for a client talking to one credential issuer.
///
/// Construction verifies the derived public key against the published
/// primary key; afterwards the driver runs the credential state machine
/// against the verified key.
pub struct CredentialClient<S: Suite> {
    derived_key: VerifyingKey<S::Group>,
}

impl<S: Suite> CredentialClient<S> {
    /// Accept a derived public key after checking its derivation proof.
    ///
    /// `primary_key` must come from an authenticated channel (it is the
    /// server's long-lived identity); `derived_key` and `proof` are what the
    /// server handed out for `attributes`.
    pub fn new(
        primary_key: VerifyingKey<S::Group>,
        derived_key: VerifyingKey<S::Group>,
        attributes: &[Attribute<'_>],
        proof: &Proof<Scalar<S>>,
    ) -> Result<Self, InvalidProof> {
        if !kdf::verify_public_key::<S>(&primary_key, &derived_key, attributes, proof) {
            return Err(InvalidProof);
        }
        Ok(CredentialClient { derived_key })
    }

    /// The verified derived public key.
    pub fn derived_key(&self) -> VerifyingKey<S::Group> {
        self.derived_key
    }

    /// Blind the given token, starting a new credential.
    pub fn issue(
        &self,
        token: Token,
        rng: &mut impl Rng,
    ) -> Result<(Credential<S>, Blinded<S::Group>), InvalidToken> {
        Credential::blind(token, rng)
    }

    /// Complete a credential from the server's evaluation.
    ///
    /// Verifies the evaluation proof against the derived key, unblinds, and
    /// finalizes. Returns the token and the shared secret, which together
    /// form the redemption request.
    pub fn complete(
        &self,
        credential: Credential<S>,
        evaluated: Evaluated<S::Group>,
        proof: &Proof<Scalar<S>>,
    ) -> Result<(Token, SharedSecret), InvalidProof> {
        let unblinded = credential.verifiable_unblind(evaluated, proof, self.derived_key)?;
        let token = credential.token();
        Ok((token, credential.finalize(&unblinded)))
    }
}

/// The proof provided is invalid.
///
/// Returned when proof verification fails: either the evaluation was not
/// produced under the expected key, or a derived public key does not
/// descend from the primary key for the claimed attributes. Fatal for the
/// credential or key in question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidProof;

impl core::fmt::Display for InvalidProof {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "the proof provided is invalid")
    }
}

impl core::error::Error for InvalidProof {}

/// The token provided is invalid.
///
/// This practically never happens: it means the token hashed to the group
/// identity, which is roughly equivalent to finding a hash collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidToken;

impl core::fmt::Display for InvalidToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "the token provided is invalid")
    }
}

impl core::error::Error for InvalidToken {}
