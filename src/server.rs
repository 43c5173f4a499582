//! Server side of the credential protocol.
//!
//! The [`Server`] holds one secret scalar and evaluates blinded elements
//! under it. In the full service the scalar is derived per attribute set by
//! the [`kdf`](crate::kdf) and a `Server` is constructed transiently per
//! request; the type itself neither knows nor cares where its key came
//! from.

use group::{Group, ff::Field};
use rand_core::Rng;

use crate::{
    Blinded, Evaluated, Scalar, Suite, Token, VerifyingKey,
    dleq::{self, Proof},
    finalize_output, hash_to_group,
    wire::SharedSecret,
};

/// Evaluator of the pseudorandom function.
///
/// The server evaluates blinded elements provided by the client, and can
/// produce a [`Proof`] that the evaluation used the key committed to by its
/// [`verifying_key`], which the client checks before unblinding.
///
/// [`verifying_key`]: Server::verifying_key
pub struct Server<S: Suite> {
    key: Scalar<S>,
    verifying_key: VerifyingKey<S::Group>,
}

impl<S: Suite> zeroize::Zeroize for Server<S> {
    fn zeroize(&mut self) {
        self.key = Scalar::<S>::ZERO;
    }
}

impl<S: Suite> Drop for Server<S> {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.zeroize();
    }
}

impl<S: Suite> Server<S> {
    /// Initialize a new server with a random secret key.
    pub fn random(rng: &mut impl Rng) -> Self {
        Self::from_secret_key(Scalar::<S>::random(rng))
    }

    /// Initialize a new server from the provided secret key.
    pub fn from_secret_key(key: Scalar<S>) -> Self {
        let verifying_key = VerifyingKey(S::Group::mul_by_generator(&key));
        Server { key, verifying_key }
    }

    /// Access the server's secret key.
    ///
    /// Be careful with it!
    pub fn secret_key(&self) -> &Scalar<S> {
        &self.key
    }

    /// The verifying key of the server.
    pub fn verifying_key(&self) -> VerifyingKey<S::Group> {
        self.verifying_key
    }

    /// Evaluate the blinded element.
    pub fn evaluate(&self, blinded: Blinded<S::Group>) -> Evaluated<S::Group> {
        Evaluated(blinded.0 * self.key)
    }

    /// Evaluate the blinded element and prove the evaluation.
    ///
    /// The proof shows that the exponent taking the generator to the
    /// verifying key also takes the blinded element to the evaluation. Its
    /// nonce is fresh per call; verification is deterministic.
    pub fn evaluate_with_proof(
        &self,
        blinded: Blinded<S::Group>,
        rng: &mut impl Rng,
    ) -> (Evaluated<S::Group>, Proof<Scalar<S>>) {
        let evaluated = self.evaluate(blinded);
        let proof = dleq::prove::<S>(
            &self.key,
            &S::Group::generator(),
            &self.verifying_key.0,
            &blinded.0,
            &evaluated.0,
            rng,
        );
        (evaluated, proof)
    }

    /// Compute the shared secret for a revealed token.
    ///
    /// Evaluates the hashed token directly, without blinding; equals what an
    /// honest client derives for the same token through the blinded flow.
    pub fn finalize_token(&self, token: &Token) -> SharedSecret {
        let evaluated = hash_to_group::<S>(&[token.as_ref()]) * self.key;
        finalize_output::<S>(token.as_ref(), &evaluated)
    }

    /// Check a redemption witness.
    ///
    /// Recomputes the shared secret for the token and compares it with the
    /// presented one in constant time. Deduplication of tokens is the
    /// caller's responsibility; this only asserts cryptographic validity.
    pub fn redeem(
        &self,
        token: &Token,
        presented: &SharedSecret,
    ) -> Result<(), SecretMismatch> {
        if self.finalize_token(token) == *presented {
            Ok(())
        } else {
            Err(SecretMismatch)
        }
    }
}

/// The presented shared secret does not match.
///
/// The token was not signed under this key, or the attribute set at
/// redemption differs from the one at issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretMismatch;

impl core::fmt::Display for SecretMismatch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "the presented shared secret does not match")
    }
}

impl core::error::Error for SecretMismatch {}
