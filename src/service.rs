//! The four-operation request/response surface of the credential service.
//!
//! This module composes the key derivation and the pseudorandom function
//! into the handlers an RPC transport dispatches to. The transport itself,
//! and the mechanism that authenticates callers before signing, live
//! outside this crate; handlers receive already-parsed requests and an
//! already-established [`CallerIdentity`] where one is required.
//!
//! Byte fields cross the wire as plain vectors and are decoded into
//! fixed-width values inside the handler, so malformed input is rejected at
//! exactly one place.

use rand_core::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    Blinded, Suite, Token,
    attribute::{self, TooLong},
    client::InvalidProof,
    config::{Config, ConfigError},
    kdf::{Kdf, KdfError},
    server::{SecretMismatch, Server},
    wire::{self, InvalidEncoding, SharedSecret},
};

/// The credential service: the primary key pair plus the handlers.
///
/// The key material is immutable after construction; handlers are pure
/// functions over their inputs and the RNG, so one instance serves
/// concurrent requests without synchronization.
pub struct CredentialService<S: Suite> {
    kdf: Kdf<S>,
}

impl<S: Suite> CredentialService<S> {
    pub fn new(kdf: Kdf<S>) -> Self {
        CredentialService { kdf }
    }

    /// Build the service from process configuration.
    pub fn from_config(config: &Config, rng: &mut impl Rng) -> Result<Self, ConfigError> {
        let secret = config.master_secret_source.load(rng)?;
        let kdf = if secret.is_raw() {
            Kdf::from_secret_scalar(secret.bytes())
                .map_err(|InvalidEncoding| ConfigError::InvalidMasterScalar)?
        } else {
            Kdf::from_seed(secret.bytes())
                .map_err(|_| ConfigError::SecretTooShort(secret.bytes().len()))?
        };
        Ok(Self::new(kdf))
    }

    /// `getPrimaryPublicKey`: the long-lived primary public key.
    ///
    /// Always succeeds.
    pub fn primary_public_key(&self) -> PrimaryKeyResponse {
        PrimaryKeyResponse {
            public_key: wire::serialize_element(&self.kdf.public_key().0)
                .as_ref()
                .to_vec(),
        }
    }

    /// `getPublicKeyAndProof`: the public key derived for an attribute set,
    /// with the proof tying it to the primary key.
    pub fn public_key_and_proof(
        &self,
        request: &PublicKeyRequest,
        rng: &mut impl Rng,
    ) -> Result<PublicKeyResponse, ServiceError> {
        let mut respond = || {
            let attributes = attribute::from_slices(&request.attributes)?;
            let derived = self.kdf.derive_key_pair(&attributes, rng)?;
            Ok(PublicKeyResponse {
                public_key: wire::serialize_element(&derived.public_key().0)
                    .as_ref()
                    .to_vec(),
                proof: derived.proof().to_bytes(),
            })
        };
        respond().map_err(|error| rejected("public_key_and_proof", error))
    }

    /// `signCredential`: evaluate a blinded element under the key derived
    /// for the attribute set, with an evaluation proof.
    ///
    /// The caller must have been authenticated by the external mechanism
    /// before this handler runs; a missing identity is rejected outright.
    pub fn sign_credential(
        &self,
        caller: Option<&CallerIdentity>,
        request: &SignRequest,
        rng: &mut impl Rng,
    ) -> Result<SignResponse, ServiceError> {
        let mut respond = || {
            let caller = caller.ok_or(ServiceError::AuthRequired)?;
            let attributes = attribute::from_slices(&request.attributes)?;
            let blinded: S::Group = wire::deserialize_element(&request.blinded)?;

            let key = self.kdf.derive_secret_key(&attributes)?;
            let server = Server::<S>::from_secret_key(key);
            let (evaluated, proof) = server.evaluate_with_proof(Blinded(blinded), rng);

            tracing::debug!(caller = caller.subject(), "credential signed");
            Ok(SignResponse {
                evaluated: wire::serialize_element(&evaluated.0).as_ref().to_vec(),
                proof: proof.to_bytes(),
            })
        };
        respond().map_err(|error| rejected("sign_credential", error))
    }

    /// `redeemCredential`: check a revealed token and its shared secret
    /// against the key derived for the attribute set.
    ///
    /// Only asserts cryptographic validity. Whether this token was seen
    /// before is for the layer above to decide.
    pub fn redeem_credential(&self, request: &RedeemRequest) -> Result<(), ServiceError> {
        let respond = || {
            let attributes = attribute::from_slices(&request.attributes)?;
            let token = decode_token(&request.token)?;
            let presented = SharedSecret::from_slice(&request.shared_secret)?;

            let key = self.kdf.derive_secret_key(&attributes)?;
            let server = Server::<S>::from_secret_key(key);
            server.redeem(&token, &presented)?;
            Ok(())
        };
        respond().map_err(|error| rejected("redeem_credential", error))
    }
}

/// An authenticated caller, as established by the external authenticator.
///
/// The service does not prescribe the mechanism; it only insists on
/// receiving the result before signing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    pub fn new(subject: impl Into<String>) -> Self {
        CallerIdentity(subject.into())
    }

    pub fn subject(&self) -> &str {
        &self.0
    }
}

/// Response to `getPrimaryPublicKey`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeyResponse {
    /// Canonical encoding of the primary public key.
    pub public_key: Vec<u8>,
}

/// Request for `getPublicKeyAndProof`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyRequest {
    /// Ordered attribute byte strings.
    pub attributes: Vec<Vec<u8>>,
}

/// Response to `getPublicKeyAndProof`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    /// Canonical encoding of the derived public key.
    pub public_key: Vec<u8>,
    /// Derivation proof, challenge then response.
    pub proof: Vec<u8>,
}

/// Request for `signCredential`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRequest {
    /// Canonical encoding of the blinded element.
    pub blinded: Vec<u8>,
    /// Ordered attribute byte strings.
    pub attributes: Vec<Vec<u8>>,
}

/// Response to `signCredential`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignResponse {
    /// Canonical encoding of the evaluated element.
    pub evaluated: Vec<u8>,
    /// Evaluation proof, challenge then response.
    pub proof: Vec<u8>,
}

/// Request for `redeemCredential`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemRequest {
    /// The revealed 32-byte token.
    pub token: Vec<u8>,
    /// The 64-byte shared secret derived at issuance.
    pub shared_secret: Vec<u8>,
    /// Ordered attribute byte strings, as used at issuance.
    pub attributes: Vec<Vec<u8>>,
}

/// Protocol-level failure of a handler.
///
/// Carries the failure kind and nothing else; in particular no bytes from
/// the failing request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// A value in the request is not a canonical encoding.
    #[error("a value is not a canonical encoding")]
    InvalidEncoding,
    /// A proof failed verification.
    #[error("a proof failed verification")]
    ProofInvalid,
    /// A scalar fell outside its arithmetic domain.
    #[error("a scalar fell outside its arithmetic domain")]
    ArithmeticDomain,
    /// The attribute list is empty.
    #[error("the attribute list is empty")]
    NoAttributes,
    /// The presented shared secret does not match.
    #[error("the presented shared secret does not match")]
    SecretMismatch,
    /// The caller has not been authenticated.
    #[error("the caller has not been authenticated")]
    AuthRequired,
}

impl From<InvalidEncoding> for ServiceError {
    fn from(InvalidEncoding: InvalidEncoding) -> Self {
        ServiceError::InvalidEncoding
    }
}

impl From<TooLong> for ServiceError {
    fn from(TooLong: TooLong) -> Self {
        ServiceError::InvalidEncoding
    }
}

impl From<KdfError> for ServiceError {
    fn from(error: KdfError) -> Self {
        match error {
            KdfError::NoAttributes => ServiceError::NoAttributes,
            KdfError::DerivationFailure => ServiceError::ArithmeticDomain,
        }
    }
}

impl From<SecretMismatch> for ServiceError {
    fn from(SecretMismatch: SecretMismatch) -> Self {
        ServiceError::SecretMismatch
    }
}

impl From<InvalidProof> for ServiceError {
    fn from(InvalidProof: InvalidProof) -> Self {
        ServiceError::ProofInvalid
    }
}

fn decode_token(bytes: &[u8]) -> Result<Token, ServiceError> {
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| ServiceError::InvalidEncoding)?;
    Ok(Token::from(bytes))
}

/// Count the rejection without echoing any request bytes.
fn rejected(operation: &'static str, error: ServiceError) -> ServiceError {
    tracing::warn!(operation, error = %error, "request rejected");
    error
}
