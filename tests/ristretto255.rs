//! End-to-end protocol runs over the Ristretto255 suite.

use anoncred::{
    Evaluated, Token, VerifyingKey,
    attribute::Attribute,
    client::{Credential, CredentialClient, InvalidProof},
    dleq::Proof,
    kdf::{self, Kdf},
    ristretto::Ristretto255,
    server::Server,
    service::{
        CallerIdentity, CredentialService, PublicKeyRequest, RedeemRequest, ServiceError,
        SignRequest,
    },
    wire,
};
use curve25519_dalek::{RistrettoPoint, Scalar};
use group::Group;
use getrandom::SysRng;
use rand_core::UnwrapErr;

fn attributes() -> Vec<Attribute<'static>> {
    [b"app:demo".as_slice(), b"2024-01".as_slice()]
        .into_iter()
        .map(|a| Attribute::try_from(a).unwrap())
        .collect()
}

fn raw_attributes() -> Vec<Vec<u8>> {
    vec![b"app:demo".to_vec(), b"2024-01".to_vec()]
}

/// The token `0x00…01`.
fn fixed_token() -> Token {
    let mut bytes = [0u8; 32];
    bytes[31] = 1;
    Token::from(bytes)
}

/// Client and server arrive at the same shared secret through the blinded
/// and the direct path.
#[test]
fn client_and_server_agree() {
    let mut rng = UnwrapErr(SysRng);
    let server = Server::<Ristretto255>::random(&mut rng);

    let token = Token::random(&mut rng);
    let (credential, blinded) = Credential::blind(token, &mut rng).unwrap();
    let (evaluated, proof) = server.evaluate_with_proof(blinded, &mut rng);

    let unblinded = credential
        .verifiable_unblind(evaluated, &proof, server.verifying_key())
        .unwrap();
    let client_secret = credential.finalize(&unblinded);

    assert_eq!(client_secret, server.finalize_token(&token));
    server.redeem(&token, &client_secret).unwrap();
}

/// The full four-operation flow: fetch the primary key, fetch and verify a
/// derived key, issue a credential blindly, and redeem it.
#[test]
fn happy_path_through_the_service() {
    let mut rng = UnwrapErr(SysRng);
    let kdf = Kdf::from_seed(b"test-master-test-master-test-mas").unwrap();
    let service = CredentialService::<Ristretto255>::new(kdf);
    let caller = CallerIdentity::new("issuer-gateway");

    let primary = service.primary_public_key();
    let primary_key: RistrettoPoint = wire::deserialize_element(&primary.public_key).unwrap();

    let derived = service
        .public_key_and_proof(
            &PublicKeyRequest {
                attributes: raw_attributes(),
            },
            &mut rng,
        )
        .unwrap();
    let derived_key: RistrettoPoint = wire::deserialize_element(&derived.public_key).unwrap();
    let derivation_proof = Proof::<Scalar>::from_bytes(&derived.proof).unwrap();

    let client = CredentialClient::<Ristretto255>::new(
        VerifyingKey(primary_key),
        VerifyingKey(derived_key),
        &attributes(),
        &derivation_proof,
    )
    .unwrap();

    let (credential, blinded) = client.issue(fixed_token(), &mut rng).unwrap();
    let signed = service
        .sign_credential(
            Some(&caller),
            &SignRequest {
                blinded: wire::serialize_element(&blinded.0).as_ref().to_vec(),
                attributes: raw_attributes(),
            },
            &mut rng,
        )
        .unwrap();

    let evaluated: RistrettoPoint = wire::deserialize_element(&signed.evaluated).unwrap();
    let evaluation_proof = Proof::<Scalar>::from_bytes(&signed.proof).unwrap();
    let (token, shared_secret) = client
        .complete(credential, Evaluated(evaluated), &evaluation_proof)
        .unwrap();

    service
        .redeem_credential(&RedeemRequest {
            token: token.to_bytes().to_vec(),
            shared_secret: shared_secret.as_bytes().to_vec(),
            attributes: raw_attributes(),
        })
        .unwrap();
}

/// A tampered evaluation is caught before unblinding.
#[test]
fn tampered_evaluation_is_rejected() {
    let mut rng = UnwrapErr(SysRng);
    let server = Server::<Ristretto255>::random(&mut rng);

    let (credential, blinded) = Credential::blind(Token::random(&mut rng), &mut rng).unwrap();
    let (evaluated, proof) = server.evaluate_with_proof(blinded, &mut rng);

    let tampered = Evaluated(evaluated.0 + RistrettoPoint::generator());
    assert_eq!(
        credential.verifiable_unblind(tampered, &proof, server.verifying_key()),
        Err(InvalidProof)
    );

    // A bit flip on the wire either breaks the canonical encoding or the
    // proof; both are fatal for the credential.
    let mut bytes = wire::serialize_element(&evaluated.0).as_ref().to_vec();
    bytes[7] ^= 0x20;
    match wire::deserialize_element::<RistrettoPoint>(&bytes) {
        Err(wire::InvalidEncoding) => {}
        Ok(mutated) => {
            assert_eq!(
                credential.verifiable_unblind(
                    Evaluated(mutated),
                    &proof,
                    server.verifying_key()
                ),
                Err(InvalidProof)
            );
        }
    }
}

/// Redeeming under a different attribute set fails the secret comparison.
#[test]
fn wrong_attributes_at_redeem() {
    let mut rng = UnwrapErr(SysRng);
    let service = CredentialService::<Ristretto255>::new(Kdf::random(&mut rng));
    let caller = CallerIdentity::new("issuer-gateway");

    let derived = service
        .public_key_and_proof(
            &PublicKeyRequest {
                attributes: raw_attributes(),
            },
            &mut rng,
        )
        .unwrap();
    let primary: RistrettoPoint =
        wire::deserialize_element(&service.primary_public_key().public_key).unwrap();
    let derived_key: RistrettoPoint = wire::deserialize_element(&derived.public_key).unwrap();
    let client = CredentialClient::<Ristretto255>::new(
        VerifyingKey(primary),
        VerifyingKey(derived_key),
        &attributes(),
        &Proof::<Scalar>::from_bytes(&derived.proof).unwrap(),
    )
    .unwrap();

    let (credential, blinded) = client.issue(fixed_token(), &mut rng).unwrap();
    let signed = service
        .sign_credential(
            Some(&caller),
            &SignRequest {
                blinded: wire::serialize_element(&blinded.0).as_ref().to_vec(),
                attributes: raw_attributes(),
            },
            &mut rng,
        )
        .unwrap();
    let evaluated: RistrettoPoint = wire::deserialize_element(&signed.evaluated).unwrap();
    let (token, shared_secret) = client
        .complete(
            credential,
            Evaluated(evaluated),
            &Proof::<Scalar>::from_bytes(&signed.proof).unwrap(),
        )
        .unwrap();

    assert_eq!(
        service.redeem_credential(&RedeemRequest {
            token: token.to_bytes().to_vec(),
            shared_secret: shared_secret.as_bytes().to_vec(),
            attributes: vec![b"app:demo".to_vec(), b"2024-02".to_vec()],
        }),
        Err(ServiceError::SecretMismatch)
    );
}

/// A public key not derived from the primary key is rejected, forged proof
/// and all.
#[test]
fn key_substitution_is_rejected() {
    let mut rng = UnwrapErr(SysRng);
    let honest = Kdf::<Ristretto255>::random(&mut rng);
    let rogue = Kdf::<Ristretto255>::random(&mut rng);

    let forged = rogue.derive_key_pair(&attributes(), &mut rng).unwrap();
    assert!(!kdf::verify_public_key::<Ristretto255>(
        &honest.public_key(),
        &forged.public_key(),
        &attributes(),
        forged.proof(),
    ));

    assert_eq!(
        CredentialClient::<Ristretto255>::new(
            honest.public_key(),
            forged.public_key(),
            &attributes(),
            forged.proof(),
        )
        .err(),
        Some(InvalidProof)
    );
}

/// Two independent derivations for the same attributes are byte-equal.
#[test]
fn derivation_is_deterministic_across_calls() {
    let mut rng = UnwrapErr(SysRng);
    let service = CredentialService::<Ristretto255>::new(Kdf::random(&mut rng));
    let request = PublicKeyRequest {
        attributes: raw_attributes(),
    };

    let one = service.public_key_and_proof(&request, &mut rng).unwrap();
    let two = service.public_key_and_proof(&request, &mut rng).unwrap();
    assert_eq!(one.public_key, two.public_key);
    // Fresh proof nonce per call.
    assert_ne!(one.proof, two.proof);
}

/// Two clients blinding the same token produce unrelated transcripts, and
/// neither reveals the hashed token.
#[test]
fn issuances_are_unlinkable() {
    let mut rng = UnwrapErr(SysRng);
    let server = Server::<Ristretto255>::random(&mut rng);
    let token = fixed_token();

    let (_, blinded_one) = Credential::<Ristretto255>::blind(token, &mut rng).unwrap();
    let (_, blinded_two) = Credential::<Ristretto255>::blind(token, &mut rng).unwrap();
    assert_ne!(blinded_one, blinded_two);

    let evaluated_one = server.evaluate(blinded_one);
    let evaluated_two = server.evaluate(blinded_two);
    assert_ne!(evaluated_one, evaluated_two);
}

/// Blinded elements for one token are fresh uniform elements each time.
#[test]
fn blinding_hides_the_token() {
    let mut rng = UnwrapErr(SysRng);
    let token = fixed_token();

    let mut seen = std::collections::HashSet::new();
    for _ in 0..64 {
        let (_, blinded) = Credential::<Ristretto255>::blind(token, &mut rng).unwrap();
        let encoded = wire::serialize_element(&blinded.0).as_ref().to_vec();
        assert!(seen.insert(encoded));
    }
}
