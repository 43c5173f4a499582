//! Non-interactive discrete-log-equality proofs.
//!
//! A proof witnesses that two element pairs share one exponent: given a
//! statement `(g, y, h, z)`, the prover knows `x` with `y = x·g` and
//! `z = x·h`. The credential protocol instantiates this twice, with the
//! same verifier on the client side: once to tie an evaluation to the
//! server's derived public key, and once to tie a derived public key to
//! the primary one.

use group::{
    GroupEncoding,
    ff::{Field, PrimeField},
};
use rand_core::Rng;
use subtle::ConstantTimeEq;

use crate::{Scalar, Suite, domain_tag, wire::InvalidEncoding};

/// A discrete-log-equality proof: the Fiat-Shamir challenge and response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Proof<T> {
    pub(crate) c: T,
    pub(crate) s: T,
}

impl<T: PrimeField> Proof<T> {
    /// Serialize as the challenge followed by the response.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 * T::Repr::default().as_ref().len());
        out.extend_from_slice(self.c.to_repr().as_ref());
        out.extend_from_slice(self.s.to_repr().as_ref());
        out
    }

    /// Deserialize from the wire form produced by [`Proof::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvalidEncoding> {
        let width = T::Repr::default().as_ref().len();
        if bytes.len() != 2 * width {
            return Err(InvalidEncoding);
        }
        let c = crate::wire::deserialize_scalar(&bytes[..width])?;
        let s = crate::wire::deserialize_scalar(&bytes[width..])?;
        Ok(Proof { c, s })
    }
}

/// Prove that `y = x·g` and `z = x·h` share the exponent `x`.
///
/// The nonce is freshly random on every call, so two proofs of the same
/// statement never compare equal.
pub fn prove<S: Suite>(
    x: &Scalar<S>,
    g: &S::Group,
    y: &S::Group,
    h: &S::Group,
    z: &S::Group,
    rng: &mut impl Rng,
) -> Proof<Scalar<S>> {
    let k = Scalar::<S>::random(&mut *rng);
    let commitment_g = *g * k;
    let commitment_h = *h * k;

    let c = challenge::<S>(g, h, y, z, &commitment_g, &commitment_h);
    let s = k + c * x;

    Proof { c, s }
}

/// Verify a proof over the statement `(g, y, h, z)`.
///
/// Returns `false` on a challenge mismatch; the verifier inputs are all
/// public, so short-circuiting is fine, but the final scalar comparison is
/// constant-time regardless.
pub fn verify<S: Suite>(
    g: &S::Group,
    y: &S::Group,
    h: &S::Group,
    z: &S::Group,
    proof: &Proof<Scalar<S>>,
) -> bool {
    let commitment_g = *g * proof.s - *y * proof.c;
    let commitment_h = *h * proof.s - *z * proof.c;

    let expected = challenge::<S>(g, h, y, z, &commitment_g, &commitment_h);
    expected.ct_eq(&proof.c).into()
}

/// The Fiat-Shamir challenge over the whole transcript.
///
/// All four statement elements and both commitments are hashed, in this
/// fixed order; omitting or reordering any of them breaks soundness against
/// adaptive statement choice.
fn challenge<S: Suite>(
    g: &S::Group,
    h: &S::Group,
    y: &S::Group,
    z: &S::Group,
    commitment_g: &S::Group,
    commitment_h: &S::Group,
) -> Scalar<S> {
    let g = g.to_bytes();
    let h = h.to_bytes();
    let y = y.to_bytes();
    let z = z.to_bytes();
    let commitment_g = commitment_g.to_bytes();
    let commitment_h = commitment_h.to_bytes();

    let transcript = [
        g.as_ref(),
        h.as_ref(),
        y.as_ref(),
        z.as_ref(),
        commitment_g.as_ref(),
        commitment_h.as_ref(),
    ];

    S::hash_to_scalar(&transcript, &domain_tag!(b"DleqChallenge-"; <S>))
}

#[cfg(test)]
mod tests {
    use group::Group;
    use getrandom::SysRng;
    use rand_core::UnwrapErr;

    use super::*;
    use crate::ristretto::Ristretto255;

    type Point = <Ristretto255 as Suite>::Group;

    fn statement() -> (crate::Scalar<Ristretto255>, Point, Point, Point, Point) {
        let mut rng = UnwrapErr(SysRng);
        let x = crate::Scalar::<Ristretto255>::random(&mut rng);
        let g = Point::generator();
        let h = Point::random(&mut rng);
        (x, g, g * x, h, h * x)
    }

    #[test]
    fn completeness() {
        let mut rng = UnwrapErr(SysRng);
        let (x, g, y, h, z) = statement();
        let proof = prove::<Ristretto255>(&x, &g, &y, &h, &z, &mut rng);
        assert!(verify::<Ristretto255>(&g, &y, &h, &z, &proof));
    }

    #[test]
    fn rejects_mutated_proof() {
        let mut rng = UnwrapErr(SysRng);
        let (x, g, y, h, z) = statement();
        let proof = prove::<Ristretto255>(&x, &g, &y, &h, &z, &mut rng);

        let bytes = proof.to_bytes();
        for bit in [0, 8 * 31 + 1, 8 * 32, 8 * 63 + 7] {
            let mut mutated = bytes.clone();
            mutated[bit / 8] ^= 1 << (bit % 8);
            // A flipped bit either de-canonicalizes a scalar or breaks the
            // challenge equation.
            if let Ok(mutated) = Proof::from_bytes(&mutated) {
                assert!(!verify::<Ristretto255>(&g, &y, &h, &z, &mutated));
            }
        }
    }

    #[test]
    fn rejects_substituted_statement() {
        let mut rng = UnwrapErr(SysRng);
        let (x, g, y, h, z) = statement();
        let proof = prove::<Ristretto255>(&x, &g, &y, &h, &z, &mut rng);

        let other = Point::random(&mut rng);
        assert!(!verify::<Ristretto255>(&g, &y, &other, &z, &proof));
        assert!(!verify::<Ristretto255>(&g, &other, &h, &z, &proof));
        assert!(!verify::<Ristretto255>(&g, &y, &h, &other, &proof));
    }

    #[test]
    fn proofs_are_randomized() {
        let mut rng = UnwrapErr(SysRng);
        let (x, g, y, h, z) = statement();
        let one = prove::<Ristretto255>(&x, &g, &y, &h, &z, &mut rng);
        let two = prove::<Ristretto255>(&x, &g, &y, &h, &z, &mut rng);
        assert_ne!(one, two);
        assert!(verify::<Ristretto255>(&g, &y, &h, &z, &one));
        assert!(verify::<Ristretto255>(&g, &y, &h, &z, &two));
    }

    #[test]
    fn wire_round_trip() {
        let mut rng = UnwrapErr(SysRng);
        let (x, g, y, h, z) = statement();
        let proof = prove::<Ristretto255>(&x, &g, &y, &h, &z, &mut rng);
        let decoded = Proof::from_bytes(&proof.to_bytes()).unwrap();
        assert_eq!(proof, decoded);
    }
}
