//! The national suite: SM2, SM3, SM4-GCM.
//!
//! Signatures follow the SM2 signature equations directly over the
//! supplied 32-byte digest:
//!
//! ```text
//! sign:    R = k·G, r = e + R.x, s = (1 + d)⁻¹ · (k − r·d)
//! verify:  t = r + s, X = s·G + t·P, accept iff e + X.x == r
//! recover: R from (r − e, v), P = (R − s·G) · t⁻¹
//! ```
//!
//! where `e` is the digest reduced mod n. The appended byte `v` is the
//! parity of `R.y`. Nonces whose `R.x` would not survive the reduction
//! mod n are redrawn, so every signature we emit is recoverable.

use aes_gcm::aead::consts::U12;
use aes_gcm::AesGcm;
use sm2::elliptic_curve::bigint::U256;
use sm2::elliptic_curve::ops::Reduce;
use sm2::elliptic_curve::point::AffineCoordinates;
use sm2::elliptic_curve::sec1::ToEncodedPoint;
use sm2::elliptic_curve::{Group, PrimeField};
use sm2::{FieldBytes, ProjectivePoint, Scalar};
use sm3::{Digest as _, Sm3};

use super::{ecies, random_bytes, signature_rs, Cipher, CryptoSuite, KeyCodec, Signer, SuiteKind};
use crate::error::{CryptoError, Result};
use crate::hash::Digest;
use crate::keys::{PrivateKey, PublicKey, Signature, PRIVATE_KEY_LEN, PUBLIC_KEY_LEN, SIGNATURE_LEN};
use crate::types::H256;

type Sm4Gcm = AesGcm<sm4::Sm4, U12>;

const SM4_KEY_LEN: usize = 16;

/// SM2 / SM3 / SM4-GCM.
#[derive(Debug, Clone, Copy, Default)]
pub struct NationalSuite;

impl NationalSuite {
    fn secret(&self, key: &PrivateKey) -> Result<sm2::SecretKey> {
        key.expect_suite(SuiteKind::National)?;
        parse_secret(key.as_bytes())
    }

    fn point(&self, key: &PublicKey) -> Result<sm2::PublicKey> {
        key.expect_suite(SuiteKind::National)?;
        sm2::PublicKey::from_sec1_bytes(key.as_bytes())
            .map_err(|e| CryptoError::InvalidPointEncoding(e.to_string()))
    }

    fn wrap_public(&self, point: &sm2::PublicKey) -> Result<PublicKey> {
        let encoded = point.to_encoded_point(false);
        let bytes: [u8; PUBLIC_KEY_LEN] = encoded.as_bytes().try_into().map_err(|_| {
            CryptoError::InvalidPointEncoding("identity point has no uncompressed form".into())
        })?;
        Ok(PublicKey::new(SuiteKind::National, bytes))
    }
}

impl Digest for NationalSuite {
    fn hash(&self, data: &[u8]) -> H256 {
        H256(Sm3::digest(data).into())
    }

    fn hash_parts(&self, parts: &[&[u8]]) -> H256 {
        let mut hasher = Sm3::new();
        for part in parts {
            hasher.update(part);
        }
        H256(hasher.finalize().into())
    }
}

impl KeyCodec for NationalSuite {
    fn generate_key(&self) -> Result<PrivateKey> {
        loop {
            let bytes = random_bytes()?;
            if parse_secret(&bytes).is_ok() {
                return Ok(PrivateKey::new(SuiteKind::National, bytes));
            }
        }
    }

    fn deserialize_private(&self, bytes: &[u8]) -> Result<PrivateKey> {
        let arr: [u8; PRIVATE_KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKeyEncoding(format!(
                "expected {PRIVATE_KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        parse_secret(&arr)?;
        Ok(PrivateKey::new(SuiteKind::National, arr))
    }

    fn serialize_private(&self, key: &PrivateKey) -> Result<Vec<u8>> {
        key.expect_suite(SuiteKind::National)?;
        Ok(key.as_bytes().to_vec())
    }

    fn public_key_of(&self, key: &PrivateKey) -> Result<PublicKey> {
        let secret = self.secret(key)?;
        self.wrap_public(&secret.public_key())
    }

    fn deserialize_public(&self, bytes: &[u8]) -> Result<PublicKey> {
        let point = sm2::PublicKey::from_sec1_bytes(bytes)
            .map_err(|_| CryptoError::InvalidPointEncoding("not a point on SM2".into()))?;
        self.wrap_public(&point)
    }

    fn serialize_public(&self, key: &PublicKey, compressed: bool) -> Result<Vec<u8>> {
        let point = self.point(key)?;
        Ok(point.to_encoded_point(compressed).as_bytes().to_vec())
    }
}

impl Signer for NationalSuite {
    fn sign(&self, digest: &H256, key: &PrivateKey) -> Result<Signature> {
        let d = *self.secret(key)?.to_nonzero_scalar();
        let e = reduce(digest);
        let one_plus_d_inv = Option::<Scalar>::from((Scalar::ONE + d).invert())
            .ok_or_else(|| CryptoError::InvalidKeyEncoding("d = n - 1".into()))?;

        loop {
            let k = random_scalar()?;
            let point = (ProjectivePoint::generator() * k).to_affine();

            // x1 >= n would not survive recovery
            let Some(x1) = Option::<Scalar>::from(Scalar::from_repr(point.x())) else {
                continue;
            };
            let r = e + x1;
            if is_zero(&r) || is_zero(&(r + k)) {
                continue;
            }
            let s = one_plus_d_inv * (k - r * d);
            if is_zero(&s) || is_zero(&(r + s)) {
                continue;
            }

            let mut out = [0u8; SIGNATURE_LEN];
            out[..32].copy_from_slice(&r.to_repr());
            out[32..64].copy_from_slice(&s.to_repr());
            out[64] = u8::from(bool::from(point.y_is_odd()));
            return Ok(Signature(out));
        }
    }

    fn verify_signature(&self, public_key: &[u8], digest: &H256, signature: &[u8]) -> bool {
        let Some(rs) = signature_rs(signature) else {
            return false;
        };
        let Ok(public) = sm2::PublicKey::from_sec1_bytes(public_key) else {
            return false;
        };
        let Some((r, s)) = parse_rs(rs) else {
            return false;
        };
        let t = r + s;
        if is_zero(&t) {
            return false;
        }

        let point = ProjectivePoint::generator() * s + public.to_projective() * t;
        if bool::from(point.is_identity()) {
            return false;
        }
        let x = <Scalar as Reduce<U256>>::reduce_bytes(&point.to_affine().x());
        reduce(digest) + x == r
    }

    fn recover_public_key(&self, digest: &H256, signature: &Signature) -> Result<PublicKey> {
        let (r, s) = parse_rs(signature.rs())
            .ok_or_else(|| CryptoError::RecoveryFailed("r or s out of range".into()))?;
        let v = signature.v();
        if v > 1 {
            return Err(CryptoError::RecoveryFailed(format!("bad recovery byte {v}")));
        }

        let x1 = r - reduce(digest);
        let mut compressed = [0u8; 33];
        compressed[0] = 0x02 | v;
        compressed[1..].copy_from_slice(&x1.to_repr());
        let nonce_point = sm2::PublicKey::from_sec1_bytes(&compressed)
            .map_err(|_| CryptoError::RecoveryFailed("R is not on the curve".into()))?;

        let t_inv = Option::<Scalar>::from((r + s).invert())
            .ok_or_else(|| CryptoError::RecoveryFailed("r + s = 0".into()))?;
        let recovered = (nonce_point.to_projective() - ProjectivePoint::generator() * s) * t_inv;
        let public = sm2::PublicKey::from_affine(recovered.to_affine())
            .map_err(|_| CryptoError::RecoveryFailed("recovered the identity".into()))?;
        self.wrap_public(&public)
    }
}

impl Cipher for NationalSuite {
    fn encrypt(&self, key: &PublicKey, plaintext: &[u8], s1: &[u8], s2: &[u8]) -> Result<Vec<u8>> {
        let recipient = self.point(key)?;
        let ephemeral = self.generate_key()?;
        let ephemeral_pub = self.public_key_of(&ephemeral)?;
        let k = *self.secret(&ephemeral)?.to_nonzero_scalar();

        let shared = shared_x(&recipient, &k);
        let aead_key = ecies::derive_key(self, &shared, s1, SM4_KEY_LEN);
        ecies::seal::<Sm4Gcm>(ephemeral_pub.as_bytes(), &aead_key, plaintext, s2)
    }

    fn decrypt(&self, key: &PrivateKey, ciphertext: &[u8], s1: &[u8], s2: &[u8]) -> Result<Vec<u8>> {
        let d = *self.secret(key)?.to_nonzero_scalar();
        let (ephemeral, nonce, body) = ecies::split(ciphertext)?;
        let ephemeral_pub =
            sm2::PublicKey::from_sec1_bytes(ephemeral).map_err(|_| CryptoError::DecryptionFailed)?;

        let shared = shared_x(&ephemeral_pub, &d);
        let aead_key = ecies::derive_key(self, &shared, s1, SM4_KEY_LEN);
        ecies::open::<Sm4Gcm>(&aead_key, nonce, body, s2)
    }
}

impl CryptoSuite for NationalSuite {
    fn kind(&self) -> SuiteKind {
        SuiteKind::National
    }
}

/// Valid SM2 private scalars lie in `[1, n - 2]`.
fn parse_secret(bytes: &[u8; PRIVATE_KEY_LEN]) -> Result<sm2::SecretKey> {
    let secret = sm2::SecretKey::from_slice(bytes)
        .map_err(|_| CryptoError::InvalidKeyEncoding("scalar out of range".into()))?;
    if is_zero(&(Scalar::ONE + *secret.to_nonzero_scalar())) {
        return Err(CryptoError::InvalidKeyEncoding("scalar out of range".into()));
    }
    Ok(secret)
}

fn random_scalar() -> Result<Scalar> {
    loop {
        let bytes = random_bytes()?;
        if let Some(k) = Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(bytes))) {
            if !is_zero(&k) {
                return Ok(k);
            }
        }
    }
}

fn parse_rs(rs: &[u8]) -> Option<(Scalar, Scalar)> {
    let r = Option::<Scalar>::from(Scalar::from_repr(FieldBytes::clone_from_slice(&rs[..32])))?;
    let s = Option::<Scalar>::from(Scalar::from_repr(FieldBytes::clone_from_slice(&rs[32..64])))?;
    if is_zero(&r) || is_zero(&s) {
        return None;
    }
    Some((r, s))
}

fn reduce(digest: &H256) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(FieldBytes::from_slice(digest.as_bytes()))
}

fn shared_x(public: &sm2::PublicKey, scalar: &Scalar) -> Vec<u8> {
    (public.to_projective() * *scalar).to_affine().x().to_vec()
}

fn is_zero(scalar: &Scalar) -> bool {
    bool::from(scalar.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_sm3() {
        assert_eq!(
            NationalSuite.hash(b"abc").to_hex(),
            "66c7f0f462eeedd9d1f2d46bdc10e4e24167c4875cf2f7a2297da02b8f4ba8e0"
        );
        assert_eq!(
            NationalSuite.hash_parts(&[&b"ab"[..], &b"c"[..]]),
            NationalSuite.hash(b"abc")
        );
    }

    #[test]
    fn test_recover_both_parities() {
        let sk = NationalSuite.generate_key().unwrap();
        let pk = NationalSuite.public_key_of(&sk).unwrap();
        let mut seen = [false; 2];
        for i in 0u32..64 {
            let digest = NationalSuite.hash(&i.to_be_bytes());
            let sig = NationalSuite.sign(&digest, &sk).unwrap();
            seen[sig.v() as usize] = true;
            assert_eq!(NationalSuite.recover_public_key(&digest, &sig).unwrap(), pk);
            assert!(NationalSuite.verify_signature(pk.as_bytes(), &digest, sig.as_bytes()));
        }
        assert!(seen[0] && seen[1]);
    }

    #[test]
    fn test_signature_is_randomized() {
        let sk = NationalSuite.generate_key().unwrap();
        let digest = NationalSuite.hash(b"nonce");
        let a = NationalSuite.sign(&digest, &sk).unwrap();
        let b = NationalSuite.sign(&digest, &sk).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_recover_wrong_digest_gives_other_key() {
        let sk = NationalSuite.generate_key().unwrap();
        let pk = NationalSuite.public_key_of(&sk).unwrap();
        let sig = NationalSuite.sign(&NationalSuite.hash(b"a"), &sk).unwrap();
        match NationalSuite.recover_public_key(&NationalSuite.hash(b"b"), &sig) {
            Ok(other) => assert_ne!(other, pk),
            Err(e) => assert!(matches!(e, CryptoError::RecoveryFailed(_))),
        }
    }

    #[test]
    fn test_rejects_order_minus_one() {
        // n - 1 for the SM2 curve
        let n_minus_1 =
            hex::decode("fffffffeffffffffffffffffffffffff7203df6b21c6052b53bbf40939d54122").unwrap();
        assert!(matches!(
            NationalSuite.deserialize_private(&n_minus_1),
            Err(CryptoError::InvalidKeyEncoding(_))
        ));
    }
}
