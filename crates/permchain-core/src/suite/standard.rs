//! The standard suite: NIST P-256, Keccak-256, AES-256-GCM.

use aes_gcm::Aes256Gcm;
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use ecdsa::RecoveryId;
use p256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest as _, Keccak256};

use super::{ecies, random_bytes, signature_rs, Cipher, CryptoSuite, KeyCodec, Signer, SuiteKind};
use crate::error::{CryptoError, Result};
use crate::hash::Digest;
use crate::keys::{PrivateKey, PublicKey, Signature, PRIVATE_KEY_LEN, PUBLIC_KEY_LEN, SIGNATURE_LEN};
use crate::types::H256;

const AES_KEY_LEN: usize = 32;

/// P-256 / Keccak-256 / AES-256-GCM.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardSuite;

impl StandardSuite {
    fn secret(&self, key: &PrivateKey) -> Result<p256::SecretKey> {
        key.expect_suite(SuiteKind::Standard)?;
        p256::SecretKey::from_slice(key.as_bytes())
            .map_err(|e| CryptoError::InvalidKeyEncoding(e.to_string()))
    }

    fn point(&self, key: &PublicKey) -> Result<p256::PublicKey> {
        key.expect_suite(SuiteKind::Standard)?;
        p256::PublicKey::from_sec1_bytes(key.as_bytes())
            .map_err(|e| CryptoError::InvalidPointEncoding(e.to_string()))
    }

    fn wrap_public(&self, point: &p256::PublicKey) -> Result<PublicKey> {
        wrap_encoded(point.to_encoded_point(false).as_bytes())
    }

    fn shared_secret(&self, secret: &p256::SecretKey, public: &p256::PublicKey) -> Vec<u8> {
        let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
        shared.raw_secret_bytes().to_vec()
    }
}

impl Digest for StandardSuite {
    fn hash(&self, data: &[u8]) -> H256 {
        H256(Keccak256::digest(data).into())
    }

    fn hash_parts(&self, parts: &[&[u8]]) -> H256 {
        let mut hasher = Keccak256::new();
        for part in parts {
            hasher.update(part);
        }
        H256(hasher.finalize().into())
    }
}

impl KeyCodec for StandardSuite {
    fn generate_key(&self) -> Result<PrivateKey> {
        let secret = random_secret()?;
        Ok(PrivateKey::new(SuiteKind::Standard, secret.to_bytes().into()))
    }

    fn deserialize_private(&self, bytes: &[u8]) -> Result<PrivateKey> {
        let arr: [u8; PRIVATE_KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKeyEncoding(format!(
                "expected {PRIVATE_KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        p256::SecretKey::from_slice(&arr)
            .map_err(|_| CryptoError::InvalidKeyEncoding("scalar out of range".into()))?;
        Ok(PrivateKey::new(SuiteKind::Standard, arr))
    }

    fn serialize_private(&self, key: &PrivateKey) -> Result<Vec<u8>> {
        key.expect_suite(SuiteKind::Standard)?;
        Ok(key.as_bytes().to_vec())
    }

    fn public_key_of(&self, key: &PrivateKey) -> Result<PublicKey> {
        let secret = self.secret(key)?;
        self.wrap_public(&secret.public_key())
    }

    fn deserialize_public(&self, bytes: &[u8]) -> Result<PublicKey> {
        let point = p256::PublicKey::from_sec1_bytes(bytes)
            .map_err(|_| CryptoError::InvalidPointEncoding("not a point on P-256".into()))?;
        self.wrap_public(&point)
    }

    fn serialize_public(&self, key: &PublicKey, compressed: bool) -> Result<Vec<u8>> {
        let point = self.point(key)?;
        Ok(point.to_encoded_point(compressed).as_bytes().to_vec())
    }
}

impl Signer for StandardSuite {
    fn sign(&self, digest: &H256, key: &PrivateKey) -> Result<Signature> {
        key.expect_suite(SuiteKind::Standard)?;
        let signing_key = SigningKey::from_slice(key.as_bytes())
            .map_err(|e| CryptoError::InvalidKeyEncoding(e.to_string()))?;
        let (sig, recovery_id) = signing_key
            .sign_prehash_recoverable(digest.as_bytes())
            .map_err(|e| CryptoError::InvalidKeyEncoding(e.to_string()))?;

        let mut out = [0u8; SIGNATURE_LEN];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = recovery_id.to_byte();
        Ok(Signature(out))
    }

    fn verify_signature(&self, public_key: &[u8], digest: &H256, signature: &[u8]) -> bool {
        let Some(rs) = signature_rs(signature) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(public_key) else {
            return false;
        };
        let Ok(sig) = EcdsaSignature::from_slice(rs) else {
            return false;
        };
        verifying_key.verify_prehash(digest.as_bytes(), &sig).is_ok()
    }

    fn recover_public_key(&self, digest: &H256, signature: &Signature) -> Result<PublicKey> {
        let sig = EcdsaSignature::from_slice(signature.rs())
            .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;
        let recovery_id = RecoveryId::from_byte(signature.v()).ok_or_else(|| {
            CryptoError::RecoveryFailed(format!("bad recovery byte {}", signature.v()))
        })?;
        let verifying_key =
            VerifyingKey::recover_from_prehash(digest.as_bytes(), &sig, recovery_id)
                .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;
        wrap_encoded(verifying_key.to_encoded_point(false).as_bytes())
    }
}

impl Cipher for StandardSuite {
    fn encrypt(&self, key: &PublicKey, plaintext: &[u8], s1: &[u8], s2: &[u8]) -> Result<Vec<u8>> {
        let recipient = self.point(key)?;
        let ephemeral = random_secret()?;
        let ephemeral_pub = self.wrap_public(&ephemeral.public_key())?;

        let shared = self.shared_secret(&ephemeral, &recipient);
        let aead_key = ecies::derive_key(self, &shared, s1, AES_KEY_LEN);
        ecies::seal::<Aes256Gcm>(ephemeral_pub.as_bytes(), &aead_key, plaintext, s2)
    }

    fn decrypt(&self, key: &PrivateKey, ciphertext: &[u8], s1: &[u8], s2: &[u8]) -> Result<Vec<u8>> {
        let secret = self.secret(key)?;
        let (ephemeral, nonce, body) = ecies::split(ciphertext)?;
        let ephemeral_pub =
            p256::PublicKey::from_sec1_bytes(ephemeral).map_err(|_| CryptoError::DecryptionFailed)?;

        let shared = self.shared_secret(&secret, &ephemeral_pub);
        let aead_key = ecies::derive_key(self, &shared, s1, AES_KEY_LEN);
        ecies::open::<Aes256Gcm>(&aead_key, nonce, body, s2)
    }
}

impl CryptoSuite for StandardSuite {
    fn kind(&self) -> SuiteKind {
        SuiteKind::Standard
    }
}

fn random_secret() -> Result<p256::SecretKey> {
    loop {
        let bytes = random_bytes()?;
        if let Ok(secret) = p256::SecretKey::from_slice(&bytes) {
            return Ok(secret);
        }
    }
}

fn wrap_encoded(encoded: &[u8]) -> Result<PublicKey> {
    let bytes: [u8; PUBLIC_KEY_LEN] = encoded.try_into().map_err(|_| {
        CryptoError::InvalidPointEncoding("identity point has no uncompressed form".into())
    })?;
    Ok(PublicKey::new(SuiteKind::Standard, bytes))
}
