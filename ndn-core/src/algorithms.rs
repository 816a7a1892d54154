//! Reference signing algorithms for [`Signer`] and [`Verifier`].

use async_trait::async_trait;
use ed25519_dalek::Signer as _;
use ring::hmac;
use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::pkcs1v15::{SigningKey, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier as _};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::name::{Name, NameComponent};
use crate::signature::{KeyLocator, SignatureError, SignatureType, Signer, Verifier};

/// DigestSha256: the "signature" is the SHA-256 of the signed portion
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestSigning;

#[async_trait]
impl Signer for DigestSigning {
    fn signature_type(&self) -> SignatureType {
        SignatureType::DigestSha256
    }

    async fn sign(&self, input: &[u8]) -> Result<Vec<u8>, SignatureError> {
        Ok(Sha256::digest(input).to_vec())
    }
}

#[async_trait]
impl Verifier for DigestSigning {
    async fn verify(&self, input: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
        if Sha256::digest(input).as_slice() != signature {
            return Err(SignatureError::VerificationFailed);
        }
        Ok(())
    }
}

/// HMAC-SHA256 with a shared secret
pub struct HmacKey {
    key: hmac::Key,
    key_locator: Option<KeyLocator>,
}

impl HmacKey {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
            key_locator: None,
        }
    }

    pub fn with_key_locator(mut self, key_locator: KeyLocator) -> Self {
        self.key_locator = Some(key_locator);
        self
    }
}

#[async_trait]
impl Signer for HmacKey {
    fn signature_type(&self) -> SignatureType {
        SignatureType::HmacWithSha256
    }

    fn key_locator(&self) -> Option<KeyLocator> {
        self.key_locator.clone()
    }

    async fn sign(&self, input: &[u8]) -> Result<Vec<u8>, SignatureError> {
        Ok(hmac::sign(&self.key, input).as_ref().to_vec())
    }
}

#[async_trait]
impl Verifier for HmacKey {
    async fn verify(&self, input: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
        hmac::verify(&self.key, input, signature).map_err(|_| SignatureError::VerificationFailed)
    }
}

/// SHA256withRSA (PKCS#1 v1.5)
pub struct RsaSigner {
    signing_key: SigningKey<Sha256>,
    key_locator: Option<KeyLocator>,
}

impl RsaSigner {
    pub fn new(private_key: RsaPrivateKey) -> Self {
        Self {
            signing_key: SigningKey::<Sha256>::new(private_key),
            key_locator: None,
        }
    }

    pub fn with_key_locator(mut self, key_locator: KeyLocator) -> Self {
        self.key_locator = Some(key_locator);
        self
    }
}

#[async_trait]
impl Signer for RsaSigner {
    fn signature_type(&self) -> SignatureType {
        SignatureType::Sha256WithRsa
    }

    fn key_locator(&self) -> Option<KeyLocator> {
        self.key_locator.clone()
    }

    async fn sign(&self, input: &[u8]) -> Result<Vec<u8>, SignatureError> {
        // SigningKey hashes the input itself
        let signature = self.signing_key.sign_with_rng(&mut rand::thread_rng(), input);
        Ok(signature.to_vec())
    }
}

pub struct RsaVerifier {
    verifying_key: VerifyingKey<Sha256>,
}

impl RsaVerifier {
    pub fn new(public_key: RsaPublicKey) -> Self {
        Self {
            verifying_key: VerifyingKey::<Sha256>::new(public_key),
        }
    }
}

#[async_trait]
impl Verifier for RsaVerifier {
    async fn verify(&self, input: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
        let signature = rsa::pkcs1v15::Signature::try_from(signature)
            .map_err(|_| SignatureError::VerificationFailed)?;
        self.verifying_key
            .verify(input, &signature)
            .map_err(|_| SignatureError::VerificationFailed)
    }
}

/// Ed25519 (RFC 8032)
pub struct Ed25519Signer {
    signing_key: ed25519_dalek::SigningKey,
    key_locator: Option<KeyLocator>,
}

impl Ed25519Signer {
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
            key_locator: None,
        }
    }

    /// Create a signer from a fresh random seed
    pub fn generate() -> Self {
        Self::from_seed(&rand::random())
    }

    pub fn with_key_locator(mut self, key_locator: KeyLocator) -> Self {
        self.key_locator = Some(key_locator);
        self
    }

    pub fn verifier(&self) -> Ed25519Verifier {
        Ed25519Verifier {
            verifying_key: self.signing_key.verifying_key(),
        }
    }
}

#[async_trait]
impl Signer for Ed25519Signer {
    fn signature_type(&self) -> SignatureType {
        SignatureType::Ed25519
    }

    fn key_locator(&self) -> Option<KeyLocator> {
        self.key_locator.clone()
    }

    async fn sign(&self, input: &[u8]) -> Result<Vec<u8>, SignatureError> {
        Ok(self.signing_key.sign(input).to_bytes().to_vec())
    }
}

pub struct Ed25519Verifier {
    verifying_key: ed25519_dalek::VerifyingKey,
}

impl Ed25519Verifier {
    pub fn from_bytes(public_key: &[u8; 32]) -> Result<Self, SignatureError> {
        let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(public_key)
            .map_err(|e| SignatureError::KeyError(e.to_string()))?;
        Ok(Self { verifying_key })
    }
}

#[async_trait]
impl Verifier for Ed25519Verifier {
    async fn verify(&self, input: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
        let signature = ed25519_dalek::Signature::from_slice(signature)
            .map_err(|_| SignatureError::VerificationFailed)?;
        self.verifying_key
            .verify_strict(input, &signature)
            .map_err(|_| SignatureError::VerificationFailed)
    }
}

/// Key generation utilities
pub struct KeyGenerator;

impl KeyGenerator {
    /// Generate a new RSA key pair
    pub fn generate_rsa_keypair(bits: usize) -> Result<RsaPrivateKey, SignatureError> {
        let mut rng = rand::thread_rng();
        RsaPrivateKey::new(&mut rng, bits).map_err(SignatureError::RsaError)
    }

    /// Extract public key from private key
    pub fn extract_public_key(private_key: &RsaPrivateKey) -> RsaPublicKey {
        RsaPublicKey::from(private_key)
    }

    /// `/keys/<hex>` where `<hex>` is the first 16 bytes of SHA-256 over the PKCS#1 DER
    pub fn key_locator_name(public_key: &RsaPublicKey) -> Result<Name, SignatureError> {
        let key_der = public_key
            .to_pkcs1_der()
            .map_err(|e| SignatureError::KeyError(e.to_string()))?;
        let key_hash = Sha256::digest(key_der.as_bytes());

        Ok(Name::from_components(vec![
            NameComponent::generic("keys"),
            NameComponent::generic(hex::encode(&key_hash[..16])),
        ]))
    }
}
