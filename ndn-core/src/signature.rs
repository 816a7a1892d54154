//! Signature metadata and the algorithm-agnostic signing protocol.
//!
//! A packet type implements [`Signable`] and [`Verifiable`]: it knows which
//! bytes are covered by its signature, but not how the signature is made.
//! Algorithms implement [`Signer`] and [`Verifier`] and are driven through
//! [`sign_packet`] and [`verify_packet`].

use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;

use crate::name::Name;
use crate::packets::{tlv_types, PacketError};
use crate::tlv::{Decodable, Encodable, Encoder, Tlv, TlvError};

/// Signature types defined by the NDN protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureType {
    /// SHA256 digest only (no key)
    DigestSha256,
    /// SHA256 with RSA signature
    Sha256WithRsa,
    /// SHA256 with ECDSA signature
    Sha256WithEcdsa,
    /// HMAC with SHA256
    HmacWithSha256,
    Ed25519,
    /// Placeholder for packets that are not meant to be verified
    Null,
    Other(u32),
}

impl SignatureType {
    pub fn code(self) -> u32 {
        match self {
            SignatureType::DigestSha256 => 0,
            SignatureType::Sha256WithRsa => 1,
            SignatureType::Sha256WithEcdsa => 3,
            SignatureType::HmacWithSha256 => 4,
            SignatureType::Ed25519 => 5,
            SignatureType::Null => 200,
            SignatureType::Other(code) => code,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            0 => SignatureType::DigestSha256,
            1 => SignatureType::Sha256WithRsa,
            3 => SignatureType::Sha256WithEcdsa,
            4 => SignatureType::HmacWithSha256,
            5 => SignatureType::Ed25519,
            200 => SignatureType::Null,
            code => SignatureType::Other(code),
        }
    }

    /// Get the signature algorithm name
    pub fn algorithm_name(&self) -> &'static str {
        match self {
            SignatureType::DigestSha256 => "SHA256",
            SignatureType::Sha256WithRsa => "SHA256withRSA",
            SignatureType::Sha256WithEcdsa => "SHA256withECDSA",
            SignatureType::HmacWithSha256 => "HMAC-SHA256",
            SignatureType::Ed25519 => "Ed25519",
            SignatureType::Null => "Null",
            SignatureType::Other(_) => "unknown",
        }
    }
}

/// Key locator for signatures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLocator {
    Name(Name),
    KeyDigest(Bytes),
}

impl Encodable for KeyLocator {
    type Error = TlvError;

    fn encode_to(&self, encoder: &mut Encoder) -> Result<(), TlvError> {
        encoder.put_nested(tlv_types::KEY_LOCATOR, |e| match self {
            KeyLocator::Name(name) => name.encode_to(e),
            KeyLocator::KeyDigest(digest) => {
                e.put_tlv(tlv_types::KEY_DIGEST, digest);
                Ok(())
            }
        })
    }
}

impl Decodable for KeyLocator {
    type Error = TlvError;

    fn decode_tlv(tlv: &Tlv) -> Result<Self, TlvError> {
        tlv.expect_type(tlv_types::KEY_LOCATOR)?;
        let mut inner = tlv.nested();
        let element = inner.read()?;
        match element.typ() {
            tlv_types::NAME => Ok(KeyLocator::Name(Name::decode_tlv(&element)?)),
            tlv_types::KEY_DIGEST => Ok(KeyLocator::KeyDigest(element.value())),
            typ => Err(TlvError::UnrecognizedCritical(typ)),
        }
    }
}

/// Certificate validity, bounded by two UTC timestamps in `YYYYMMDDThhmmss` form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityPeriod {
    pub not_before: String,
    pub not_after: String,
}

const TIMESTAMP_LENGTH: usize = 15;

fn is_timestamp(s: &str) -> bool {
    s.len() == TIMESTAMP_LENGTH
        && s.bytes()
            .enumerate()
            .all(|(i, b)| if i == 8 { b == b'T' } else { b.is_ascii_digit() })
}

impl ValidityPeriod {
    pub fn new(not_before: impl Into<String>, not_after: impl Into<String>) -> Self {
        Self {
            not_before: not_before.into(),
            not_after: not_after.into(),
        }
    }

    /// Whether `timestamp`, in the same form, lies within the period
    pub fn includes(&self, timestamp: &str) -> bool {
        self.not_before.as_str() <= timestamp && timestamp <= self.not_after.as_str()
    }

    fn decode_timestamp(tlv: &Tlv) -> Result<String, TlvError> {
        let text = String::from_utf8_lossy(tlv.value_slice()).into_owned();
        if !is_timestamp(&text) {
            return Err(TlvError::InvalidTimestamp(text));
        }
        Ok(text)
    }
}

impl Encodable for ValidityPeriod {
    type Error = TlvError;

    fn encode_to(&self, encoder: &mut Encoder) -> Result<(), TlvError> {
        for timestamp in [&self.not_before, &self.not_after] {
            if !is_timestamp(timestamp) {
                return Err(TlvError::InvalidTimestamp(timestamp.clone()));
            }
        }
        encoder.put_nested(tlv_types::VALIDITY_PERIOD, |e| {
            e.put_tlv(tlv_types::NOT_BEFORE, self.not_before.as_bytes());
            e.put_tlv(tlv_types::NOT_AFTER, self.not_after.as_bytes());
            Ok(())
        })
    }
}

impl Decodable for ValidityPeriod {
    type Error = TlvError;

    fn decode_tlv(tlv: &Tlv) -> Result<Self, TlvError> {
        tlv.expect_type(tlv_types::VALIDITY_PERIOD)?;
        let mut inner = tlv.nested();
        let not_before = inner.read()?;
        not_before.expect_type(tlv_types::NOT_BEFORE)?;
        let not_after = inner.read()?;
        not_after.expect_type(tlv_types::NOT_AFTER)?;
        inner.finish()?;

        Ok(Self {
            not_before: Self::decode_timestamp(&not_before)?,
            not_after: Self::decode_timestamp(&not_after)?,
        })
    }
}

/// Signature information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    pub sig_type: SignatureType,
    pub key_locator: Option<KeyLocator>,
    /// Carried by certificates
    pub validity: Option<ValidityPeriod>,
    /// SignatureNonce, used by signed Interests
    pub nonce: Option<Bytes>,
    /// SignatureTime in milliseconds since the Unix epoch
    pub time: Option<u64>,
    pub seq_num: Option<u64>,
}

impl SignatureInfo {
    pub fn new(sig_type: SignatureType) -> Self {
        Self {
            sig_type,
            key_locator: None,
            validity: None,
            nonce: None,
            time: None,
            seq_num: None,
        }
    }

    pub fn with_key_locator(mut self, key_locator: KeyLocator) -> Self {
        self.key_locator = Some(key_locator);
        self
    }

    pub fn with_validity(mut self, validity: ValidityPeriod) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<Bytes>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_time(mut self, time: u64) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_seq_num(mut self, seq_num: u64) -> Self {
        self.seq_num = Some(seq_num);
        self
    }

    /// Encode as DataSignatureInfo or InterestSignatureInfo
    pub fn encode_as(&self, typ: u32, encoder: &mut Encoder) -> Result<(), TlvError> {
        encoder.put_nested(typ, |e| {
            e.put_nni(tlv_types::SIGNATURE_TYPE, self.sig_type.code() as u64);
            if let Some(key_locator) = &self.key_locator {
                key_locator.encode_to(e)?;
            }
            if let Some(validity) = &self.validity {
                validity.encode_to(e)?;
            }
            if let Some(nonce) = &self.nonce {
                e.put_tlv(tlv_types::SIGNATURE_NONCE, nonce);
            }
            if let Some(time) = self.time {
                e.put_nni(tlv_types::SIGNATURE_TIME, time);
            }
            if let Some(seq_num) = self.seq_num {
                e.put_nni(tlv_types::SIGNATURE_SEQ_NUM, seq_num);
            }
            Ok(())
        })
    }
}

impl Decodable for SignatureInfo {
    type Error = TlvError;

    /// Decode the TLV-VALUE of a DataSignatureInfo or InterestSignatureInfo
    fn decode_tlv(tlv: &Tlv) -> Result<Self, TlvError> {
        let mut inner = tlv.nested();
        let sig_type = inner.read()?;
        sig_type.expect_type(tlv_types::SIGNATURE_TYPE)?;
        let mut info = SignatureInfo::new(SignatureType::from_code(
            sig_type.nni_max(u32::MAX as u64)? as u32,
        ));

        for element in inner {
            let element = element?;
            match element.typ() {
                tlv_types::KEY_LOCATOR => {
                    info.key_locator = Some(KeyLocator::decode_tlv(&element)?);
                }
                tlv_types::VALIDITY_PERIOD => {
                    info.validity = Some(ValidityPeriod::decode_tlv(&element)?);
                }
                tlv_types::SIGNATURE_NONCE => info.nonce = Some(element.value()),
                tlv_types::SIGNATURE_TIME => info.time = Some(element.nni()?),
                tlv_types::SIGNATURE_SEQ_NUM => info.seq_num = Some(element.nni()?),
                _ => element.skip_unrecognized()?,
            }
        }
        Ok(info)
    }
}

/// Errors that can occur during signature operations
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("incorrect signature value")]
    VerificationFailed,
    #[error("Unsupported signature type: {0:?}")]
    UnsupportedSignatureType(SignatureType),
    #[error("Key error: {0}")]
    KeyError(String),
    #[error("Signing failed: {0}")]
    SigningFailed(String),
    #[error("RSA error: {0}")]
    RsaError(#[from] rsa::Error),
}

/// A packet that can be signed by a pluggable algorithm.
///
/// `ll_sign` computes the signed portion, hands it to `sign`, and stores the
/// returned bytes as SignatureValue. The SignatureInfo must be set first.
/// Calls on one packet must not overlap.
#[allow(async_fn_in_trait)]
pub trait Signable {
    fn sig_info_mut(&mut self) -> &mut Option<SignatureInfo>;

    async fn ll_sign<F, Fut>(&mut self, sign: F) -> Result<(), PacketError>
    where
        F: FnOnce(Bytes) -> Fut,
        Fut: Future<Output = Result<Vec<u8>, SignatureError>>;
}

/// A packet whose signature can be checked by a pluggable algorithm.
///
/// `ll_verify` recomputes the signed portion and hands it, with the stored
/// SignatureValue, to `verify`. It performs no comparison itself; an error
/// from `verify` is the rejection.
#[allow(async_fn_in_trait)]
pub trait Verifiable {
    fn sig_info(&self) -> Option<&SignatureInfo>;

    async fn ll_verify<F, Fut>(&self, verify: F) -> Result<(), PacketError>
    where
        F: FnOnce(Bytes, Bytes) -> Fut,
        Fut: Future<Output = Result<(), SignatureError>>;
}

/// A signing algorithm bound to a private key
#[async_trait]
pub trait Signer: Send + Sync {
    fn signature_type(&self) -> SignatureType;

    fn key_locator(&self) -> Option<KeyLocator> {
        None
    }

    async fn sign(&self, input: &[u8]) -> Result<Vec<u8>, SignatureError>;
}

/// A verification algorithm bound to a public key
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Succeed only if `signature` is valid for `input`
    async fn verify(&self, input: &[u8], signature: &[u8]) -> Result<(), SignatureError>;
}

/// Sign `packet` with `signer`.
///
/// SignatureType and KeyLocator are taken from the signer; other
/// SignatureInfo fields already on the packet are kept.
pub async fn sign_packet<P, S>(packet: &mut P, signer: &S) -> Result<(), PacketError>
where
    P: Signable,
    S: Signer + ?Sized,
{
    let sig_type = signer.signature_type();
    let info = packet
        .sig_info_mut()
        .get_or_insert_with(|| SignatureInfo::new(sig_type));
    info.sig_type = sig_type;
    info.key_locator = signer.key_locator();

    packet
        .ll_sign(|input| async move { signer.sign(&input).await })
        .await
}

/// Verify `packet` with `verifier`
pub async fn verify_packet<P, V>(packet: &P, verifier: &V) -> Result<(), PacketError>
where
    P: Verifiable,
    V: Verifier + ?Sized,
{
    let result = packet
        .ll_verify(|input, signature| async move { verifier.verify(&input, &signature).await })
        .await;
    if let Err(e) = &result {
        log::warn!("signature verification failed: {}", e);
    }
    result
}
