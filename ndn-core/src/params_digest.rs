//! ParametersSha256DigestComponent handling for parameterized Interests.

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::interest::Interest;
use crate::name::NameComponent;
use crate::packets::{tlv_types, PacketError};
use crate::tlv::{Encodable, Encoder};

const DIGEST_LENGTH: usize = 32;

static ZEROS: [u8; DIGEST_LENGTH] = [0; DIGEST_LENGTH];

/// Constructors and predicates for ParamsDigest name components
pub struct ParamsDigest;

impl ParamsDigest {
    pub const TYPE: u32 = tlv_types::PARAMETERS_SHA256_DIGEST_COMPONENT;

    /// A position marker to be replaced by [`Interest::update_params_digest`].
    ///
    /// Only components created here are placeholders; a decoded all-zero
    /// digest is an ordinary value.
    pub fn placeholder() -> NameComponent {
        NameComponent::digest_placeholder(Self::TYPE)
    }

    pub fn create(digest: [u8; DIGEST_LENGTH]) -> NameComponent {
        NameComponent::new(Self::TYPE, Bytes::copy_from_slice(&digest))
    }

    pub fn is(component: &NameComponent) -> bool {
        component.is_type(Self::TYPE)
    }
}

impl Interest {
    /// Index of the ParamsDigest component in the Name
    pub fn params_digest_index(&self) -> Option<usize> {
        self.name.position(ParamsDigest::is)
    }

    /// SHA-256 over the Name with the ParamsDigest value zeroed, then
    /// AppParameters, then InterestSignatureInfo and InterestSignatureValue.
    ///
    /// A decoded Interest whose covered fields are unchanged is hashed over
    /// the bytes it was received as.
    pub fn compute_params_digest(&self) -> Result<[u8; DIGEST_LENGTH], PacketError> {
        let index = self
            .params_digest_index()
            .ok_or(PacketError::MissingParamsDigest)?;
        if let Some(input) = self.received_digest_input() {
            return Ok(Sha256::digest(input).into());
        }

        let zeroed = self
            .name
            .replace_at(index, NameComponent::new(ParamsDigest::TYPE, Bytes::from_static(&ZEROS)))
            .map_err(|e| PacketError::IllegalState(e.to_string()))?;

        let mut encoder = Encoder::new();
        zeroed.encode_to(&mut encoder)?;
        encoder.put_tlv(
            tlv_types::APPLICATION_PARAMETERS,
            self.app_parameters.as_deref().unwrap_or_default(),
        );
        if let Some(sig_info) = &self.sig_info {
            sig_info.encode_as(tlv_types::INTEREST_SIGNATURE_INFO, &mut encoder)?;
        }
        if let Some(sig_value) = &self.sig_value {
            encoder.put_tlv(tlv_types::INTEREST_SIGNATURE_VALUE, sig_value);
        }

        Ok(Sha256::digest(encoder.finish()).into())
    }

    /// Compute the ParamsDigest and store it in the Name.
    ///
    /// Appends a placeholder when the Name has no ParamsDigest, and sets
    /// empty AppParameters when none are present.
    pub fn update_params_digest(&mut self) -> Result<(), PacketError> {
        if self.params_digest_index().is_none() {
            self.name.push(ParamsDigest::placeholder());
        }
        if self.app_parameters.is_none() {
            self.app_parameters = Some(Bytes::new());
        }

        let digest = self.compute_params_digest()?;
        let index = self
            .params_digest_index()
            .ok_or(PacketError::MissingParamsDigest)?;
        self.name = self
            .name
            .replace_at(index, ParamsDigest::create(digest))
            .map_err(|e| PacketError::IllegalState(e.to_string()))?;
        log::debug!("updated ParamsDigest of {}", self.name);
        Ok(())
    }

    /// Check the stored ParamsDigest against the parameters it binds.
    ///
    /// An Interest without AppParameters has nothing to bind and passes.
    pub fn validate_params_digest(&self) -> Result<(), PacketError> {
        if self.app_parameters.is_none() {
            return Ok(());
        }
        let index = self
            .params_digest_index()
            .ok_or(PacketError::MissingParamsDigest)?;
        let stored = &self.name.components()[index];
        if stored.is_placeholder() {
            return Err(PacketError::IncorrectDigest);
        }

        let digest = self.compute_params_digest()?;
        if stored.value() != digest.as_slice() {
            return Err(PacketError::IncorrectDigest);
        }
        Ok(())
    }
}
