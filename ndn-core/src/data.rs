use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::config::CodecConfig;
use crate::interest::Interest;
use crate::name::{Name, NameComponent};
use crate::packets::{tlv_types, FieldOrder, PacketError, WireCache};
use crate::signature::{Signable, SignatureError, SignatureInfo, Verifiable};
use crate::tlv::{Decodable, Decoder, Encodable, Encoder, Tlv};

/// ContentType of a Data packet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ContentType(pub u32);

impl ContentType {
    pub const BLOB: ContentType = ContentType(0);
    pub const LINK: ContentType = ContentType(1);
    pub const KEY: ContentType = ContentType(2);
    pub const NACK: ContentType = ContentType(3);
}

/// Data packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub name: Name,
    pub content_type: ContentType,
    pub freshness_period: Duration,
    pub final_block_id: Option<NameComponent>,
    /// `None` omits the Content element; `Some` of empty bytes writes `15 00`
    pub content: Option<Bytes>,
    pub sig_info: Option<SignatureInfo>,
    pub sig_value: Option<Bytes>,
    wire: WireCache<DecodedData>,
}

#[derive(Debug)]
struct DecodedData {
    fields: Data,
    /// The whole Data element
    wire: Bytes,
    /// Name through DataSignatureInfo
    signed_portion: Bytes,
}

impl Data {
    pub fn new(name: Name, content: impl Into<Bytes>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::without_content(name)
        }
    }

    /// A Data with no Content element
    pub fn without_content(name: Name) -> Self {
        Self {
            name,
            content_type: ContentType::BLOB,
            freshness_period: Duration::ZERO,
            final_block_id: None,
            content: None,
            sig_info: None,
            sig_value: None,
            wire: WireCache::default(),
        }
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn with_freshness_period(mut self, freshness_period: Duration) -> Self {
        self.freshness_period = freshness_period;
        self
    }

    pub fn with_final_block_id(mut self, final_block_id: NameComponent) -> Self {
        self.final_block_id = Some(final_block_id);
        self
    }

    pub fn is_signed(&self) -> bool {
        self.sig_info.is_some() && self.sig_value.is_some()
    }

    /// Content bytes; empty when the Content element is absent
    pub fn content_bytes(&self) -> Bytes {
        self.content.clone().unwrap_or_default()
    }

    /// True if the last Name component equals FinalBlockId
    pub fn is_final_block(&self) -> bool {
        match (&self.final_block_id, self.name.last()) {
            (Some(final_block_id), Some(last)) => final_block_id == last,
            _ => false,
        }
    }

    /// SHA-256 of the encoded packet
    pub fn compute_implicit_digest(&self) -> Result<[u8; 32], PacketError> {
        let wire = Encoder::encode(self)?;
        Ok(Sha256::digest(&wire).into())
    }

    /// Name with the implicit digest appended
    pub fn full_name(&self) -> Result<Name, PacketError> {
        let digest = self.compute_implicit_digest()?;
        Ok(self.name.append(NameComponent::new(
            tlv_types::IMPLICIT_SHA256_DIGEST_COMPONENT,
            Bytes::copy_from_slice(&digest),
        )))
    }

    /// Whether this Data satisfies `interest`
    pub fn can_satisfy(&self, interest: &Interest) -> Result<bool, PacketError> {
        if interest.must_be_fresh && self.freshness_period.is_zero() {
            return Ok(false);
        }

        let matches = if interest.can_be_prefix {
            interest.name.is_prefix_of(&self.name)
        } else {
            interest.name == self.name
        };
        if matches {
            return Ok(true);
        }

        let has_digest = interest
            .name
            .last()
            .is_some_and(|c| c.is_type(tlv_types::IMPLICIT_SHA256_DIGEST_COMPONENT));
        if has_digest && interest.name.len() == self.name.len() + 1 {
            return Ok(interest.name == self.full_name()?);
        }
        Ok(false)
    }

    /// Decode a Data from a complete wire buffer
    pub fn decode(wire: impl Into<Bytes>) -> Result<Self, PacketError> {
        let mut decoder = Decoder::new(wire);
        let tlv = decoder.read()?;
        decoder.finish()?;
        Self::decode_tlv_with(&tlv, &CodecConfig::default())
    }

    pub fn decode_tlv_with(tlv: &Tlv, config: &CodecConfig) -> Result<Self, PacketError> {
        tlv.expect_type(tlv_types::DATA)?;
        let value = tlv.value();
        let mut elements = tlv.nested();

        if elements.is_eof() {
            return Err(PacketError::MissingName);
        }
        let first = elements.read()?;
        if first.typ() != tlv_types::NAME {
            return Err(PacketError::MissingName);
        }
        let mut data = Data::without_content(Name::decode_tlv(&first)?);
        config.check_name(&data.name)?;

        let mut order = FieldOrder::default();
        order.check(1, tlv_types::NAME)?;
        let mut signed_end = None;
        while !elements.is_eof() {
            let element = elements.read()?;
            let typ = element.typ();
            match typ {
                tlv_types::META_INFO => {
                    order.check(2, typ)?;
                    data.decode_meta_info(&element)?;
                }
                tlv_types::CONTENT => {
                    order.check(3, typ)?;
                    data.content = Some(element.value());
                }
                tlv_types::DATA_SIGNATURE_INFO => {
                    order.check(4, typ)?;
                    data.sig_info = Some(SignatureInfo::decode_tlv(&element)?);
                    signed_end = Some(elements.position());
                }
                tlv_types::DATA_SIGNATURE_VALUE => {
                    order.check(5, typ)?;
                    data.sig_value = Some(element.value());
                }
                _ => element.skip_unrecognized()?,
            }
        }

        let Some(signed_end) = signed_end else {
            return Err(PacketError::MissingSignatureInfo);
        };
        if data.sig_value.is_none() {
            return Err(PacketError::MissingSignatureValue);
        }
        data.wire = WireCache::new(DecodedData {
            fields: data.clone(),
            wire: tlv.wire().clone(),
            signed_portion: value.slice(..signed_end),
        });
        Ok(data)
    }

    fn decode_meta_info(&mut self, tlv: &Tlv) -> Result<(), PacketError> {
        for element in tlv.nested() {
            let element = element?;
            match element.typ() {
                tlv_types::CONTENT_TYPE => {
                    self.content_type = ContentType(element.nni_max(u32::MAX as u64)? as u32);
                }
                tlv_types::FRESHNESS_PERIOD => {
                    self.freshness_period = Duration::from_millis(element.nni()?);
                }
                tlv_types::FINAL_BLOCK_ID => {
                    self.final_block_id = Some(element.nested().decode::<NameComponent>()?);
                }
                _ => element.skip_unrecognized()?,
            }
        }
        Ok(())
    }

    /// The received wire, if no field has changed since decoding
    fn unmodified_wire(&self) -> Option<&DecodedData> {
        self.wire.get().filter(|decoded| decoded.fields == *self)
    }

    fn has_meta_info(&self) -> bool {
        self.content_type != ContentType::BLOB
            || !self.freshness_period.is_zero()
            || self.final_block_id.is_some()
    }

    /// Name, MetaInfo, Content and DataSignatureInfo, encoded from the fields
    fn signed_portion(&self, sig_info: &SignatureInfo) -> Result<Bytes, PacketError> {
        let mut encoder = Encoder::new();
        self.name.encode_to(&mut encoder)?;
        if self.has_meta_info() {
            encoder.put_nested(tlv_types::META_INFO, |e| {
                if self.content_type != ContentType::BLOB {
                    e.put_nni(tlv_types::CONTENT_TYPE, self.content_type.0 as u64);
                }
                if !self.freshness_period.is_zero() {
                    e.put_nni(
                        tlv_types::FRESHNESS_PERIOD,
                        self.freshness_period.as_millis().min(u64::MAX as u128) as u64,
                    );
                }
                if let Some(final_block_id) = &self.final_block_id {
                    e.put_nested(tlv_types::FINAL_BLOCK_ID, |e| final_block_id.encode_to(e))?;
                }
                Ok::<(), PacketError>(())
            })?;
        }
        if let Some(content) = &self.content {
            encoder.put_tlv(tlv_types::CONTENT, content);
        }
        sig_info.encode_as(tlv_types::DATA_SIGNATURE_INFO, &mut encoder)?;
        Ok(encoder.finish())
    }
}

impl Decodable for Data {
    type Error = PacketError;

    fn decode_tlv(tlv: &Tlv) -> Result<Self, PacketError> {
        Self::decode_tlv_with(tlv, &CodecConfig::default())
    }
}

impl Encodable for Data {
    type Error = PacketError;

    fn encode_to(&self, encoder: &mut Encoder) -> Result<(), PacketError> {
        let (Some(sig_info), Some(sig_value)) = (&self.sig_info, &self.sig_value) else {
            return Err(PacketError::IllegalState(
                "Data must be signed before encoding".into(),
            ));
        };
        if let Some(decoded) = self.unmodified_wire() {
            encoder.put_raw(&decoded.wire);
            return Ok(());
        }

        let signed_portion = self.signed_portion(sig_info)?;
        encoder.put_nested(tlv_types::DATA, |e| {
            e.put_raw(&signed_portion);
            e.put_tlv(tlv_types::DATA_SIGNATURE_VALUE, sig_value);
            Ok::<(), PacketError>(())
        })
    }
}

impl Signable for Data {
    fn sig_info_mut(&mut self) -> &mut Option<SignatureInfo> {
        &mut self.sig_info
    }

    async fn ll_sign<F, Fut>(&mut self, sign: F) -> Result<(), PacketError>
    where
        F: FnOnce(Bytes) -> Fut,
        Fut: Future<Output = Result<Vec<u8>, SignatureError>>,
    {
        let sig_info = self.sig_info.as_ref().ok_or_else(|| {
            PacketError::IllegalState("SignatureInfo must be set before signing".into())
        })?;
        let input = self.signed_portion(sig_info)?;
        let sig_value = sign(input).await?;
        self.sig_value = Some(sig_value.into());
        Ok(())
    }
}

impl Verifiable for Data {
    fn sig_info(&self) -> Option<&SignatureInfo> {
        self.sig_info.as_ref()
    }

    async fn ll_verify<F, Fut>(&self, verify: F) -> Result<(), PacketError>
    where
        F: FnOnce(Bytes, Bytes) -> Fut,
        Fut: Future<Output = Result<(), SignatureError>>,
    {
        let sig_info = self
            .sig_info
            .as_ref()
            .ok_or(PacketError::MissingSignatureInfo)?;
        let sig_value = self
            .sig_value
            .clone()
            .ok_or(PacketError::MissingSignatureValue)?;

        let input = match self.unmodified_wire() {
            Some(decoded) => decoded.signed_portion.clone(),
            None => self.signed_portion(sig_info)?,
        };
        verify(input, sig_value).await?;
        Ok(())
    }
}
