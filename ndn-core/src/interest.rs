use std::future::Future;
use std::time::Duration;

use bytes::{Bytes, BytesMut};

use crate::config::CodecConfig;
use crate::name::Name;
use crate::packets::{tlv_types, FieldOrder, PacketError, WireCache};
use crate::params_digest::ParamsDigest;
use crate::signature::{Signable, SignatureError, SignatureInfo, Verifiable};
use crate::tlv::{Decodable, Decoder, Encodable, Encoder, Tlv, TlvError};

pub const DEFAULT_LIFETIME: Duration = Duration::from_millis(4000);
pub const DEFAULT_HOP_LIMIT: u8 = 255;

const NONCE_LENGTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegation {
    pub preference: u64,
    pub name: Name,
}

/// Names of regions where the requested Data may be found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FwHint {
    pub delegations: Vec<Delegation>,
}

impl FwHint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delegation(mut self, preference: u64, name: Name) -> Self {
        self.delegations.push(Delegation { preference, name });
        self
    }
}

impl Encodable for FwHint {
    type Error = TlvError;

    fn encode_to(&self, encoder: &mut Encoder) -> Result<(), TlvError> {
        encoder.put_nested(tlv_types::FORWARDING_HINT, |e| {
            for delegation in &self.delegations {
                e.put_nested(tlv_types::DELEGATION, |e| {
                    delegation.name.encode_to(e)?;
                    e.put_nni(tlv_types::PREFERENCE, delegation.preference);
                    Ok(())
                })?;
            }
            Ok(())
        })
    }
}

impl Decodable for FwHint {
    type Error = TlvError;

    fn decode_tlv(tlv: &Tlv) -> Result<Self, TlvError> {
        let mut hint = FwHint::new();
        for element in tlv.nested() {
            let element = element?;
            if element.typ() != tlv_types::DELEGATION {
                element.skip_unrecognized()?;
                continue;
            }

            let mut name = None;
            let mut preference = 0;
            for field in element.nested() {
                let field = field?;
                match field.typ() {
                    tlv_types::NAME => name = Some(Name::decode_tlv(&field)?),
                    tlv_types::PREFERENCE => preference = field.nni()?,
                    _ => field.skip_unrecognized()?,
                }
            }
            let name = name.ok_or(TlvError::UnexpectedType {
                expected: tlv_types::NAME,
                actual: tlv_types::DELEGATION,
            })?;
            hint.delegations.push(Delegation { preference, name });
        }
        Ok(hint)
    }
}

/// Interest packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    pub name: Name,
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
    pub fw_hint: Option<FwHint>,
    /// Generated at random on encoding when unset
    pub nonce: Option<u32>,
    pub lifetime: Duration,
    pub hop_limit: u8,
    pub app_parameters: Option<Bytes>,
    pub sig_info: Option<SignatureInfo>,
    pub sig_value: Option<Bytes>,
    wire: WireCache<DecodedInterest>,
}

#[derive(Debug)]
struct DecodedInterest {
    fields: Interest,
    /// The whole Interest element
    wire: Bytes,
    /// Name components except ParamsDigest, then AppParameters through InterestSignatureInfo
    signed_portion: Option<Bytes>,
    /// Name with the ParamsDigest value zeroed, then AppParameters through the
    /// last signature element
    digest_input: Option<Bytes>,
}

/// Name components other than ParamsDigest, as received
fn components_except_digest(name: &Tlv, out: &mut BytesMut) -> Result<(), TlvError> {
    for component in name.nested() {
        let component = component?;
        if component.typ() != ParamsDigest::TYPE {
            out.extend_from_slice(component.wire());
        }
    }
    Ok(())
}

/// The Name element as received, with the ParamsDigest value zeroed
fn name_with_zeroed_digest(name: &Tlv, out: &mut BytesMut) -> Result<(), TlvError> {
    let start = out.len() + name.wire().len() - name.length();
    out.extend_from_slice(name.wire());

    let mut components = name.nested();
    while !components.is_eof() {
        let offset = components.position();
        let component = components.read()?;
        if component.typ() == ParamsDigest::TYPE {
            let value_start = start + offset + component.wire().len() - component.length();
            out[value_start..value_start + component.length()].fill(0);
        }
    }
    Ok(())
}

impl Interest {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            can_be_prefix: false,
            must_be_fresh: false,
            fw_hint: None,
            nonce: None,
            lifetime: DEFAULT_LIFETIME,
            hop_limit: DEFAULT_HOP_LIMIT,
            app_parameters: None,
            sig_info: None,
            sig_value: None,
            wire: WireCache::default(),
        }
    }

    pub fn with_can_be_prefix(mut self, can_be_prefix: bool) -> Self {
        self.can_be_prefix = can_be_prefix;
        self
    }

    pub fn with_must_be_fresh(mut self, must_be_fresh: bool) -> Self {
        self.must_be_fresh = must_be_fresh;
        self
    }

    pub fn with_fw_hint(mut self, fw_hint: FwHint) -> Self {
        self.fw_hint = Some(fw_hint);
        self
    }

    pub fn with_nonce(mut self, nonce: u32) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_hop_limit(mut self, hop_limit: u8) -> Self {
        self.hop_limit = hop_limit;
        self
    }

    /// Set AppParameters; the Name still needs a ParamsDigest before encoding
    pub fn with_app_parameters(mut self, app_parameters: impl Into<Bytes>) -> Self {
        self.app_parameters = Some(app_parameters.into());
        self
    }

    pub fn with_sig_info(mut self, sig_info: SignatureInfo) -> Self {
        self.sig_info = Some(sig_info);
        self
    }

    pub fn is_signed(&self) -> bool {
        self.sig_info.is_some() && self.sig_value.is_some()
    }

    /// Decode an Interest from a complete wire buffer
    pub fn decode(wire: impl Into<Bytes>) -> Result<Self, PacketError> {
        let mut decoder = Decoder::new(wire);
        let tlv = decoder.read()?;
        decoder.finish()?;
        Self::decode_tlv_with(&tlv, &CodecConfig::default())
    }

    pub fn decode_tlv_with(tlv: &Tlv, config: &CodecConfig) -> Result<Self, PacketError> {
        tlv.expect_type(tlv_types::INTEREST)?;
        let value = tlv.value();
        let mut elements = tlv.nested();

        if elements.is_eof() {
            return Err(PacketError::MissingName);
        }
        let first = elements.read()?;
        if first.typ() != tlv_types::NAME {
            return Err(PacketError::MissingName);
        }
        let mut interest = Interest::new(Name::decode_tlv(&first)?);
        config.check_name(&interest.name)?;

        let mut order = FieldOrder::default();
        order.check(1, tlv_types::NAME)?;
        // offsets within the Interest TLV-VALUE
        let mut params_range = None;
        let mut sig_info_end = None;
        let mut sig_value_end = None;
        while !elements.is_eof() {
            let start = elements.position();
            let element = elements.read()?;
            let typ = element.typ();
            match typ {
                tlv_types::NAME => return Err(PacketError::OutOfPlace("Name".into())),
                tlv_types::CAN_BE_PREFIX => {
                    order.check(2, typ)?;
                    interest.can_be_prefix = true;
                }
                tlv_types::MUST_BE_FRESH => {
                    order.check(3, typ)?;
                    interest.must_be_fresh = true;
                }
                tlv_types::FORWARDING_HINT => {
                    order.check(4, typ)?;
                    interest.fw_hint = Some(FwHint::decode_tlv(&element)?);
                }
                tlv_types::NONCE => {
                    order.check(5, typ)?;
                    let value: [u8; NONCE_LENGTH] =
                        element.value_slice().try_into().map_err(|_| {
                            TlvError::ValueLengthMismatch {
                                expected: NONCE_LENGTH,
                                actual: element.length(),
                            }
                        })?;
                    interest.nonce = Some(u32::from_be_bytes(value));
                }
                tlv_types::INTEREST_LIFETIME => {
                    order.check(6, typ)?;
                    interest.lifetime = Duration::from_millis(element.nni()?);
                }
                tlv_types::HOP_LIMIT => {
                    order.check(7, typ)?;
                    match element.value_slice() {
                        [hop_limit] => interest.hop_limit = *hop_limit,
                        _ => {
                            return Err(TlvError::ValueLengthMismatch {
                                expected: 1,
                                actual: element.length(),
                            }
                            .into())
                        }
                    }
                }
                tlv_types::APPLICATION_PARAMETERS => {
                    order.check(8, typ)?;
                    interest.app_parameters = Some(element.value());
                    params_range = Some((start, elements.position()));
                }
                tlv_types::INTEREST_SIGNATURE_INFO => {
                    order.check(9, typ)?;
                    interest.sig_info = Some(SignatureInfo::decode_tlv(&element)?);
                    sig_info_end = Some(elements.position());
                }
                tlv_types::INTEREST_SIGNATURE_VALUE => {
                    order.check(10, typ)?;
                    interest.sig_value = Some(element.value());
                    sig_value_end = Some(elements.position());
                }
                _ => element.skip_unrecognized()?,
            }
        }

        interest.check_structure()?;

        let mut decoded = DecodedInterest {
            fields: interest.clone(),
            wire: tlv.wire().clone(),
            signed_portion: None,
            digest_input: None,
        };
        if let Some((params_start, params_end)) = params_range {
            if let Some(sig_info_end) = sig_info_end {
                let mut signed = BytesMut::new();
                components_except_digest(&first, &mut signed)?;
                signed.extend_from_slice(&value[params_start..sig_info_end]);
                decoded.signed_portion = Some(signed.freeze());
            }

            let end = sig_value_end.or(sig_info_end).unwrap_or(params_end);
            let mut digest_input = BytesMut::new();
            name_with_zeroed_digest(&first, &mut digest_input)?;
            digest_input.extend_from_slice(&value[params_start..end]);
            decoded.digest_input = Some(digest_input.freeze());
        }
        interest.wire = WireCache::new(decoded);
        Ok(interest)
    }

    /// The received wire, if the fields it covers are unchanged since decoding
    fn unmodified_wire(&self) -> Option<&DecodedInterest> {
        self.wire.get().filter(|decoded| {
            let fields = &decoded.fields;
            fields.name == self.name
                && fields.app_parameters == self.app_parameters
                && fields.sig_info == self.sig_info
                && fields.sig_value == self.sig_value
        })
    }

    /// ParamsDigest input as received, if still valid for the current fields
    pub(crate) fn received_digest_input(&self) -> Option<Bytes> {
        self.unmodified_wire()?.digest_input.clone()
    }

    /// Relations between Name, AppParameters and the signature fields
    fn check_structure(&self) -> Result<(), PacketError> {
        let digest_index = self.params_digest_index();
        match (digest_index, &self.app_parameters) {
            (Some(_), None) => return Err(PacketError::MissingAppParameters),
            (None, Some(_)) => return Err(PacketError::MissingParamsDigest),
            _ => {}
        }

        match (&self.sig_info, &self.sig_value) {
            (None, None) => return Ok(()),
            (None, Some(_)) => return Err(PacketError::MissingSignatureInfo),
            (Some(_), None) => return Err(PacketError::MissingSignatureValue),
            (Some(_), Some(_)) => {}
        }
        match digest_index {
            None => Err(PacketError::MissingAppParameters),
            Some(index) if index + 1 != self.name.len() => {
                Err(PacketError::OutOfPlace("ParamsDigest".into()))
            }
            Some(_) => Ok(()),
        }
    }

    /// Name components except ParamsDigest, then AppParameters and
    /// InterestSignatureInfo, encoded from the fields
    fn signed_portion(&self, sig_info: &SignatureInfo) -> Result<Bytes, PacketError> {
        let mut encoder = Encoder::new();
        for component in self.name.components() {
            if !ParamsDigest::is(component) {
                component.encode_to(&mut encoder)?;
            }
        }
        encoder.put_tlv(
            tlv_types::APPLICATION_PARAMETERS,
            self.app_parameters.as_deref().unwrap_or_default(),
        );
        sig_info.encode_as(tlv_types::INTEREST_SIGNATURE_INFO, &mut encoder)?;
        Ok(encoder.finish())
    }

    fn check_digest_last(&self) -> Result<(), PacketError> {
        match self.params_digest_index() {
            Some(index) if index + 1 != self.name.len() => {
                Err(PacketError::OutOfPlace("ParamsDigest".into()))
            }
            _ => Ok(()),
        }
    }
}

impl Decodable for Interest {
    type Error = PacketError;

    fn decode_tlv(tlv: &Tlv) -> Result<Self, PacketError> {
        Self::decode_tlv_with(tlv, &CodecConfig::default())
    }
}

impl Encodable for Interest {
    type Error = PacketError;

    fn encode_to(&self, encoder: &mut Encoder) -> Result<(), PacketError> {
        if self.name.is_empty() {
            return Err(PacketError::IllegalState("Interest has no Name".into()));
        }
        if self.name.components().iter().any(|c| c.is_placeholder()) {
            return Err(PacketError::IllegalState(
                "ParamsDigest placeholder must be resolved before encoding".into(),
            ));
        }
        self.check_structure()?;
        if let Some(decoded) = self.unmodified_wire() {
            if self.nonce.is_some() && decoded.fields == *self {
                encoder.put_raw(&decoded.wire);
                return Ok(());
            }
        }

        encoder.put_nested(tlv_types::INTEREST, |e| {
            self.name.encode_to(e)?;
            if self.can_be_prefix {
                e.put_empty(tlv_types::CAN_BE_PREFIX);
            }
            if self.must_be_fresh {
                e.put_empty(tlv_types::MUST_BE_FRESH);
            }
            if let Some(fw_hint) = &self.fw_hint {
                fw_hint.encode_to(e)?;
            }
            let nonce = self.nonce.unwrap_or_else(rand::random);
            e.put_tlv(tlv_types::NONCE, &nonce.to_be_bytes());
            if self.lifetime != DEFAULT_LIFETIME {
                e.put_nni(
                    tlv_types::INTEREST_LIFETIME,
                    self.lifetime.as_millis().min(u64::MAX as u128) as u64,
                );
            }
            if self.hop_limit != DEFAULT_HOP_LIMIT {
                e.put_tlv(tlv_types::HOP_LIMIT, &[self.hop_limit]);
            }
            if let Some(app_parameters) = &self.app_parameters {
                e.put_tlv(tlv_types::APPLICATION_PARAMETERS, app_parameters);
            }
            if let (Some(sig_info), Some(sig_value)) = (&self.sig_info, &self.sig_value) {
                sig_info.encode_as(tlv_types::INTEREST_SIGNATURE_INFO, e)?;
                e.put_tlv(tlv_types::INTEREST_SIGNATURE_VALUE, sig_value);
            }
            Ok::<(), PacketError>(())
        })
    }
}

impl Signable for Interest {
    fn sig_info_mut(&mut self) -> &mut Option<SignatureInfo> {
        &mut self.sig_info
    }

    /// Sign, then finalize the ParamsDigest over the new signature.
    ///
    /// A ParamsDigest and empty AppParameters are added when the Interest has
    /// none. The Interest is left untouched if signing fails.
    async fn ll_sign<F, Fut>(&mut self, sign: F) -> Result<(), PacketError>
    where
        F: FnOnce(Bytes) -> Fut,
        Fut: Future<Output = Result<Vec<u8>, SignatureError>>,
    {
        let sig_info = self.sig_info.clone().ok_or_else(|| {
            PacketError::IllegalState("SignatureInfo must be set before signing".into())
        })?;
        self.check_digest_last()?;

        let mut signed = self.clone();
        signed.wire = WireCache::default();
        if signed.params_digest_index().is_none() {
            signed.name.push(ParamsDigest::placeholder());
        }
        if signed.app_parameters.is_none() {
            signed.app_parameters = Some(Bytes::new());
        }

        let input = signed.signed_portion(&sig_info)?;
        let sig_value = sign(input).await?;
        signed.sig_value = Some(sig_value.into());
        signed.update_params_digest()?;
        *self = signed;
        Ok(())
    }
}

impl Verifiable for Interest {
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
        self.check_digest_last()?;
        self.validate_params_digest()?;

        let input = match self.unmodified_wire().and_then(|d| d.signed_portion.clone()) {
            Some(input) => input,
            None => self.signed_portion(sig_info)?,
        };
        verify(input, sig_value).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::NameComponent;
    use crate::signature::SignatureType;
    use sha2::{Digest, Sha256};

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    #[test]
    fn test_minimal_interest() {
        let wire = Encoder::encode(&Interest::new(name("/A"))).unwrap();
        assert_eq!(wire.len(), 13);
        assert_eq!(&wire[..9], &[0x05, 0x0B, 0x07, 0x03, 0x08, 0x01, 0x41, 0x0A, 0x04]);

        let interest = Interest::decode(wire).unwrap();
        assert_eq!(interest.name, name("/A"));
        assert!(!interest.can_be_prefix);
        assert!(!interest.must_be_fresh);
        assert!(interest.fw_hint.is_none());
        assert!(interest.nonce.is_some());
        assert_eq!(interest.lifetime, DEFAULT_LIFETIME);
        assert_eq!(interest.hop_limit, 255);
    }

    #[test]
    fn test_interest_fields_roundtrip() {
        let interest = Interest::new(name("/A"))
            .with_can_be_prefix(true)
            .with_must_be_fresh(true)
            .with_fw_hint(FwHint::new().with_delegation(33, name("/FH")))
            .with_nonce(0x85AC8579)
            .with_lifetime(Duration::from_millis(8198))
            .with_hop_limit(5);

        let wire = Encoder::encode(&interest).unwrap();
        assert_eq!(
            wire.as_ref(),
            &[
                0x05, 0x23, // Interest
                0x07, 0x03, 0x08, 0x01, 0x41, // Name
                0x21, 0x00, // CanBePrefix
                0x12, 0x00, // MustBeFresh
                0x1E, 0x0B, 0x1F, 0x09, 0x07, 0x04, 0x08, 0x02, 0x46, 0x48, 0x1E, 0x01,
                0x21, // ForwardingHint
                0x0A, 0x04, 0x85, 0xAC, 0x85, 0x79, // Nonce
                0x0C, 0x02, 0x20, 0x06, // InterestLifetime
                0x22, 0x01, 0x05, // HopLimit
            ][..]
        );
        assert_eq!(Interest::decode(wire).unwrap(), interest);
    }

    #[test]
    fn test_missing_name() {
        let err = Interest::decode(vec![0x05, 0x00]).unwrap_err();
        assert!(matches!(err, PacketError::MissingName));

        let err = Interest::decode(vec![0x05, 0x02, 0x21, 0x00]).unwrap_err();
        assert!(matches!(err, PacketError::MissingName));
    }

    #[test]
    fn test_field_out_of_order() {
        // MustBeFresh before CanBePrefix
        let wire = vec![0x05, 0x09, 0x07, 0x03, 0x08, 0x01, 0x41, 0x12, 0x00, 0x21, 0x00];
        let err = Interest::decode(wire).unwrap_err();
        assert!(matches!(err, PacketError::OutOfPlace(_)));
        assert!(err.to_string().contains("out of place"));
    }

    #[test]
    fn test_invalid_nonce_and_hop_limit() {
        let wire = vec![0x05, 0x08, 0x07, 0x03, 0x08, 0x01, 0x41, 0x0A, 0x01, 0x01];
        assert!(matches!(
            Interest::decode(wire),
            Err(PacketError::Decode(TlvError::ValueLengthMismatch { expected: 4, actual: 1 }))
        ));

        let wire = vec![0x05, 0x09, 0x07, 0x03, 0x08, 0x01, 0x41, 0x22, 0x02, 0x01, 0x01];
        assert!(Interest::decode(wire).is_err());
    }

    #[test]
    fn test_unknown_fields() {
        // non-critical 0xF0 is skipped
        let wire = vec![0x05, 0x08, 0x07, 0x03, 0x08, 0x01, 0x41, 0xF0, 0x01, 0x00];
        assert_eq!(Interest::decode(wire).unwrap().name, name("/A"));

        let wire = vec![0x05, 0x08, 0x07, 0x03, 0x08, 0x01, 0x41, 0xF1, 0x01, 0x00];
        assert!(matches!(
            Interest::decode(wire),
            Err(PacketError::Decode(TlvError::UnrecognizedCritical(0xF1)))
        ));
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = Encoder::encode(&Interest::new(Name::new())).unwrap_err();
        assert!(matches!(err, PacketError::IllegalState(_)));
    }

    #[test]
    fn test_placeholder_guard() {
        let interest = Interest::new(name("/A").append(ParamsDigest::placeholder()))
            .with_app_parameters(vec![0xC0]);
        let mut encoder = Encoder::new();
        let err = interest.encode_to(&mut encoder).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ParamsDigest placeholder must be resolved before encoding"
        );
        assert!(encoder.is_empty());
    }

    #[test]
    fn test_structure_on_encode() {
        let interest = Interest::new(name("/A")).with_app_parameters(vec![0xC0]);
        assert!(matches!(
            Encoder::encode(&interest),
            Err(PacketError::MissingParamsDigest)
        ));

        let interest = Interest::new(name("/A").append(ParamsDigest::create([1; 32])));
        assert!(matches!(
            Encoder::encode(&interest),
            Err(PacketError::MissingAppParameters)
        ));
    }

    #[test]
    fn test_parameterized_roundtrip() {
        let mut interest = Interest::new(
            name("/A")
                .append(ParamsDigest::placeholder())
                .append(NameComponent::generic("C")),
        )
        .with_app_parameters(vec![0xC0, 0xC1]);
        interest.update_params_digest().unwrap();
        interest.validate_params_digest().unwrap();

        let wire = Encoder::encode(&interest).unwrap();
        let decoded = Interest::decode(wire).unwrap();
        assert_eq!(decoded.name.len(), 3);
        assert!(decoded.name.get(1).unwrap().is_type(ParamsDigest::TYPE));
        assert_eq!(decoded.app_parameters.as_deref(), Some(&[0xC0, 0xC1][..]));
        assert!(decoded.validate_params_digest().is_ok());
    }

    #[tokio::test]
    async fn test_sign_appends_params_digest() {
        let mut interest = Interest::new(name("/A"))
            .with_sig_info(SignatureInfo::new(SignatureType::Null));
        let mut seen = Bytes::new();
        interest
            .ll_sign(|input| {
                seen = input;
                async { Ok(vec![0xA0, 0xA1]) }
            })
            .await
            .unwrap();

        // /A plus AppParameters plus InterestSignatureInfo
        assert_eq!(
            seen.as_ref(),
            &[0x08, 0x01, 0x41, 0x24, 0x00, 0x2C, 0x03, 0x1B, 0x01, 0xC8][..]
        );
        assert_eq!(interest.name.len(), 2);
        assert!(!interest.name.get(1).unwrap().is_placeholder());
        assert_eq!(interest.sig_value.as_deref(), Some(&[0xA0, 0xA1][..]));
        assert!(interest.validate_params_digest().is_ok());

        let decoded = Interest::decode(Encoder::encode(&interest).unwrap()).unwrap();
        assert!(decoded.is_signed());
        decoded
            .ll_verify(|input, sig_value| async move {
                assert_eq!(input, seen);
                assert_eq!(sig_value.as_ref(), &[0xA0, 0xA1]);
                Ok(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sign_out_of_place_digest() {
        let mut interest = Interest::new(
            name("/A")
                .append(ParamsDigest::placeholder())
                .append(NameComponent::generic("C")),
        )
        .with_app_parameters(vec![0xC0])
        .with_sig_info(SignatureInfo::new(SignatureType::Null));

        let mut called = false;
        let err = interest
            .ll_sign(|_| {
                called = true;
                async { Ok(vec![]) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PacketError::OutOfPlace(_)));
        assert!(!called);
    }

    #[tokio::test]
    async fn test_sign_requires_sig_info() {
        let mut interest = Interest::new(name("/A"));
        let err = interest
            .ll_sign(|_| async { Ok(vec![]) })
            .await
            .unwrap_err();
        assert!(matches!(err, PacketError::IllegalState(_)));
    }

    #[tokio::test]
    async fn test_verify_unsigned() {
        let interest = Interest::new(name("/A"));
        let mut called = false;
        let err = interest
            .ll_verify(|_, _| {
                called = true;
                async { Ok(()) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PacketError::MissingSignatureInfo));
        assert!(!called);
    }

    #[tokio::test]
    async fn test_verify_checks_params_digest() {
        let mut interest = Interest::new(name("/A"))
            .with_sig_info(SignatureInfo::new(SignatureType::Null));
        interest
            .ll_sign(|_| async { Ok(vec![0xA0]) })
            .await
            .unwrap();
        interest.app_parameters = Some(Bytes::from_static(&[0xC0]));

        let err = interest
            .ll_verify(|_, _| async { Ok(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, PacketError::IncorrectDigest));
    }

    #[test]
    fn test_signed_structure_on_decode() {
        // Name, SigInfo then AppParameters
        let mut encoder = Encoder::new();
        encoder
            .put_nested(tlv_types::INTEREST, |e| {
                name("/A").append(ParamsDigest::create([1; 32])).encode_to(e)?;
                SignatureInfo::new(SignatureType::Null)
                    .encode_as(tlv_types::INTEREST_SIGNATURE_INFO, e)?;
                e.put_tlv(tlv_types::APPLICATION_PARAMETERS, &[0xC0]);
                e.put_tlv(tlv_types::INTEREST_SIGNATURE_VALUE, &[0xA0]);
                Ok::<(), TlvError>(())
            })
            .unwrap();
        let err = Interest::decode(encoder.finish()).unwrap_err();
        assert!(err.to_string().contains("out of place"));

        // SigValue without SigInfo
        let mut encoder = Encoder::new();
        encoder
            .put_nested(tlv_types::INTEREST, |e| {
                name("/A").append(ParamsDigest::create([1; 32])).encode_to(e)?;
                e.put_tlv(tlv_types::APPLICATION_PARAMETERS, &[0xC0]);
                e.put_tlv(tlv_types::INTEREST_SIGNATURE_VALUE, &[0xA0]);
                Ok::<(), TlvError>(())
            })
            .unwrap();
        assert!(matches!(
            Interest::decode(encoder.finish()),
            Err(PacketError::MissingSignatureInfo)
        ));
    }

    #[test]
    fn test_signed_digest_not_last_on_decode() {
        let mut encoder = Encoder::new();
        encoder
            .put_nested(tlv_types::INTEREST, |e| {
                name("/A")
                    .append(ParamsDigest::create([1; 32]))
                    .append(NameComponent::generic("C"))
                    .encode_to(e)?;
                e.put_tlv(tlv_types::APPLICATION_PARAMETERS, &[0xC0]);
                SignatureInfo::new(SignatureType::Null)
                    .encode_as(tlv_types::INTEREST_SIGNATURE_INFO, e)?;
                e.put_tlv(tlv_types::INTEREST_SIGNATURE_VALUE, &[0xA0]);
                Ok::<(), TlvError>(())
            })
            .unwrap();
        let err = Interest::decode(encoder.finish()).unwrap_err();
        assert!(matches!(err, PacketError::OutOfPlace(_)));
        assert_eq!(err.to_string(), "ParamsDigest out of place");
    }

    #[tokio::test]
    async fn test_received_wire_is_verified() {
        // SignatureType 200 as a two-octet NNI
        let sig_info = [0x2C, 0x04, 0x1B, 0x02, 0x00, 0xC8];
        let tail = [&[0x24, 0x01, 0xC0][..], &sig_info[..], &[0x2E, 0x01, 0xA0][..]].concat();
        let zeroed = Encoder::encode(&name("/A").append(ParamsDigest::create([0; 32]))).unwrap();
        let digest: [u8; 32] = Sha256::digest([&zeroed[..], &tail[..]].concat()).into();
        let name_wire = Encoder::encode(&name("/A").append(ParamsDigest::create(digest))).unwrap();

        let mut encoder = Encoder::new();
        let nonce = [0x0A, 0x04, 0x01, 0x02, 0x03, 0x04];
        encoder.put_tlv(
            tlv_types::INTEREST,
            &[&name_wire[..], &nonce[..], &tail[..]].concat(),
        );
        let wire = encoder.finish();

        let decoded = Interest::decode(wire.clone()).unwrap();
        decoded.validate_params_digest().unwrap();
        assert_eq!(Encoder::encode(&decoded).unwrap(), wire);
        decoded
            .ll_verify(|input, sig_value| async move {
                assert_eq!(
                    input.as_ref(),
                    &[0x08, 0x01, 0x41, 0x24, 0x01, 0xC0, 0x2C, 0x04, 0x1B, 0x02, 0x00, 0xC8][..]
                );
                assert_eq!(sig_value.as_ref(), &[0xA0]);
                Ok(())
            })
            .await
            .unwrap();

        // the Nonce is not covered, so the received digest input still applies
        let mut forwarded = decoded.clone().with_nonce(9);
        forwarded.validate_params_digest().unwrap();
        assert_ne!(Encoder::encode(&forwarded).unwrap(), wire);

        // changing a covered field falls back to the fields
        forwarded.app_parameters = Some(Bytes::from_static(&[0xC1]));
        assert!(matches!(
            forwarded.validate_params_digest(),
            Err(PacketError::IncorrectDigest)
        ));
    }

    #[tokio::test]
    async fn test_failed_signing_leaves_interest_unchanged() {
        let mut interest = Interest::new(name("/A"))
            .with_sig_info(SignatureInfo::new(SignatureType::Null));
        let before = interest.clone();

        let err = interest
            .ll_sign(|_| async { Err(SignatureError::SigningFailed("no key".into())) })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PacketError::Signature(SignatureError::SigningFailed(_))
        ));
        assert_eq!(interest, before);
        assert_eq!(interest.name.len(), 1);
        assert!(interest.app_parameters.is_none());
        assert!(interest.sig_value.is_none());
    }
}
