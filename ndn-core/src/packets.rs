use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::config::CodecConfig;
use crate::data::Data;
use crate::interest::Interest;
use crate::nack::{self, Nack};
use crate::name::Name;
use crate::signature::SignatureError;
use crate::tlv::{Decoder, Encodable, Encoder, Tlv, TlvError};

/// TLV Type constants for NDN packets
pub mod tlv_types {
    pub const IMPLICIT_SHA256_DIGEST_COMPONENT: u32 = 0x01;
    pub const PARAMETERS_SHA256_DIGEST_COMPONENT: u32 = 0x02;
    pub const INTEREST: u32 = 0x05;
    pub const DATA: u32 = 0x06;
    pub const NAME: u32 = 0x07;
    pub const GENERIC_NAME_COMPONENT: u32 = 0x08;
    pub const NONCE: u32 = 0x0A;
    pub const INTEREST_LIFETIME: u32 = 0x0C;
    pub const MUST_BE_FRESH: u32 = 0x12;
    pub const META_INFO: u32 = 0x14;
    pub const CONTENT: u32 = 0x15;
    pub const DATA_SIGNATURE_INFO: u32 = 0x16;
    pub const DATA_SIGNATURE_VALUE: u32 = 0x17;
    pub const CONTENT_TYPE: u32 = 0x18;
    pub const FRESHNESS_PERIOD: u32 = 0x19;
    pub const FINAL_BLOCK_ID: u32 = 0x1A;
    pub const SIGNATURE_TYPE: u32 = 0x1B;
    pub const KEY_LOCATOR: u32 = 0x1C;
    pub const KEY_DIGEST: u32 = 0x1D;
    pub const FORWARDING_HINT: u32 = 0x1E;
    pub const DELEGATION: u32 = 0x1F;
    /// Inside a Delegation; shares its number with ForwardingHint
    pub const PREFERENCE: u32 = 0x1E;
    pub const KEYWORD_NAME_COMPONENT: u32 = 0x20;
    pub const CAN_BE_PREFIX: u32 = 0x21;
    pub const HOP_LIMIT: u32 = 0x22;
    pub const APPLICATION_PARAMETERS: u32 = 0x24;
    pub const SIGNATURE_NONCE: u32 = 0x26;
    pub const SIGNATURE_TIME: u32 = 0x28;
    pub const SIGNATURE_SEQ_NUM: u32 = 0x2A;
    pub const INTEREST_SIGNATURE_INFO: u32 = 0x2C;
    pub const INTEREST_SIGNATURE_VALUE: u32 = 0x2E;
    pub const SEGMENT_NAME_COMPONENT: u32 = 0x32;
    pub const BYTE_OFFSET_NAME_COMPONENT: u32 = 0x34;
    pub const VERSION_NAME_COMPONENT: u32 = 0x36;
    pub const TIMESTAMP_NAME_COMPONENT: u32 = 0x38;
    pub const SEQUENCE_NUM_NAME_COMPONENT: u32 = 0x3A;
    pub const VALIDITY_PERIOD: u32 = 0xFD;
    pub const NOT_BEFORE: u32 = 0xFE;
    pub const NOT_AFTER: u32 = 0xFF;

    // NDNLPv2
    pub const LP_FRAGMENT: u32 = 0x50;
    pub const LP_SEQUENCE: u32 = 0x51;
    pub const LP_FRAG_INDEX: u32 = 0x52;
    pub const LP_FRAG_COUNT: u32 = 0x53;
    pub const LP_PIT_TOKEN: u32 = 0x62;
    pub const LP_PACKET: u32 = 0x64;
    pub const NACK: u32 = 0x0320;
    pub const NACK_REASON: u32 = 0x0321;
}

/// Coarse classification of [`PacketError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed TLV or limits exceeded
    Decode,
    /// Well-formed TLV that violates packet structure rules
    Structural,
    IncorrectDigest,
    Signature,
    /// Caller misuse, e.g. encoding an unfinished packet
    IllegalState,
}

/// Errors raised by the packet model
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("TLV decoding error: {0}")]
    Decode(#[from] TlvError),
    #[error("missing Name")]
    MissingName,
    #[error("packet too large: {size} bytes (max: {max})")]
    PacketTooLarge { size: usize, max: usize },
    #[error("Name too deep: {depth} components (max: {max})")]
    NameTooDeep { depth: usize, max: usize },
    #[error("expected {expected:?} packet, got {actual:?}")]
    UnexpectedPacket {
        expected: PacketKind,
        actual: PacketKind,
    },
    #[error("missing AppParameters")]
    MissingAppParameters,
    #[error("missing ParamsDigest")]
    MissingParamsDigest,
    #[error("missing SignatureInfo")]
    MissingSignatureInfo,
    #[error("missing SignatureValue")]
    MissingSignatureValue,
    #[error("{0} out of place")]
    OutOfPlace(String),
    #[error("Nack fragment must be an Interest, found TLV-TYPE {0:#x}")]
    NackPayload(u32),
    #[error("LpPacket has no fragment")]
    MissingFragment,
    #[error("incorrect ParamsDigest")]
    IncorrectDigest,
    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),
    #[error("{0}")]
    IllegalState(String),
}

impl PacketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PacketError::Decode(_)
            | PacketError::MissingName
            | PacketError::PacketTooLarge { .. }
            | PacketError::NameTooDeep { .. }
            | PacketError::UnexpectedPacket { .. } => ErrorKind::Decode,
            PacketError::MissingAppParameters
            | PacketError::MissingParamsDigest
            | PacketError::MissingSignatureInfo
            | PacketError::MissingSignatureValue
            | PacketError::OutOfPlace(_)
            | PacketError::NackPayload(_)
            | PacketError::MissingFragment => ErrorKind::Structural,
            PacketError::IncorrectDigest => ErrorKind::IncorrectDigest,
            PacketError::Signature(_) => ErrorKind::Signature,
            PacketError::IllegalState(_) => ErrorKind::IllegalState,
        }
    }
}

/// Enforces the fixed wire order of recognized fields within a packet.
///
/// Each recognized field has a rank; ranks must strictly increase, which
/// also rejects repeated fields.
#[derive(Debug, Default)]
pub(crate) struct FieldOrder {
    last: usize,
}

impl FieldOrder {
    pub(crate) fn check(&mut self, rank: usize, typ: u32) -> Result<(), PacketError> {
        if rank <= self.last {
            return Err(PacketError::OutOfPlace(format!("TLV-TYPE {:#x}", typ)));
        }
        self.last = rank;
        Ok(())
    }
}

/// Wire bytes a packet was decoded from, together with a copy of the
/// fields they carried.
///
/// While a packet's fields still equal that copy, its signed portion and
/// encoding are taken from the received bytes. Equality ignores the cache.
pub(crate) struct WireCache<T>(Option<Arc<T>>);

impl<T> WireCache<T> {
    pub(crate) fn new(decoded: T) -> Self {
        Self(Some(Arc::new(decoded)))
    }

    pub(crate) fn get(&self) -> Option<&T> {
        self.0.as_deref()
    }
}

impl<T> Default for WireCache<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> Clone for WireCache<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> PartialEq for WireCache<T> {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl<T> Eq for WireCache<T> {}

impl<T> fmt::Debug for WireCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("WireCache(decoded)"),
            None => f.write_str("WireCache(none)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Interest,
    Data,
    Nack,
    /// Accept whichever packet the wire holds
    Any,
}

/// Packet types that can be sent over the network
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Interest(Interest),
    Data(Data),
    Nack(Nack),
}

impl Packet {
    /// Get the name of the packet
    pub fn name(&self) -> &Name {
        match self {
            Packet::Interest(interest) => &interest.name,
            Packet::Data(data) => &data.name,
            Packet::Nack(nack) => &nack.interest.name,
        }
    }

    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Interest(_) => PacketKind::Interest,
            Packet::Data(_) => PacketKind::Data,
            Packet::Nack(_) => PacketKind::Nack,
        }
    }

    pub fn is_interest(&self) -> bool {
        matches!(self, Packet::Interest(_))
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Packet::Data(_))
    }

    pub fn is_nack(&self) -> bool {
        matches!(self, Packet::Nack(_))
    }
}

impl From<Interest> for Packet {
    fn from(interest: Interest) -> Self {
        Packet::Interest(interest)
    }
}

impl From<Data> for Packet {
    fn from(data: Data) -> Self {
        Packet::Data(data)
    }
}

impl From<Nack> for Packet {
    fn from(nack: Nack) -> Self {
        Packet::Nack(nack)
    }
}

impl Encodable for Packet {
    type Error = PacketError;

    fn encode_to(&self, encoder: &mut Encoder) -> Result<(), PacketError> {
        match self {
            Packet::Interest(interest) => interest.encode_to(encoder),
            Packet::Data(data) => data.encode_to(encoder),
            Packet::Nack(nack) => nack.encode_to(encoder),
        }
    }
}

type DecodeFn = fn(&Tlv, &CodecConfig) -> Result<Packet, PacketError>;

fn decode_interest(tlv: &Tlv, config: &CodecConfig) -> Result<Packet, PacketError> {
    Interest::decode_tlv_with(tlv, config).map(Packet::Interest)
}

fn decode_data(tlv: &Tlv, config: &CodecConfig) -> Result<Packet, PacketError> {
    Data::decode_tlv_with(tlv, config).map(Packet::Data)
}

/// Top-level TLV-TYPE to decoder
const DECODERS: &[(u32, DecodeFn)] = &[
    (tlv_types::INTEREST, decode_interest),
    (tlv_types::DATA, decode_data),
    (tlv_types::LP_PACKET, nack::decode_lp_packet),
];

/// Decoder for a network-layer packet (Interest or Data), excluding LpPacket
pub(crate) fn network_layer_decoder(typ: u32) -> Option<DecodeFn> {
    DECODERS
        .iter()
        .filter(|(t, _)| *t != tlv_types::LP_PACKET)
        .find(|(t, _)| *t == typ)
        .map(|(_, f)| *f)
}

fn lookup_decoder(typ: u32) -> Option<DecodeFn> {
    DECODERS.iter().find(|(t, _)| *t == typ).map(|(_, f)| *f)
}

/// Decode a complete wire buffer into a packet
pub fn decode_packet(wire: impl Into<Bytes>, kind: PacketKind) -> Result<Packet, PacketError> {
    decode_packet_with(wire, kind, &CodecConfig::default())
}

pub fn decode_packet_with(
    wire: impl Into<Bytes>,
    kind: PacketKind,
    config: &CodecConfig,
) -> Result<Packet, PacketError> {
    let wire = wire.into();
    config.check_packet_size(wire.len())?;

    let mut decoder = Decoder::new(wire).strict(config.strict_varnum);
    let tlv = decoder.read()?;
    decoder.finish()?;

    let decode = lookup_decoder(tlv.typ()).ok_or(TlvError::UnrecognizedCritical(tlv.typ()))?;
    let packet = decode(&tlv, config)?;

    if kind != PacketKind::Any && packet.kind() != kind {
        return Err(PacketError::UnexpectedPacket {
            expected: kind,
            actual: packet.kind(),
        });
    }
    Ok(packet)
}

/// Encode a packet to wire format
pub fn encode_packet(packet: &Packet) -> Result<Bytes, PacketError> {
    Encoder::encode(packet)
}
