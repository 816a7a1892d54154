//! Named Data Networking packet codec and signing protocol.
//!
//! Provides the TLV wire format, Names, Interest/Data/Nack packets, the
//! ParamsDigest engine for parameterized Interests, and an
//! algorithm-independent sign/verify protocol.

pub mod algorithms;
pub mod config;
pub mod data;
pub mod interest;
pub mod nack;
pub mod name;
pub mod packets;
pub mod params_digest;
pub mod signature;
pub mod tlv;

pub use config::CodecConfig;
pub use data::{ContentType, Data};
pub use interest::{Delegation, FwHint, Interest};
pub use nack::{Nack, NackReason};
pub use name::{Name, NameCompare, NameComponent, NameError};
pub use packets::{
    decode_packet, decode_packet_with, encode_packet, ErrorKind, Packet, PacketError, PacketKind,
};
pub use params_digest::ParamsDigest;
pub use signature::{
    sign_packet, verify_packet, KeyLocator, Signable, SignatureError, SignatureInfo,
    SignatureType, Signer, ValidityPeriod, Verifiable, Verifier,
};
pub use tlv::{Decodable, Decoder, Encodable, Encoder, Tlv, TlvError};
