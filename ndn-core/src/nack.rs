//! Network Nack, carried in an NDNLPv2 LpPacket.

use crate::config::CodecConfig;
use crate::interest::Interest;
use crate::packets::{network_layer_decoder, tlv_types, Packet, PacketError};
use crate::tlv::{Encodable, Encoder, Tlv, TlvError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NackReason {
    Unspecified,
    Congestion,
    Duplicate,
    NoRoute,
    Other(u64),
}

impl NackReason {
    pub fn code(self) -> u64 {
        match self {
            NackReason::Unspecified => 0,
            NackReason::Congestion => 50,
            NackReason::Duplicate => 100,
            NackReason::NoRoute => 150,
            NackReason::Other(code) => code,
        }
    }

    pub fn from_code(code: u64) -> Self {
        match code {
            0 => NackReason::Unspecified,
            50 => NackReason::Congestion,
            100 => NackReason::Duplicate,
            150 => NackReason::NoRoute,
            code => NackReason::Other(code),
        }
    }
}

/// A negative acknowledgement of an Interest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nack {
    pub interest: Interest,
    pub reason: NackReason,
}

impl Nack {
    pub fn new(interest: Interest, reason: NackReason) -> Self {
        Self { interest, reason }
    }
}

impl Encodable for Nack {
    type Error = PacketError;

    fn encode_to(&self, encoder: &mut Encoder) -> Result<(), PacketError> {
        let interest = Encoder::encode(&self.interest)?;
        encoder.put_nested(tlv_types::LP_PACKET, |e| {
            e.put_nested(tlv_types::NACK, |e| {
                if self.reason != NackReason::Unspecified {
                    e.put_nni(tlv_types::NACK_REASON, self.reason.code());
                }
                Ok::<(), PacketError>(())
            })?;
            e.put_tlv(tlv_types::LP_FRAGMENT, &interest);
            Ok::<(), PacketError>(())
        })
    }
}

/// LP header fields a receiver may ignore when it does not recognize them
fn is_ignorable_lp_field(typ: u32) -> bool {
    (800..=959).contains(&typ) && typ & 0x03 == 0
}

/// Decode an LpPacket: a Nack when it carries a Nack header, otherwise the
/// Interest or Data in its fragment.
pub(crate) fn decode_lp_packet(tlv: &Tlv, config: &CodecConfig) -> Result<Packet, PacketError> {
    let mut reason = None;
    let mut fragment = None;

    for element in tlv.nested() {
        let element = element?;
        match element.typ() {
            tlv_types::NACK => {
                let mut code = 0;
                for field in element.nested() {
                    let field = field?;
                    match field.typ() {
                        tlv_types::NACK_REASON => code = field.nni()?,
                        _ => field.skip_unrecognized()?,
                    }
                }
                reason = Some(NackReason::from_code(code));
            }
            tlv_types::LP_FRAGMENT => fragment = Some(element),
            tlv_types::LP_SEQUENCE
            | tlv_types::LP_FRAG_INDEX
            | tlv_types::LP_FRAG_COUNT
            | tlv_types::LP_PIT_TOKEN => {
                log::debug!("ignoring LP header field {:#x}", element.typ());
            }
            typ if is_ignorable_lp_field(typ) => {
                log::debug!("ignoring unknown LP header field {:#x}", typ);
            }
            typ => return Err(TlvError::UnrecognizedCritical(typ).into()),
        }
    }

    let fragment = fragment.ok_or(PacketError::MissingFragment)?;
    let mut inner = fragment.nested();
    let payload = inner.read()?;
    inner.finish()?;

    match reason {
        Some(reason) => {
            if payload.typ() != tlv_types::INTEREST {
                return Err(PacketError::NackPayload(payload.typ()));
            }
            let interest = Interest::decode_tlv_with(&payload, config)?;
            Ok(Packet::Nack(Nack::new(interest, reason)))
        }
        None => {
            let decode = network_layer_decoder(payload.typ())
                .ok_or(TlvError::UnrecognizedCritical(payload.typ()))?;
            decode(&payload, config)
        }
    }
}
