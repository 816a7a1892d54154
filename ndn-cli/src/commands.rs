use std::fs;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use clap::ArgMatches;
use log::{debug, info};
use ndn_core::{
    decode_packet_with, encode_packet, sign_packet, verify_packet, ContentType, Data, FwHint,
    Interest, KeyLocator, Nack, NackReason, Name, NameComponent, Packet, PacketKind,
    SignatureInfo,
};
use serde_json::{json, Value};

use crate::config::Config;
use crate::utils::{format_bytes, format_hex, parse_hex, read_packet_file};

fn name_arg(matches: &ArgMatches) -> Result<Name> {
    let uri = matches
        .get_one::<String>("name")
        .ok_or_else(|| anyhow!("missing NAME"))?;
    Ok(Name::from_uri(uri)?)
}

fn millis_arg(matches: &ArgMatches, id: &str) -> Option<Duration> {
    matches.get_one::<u64>(id).copied().map(Duration::from_millis)
}

/// Print the encoded packet as hex, or write raw TLV to --output
fn emit(matches: &ArgMatches, wire: &[u8]) -> Result<()> {
    match matches.get_one::<String>("output") {
        Some(path) => {
            fs::write(path, wire).with_context(|| format!("writing {}", path))?;
            info!("Wrote {} to {}", format_bytes(wire.len() as u64), path);
        }
        None => println!("{}", format_hex(wire)),
    }
    Ok(())
}

fn build_interest(matches: &ArgMatches) -> Result<Interest> {
    let mut interest = Interest::new(name_arg(matches)?)
        .with_can_be_prefix(matches.get_flag("can-be-prefix"))
        .with_must_be_fresh(matches.get_flag("must-be-fresh"));
    if let Some(lifetime) = millis_arg(matches, "lifetime") {
        interest = interest.with_lifetime(lifetime);
    }
    if let Some(hop_limit) = matches.get_one::<u8>("hop-limit") {
        interest = interest.with_hop_limit(*hop_limit);
    }
    if let Some(hint) = matches.get_one::<String>("forwarding-hint") {
        interest = interest.with_fw_hint(FwHint::new().with_delegation(0, Name::from_uri(hint)?));
    }
    if let Some(params) = matches.get_one::<String>("params") {
        interest = interest.with_app_parameters(parse_hex(params)?);
    }
    Ok(interest)
}

pub async fn handle_interest_command(matches: &ArgMatches, config: &Config) -> Result<()> {
    let mut interest = build_interest(matches)?;

    if matches.get_flag("sign") {
        let signer = config.signing.signer()?;
        let mut sig_info = SignatureInfo::new(signer.signature_type())
            .with_nonce(rand::random::<[u8; 8]>().to_vec());
        if let Ok(now) = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
            sig_info = sig_info.with_time(now.as_millis() as u64);
        }
        interest = interest.with_sig_info(sig_info);
        sign_packet(&mut interest, signer.as_ref()).await?;
        info!("Signed Interest with {}", signer.signature_type().algorithm_name());
    } else if interest.app_parameters.is_some() {
        interest.update_params_digest()?;
    }

    debug!("Interest name: {}", interest.name);
    emit(matches, &encode_packet(&interest.into())?)
}

pub async fn handle_data_command(matches: &ArgMatches, config: &Config) -> Result<()> {
    let content = match (
        matches.get_one::<String>("content"),
        matches.get_one::<String>("content-hex"),
    ) {
        (_, Some(hex)) => Some(Bytes::from(parse_hex(hex)?)),
        (Some(text), None) => Some(Bytes::from(text.clone())),
        (None, None) => None,
    };

    let mut data = Data::without_content(name_arg(matches)?);
    data.content = content;
    if let Some(freshness) = millis_arg(matches, "freshness") {
        data = data.with_freshness_period(freshness);
    }
    if let Some(content_type) = matches.get_one::<u32>("content-type") {
        data = data.with_content_type(ContentType(*content_type));
    }
    if let Some(component) = matches.get_one::<String>("final-block-id") {
        data = data.with_final_block_id(component.parse::<NameComponent>()?);
    }

    let signer = config.signing.signer()?;
    sign_packet(&mut data, signer.as_ref()).await?;
    info!(
        "Signed Data {} with {}",
        data.name,
        signer.signature_type().algorithm_name()
    );
    emit(matches, &encode_packet(&data.into())?)
}

pub fn build_nack(matches: &ArgMatches) -> Result<Nack> {
    let mut interest = build_interest(matches)?;
    if interest.app_parameters.is_some() {
        interest.update_params_digest()?;
    }
    let reason = NackReason::from_code(matches.get_one::<u64>("reason").copied().unwrap_or(0));
    Ok(Nack::new(interest, reason))
}

pub async fn handle_nack_command(matches: &ArgMatches) -> Result<()> {
    let nack = build_nack(matches)?;
    emit(matches, &encode_packet(&nack.into())?)
}

fn read_input(matches: &ArgMatches) -> Result<Vec<u8>> {
    match (matches.get_one::<String>("hex"), matches.get_one::<String>("file")) {
        (Some(hex), _) => parse_hex(hex),
        (None, Some(path)) => read_packet_file(path),
        (None, None) => Err(anyhow!("either HEX or --file is required")),
    }
}

fn key_locator_json(key_locator: &Option<KeyLocator>) -> Value {
    match key_locator {
        Some(KeyLocator::Name(name)) => json!({ "name": name }),
        Some(KeyLocator::KeyDigest(digest)) => json!({ "digest": hex::encode(digest) }),
        None => Value::Null,
    }
}

fn sig_info_json(sig_info: &Option<SignatureInfo>) -> Value {
    match sig_info {
        Some(info) => json!({
            "type": info.sig_type.algorithm_name(),
            "code": info.sig_type.code(),
            "keyLocator": key_locator_json(&info.key_locator),
            "nonce": info.nonce.as_ref().map(hex::encode),
            "time": info.time,
            "seqNum": info.seq_num,
            "validity": info.validity.as_ref().map(|v| json!({
                "notBefore": v.not_before,
                "notAfter": v.not_after,
            })),
        }),
        None => Value::Null,
    }
}

fn interest_json(interest: &Interest) -> Value {
    json!({
        "name": interest.name,
        "canBePrefix": interest.can_be_prefix,
        "mustBeFresh": interest.must_be_fresh,
        "forwardingHint": interest.fw_hint.as_ref().map(|hint| {
            hint.delegations
                .iter()
                .map(|d| json!({ "preference": d.preference, "name": d.name }))
                .collect::<Vec<_>>()
        }),
        "nonce": interest.nonce.map(|n| format!("{:08x}", n)),
        "lifetime": interest.lifetime.as_millis() as u64,
        "hopLimit": interest.hop_limit,
        "appParameters": interest.app_parameters.as_ref().map(hex::encode),
        "sigInfo": sig_info_json(&interest.sig_info),
    })
}

/// Summary of a packet as JSON
pub fn packet_json(packet: &Packet) -> Value {
    match packet {
        Packet::Interest(interest) => {
            json!({ "type": "Interest", "interest": interest_json(interest) })
        }
        Packet::Data(data) => json!({
            "type": "Data",
            "name": data.name,
            "contentType": data.content_type.0,
            "freshnessPeriod": data.freshness_period.as_millis() as u64,
            "finalBlockId": data.final_block_id.as_ref().map(|c| c.to_string()),
            "content": data.content.as_ref().map(hex::encode),
            "sigInfo": sig_info_json(&data.sig_info),
        }),
        Packet::Nack(nack) => json!({
            "type": "Nack",
            "reason": nack.reason.code(),
            "interest": interest_json(&nack.interest),
        }),
    }
}

pub async fn handle_decode_command(matches: &ArgMatches, config: &Config) -> Result<()> {
    let wire = read_input(matches)?;
    debug!("Decoding {}", format_bytes(wire.len() as u64));
    let packet = decode_packet_with(wire, PacketKind::Any, &config.codec)?;
    println!("{}", serde_json::to_string_pretty(&packet_json(&packet))?);
    Ok(())
}

pub async fn handle_verify_command(matches: &ArgMatches, config: &Config) -> Result<()> {
    let wire = read_input(matches)?;
    let verifier = config.signing.verifier()?;

    match decode_packet_with(wire, PacketKind::Any, &config.codec)? {
        Packet::Interest(interest) => {
            interest.validate_params_digest()?;
            if interest.is_signed() {
                verify_packet(&interest, verifier.as_ref()).await?;
                println!("Interest {}: signature OK", interest.name);
            } else {
                println!("Interest {}: ParamsDigest OK, unsigned", interest.name);
            }
        }
        Packet::Data(data) => {
            verify_packet(&data, verifier.as_ref()).await?;
            println!("Data {}: signature OK", data.name);
        }
        Packet::Nack(nack) => {
            nack.interest.validate_params_digest()?;
            println!(
                "Nack for {}: reason {}",
                nack.interest.name,
                nack.reason.code()
            );
        }
    }
    Ok(())
}
