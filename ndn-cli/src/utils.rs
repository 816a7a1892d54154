use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Load a packet from a file: raw TLV, or hex text when the file is valid hex
pub fn read_packet_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let contents = fs::read(&path).with_context(|| format!("reading {}", path.as_ref().display()))?;
    match std::str::from_utf8(&contents) {
        Ok(text) => match parse_hex(text) {
            Ok(bytes) => Ok(bytes),
            Err(_) => Ok(contents),
        },
        Err(_) => Ok(contents),
    }
}

/// Parse hex, ignoring whitespace
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(hex::decode(compact)?)
}

/// Upper-case hex with a space between octets
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.1} {}", size, UNITS[unit_index])
}
