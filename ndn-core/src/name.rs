use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::packets::tlv_types;
use crate::tlv::{decode_nni, nni_size, write_nni, Decodable, Encodable, Encoder, Tlv, TlvError};

/// Largest TLV-TYPE allowed for a name component
pub const MAX_COMPONENT_TYPE: u32 = 0xFFFF;

const DIGEST_LENGTH: usize = 32;

static ZERO_DIGEST: [u8; DIGEST_LENGTH] = [0; DIGEST_LENGTH];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("Invalid name component: {0}")]
    InvalidComponent(String),
    #[error("Invalid component type: {0}")]
    InvalidType(String),
    #[error("Invalid percent-encoding: {0}")]
    InvalidEncoding(String),
    #[error("Index {index} out of range for name of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// A typed segment of a [`Name`].
///
/// Components order by value first (byte-wise, a proper prefix sorts first)
/// and by TLV-TYPE when the values are identical.
#[derive(Debug, Clone)]
pub struct NameComponent {
    typ: u32,
    value: Bytes,
    // set only by ParamsDigest::placeholder(); decoded components never carry it
    placeholder: bool,
}

impl NameComponent {
    pub fn new(typ: u32, value: impl Into<Bytes>) -> Self {
        Self {
            typ,
            value: value.into(),
            placeholder: false,
        }
    }

    /// A GenericNameComponent holding `value`
    pub fn generic(value: impl Into<Bytes>) -> Self {
        Self::new(tlv_types::GENERIC_NAME_COMPONENT, value)
    }

    /// A component whose value is a NonNegativeInteger, e.g. a segment number
    pub fn from_number(typ: u32, n: u64) -> Self {
        let mut value = Vec::with_capacity(nni_size(n));
        write_nni(&mut value, n);
        Self::new(typ, value)
    }

    pub(crate) fn digest_placeholder(typ: u32) -> Self {
        Self {
            typ,
            value: Bytes::from_static(&ZERO_DIGEST),
            placeholder: true,
        }
    }

    pub fn typ(&self) -> u32 {
        self.typ
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn value_bytes(&self) -> Bytes {
        self.value.clone()
    }

    pub fn is_type(&self, typ: u32) -> bool {
        self.typ == typ
    }

    /// Whether this is a position marker for a digest not yet computed
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Interpret the value as a NonNegativeInteger
    pub fn to_number(&self) -> Result<u64, TlvError> {
        decode_nni(&self.value)
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn compare(&self, other: &Self) -> Ordering {
        self.value
            .as_ref()
            .cmp(other.value.as_ref())
            .then(self.typ.cmp(&other.typ))
            .then(self.placeholder.cmp(&other.placeholder))
    }
}

impl PartialEq for NameComponent {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for NameComponent {}

impl PartialOrd for NameComponent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NameComponent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl Hash for NameComponent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.typ.hash(state);
        self.value.hash(state);
        self.placeholder.hash(state);
    }
}

impl Encodable for NameComponent {
    type Error = TlvError;

    fn encode_to(&self, encoder: &mut Encoder) -> Result<(), TlvError> {
        encoder.put_tlv(self.typ, &self.value);
        Ok(())
    }
}

impl Decodable for NameComponent {
    type Error = TlvError;

    fn decode_tlv(tlv: &Tlv) -> Result<Self, TlvError> {
        if tlv.typ() > MAX_COMPONENT_TYPE {
            return Err(TlvError::InvalidType(tlv.typ() as u64));
        }
        if is_digest_type(tlv.typ()) && tlv.length() != DIGEST_LENGTH {
            return Err(TlvError::ValueLengthMismatch {
                expected: DIGEST_LENGTH,
                actual: tlv.length(),
            });
        }
        Ok(Self::new(tlv.typ(), tlv.value()))
    }
}

fn is_digest_type(typ: u32) -> bool {
    typ == tlv_types::IMPLICIT_SHA256_DIGEST_COMPONENT
        || typ == tlv_types::PARAMETERS_SHA256_DIGEST_COMPONENT
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

fn percent_encode(value: &[u8], out: &mut String) {
    if value.iter().all(|b| *b == b'.') {
        // "", ".", ".." are not valid URI segments
        out.push_str("...");
    }
    for b in value {
        if is_unreserved(*b) {
            out.push(*b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
}

fn percent_decode(s: &str) -> Result<Vec<u8>, NameError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s
                .get(i + 1..i + 3)
                .ok_or_else(|| NameError::InvalidEncoding(s.to_string()))?;
            let b = u8::from_str_radix(hex, 16)
                .map_err(|_| NameError::InvalidEncoding(s.to_string()))?;
            out.push(b);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

impl fmt::Display for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        match self.typ {
            tlv_types::GENERIC_NAME_COMPONENT => percent_encode(&self.value, &mut out),
            tlv_types::IMPLICIT_SHA256_DIGEST_COMPONENT => {
                out.push_str("sha256digest=");
                out.push_str(&hex::encode(&self.value));
            }
            tlv_types::PARAMETERS_SHA256_DIGEST_COMPONENT => {
                out.push_str("params-sha256=");
                out.push_str(&hex::encode(&self.value));
            }
            typ => {
                out.push_str(&typ.to_string());
                out.push('=');
                percent_encode(&self.value, &mut out);
            }
        }
        f.write_str(&out)
    }
}

impl FromStr for NameComponent {
    type Err = NameError;

    /// Parse the URI form of a component: `value`, `TYPE=value`,
    /// `sha256digest=HEX` or `params-sha256=HEX`.
    fn from_str(s: &str) -> Result<Self, NameError> {
        let (typ, value) = match s.split_once('=') {
            Some(("sha256digest", hex_value)) => (
                tlv_types::IMPLICIT_SHA256_DIGEST_COMPONENT,
                parse_digest(hex_value)?,
            ),
            Some(("params-sha256", hex_value)) => (
                tlv_types::PARAMETERS_SHA256_DIGEST_COMPONENT,
                parse_digest(hex_value)?,
            ),
            Some((prefix, rest))
                if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) =>
            {
                let typ: u32 = prefix
                    .parse()
                    .map_err(|_| NameError::InvalidType(prefix.to_string()))?;
                if typ == 0 || typ > MAX_COMPONENT_TYPE {
                    return Err(NameError::InvalidType(prefix.to_string()));
                }
                (typ, decode_segment(rest)?)
            }
            _ => (tlv_types::GENERIC_NAME_COMPONENT, decode_segment(s)?),
        };

        if is_digest_type(typ) && value.len() != DIGEST_LENGTH {
            return Err(NameError::InvalidComponent(s.to_string()));
        }
        Ok(Self::new(typ, value))
    }
}

fn parse_digest(hex_value: &str) -> Result<Vec<u8>, NameError> {
    hex::decode(hex_value).map_err(|_| NameError::InvalidEncoding(hex_value.to_string()))
}

fn decode_segment(s: &str) -> Result<Vec<u8>, NameError> {
    let value = percent_decode(s)?;
    if value.iter().all(|b| *b == b'.') {
        if value.len() < 3 {
            return Err(NameError::InvalidComponent(s.to_string()));
        }
        return Ok(value[3..].to_vec());
    }
    Ok(value)
}

/// Relation between two names, distinguishing prefix relationships
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameCompare {
    /// Left sorts before right and is not a prefix of it
    Less,
    /// Left is a proper prefix of right
    LPrefix,
    Equal,
    /// Right is a proper prefix of left
    RPrefix,
    /// Left sorts after right and right is not a prefix of it
    Greater,
}

/// Represents a hierarchical name in the NDN network
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Name {
    components: Vec<NameComponent>,
}

impl Name {
    /// Create a new empty name
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_components(components: Vec<NameComponent>) -> Self {
        Self { components }
    }

    /// Parse a name URI such as `/hello/world` or `/A/params-sha256=...`
    pub fn from_uri(uri: &str) -> Result<Self, NameError> {
        let path = uri.strip_prefix("ndn:").unwrap_or(uri);
        let components = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(NameComponent::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }

    pub fn components(&self) -> &[NameComponent] {
        &self.components
    }

    /// Get the number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Get a component by index
    pub fn get(&self, index: usize) -> Option<&NameComponent> {
        self.components.get(index)
    }

    pub fn last(&self) -> Option<&NameComponent> {
        self.components.last()
    }

    /// Index of the first component satisfying `pred`
    pub fn position<P>(&self, pred: P) -> Option<usize>
    where
        P: FnMut(&NameComponent) -> bool,
    {
        self.components.iter().position(pred)
    }

    /// Return a new name with `component` appended
    pub fn append(&self, component: NameComponent) -> Name {
        let mut name = self.clone();
        name.push(component);
        name
    }

    pub fn push(&mut self, component: NameComponent) {
        self.components.push(component);
    }

    /// Get a prefix of this name with at most `length` components
    pub fn get_prefix(&self, length: usize) -> Name {
        let end = length.min(self.components.len());
        Self {
            components: self.components[..end].to_vec(),
        }
    }

    /// Get the components from `start` onward
    pub fn get_suffix(&self, start: usize) -> Name {
        let start = start.min(self.components.len());
        Self {
            components: self.components[start..].to_vec(),
        }
    }

    /// Return a new name with the component at `index` replaced
    pub fn replace_at(&self, index: usize, component: NameComponent) -> Result<Name, NameError> {
        if index >= self.components.len() {
            return Err(NameError::IndexOutOfRange {
                index,
                len: self.components.len(),
            });
        }
        let mut name = self.clone();
        name.components[index] = component;
        Ok(name)
    }

    pub fn compare(&self, other: &Name) -> NameCompare {
        for (a, b) in self.components.iter().zip(other.components.iter()) {
            match a.compare(b) {
                Ordering::Less => return NameCompare::Less,
                Ordering::Greater => return NameCompare::Greater,
                Ordering::Equal => {}
            }
        }
        match self.len().cmp(&other.len()) {
            Ordering::Less => NameCompare::LPrefix,
            Ordering::Equal => NameCompare::Equal,
            Ordering::Greater => NameCompare::RPrefix,
        }
    }

    /// Check if this name is a prefix of (or equal to) another name
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        matches!(self.compare(other), NameCompare::LPrefix | NameCompare::Equal)
    }

    /// Concatenated component TLVs, without the outer Name TLV-TYPE/LENGTH
    pub fn encode_value(&self, encoder: &mut Encoder) {
        for component in &self.components {
            encoder.put_tlv(component.typ, &component.value);
        }
    }

    pub fn to_uri(&self) -> String {
        if self.components.is_empty() {
            return "/".to_string();
        }
        self.components
            .iter()
            .map(|c| format!("/{}", c))
            .collect()
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.compare(other) {
            NameCompare::Less | NameCompare::LPrefix => Ordering::Less,
            NameCompare::Equal => Ordering::Equal,
            NameCompare::RPrefix | NameCompare::Greater => Ordering::Greater,
        }
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Encodable for Name {
    type Error = TlvError;

    fn encode_to(&self, encoder: &mut Encoder) -> Result<(), TlvError> {
        encoder.put_nested(tlv_types::NAME, |e| {
            self.encode_value(e);
            Ok(())
        })
    }
}

impl Decodable for Name {
    type Error = TlvError;

    fn decode_tlv(tlv: &Tlv) -> Result<Self, TlvError> {
        tlv.expect_type(tlv_types::NAME)?;
        let components = tlv
            .nested()
            .map(|c| c.and_then(|c| NameComponent::decode_tlv(&c)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, NameError> {
        Self::from_uri(s)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_uri())
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        Name::from_uri(&uri).map_err(serde::de::Error::custom)
    }
}
