//! TLV (Type-Length-Value) codec for NDN packet serialization
//!
//! Wire format:
//! - Type: VarNumber (1, 3, 5 or 9 bytes)
//! - Length: VarNumber (1, 3, 5 or 9 bytes)
//! - Value: `Length` bytes, possibly a nested sequence of TLV elements
//!
//! VarNumber encoding:
//! - If value < 253: 1 byte
//! - If value <= 0xFFFF: 0xFD + 2 bytes (big-endian)
//! - If value <= 0xFFFFFFFF: 0xFE + 4 bytes (big-endian)
//! - Otherwise: 0xFF + 8 bytes (big-endian)
//!
//! Decoding is lazy: a [`Decoder`] walks sibling elements one at a time and
//! each [`Tlv`] is a view into the shared input buffer.

use bytes::{BufMut, Bytes, BytesMut};

/// Largest integer that survives a round trip through an IEEE-754 double.
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Errors that can occur during TLV encoding/decoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TlvError {
    #[error("Buffer too short: needed {needed} bytes, {available} available")]
    BufferTooShort { needed: usize, available: usize },
    #[error("Non-minimal VarNumber encoding")]
    NonMinimalVarNumber,
    #[error("Invalid TLV-TYPE: {0}")]
    InvalidType(u64),
    #[error("TLV-LENGTH {0} exceeds buffer")]
    LengthOverflow(u64),
    #[error("Invalid NNI length: {0}")]
    InvalidNniLength(usize),
    #[error("NNI value {0} exceeds safe integer range")]
    NniOutOfRange(u64),
    #[error("Unexpected TLV-TYPE {actual:#x}, expected {expected:#x}")]
    UnexpectedType { expected: u32, actual: u32 },
    #[error("Unrecognized critical TLV-TYPE {0:#x}")]
    UnrecognizedCritical(u32),
    #[error("Value length mismatch: expected {expected}, got {actual}")]
    ValueLengthMismatch { expected: usize, actual: usize },
    #[error("{0} trailing bytes after TLV")]
    TrailingBytes(usize),
    #[error("Invalid timestamp {0:?}, expected YYYYMMDDThhmmss")]
    InvalidTimestamp(String),
}

/// Get the size needed to encode a VarNumber
pub fn varnum_size(n: u64) -> usize {
    if n < 253 {
        1
    } else if n <= 0xFFFF {
        3
    } else if n <= 0xFFFF_FFFF {
        5
    } else {
        9
    }
}

/// Encode a VarNumber
pub fn write_varnum<B: BufMut>(buf: &mut B, n: u64) {
    if n < 253 {
        buf.put_u8(n as u8);
    } else if n <= 0xFFFF {
        buf.put_u8(0xFD);
        buf.put_u16(n as u16);
    } else if n <= 0xFFFF_FFFF {
        buf.put_u8(0xFE);
        buf.put_u32(n as u32);
    } else {
        buf.put_u8(0xFF);
        buf.put_u64(n);
    }
}

/// Decode a VarNumber from the start of `data`, returning the value and the
/// number of bytes consumed.
///
/// The width is chosen from the first byte alone. With `strict` set, an
/// encoding wider than necessary is rejected.
pub fn read_varnum(data: &[u8], strict: bool) -> Result<(u64, usize), TlvError> {
    let first = *data.first().ok_or(TlvError::BufferTooShort {
        needed: 1,
        available: 0,
    })?;

    let (width, min) = match first {
        0..=252 => return Ok((first as u64, 1)),
        0xFD => (2, 253),
        0xFE => (4, 0x1_0000),
        0xFF => (8, 0x1_0000_0000),
    };

    if data.len() < 1 + width {
        return Err(TlvError::BufferTooShort {
            needed: 1 + width,
            available: data.len(),
        });
    }

    let value = data[1..1 + width]
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | *b as u64);

    if strict && value < min {
        return Err(TlvError::NonMinimalVarNumber);
    }
    Ok((value, 1 + width))
}

/// Size of the minimal NNI encoding of `n`
pub fn nni_size(n: u64) -> usize {
    if n <= 0xFF {
        1
    } else if n <= 0xFFFF {
        2
    } else if n <= 0xFFFF_FFFF {
        4
    } else {
        8
    }
}

/// Encode a NonNegativeInteger using the shortest of 1, 2, 4 or 8 bytes
pub fn write_nni<B: BufMut>(buf: &mut B, n: u64) {
    match nni_size(n) {
        1 => buf.put_u8(n as u8),
        2 => buf.put_u16(n as u16),
        4 => buf.put_u32(n as u32),
        _ => buf.put_u64(n),
    }
}

/// Decode a NonNegativeInteger TLV-VALUE
pub fn decode_nni(value: &[u8]) -> Result<u64, TlvError> {
    if !matches!(value.len(), 1 | 2 | 4 | 8) {
        return Err(TlvError::InvalidNniLength(value.len()));
    }
    let n = value.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64);
    if n > MAX_SAFE_INTEGER {
        return Err(TlvError::NniOutOfRange(n));
    }
    Ok(n)
}

/// Whether an unrecognized element of this TLV-TYPE must abort decoding.
///
/// Types 0-31 are reserved as critical; above that, odd numbers are critical.
pub fn is_critical_type(typ: u32) -> bool {
    typ <= 31 || typ & 1 == 1
}

/// A decoded TLV element: a view into the input buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    typ: u32,
    wire: Bytes,
    value_offset: usize,
    strict: bool,
}

impl Tlv {
    pub fn typ(&self) -> u32 {
        self.typ
    }

    /// TLV-LENGTH of this element
    pub fn length(&self) -> usize {
        self.wire.len() - self.value_offset
    }

    /// TLV-VALUE, sharing the input buffer
    pub fn value(&self) -> Bytes {
        self.wire.slice(self.value_offset..)
    }

    pub fn value_slice(&self) -> &[u8] {
        &self.wire[self.value_offset..]
    }

    /// The whole element, including TLV-TYPE and TLV-LENGTH
    pub fn wire(&self) -> &Bytes {
        &self.wire
    }

    pub fn is_critical(&self) -> bool {
        is_critical_type(self.typ)
    }

    /// Interpret TLV-VALUE as a NonNegativeInteger
    pub fn nni(&self) -> Result<u64, TlvError> {
        decode_nni(self.value_slice())
    }

    /// Interpret TLV-VALUE as a NonNegativeInteger no greater than `max`
    pub fn nni_max(&self, max: u64) -> Result<u64, TlvError> {
        let n = self.nni()?;
        if n > max {
            return Err(TlvError::NniOutOfRange(n));
        }
        Ok(n)
    }

    /// Decode TLV-VALUE as a nested sequence of elements
    pub fn nested(&self) -> Decoder {
        Decoder {
            buf: self.value(),
            offset: 0,
            strict: self.strict,
        }
    }

    pub fn expect_type(&self, expected: u32) -> Result<&Self, TlvError> {
        if self.typ != expected {
            return Err(TlvError::UnexpectedType {
                expected,
                actual: self.typ,
            });
        }
        Ok(self)
    }

    /// Reject this element if it is critical; used for unrecognized types.
    pub fn skip_unrecognized(&self) -> Result<(), TlvError> {
        if self.is_critical() {
            return Err(TlvError::UnrecognizedCritical(self.typ));
        }
        log::debug!("skipping non-critical TLV-TYPE {:#x}", self.typ);
        Ok(())
    }
}

/// Types that can be constructed from a TLV element
pub trait Decodable: Sized {
    type Error: From<TlvError>;

    fn decode_tlv(tlv: &Tlv) -> Result<Self, Self::Error>;
}

/// Types that can write themselves as TLV
pub trait Encodable {
    type Error: From<TlvError>;

    fn encode_to(&self, encoder: &mut Encoder) -> Result<(), Self::Error>;
}

/// Sequential reader over sibling TLV elements
#[derive(Debug, Clone)]
pub struct Decoder {
    buf: Bytes,
    offset: usize,
    strict: bool,
}

impl Decoder {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self {
            buf: buf.into(),
            offset: 0,
            strict: false,
        }
    }

    /// Reject non-minimal VarNumber encodings in this decoder and any
    /// nested decoder derived from it.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buf.len()
    }

    /// Offset of the next element within the buffer
    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.offset)
    }

    /// Read the next sibling element
    pub fn read(&mut self) -> Result<Tlv, TlvError> {
        let data = &self.buf[self.offset..];

        let (typ, type_len) = read_varnum(data, self.strict)?;
        if typ == 0 || typ > u32::MAX as u64 {
            return Err(TlvError::InvalidType(typ));
        }

        let (length, length_len) = read_varnum(&data[type_len..], self.strict)?;
        let header = type_len + length_len;
        let available = (data.len() - header) as u64;
        if length > available {
            return Err(TlvError::LengthOverflow(length));
        }

        let total = header + length as usize;
        let wire = self.buf.slice(self.offset..self.offset + total);
        self.offset += total;

        Ok(Tlv {
            typ: typ as u32,
            wire,
            value_offset: header,
            strict: self.strict,
        })
    }

    /// Read the next element and decode it as `T`
    pub fn decode<T: Decodable>(&mut self) -> Result<T, T::Error> {
        let tlv = self.read()?;
        T::decode_tlv(&tlv)
    }

    /// Fail if any bytes remain unread
    pub fn finish(&self) -> Result<(), TlvError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(TlvError::TrailingBytes(n)),
        }
    }
}

impl Iterator for Decoder {
    type Item = Result<Tlv, TlvError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_eof() {
            return None;
        }
        let result = self.read();
        if result.is_err() {
            // stop after the first malformed element
            self.offset = self.buf.len();
        }
        Some(result)
    }
}

/// TLV writer.
///
/// Nested elements are built children-first: [`Encoder::put_nested`] encodes
/// the children into a scratch encoder, so the parent's TLV-LENGTH is known
/// before it is written.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Encode a single value to bytes
    pub fn encode<E: Encodable + ?Sized>(value: &E) -> Result<Bytes, E::Error> {
        let mut encoder = Encoder::new();
        value.encode_to(&mut encoder)?;
        Ok(encoder.finish())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append bytes verbatim
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn put_tlv(&mut self, typ: u32, value: &[u8]) {
        self.buf
            .reserve(varnum_size(typ as u64) + varnum_size(value.len() as u64) + value.len());
        write_varnum(&mut self.buf, typ as u64);
        write_varnum(&mut self.buf, value.len() as u64);
        self.buf.extend_from_slice(value);
    }

    pub fn put_empty(&mut self, typ: u32) {
        self.put_tlv(typ, &[]);
    }

    pub fn put_nni(&mut self, typ: u32, n: u64) {
        write_varnum(&mut self.buf, typ as u64);
        write_varnum(&mut self.buf, nni_size(n) as u64);
        write_nni(&mut self.buf, n);
    }

    /// Write an element whose TLV-VALUE is produced by `f`
    pub fn put_nested<F, E>(&mut self, typ: u32, f: F) -> Result<(), E>
    where
        F: FnOnce(&mut Encoder) -> Result<(), E>,
    {
        let mut inner = Encoder::new();
        f(&mut inner)?;
        self.put_tlv(typ, &inner.buf);
        Ok(())
    }

    pub fn put<E: Encodable + ?Sized>(&mut self, value: &E) -> Result<(), E::Error> {
        value.encode_to(self)
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}
