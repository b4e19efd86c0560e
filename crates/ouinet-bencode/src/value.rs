use std::collections::BTreeMap;

use thiserror::Error;

/// A bencoded value: integer, byte string, list, or dictionary.
///
/// Dictionary keys are kept in a [`BTreeMap`], so any value this module
/// constructs encodes with keys in lexicographic order automatically;
/// [`decode`] additionally *rejects* input whose dictionary keys were not
/// already sorted, since BEP5 treats that as a malleability hazard rather
/// than something to silently normalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BValue {
    Int(i64),
    Bytes(Vec<u8>),
    List(Vec<BValue>),
    Dict(BTreeMap<Vec<u8>, BValue>),
}

impl BValue {
    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        BValue::Bytes(b.into())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            BValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            BValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[BValue]> {
        match self {
            BValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<Vec<u8>, BValue>> {
        match self {
            BValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&BValue> {
        self.as_dict()?.get(key.as_bytes())
    }
}

/// Errors surfaced while decoding a bencoded byte string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BencodeError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("invalid integer")]
    InvalidInteger,
    #[error("invalid string length")]
    InvalidString,
    #[error("dictionary keys are not in sorted order")]
    UnsortedKeys,
    #[error("duplicate dictionary key")]
    DuplicateKey,
    #[error("input has trailing bytes after the top-level value")]
    TrailingBytes,
    #[error("unrecognized value tag")]
    UnknownTag,
}

/// Encodes a value using the canonical BEP5 wire form (dict keys always
/// sorted, since they are stored sorted).
pub fn encode(value: &BValue) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &BValue, out: &mut Vec<u8>) {
    match value {
        BValue::Int(n) => {
            out.push(b'i');
            out.extend_from_slice(n.to_string().as_bytes());
            out.push(b'e');
        }
        BValue::Bytes(b) => {
            out.extend_from_slice(b.len().to_string().as_bytes());
            out.push(b':');
            out.extend_from_slice(b);
        }
        BValue::List(items) => {
            out.push(b'l');
            for item in items {
                encode_into(item, out);
            }
            out.push(b'e');
        }
        BValue::Dict(map) => {
            out.push(b'd');
            for (k, v) in map {
                encode_into(&BValue::Bytes(k.clone()), out);
                encode_into(v, out);
            }
            out.push(b'e');
        }
    }
}

/// Decodes a single top-level bencoded value, rejecting any trailing bytes.
pub fn decode(input: &[u8]) -> Result<BValue, BencodeError> {
    let (value, consumed) = decode_value(input)?;
    if consumed != input.len() {
        return Err(BencodeError::TrailingBytes);
    }
    Ok(value)
}

/// Decodes one value from the front of `input`, returning it along with the
/// number of bytes consumed. Used internally for recursive list/dict
/// parsing; [`decode`] is the entry point that enforces full consumption.
fn decode_value(input: &[u8]) -> Result<(BValue, usize), BencodeError> {
    match input.first() {
        None => Err(BencodeError::UnexpectedEof),
        Some(b'i') => decode_int(input),
        Some(b'l') => decode_list(input),
        Some(b'd') => decode_dict(input),
        Some(c) if c.is_ascii_digit() => decode_bytes(input),
        Some(_) => Err(BencodeError::UnknownTag),
    }
}

fn decode_int(input: &[u8]) -> Result<(BValue, usize), BencodeError> {
    let end = find(input, b'e').ok_or(BencodeError::UnexpectedEof)?;
    let digits = &input[1..end];
    if digits.is_empty() || digits == b"-" {
        return Err(BencodeError::InvalidInteger);
    }
    // Reject leading zeros (other than exactly "0") and "-0", mirroring the
    // canonical bencoding grammar.
    let neg = digits[0] == b'-';
    let mag = if neg { &digits[1..] } else { digits };
    if mag.is_empty() || (mag.len() > 1 && mag[0] == b'0') || (neg && mag == b"0") {
        return Err(BencodeError::InvalidInteger);
    }
    let s = std::str::from_utf8(digits).map_err(|_| BencodeError::InvalidInteger)?;
    let n: i64 = s.parse().map_err(|_| BencodeError::InvalidInteger)?;
    Ok((BValue::Int(n), end + 1))
}

fn decode_bytes(input: &[u8]) -> Result<(BValue, usize), BencodeError> {
    let colon = find(input, b':').ok_or(BencodeError::InvalidString)?;
    let len_digits = &input[..colon];
    if len_digits.is_empty() || (len_digits.len() > 1 && len_digits[0] == b'0') {
        return Err(BencodeError::InvalidString);
    }
    let s = std::str::from_utf8(len_digits).map_err(|_| BencodeError::InvalidString)?;
    let len: usize = s.parse().map_err(|_| BencodeError::InvalidString)?;
    let start = colon + 1;
    let end = start
        .checked_add(len)
        .ok_or(BencodeError::InvalidString)?;
    if end > input.len() {
        return Err(BencodeError::UnexpectedEof);
    }
    Ok((BValue::Bytes(input[start..end].to_vec()), end))
}

fn decode_list(input: &[u8]) -> Result<(BValue, usize), BencodeError> {
    let mut pos = 1;
    let mut items = Vec::new();
    loop {
        match input.get(pos) {
            None => return Err(BencodeError::UnexpectedEof),
            Some(b'e') => return Ok((BValue::List(items), pos + 1)),
            _ => {
                let (value, consumed) = decode_value(&input[pos..])?;
                items.push(value);
                pos += consumed;
            }
        }
    }
}

fn decode_dict(input: &[u8]) -> Result<(BValue, usize), BencodeError> {
    let mut pos = 1;
    let mut map = BTreeMap::new();
    let mut last_key: Option<Vec<u8>> = None;
    loop {
        match input.get(pos) {
            None => return Err(BencodeError::UnexpectedEof),
            Some(b'e') => return Ok((BValue::Dict(map), pos + 1)),
            _ => {
                let (key_value, key_consumed) = decode_bytes(&input[pos..])?;
                let key = match key_value {
                    BValue::Bytes(b) => b,
                    _ => unreachable!(),
                };
                if let Some(prev) = &last_key {
                    if &key == prev {
                        return Err(BencodeError::DuplicateKey);
                    }
                    if &key < prev {
                        return Err(BencodeError::UnsortedKeys);
                    }
                }
                pos += key_consumed;
                let (value, value_consumed) = decode_value(&input[pos..])?;
                pos += value_consumed;
                last_key = Some(key.clone());
                map.insert(key, value);
            }
        }
    }
}

fn find(input: &[u8], needle: u8) -> Option<usize> {
    input.iter().position(|&b| b == needle)
}
