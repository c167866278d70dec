/*!
Library types for the tags of RFC 8949, section 3.4.
*/

use super::*;
use super::decode::Header;

/// Tag 0: a date/time string (RFC 3339). The text is not validated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime(pub String);

/// Tag 1: seconds relative to 1970-01-01T00:00Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EpochTime {
    Integer(i64),
    Float(f64),
}

/// Tag 2: an unsigned bignum, as big-endian magnitude bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BigUint(pub Vec<u8>);

/// Tag 3: the negative bignum `-1 - n`, where `n` is the big-endian
/// magnitude held here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BigNegative(pub Vec<u8>);

/// Tag 24: a byte string holding a complete CBOR encoding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EncodedCbor(pub Vec<u8>);

/// Tag 32: a URI (RFC 3986). The text is not validated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uri(pub String);

macro_rules! impl_text_tag {
    ($ty:ident, $tag:expr) => {
        impl TaggedType for $ty {
            const TAG: u64 = $tag;
        }

        impl ToCbor for $ty {
            fn to_cbor(&self, encoder: &mut Encoder) {
                encoder.emit_tagged(self.0.as_str(), [Self::TAG])
            }
        }

        impl FromCbor for $ty {
            fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
                decoder.expect_tag(Self::TAG, |d| d.text().map(|s| Self(s.into_owned())))
            }
        }
    };
}

macro_rules! impl_bytes_tag {
    ($ty:ident, $tag:expr) => {
        impl TaggedType for $ty {
            const TAG: u64 = $tag;
        }

        impl ToCbor for $ty {
            fn to_cbor(&self, encoder: &mut Encoder) {
                encoder.emit_tagged(&Bytes(&self.0), [Self::TAG])
            }
        }

        impl FromCbor for $ty {
            fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
                decoder.expect_tag(Self::TAG, |d| d.bytes().map(|b| Self(b.into_owned())))
            }
        }
    };
}

impl_text_tag!(DateTime, 0);
impl_text_tag!(Uri, 32);
impl_bytes_tag!(BigUint, 2);
impl_bytes_tag!(BigNegative, 3);
impl_bytes_tag!(EncodedCbor, 24);

impl TaggedType for EpochTime {
    const TAG: u64 = 1;
}

impl ToCbor for EpochTime {
    fn to_cbor(&self, encoder: &mut Encoder) {
        match self {
            Self::Integer(v) => encoder.emit_tagged(v, [Self::TAG]),
            Self::Float(v) => encoder.emit_tagged(v, [Self::TAG]),
        }
    }
}

impl FromCbor for EpochTime {
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        decoder.expect_tag(Self::TAG, |d| {
            let start = d.offset();
            match d.peek_header()? {
                Header::Float(_) => d.float().map(Self::Float),
                Header::Unsigned(_) | Header::Negative(_) => d.integer().map(Self::Integer),
                h => Err(Decoder::type_error("Integer or Float", &h, start)),
            }
        })
    }
}

impl EncodedCbor {
    /// Encode `value` and wrap the result.
    pub fn encode<T>(value: &T) -> Self
    where
        T: ToCbor + ?Sized,
    {
        Self(encode::emit(value))
    }

    /// Decode the embedded encoding as a `T`.
    ///
    /// Offsets in any error are relative to the embedded bytes.
    pub fn decode<T>(&self) -> Result<T, Error>
    where
        T: FromCbor,
    {
        super::decode(&self.0)
    }

    pub fn item(&self) -> Result<Item, Error> {
        decode_any(&self.0)
    }
}

fn magnitude(bytes: &[u8]) -> &[u8] {
    let zeros = bytes.iter().take_while(|b| **b == 0).count();
    &bytes[zeros..]
}

fn to_u128(bytes: &[u8], start: usize) -> Result<u128, Error> {
    let bytes = magnitude(bytes);
    if bytes.len() > 16 {
        return Err(Error::new(ErrorKind::IntegerOverflow, start));
    }
    Ok(bytes.iter().fold(0u128, |v, b| (v << 8) | *b as u128))
}

impl BigUint {
    pub fn from_u128(value: u128) -> Self {
        Self(magnitude(&value.to_be_bytes()).to_vec())
    }
}

impl BigNegative {
    /// The bignum for `value`, which must be negative.
    pub fn from_i128(value: i128) -> Option<Self> {
        (value < 0).then(|| Self(magnitude(&(!(value as u128)).to_be_bytes()).to_vec()))
    }
}

/// Written as a plain integer when it fits in 64 bits, and as a tag 2
/// bignum otherwise.
impl ToCbor for u128 {
    fn to_cbor(&self, encoder: &mut Encoder) {
        match u64::try_from(*self) {
            Ok(v) => encoder.emit_unsigned(v),
            Err(_) => encoder.emit(&BigUint::from_u128(*self)),
        }
    }
}

impl ToCbor for i128 {
    fn to_cbor(&self, encoder: &mut Encoder) {
        if *self >= 0 {
            return encoder.emit(&(*self as u128));
        }
        let n = !(*self as u128);
        match u64::try_from(n) {
            Ok(v) => encoder.emit_negative(v),
            Err(_) => encoder.emit_tagged(&Bytes(magnitude(&n.to_be_bytes())), [3]),
        }
    }
}

/// Accepts plain integers and tag 2 bignums.
impl FromCbor for u128 {
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        let start = decoder.offset();
        match decoder.peek_header()? {
            Header::Tag(_) => {
                let big = decoder.parse::<BigUint>()?;
                to_u128(&big.0, start)
            }
            _ => decoder.integer(),
        }
    }
}

/// Accepts plain integers and tag 2 or 3 bignums.
impl FromCbor for i128 {
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        let start = decoder.offset();
        let overflow = || Error::new(ErrorKind::IntegerOverflow, start);
        match decoder.peek_tag()? {
            Some(3) => {
                let n = to_u128(&decoder.parse::<BigNegative>()?.0, start)?;
                i128::try_from(n).map(|n| -1 - n).map_err(|_| overflow())
            }
            Some(_) => {
                let n = to_u128(&decoder.parse::<BigUint>()?.0, start)?;
                i128::try_from(n).map_err(|_| overflow())
            }
            None => decoder.integer(),
        }
    }
}
