use super::*;
use super::encode::{lossless_float_coerce, shortest_float_width, widen_nan};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

pub use super::error::{Error, ErrorKind};

pub trait FromCbor: Sized {
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error>;
}

/// The initial byte and argument of one data item.
///
/// `None` lengths are indefinite. `Simple` carries the raw simple value,
/// including false/true/null/undefined (20..=23).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Header {
    Unsigned(u64),
    Negative(u64),
    Bytes(Option<u64>),
    Text(Option<u64>),
    Array(Option<u64>),
    Map(Option<u64>),
    Tag(u64),
    Simple(u8),
    Float(f64),
}

impl Header {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Unsigned(_) => "Unsigned Integer",
            Self::Negative(_) => "Negative Integer",
            Self::Bytes(_) => "Byte String",
            Self::Text(_) => "Text String",
            Self::Array(_) => "Array",
            Self::Map(_) => "Map",
            Self::Tag(_) => "Tag",
            Self::Simple(20 | 21) => "Boolean",
            Self::Simple(22) => "Null",
            Self::Simple(23) => "Undefined",
            Self::Simple(_) => "Simple Value",
            Self::Float(_) => "Float",
        }
    }
}

pub struct Decoder<'a> {
    cursor: Cursor<'a>,
    options: Options,
    depth: usize,
    items: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_options(data, Options::default())
    }

    pub fn with_options(data: &'a [u8], options: Options) -> Self {
        Self {
            cursor: Cursor::new(data),
            options,
            depth: 0,
            items: 0,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn offset(&self) -> usize {
        self.cursor.offset()
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.is_empty()
    }

    /// Fails with `TrailingData` if any input is left.
    pub fn finish(self) -> Result<(), Error> {
        if self.cursor.is_empty() {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::TrailingData, self.cursor.offset()))
        }
    }

    fn read<T>(
        &mut self,
        f: impl FnOnce(&mut Cursor<'a>) -> Result<T, ErrorKind>,
        start: usize,
    ) -> Result<T, Error> {
        f(&mut self.cursor).map_err(|kind| Error::new(kind, start))
    }

    fn count_item(&mut self, start: usize) -> Result<(), Error> {
        self.items += 1;
        if self.items > self.options.max_item_count {
            Err(Error::new(ErrorKind::ItemCountLimitExceeded, start))
        } else {
            Ok(())
        }
    }

    fn enter(&mut self, start: usize) -> Result<(), Error> {
        if self.depth >= self.options.max_nesting_depth {
            return Err(Error::new(ErrorKind::DepthLimitExceeded, start));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn read_argument(&mut self, ai: u8, start: usize) -> Result<(Option<u64>, bool), Error> {
        Ok(match ai {
            0..=23 => (Some(ai as u64), true),
            24 => {
                let v = self.read(|c| c.read_u8(), start)?;
                (Some(v as u64), v >= 24)
            }
            25 => {
                let v = u16::from_be_bytes(self.read(|c| c.read_array(), start)?);
                (Some(v as u64), v > u8::MAX as u16)
            }
            26 => {
                let v = u32::from_be_bytes(self.read(|c| c.read_array(), start)?);
                (Some(v as u64), v > u16::MAX as u32)
            }
            27 => {
                let v = u64::from_be_bytes(self.read(|c| c.read_array(), start)?);
                (Some(v), v > u32::MAX as u64)
            }
            31 => (None, false),
            _ => return Err(Error::new(ErrorKind::InvalidAdditionalInfo(ai), start)),
        })
    }

    fn read_simple(&mut self, ai: u8, start: usize) -> Result<(Header, bool), Error> {
        Ok(match ai {
            0..=23 => (Header::Simple(ai), true),
            24 => {
                let v = self.read(|c| c.read_u8(), start)?;
                if v < 32 {
                    return Err(Error::new(ErrorKind::InvalidSimpleValue(v), start));
                }
                (Header::Simple(v), true)
            }
            25 => {
                let raw = u16::from_be_bytes(self.read(|c| c.read_array(), start)?);
                let f = half::f16::from_bits(raw);
                let v = if f.is_nan() {
                    widen_nan(raw >> 15 != 0, (raw & 0x3FF) as u64, 42)
                } else {
                    f.into()
                };
                (Header::Float(v), true)
            }
            26 => {
                let raw = u32::from_be_bytes(self.read(|c| c.read_array(), start)?);
                let f = f32::from_bits(raw);
                let v = if f.is_nan() {
                    widen_nan(raw >> 31 != 0, (raw & 0x7F_FFFF) as u64, 29)
                } else {
                    f.into()
                };
                (Header::Float(v), shortest_float_width(v) == 26)
            }
            27 => {
                let v = f64::from_be_bytes(self.read(|c| c.read_array(), start)?);
                (Header::Float(v), shortest_float_width(v) == 27)
            }
            _ => return Err(Error::new(ErrorKind::InvalidAdditionalInfo(ai), start)),
        })
    }

    /// Read the next item's header.
    ///
    /// Counts the item against `max_item_count`, applies the canonical form
    /// checks when `strict_canonical_decode` is set, and rejects definite
    /// array and map lengths that the remaining input cannot possibly hold.
    pub fn header(&mut self) -> Result<Header, Error> {
        let start = self.cursor.offset();
        let initial = self.read(|c| c.read_u8(), start)?;
        if initial == 0xFF {
            return Err(Error::new(ErrorKind::UnexpectedBreak, start));
        }
        self.count_item(start)?;

        let (major, ai) = (initial >> 5, initial & 0x1F);
        let (header, shortest) = if major == 7 {
            self.read_simple(ai, start)?
        } else {
            let (arg, shortest) = self.read_argument(ai, start)?;
            let header = match (major, arg) {
                (0, Some(v)) => Header::Unsigned(v),
                (1, Some(v)) => Header::Negative(v),
                (2, len) => Header::Bytes(len),
                (3, len) => Header::Text(len),
                (4, len) => Header::Array(len),
                (5, len) => Header::Map(len),
                (6, Some(v)) => Header::Tag(v),
                _ => {
                    return Err(Error::new(
                        ErrorKind::IndefiniteLengthNotSupportedHere,
                        start,
                    ));
                }
            };
            (header, shortest)
        };

        if self.options.strict_canonical_decode && !shortest {
            return Err(Error::new(ErrorKind::NonCanonical, start));
        }

        let remaining = self.cursor.remaining() as u64;
        match header {
            Header::Array(Some(n)) if n > remaining => {
                Err(Error::new(ErrorKind::TruncatedInput, start))
            }
            Header::Map(Some(n)) if n.saturating_mul(2) > remaining => {
                Err(Error::new(ErrorKind::TruncatedInput, start))
            }
            header => Ok(header),
        }
    }

    /// Read the next header without consuming it.
    pub fn peek_header(&mut self) -> Result<Header, Error> {
        let cursor = self.cursor.clone();
        let items = self.items;
        let r = self.header();
        self.cursor = cursor;
        self.items = items;
        r
    }

    pub fn peek_tag(&mut self) -> Result<Option<u64>, Error> {
        match self.peek_header()? {
            Header::Tag(tag) => Ok(Some(tag)),
            _ => Ok(None),
        }
    }

    pub(crate) fn type_error(expected: &'static str, found: &Header, start: usize) -> Error {
        Error::new(
            ErrorKind::InvalidMajorType {
                expected,
                found: found.type_name(),
            },
            start,
        )
    }

    /// Decode the next item, whatever it is.
    pub fn item(&mut self) -> Result<Item, Error> {
        let start = self.offset();
        Ok(match self.header()? {
            Header::Unsigned(n) => Item::Unsigned(n),
            Header::Negative(n) => Item::Negative(n),
            Header::Bytes(len) => Item::Bytes(self.collect_string(2, len, start)?.into_owned()),
            Header::Text(len) => {
                let data = self.collect_string(3, len, start)?;
                Item::Text(into_text(data, start)?.into_owned())
            }
            Header::Array(len) => Item::Array(self.sequence::<1, _, _>(len, start, |a| {
                let mut items = Vec::with_capacity(a.len().unwrap_or(0));
                while let Some(item) = a.try_item()? {
                    items.push(item);
                }
                Ok(items)
            })?),
            Header::Map(len) => Item::Map(self.sequence::<2, _, _>(len, start, |m| {
                let mut pairs = Vec::with_capacity(m.len().unwrap_or(0));
                while let Some(key) = m.try_item()? {
                    pairs.push((key, m.item()?));
                }
                Ok(pairs)
            })?),
            Header::Tag(tag) => {
                self.enter(start)?;
                let item = self.item()?;
                self.leave();
                Item::Tagged(tag, Box::new(item))
            }
            Header::Simple(20) => Item::Bool(false),
            Header::Simple(21) => Item::Bool(true),
            Header::Simple(22) => Item::Null,
            Header::Simple(23) => Item::Undefined,
            Header::Simple(v) => Item::Simple(
                Simple::new(v).ok_or(Error::new(ErrorKind::InvalidSimpleValue(v), start))?,
            ),
            Header::Float(v) => Item::Float(v),
        })
    }

    /// Step over the next item, checking it as thoroughly as `item` would.
    pub fn skip(&mut self) -> Result<(), Error> {
        let start = self.offset();
        match self.header()? {
            Header::Bytes(len) => self.string_chunks(2, len, start)?.try_for_each(|c| c.map(|_| ())),
            Header::Text(len) => self.string_chunks(3, len, start)?.try_for_each(|c| c.map(|_| ())),
            Header::Array(len) => self.sequence::<1, _, _>(len, start, |a| a.skip_rest()),
            Header::Map(len) => self.sequence::<2, _, _>(len, start, |m| m.skip_rest()),
            Header::Tag(_) => {
                self.enter(start)?;
                self.skip()?;
                self.leave();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn string_chunks<'d>(
        &'d mut self,
        major: u8,
        len: Option<u64>,
        start: usize,
    ) -> Result<Chunks<'d, 'a>, Error> {
        let state = match len {
            Some(len) => {
                let data = self.read(|c| c.read_slice(len), start)?;
                if major == 3 && core::str::from_utf8(data).is_err() {
                    return Err(Error::new(ErrorKind::MalformedUtf8, start));
                }
                ChunksState::Definite(data)
            }
            None => ChunksState::Indefinite,
        };
        Ok(Chunks {
            decoder: self,
            major,
            state,
        })
    }

    fn collect_string(
        &mut self,
        major: u8,
        len: Option<u64>,
        start: usize,
    ) -> Result<Cow<'a, [u8]>, Error> {
        let mut chunks = self.string_chunks(major, len, start)?;
        if let ChunksState::Definite(data) = chunks.state {
            return Ok(Cow::Borrowed(data));
        }
        let mut data = Vec::new();
        for chunk in &mut chunks {
            data.extend_from_slice(chunk?);
        }
        Ok(Cow::Owned(data))
    }

    /// Iterate the chunks of the next byte or text string.
    ///
    /// A definite-length string yields exactly one chunk.
    pub fn chunks(&mut self) -> Result<Chunks<'_, 'a>, Error> {
        let start = self.offset();
        match self.header()? {
            Header::Bytes(len) => self.string_chunks(2, len, start),
            Header::Text(len) => self.string_chunks(3, len, start),
            h => Err(Self::type_error("Byte or Text String", &h, start)),
        }
    }

    pub fn unsigned(&mut self) -> Result<u64, Error> {
        let start = self.offset();
        match self.header()? {
            Header::Unsigned(n) => Ok(n),
            h => Err(Self::type_error("Unsigned Integer", &h, start)),
        }
    }

    /// Decode an integer of either sign into `T`, failing with
    /// `IntegerOverflow` rather than wrapping.
    pub fn integer<T>(&mut self) -> Result<T, Error>
    where
        T: TryFrom<i128>,
    {
        let start = self.offset();
        let v = match self.header()? {
            Header::Unsigned(n) => n as i128,
            Header::Negative(n) => -1 - n as i128,
            h => return Err(Self::type_error("Integer", &h, start)),
        };
        T::try_from(v).map_err(|_| Error::new(ErrorKind::IntegerOverflow, start))
    }

    pub fn float(&mut self) -> Result<f64, Error> {
        let start = self.offset();
        match self.header()? {
            Header::Float(v) => Ok(v),
            h => Err(Self::type_error("Float", &h, start)),
        }
    }

    pub fn bool(&mut self) -> Result<bool, Error> {
        let start = self.offset();
        match self.header()? {
            Header::Simple(20) => Ok(false),
            Header::Simple(21) => Ok(true),
            h => Err(Self::type_error("Boolean", &h, start)),
        }
    }

    pub fn null(&mut self) -> Result<(), Error> {
        let start = self.offset();
        match self.header()? {
            Header::Simple(22) => Ok(()),
            h => Err(Self::type_error("Null", &h, start)),
        }
    }

    /// Consume a null or undefined if it is next, returning whether one was.
    pub fn try_null(&mut self) -> Result<bool, Error> {
        match self.peek_header()? {
            Header::Simple(22 | 23) => {
                self.header()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// A byte string, borrowed from the input unless it was chunked.
    pub fn bytes(&mut self) -> Result<Cow<'a, [u8]>, Error> {
        let start = self.offset();
        match self.header()? {
            Header::Bytes(len) => self.collect_string(2, len, start),
            h => Err(Self::type_error("Byte String", &h, start)),
        }
    }

    /// A text string, borrowed from the input unless it was chunked.
    pub fn text(&mut self) -> Result<Cow<'a, str>, Error> {
        let start = self.offset();
        match self.header()? {
            Header::Text(len) => {
                let data = self.collect_string(3, len, start)?;
                into_text(data, start)
            }
            h => Err(Self::type_error("Text String", &h, start)),
        }
    }

    /// Decode a tagged item, passing the tag number to `f`.
    pub fn tagged<T, F>(&mut self, f: F) -> Result<T, Error>
    where
        F: FnOnce(u64, &mut Self) -> Result<T, Error>,
    {
        let start = self.offset();
        match self.header()? {
            Header::Tag(tag) => {
                self.enter(start)?;
                let r = f(tag, self)?;
                self.leave();
                Ok(r)
            }
            h => Err(Self::type_error("Tag", &h, start)),
        }
    }

    /// Decode an item that must carry the tag `expected`.
    pub fn expect_tag<T, F>(&mut self, expected: u64, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Self) -> Result<T, Error>,
    {
        let start = self.offset();
        match self.header()? {
            Header::Tag(tag) if tag == expected => {
                self.enter(start)?;
                let r = f(self)?;
                self.leave();
                Ok(r)
            }
            Header::Tag(tag) => Err(Error::new(
                ErrorKind::TagMismatch {
                    expected,
                    found: Some(tag),
                },
                start,
            )),
            _ => Err(Error::new(
                ErrorKind::TagMismatch {
                    expected,
                    found: None,
                },
                start,
            )),
        }
    }

    fn sequence<const D: usize, T, F>(
        &mut self,
        len: Option<u64>,
        start: usize,
        f: F,
    ) -> Result<T, Error>
    where
        F: FnOnce(&mut Sequence<'_, 'a, D>) -> Result<T, Error>,
    {
        self.enter(start)?;
        let mut seq = Sequence::new(self, len.map(|n| n as usize * D));
        let r = f(&mut seq)?;
        seq.complete()?;
        self.leave();
        Ok(r)
    }

    /// Decode an array; every item must be consumed by `f`.
    pub fn array<T, F>(&mut self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Array<'_, 'a>) -> Result<T, Error>,
    {
        let start = self.offset();
        match self.header()? {
            Header::Array(len) => self.sequence(len, start, f),
            h => Err(Self::type_error("Array", &h, start)),
        }
    }

    /// Decode a map; every key and value must be consumed by `f`.
    pub fn map<T, F>(&mut self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Map<'_, 'a>) -> Result<T, Error>,
    {
        let start = self.offset();
        match self.header()? {
            Header::Map(len) => self.sequence(len, start, f),
            h => Err(Self::type_error("Map", &h, start)),
        }
    }

    /// Decode either an array or a map, whichever is next.
    pub fn array_or_map<T, A, M>(&mut self, array: A, map: M) -> Result<T, Error>
    where
        A: FnOnce(&mut Array<'_, 'a>) -> Result<T, Error>,
        M: FnOnce(&mut Map<'_, 'a>) -> Result<T, Error>,
    {
        let start = self.offset();
        match self.header()? {
            Header::Array(len) => self.sequence(len, start, array),
            Header::Map(len) => self.sequence(len, start, map),
            h => Err(Self::type_error("Array or Map", &h, start)),
        }
    }

    pub fn parse<T>(&mut self) -> Result<T, Error>
    where
        T: FromCbor,
    {
        T::from_cbor(self)
    }
}

fn into_text(data: Cow<'_, [u8]>, start: usize) -> Result<Cow<'_, str>, Error> {
    let malformed = Error::new(ErrorKind::MalformedUtf8, start);
    Ok(match data {
        Cow::Borrowed(b) => Cow::Borrowed(core::str::from_utf8(b).map_err(|_| malformed)?),
        Cow::Owned(v) => Cow::Owned(String::from_utf8(v).map_err(|_| malformed)?),
    })
}

#[derive(Clone, Copy)]
enum ChunksState<'a> {
    Definite(&'a [u8]),
    Indefinite,
    Done,
}

/// Lazy walk over the chunks of a byte or text string.
///
/// Text chunks are checked to be valid UTF-8 on their own.
pub struct Chunks<'d, 'a> {
    decoder: &'d mut Decoder<'a>,
    major: u8,
    state: ChunksState<'a>,
}

impl<'a> Chunks<'_, 'a> {
    pub fn is_text(&self) -> bool {
        self.major == 3
    }

    fn next_chunk(&mut self) -> Result<Option<&'a [u8]>, Error> {
        let start = self.decoder.offset();
        match self.decoder.cursor.peek() {
            None => return Err(Error::new(ErrorKind::TruncatedInput, start)),
            Some(0xFF) => {
                self.decoder.read(|c| c.read_u8(), start)?;
                return Ok(None);
            }
            Some(b) if b >> 5 != self.major || b & 0x1F == 31 => {
                return Err(Error::new(ErrorKind::InvalidChunk, start));
            }
            _ => {}
        }
        let len = match self.decoder.header()? {
            Header::Bytes(Some(len)) | Header::Text(Some(len)) => len,
            _ => return Err(Error::new(ErrorKind::InvalidChunk, start)),
        };
        let chunk = self.decoder.read(|c| c.read_slice(len), start)?;
        if self.major == 3 && core::str::from_utf8(chunk).is_err() {
            return Err(Error::new(ErrorKind::MalformedUtf8, start));
        }
        Ok(Some(chunk))
    }
}

impl<'a> Iterator for Chunks<'_, 'a> {
    type Item = Result<&'a [u8], Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            ChunksState::Done => None,
            ChunksState::Definite(data) => {
                self.state = ChunksState::Done;
                Some(Ok(data))
            }
            ChunksState::Indefinite => match self.next_chunk() {
                Ok(Some(chunk)) => Some(Ok(chunk)),
                Ok(None) => {
                    self.state = ChunksState::Done;
                    None
                }
                Err(e) => {
                    self.state = ChunksState::Done;
                    Some(Err(e))
                }
            },
        }
    }
}

/// Reader over the items of an array (`D == 1`) or the keys and values of a
/// map (`D == 2`).
pub struct Sequence<'d, 'a, const D: usize> {
    decoder: &'d mut Decoder<'a>,
    count: Option<usize>,
    parsed: usize,
}

pub type Array<'d, 'a> = Sequence<'d, 'a, 1>;
pub type Map<'d, 'a> = Sequence<'d, 'a, 2>;

impl<'d, 'a, const D: usize> Sequence<'d, 'a, D> {
    fn new(decoder: &'d mut Decoder<'a>, count: Option<usize>) -> Self {
        Self {
            decoder,
            count,
            parsed: 0,
        }
    }

    /// Number of items (or pairs), if the length is definite.
    pub fn len(&self) -> Option<usize> {
        self.count.map(|c| c / D)
    }

    pub fn is_definite(&self) -> bool {
        self.count.is_some()
    }

    pub fn offset(&self) -> usize {
        self.decoder.offset()
    }

    pub fn options(&self) -> &Options {
        &self.decoder.options
    }

    fn check_for_end(&mut self) -> Result<bool, Error> {
        if let Some(count) = self.count {
            return Ok(self.parsed >= count);
        }
        let start = self.decoder.offset();
        match self.decoder.cursor.peek() {
            None => Err(Error::new(ErrorKind::TruncatedInput, start)),
            Some(0xFF) if self.parsed % D == 1 => Err(Error::new(ErrorKind::PartialMap, start)),
            Some(0xFF) => {
                self.decoder.read(|c| c.read_u8(), start)?;
                self.count = Some(self.parsed);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Whether every item has been read, consuming the break of an
    /// indefinite-length sequence.
    pub fn at_end(&mut self) -> Result<bool, Error> {
        self.check_for_end()
    }

    fn complete(mut self) -> Result<(), Error> {
        if !self.check_for_end()? {
            return Err(Error::new(ErrorKind::AdditionalItems, self.decoder.offset()));
        }
        Ok(())
    }

    /// Decode the next item with `f`, or return `None` at the end.
    pub fn try_with<T, F>(&mut self, f: F) -> Result<Option<T>, Error>
    where
        F: FnOnce(&mut Decoder<'a>) -> Result<T, Error>,
    {
        if self.check_for_end()? {
            return Ok(None);
        }
        let r = f(&mut *self.decoder)?;
        self.parsed += 1;
        Ok(Some(r))
    }

    pub fn with<T, F>(&mut self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Decoder<'a>) -> Result<T, Error>,
    {
        let offset = self.decoder.offset();
        self.try_with(f)?
            .ok_or(Error::new(ErrorKind::MissingItems, offset))
    }

    pub fn try_parse<T>(&mut self) -> Result<Option<T>, Error>
    where
        T: FromCbor,
    {
        self.try_with(T::from_cbor)
    }

    pub fn parse<T>(&mut self) -> Result<T, Error>
    where
        T: FromCbor,
    {
        self.with(T::from_cbor)
    }

    pub fn try_item(&mut self) -> Result<Option<Item>, Error> {
        self.try_with(Decoder::item)
    }

    pub fn item(&mut self) -> Result<Item, Error> {
        self.with(Decoder::item)
    }

    /// Skip the next item; returns `false` at the end.
    pub fn skip(&mut self) -> Result<bool, Error> {
        self.try_with(Decoder::skip).map(|r| r.is_some())
    }

    pub fn skip_rest(&mut self) -> Result<(), Error> {
        while self.skip()? {}
        Ok(())
    }
}

macro_rules! impl_int_from_cbor {
    ($($ty:ty),*) => {
        $(
            impl FromCbor for $ty {
                fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
                    decoder.integer()
                }
            }
        )*
    };
}

impl_int_from_cbor!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl FromCbor for f64 {
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        decoder.float()
    }
}

impl FromCbor for f32 {
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        let start = decoder.offset();
        let v = decoder.float()?;
        if v.is_nan() {
            return Ok(f32::NAN);
        }
        lossless_float_coerce(v).ok_or(Error::new(ErrorKind::FloatPrecisionLoss, start))
    }
}

impl FromCbor for half::f16 {
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        let start = decoder.offset();
        let v = decoder.float()?;
        if v.is_nan() {
            return Ok(half::f16::NAN);
        }
        lossless_float_coerce(v).ok_or(Error::new(ErrorKind::FloatPrecisionLoss, start))
    }
}

impl FromCbor for bool {
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        decoder.bool()
    }
}

impl FromCbor for () {
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        decoder.null()
    }
}

impl FromCbor for String {
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        decoder.text().map(Cow::into_owned)
    }
}

impl FromCbor for ByteBuf {
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        decoder.bytes().map(|b| ByteBuf(b.into_owned()))
    }
}

impl<const N: usize> FromCbor for [u8; N] {
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        let start = decoder.offset();
        let data = decoder.bytes()?;
        data.as_ref().try_into().map_err(|_| {
            Error::new(
                ErrorKind::InvalidValue(format!(
                    "Expecting {N} bytes, found {}",
                    data.len()
                )),
                start,
            )
        })
    }
}

impl<T> FromCbor for Option<T>
where
    T: FromCbor,
{
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        if decoder.try_null()? {
            Ok(None)
        } else {
            T::from_cbor(decoder).map(Some)
        }
    }
}

impl<T> FromCbor for Box<T>
where
    T: FromCbor,
{
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        T::from_cbor(decoder).map(Box::new)
    }
}

impl<T> FromCbor for Vec<T>
where
    T: FromCbor,
{
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        decoder.array(|a| {
            let mut v = Vec::with_capacity(a.len().unwrap_or(0));
            while let Some(item) = a.try_parse()? {
                v.push(item);
            }
            Ok(v)
        })
    }
}

impl<K, V> FromCbor for BTreeMap<K, V>
where
    K: FromCbor + Ord,
    V: FromCbor,
{
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        decoder.map(|m| {
            let mut r = BTreeMap::new();
            while let Some(k) = m.try_parse()? {
                let v = m.parse()?;
                r.entry(k).or_insert(v);
            }
            Ok(r)
        })
    }
}

impl<K, V, S> FromCbor for HashMap<K, V, S>
where
    K: FromCbor + Eq + core::hash::Hash,
    V: FromCbor,
    S: core::hash::BuildHasher + Default,
{
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        decoder.map(|m| {
            let mut r = HashMap::with_capacity_and_hasher(m.len().unwrap_or(0), S::default());
            while let Some(k) = m.try_parse()? {
                let v = m.parse()?;
                r.entry(k).or_insert(v);
            }
            Ok(r)
        })
    }
}

macro_rules! impl_tuple_from_cbor {
    ($( ($($name:ident),+) ),*) => {
        $(
            impl<$($name),+> FromCbor for ($($name,)+)
            where
                $($name: FromCbor),+
            {
                fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
                    decoder.array(|a| Ok(($(a.parse::<$name>()?,)+)))
                }
            }
        )*
    };
}

impl_tuple_from_cbor!(
    (A),
    (A, B),
    (A, B, C),
    (A, B, C, D),
    (A, B, C, D, E),
    (A, B, C, D, E, F),
    (A, B, C, D, E, F, G),
    (A, B, C, D, E, F, G, H)
);

impl FromCbor for Item {
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        decoder.item()
    }
}
