use super::*;
use std::collections::{BTreeMap, HashMap};

pub trait ToCbor {
    fn to_cbor(&self, encoder: &mut Encoder);
}

pub struct Encoder {
    data: Vec<u8>,
    options: Options,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            data: Vec::new(),
            options,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }

    pub fn offset(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn emit_uint_minor(&mut self, major: u8, val: u64) {
        if val < 24 {
            self.data.push((major << 5) | (val as u8))
        } else if val <= u8::MAX as u64 {
            self.data.push((major << 5) | 24u8);
            self.data.push(val as u8)
        } else if val <= u16::MAX as u64 {
            self.data.push((major << 5) | 25u8);
            self.data.extend((val as u16).to_be_bytes())
        } else if val <= u32::MAX as u64 {
            self.data.push((major << 5) | 26u8);
            self.data.extend((val as u32).to_be_bytes())
        } else {
            self.data.push((major << 5) | 27u8);
            self.data.extend(val.to_be_bytes())
        }
    }

    pub fn emit_tag(&mut self, tag: u64) {
        self.emit_uint_minor(6, tag)
    }

    fn emit_tags<I>(&mut self, tags: I)
    where
        I: IntoIterator<Item = u64>,
    {
        for tag in tags {
            self.emit_tag(tag);
        }
    }

    /// Emit already-encoded CBOR verbatim.
    pub fn emit_raw_slice(&mut self, data: &[u8]) {
        self.data.extend_from_slice(data)
    }

    pub fn emit<T>(&mut self, value: &T)
    where
        T: ToCbor + ?Sized,
    {
        value.to_cbor(self)
    }

    pub fn emit_tagged<T, I>(&mut self, value: &T, tags: I)
    where
        T: ToCbor + ?Sized,
        I: IntoIterator<Item = u64>,
    {
        self.emit_tags(tags);
        self.emit(value)
    }

    pub fn emit_unsigned(&mut self, value: u64) {
        self.emit_uint_minor(0, value)
    }

    /// Emit the negative integer `-1 - value`.
    pub fn emit_negative(&mut self, value: u64) {
        self.emit_uint_minor(1, value)
    }

    pub fn emit_bytes(&mut self, value: &[u8]) {
        self.emit_uint_minor(2, value.len() as u64);
        self.data.extend_from_slice(value)
    }

    pub fn emit_text(&mut self, value: &str) {
        self.emit_uint_minor(3, value.len() as u64);
        self.data.extend_from_slice(value.as_bytes())
    }

    pub fn emit_bool(&mut self, value: bool) {
        self.data.push((7 << 5) | if value { 21 } else { 20 })
    }

    pub fn emit_null(&mut self) {
        self.data.push((7 << 5) | 22)
    }

    pub fn emit_undefined(&mut self) {
        self.data.push((7 << 5) | 23)
    }

    pub fn emit_simple(&mut self, value: Simple) {
        self.emit_uint_minor(7, value.value() as u64)
    }

    /// Emit the marker for a value that is not there, as configured by
    /// `Options::absent_fields`.
    pub fn emit_absent(&mut self) {
        match self.options.absent_fields {
            AbsentFields::Undefined => self.emit_undefined(),
            AbsentFields::Omit | AbsentFields::Null => self.emit_null(),
        }
    }

    pub fn emit_byte_stream<F>(&mut self, f: F)
    where
        F: FnOnce(&mut ByteStream),
    {
        let mut s = ByteStream::new(self);
        f(&mut s);
        s.end()
    }

    pub fn emit_text_stream<F>(&mut self, f: F)
    where
        F: FnOnce(&mut TextStream),
    {
        let mut s = TextStream::new(self);
        f(&mut s);
        s.end()
    }

    /// Emit an array; `None` for `count` gives an indefinite-length array.
    pub fn emit_array<F>(&mut self, count: Option<usize>, f: F)
    where
        F: FnOnce(&mut Array),
    {
        let mut a = Array::new(self, count);
        f(&mut a);
        a.end()
    }

    pub fn emit_slice<T>(&mut self, values: &[T])
    where
        T: ToCbor,
    {
        self.emit_array(Some(values.len()), |a| {
            for value in values {
                a.emit(value);
            }
        })
    }

    /// Emit a map; `count` is the number of key/value pairs.
    pub fn emit_map<F>(&mut self, count: Option<usize>, f: F)
    where
        F: FnOnce(&mut Map),
    {
        let mut m = Map::new(self, count);
        f(&mut m);
        m.end()
    }
}

pub struct ByteStream<'a> {
    encoder: &'a mut Encoder,
}

impl<'a> ByteStream<'a> {
    fn new(encoder: &'a mut Encoder) -> Self {
        encoder.data.push((2 << 5) | 31);
        Self { encoder }
    }

    pub fn emit(&mut self, chunk: &[u8]) {
        self.encoder.emit_bytes(chunk)
    }

    fn end(self) {
        self.encoder.data.push(0xFF)
    }
}

pub struct TextStream<'a> {
    encoder: &'a mut Encoder,
}

impl<'a> TextStream<'a> {
    fn new(encoder: &'a mut Encoder) -> Self {
        encoder.data.push((3 << 5) | 31);
        Self { encoder }
    }

    pub fn emit(&mut self, chunk: &str) {
        self.encoder.emit_text(chunk)
    }

    fn end(self) {
        self.encoder.data.push(0xFF)
    }
}

pub struct Sequence<'a, const D: usize> {
    encoder: &'a mut Encoder,
    count: Option<usize>,
    idx: usize,
}

pub type Array<'a> = Sequence<'a, 1>;
pub type Map<'a> = Sequence<'a, 2>;

impl<'a, const D: usize> Sequence<'a, D> {
    fn new(encoder: &'a mut Encoder, count: Option<usize>) -> Self {
        let major = if D == 1 { 4 } else { 5 };
        if let Some(count) = count {
            encoder.emit_uint_minor(major, count as u64);
        } else {
            encoder.data.push((major << 5) | 31);
        }
        Self {
            encoder,
            count: count.map(|c| c * D),
            idx: 0,
        }
    }

    fn next_field(&mut self) -> &mut Encoder {
        self.idx += 1;
        match self.count {
            Some(count) if self.idx > count => {
                panic!("Too many items added to definite length sequence")
            }
            _ => {}
        };
        self.encoder
    }

    fn end(self) {
        let Some(count) = self.count else {
            return self.encoder.data.push(0xFF);
        };
        if self.idx != count {
            panic!(
                "Definite length sequence is short of items: {}, expected {}",
                self.idx, count
            );
        }
    }

    pub fn options(&self) -> &Options {
        &self.encoder.options
    }

    pub fn emit<T>(&mut self, value: &T)
    where
        T: ToCbor + ?Sized,
    {
        self.next_field().emit(value)
    }

    pub fn emit_tagged<T, I>(&mut self, value: &T, tags: I)
    where
        T: ToCbor + ?Sized,
        I: IntoIterator<Item = u64>,
    {
        self.next_field().emit_tagged(value, tags)
    }

    /// Emit the next item with direct access to the encoder; `f` must emit
    /// exactly one item.
    pub fn emit_with<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Encoder),
    {
        f(self.next_field())
    }

    pub fn emit_raw_slice(&mut self, data: &[u8]) {
        self.next_field().emit_raw_slice(data)
    }

    pub fn emit_absent(&mut self) {
        self.next_field().emit_absent()
    }

    pub fn emit_array<F>(&mut self, count: Option<usize>, f: F)
    where
        F: FnOnce(&mut Array),
    {
        self.next_field().emit_array(count, f)
    }

    pub fn emit_map<F>(&mut self, count: Option<usize>, f: F)
    where
        F: FnOnce(&mut Map),
    {
        self.next_field().emit_map(count, f)
    }
}

macro_rules! impl_uint_to_cbor {
    ($($ty:ty),*) => {
        $(
            impl ToCbor for $ty {
                fn to_cbor(&self, encoder: &mut Encoder) {
                    encoder.emit_uint_minor(0, *self as u64);
                }
            }
        )*
    };
}

impl_uint_to_cbor!(u8, u16, u32, u64, usize);

fn emit_i64(encoder: &mut Encoder, val: i64) {
    if val >= 0 {
        encoder.emit_uint_minor(0, val as u64);
    } else {
        encoder.emit_uint_minor(1, !(val as u64));
    }
}

macro_rules! impl_int_to_cbor {
    ($($ty:ty),*) => {
        $(
            impl ToCbor for $ty {
                fn to_cbor(&self, encoder: &mut Encoder) {
                    emit_i64(encoder, *self as i64)
                }
            }
        )*
    };
}

impl_int_to_cbor!(i8, i16, i32, i64, isize);

pub(crate) fn lossless_float_coerce<T>(value: f64) -> Option<T>
where
    T: num_traits::FromPrimitive + Into<f64> + Copy,
{
    match <T as num_traits::FromPrimitive>::from_f64(value) {
        Some(f) if <T as Into<f64>>::into(f) == value => Some(f),
        _ => None,
    }
}

/// The additional information (25, 26 or 27) of the narrowest float that
/// holds `value` exactly. A NaN fits a width when its sign and payload do.
pub(crate) fn shortest_float_width(value: f64) -> u8 {
    if value.is_nan() {
        match value.to_bits().trailing_zeros() {
            42.. => 25,
            29.. => 26,
            _ => 27,
        }
    } else if lossless_float_coerce::<half::f16>(value).is_some() {
        25
    } else if lossless_float_coerce::<f32>(value).is_some() {
        26
    } else {
        27
    }
}

/// Build an `f64` NaN from a narrower NaN's sign and mantissa bits.
pub(crate) fn widen_nan(sign: bool, mantissa: u64, shift: u32) -> f64 {
    f64::from_bits(((sign as u64) << 63) | 0x7FF0_0000_0000_0000 | (mantissa << shift))
}

impl ToCbor for f64 {
    fn to_cbor(&self, encoder: &mut Encoder) {
        let bits = self.to_bits();
        match shortest_float_width(*self) {
            25 => {
                let f = if self.is_nan() {
                    half::f16::from_bits(
                        ((bits >> 48) as u16 & 0x8000) | 0x7C00 | ((bits >> 42) as u16 & 0x3FF),
                    )
                } else {
                    half::f16::from_f64(*self)
                };
                encoder.data.push((7 << 5) | 25);
                encoder.data.extend(f.to_be_bytes())
            }
            26 => {
                let f = if self.is_nan() {
                    f32::from_bits(
                        ((bits >> 32) as u32 & 0x8000_0000)
                            | 0x7F80_0000
                            | ((bits >> 29) as u32 & 0x7F_FFFF),
                    )
                } else {
                    *self as f32
                };
                encoder.data.push((7 << 5) | 26);
                encoder.data.extend(f.to_be_bytes())
            }
            _ => {
                encoder.data.push((7 << 5) | 27);
                encoder.data.extend(self.to_be_bytes())
            }
        }
    }
}

impl ToCbor for f32 {
    fn to_cbor(&self, encoder: &mut Encoder) {
        let v = if self.is_nan() {
            let bits = self.to_bits();
            widen_nan(bits >> 31 != 0, (bits & 0x7F_FFFF) as u64, 29)
        } else {
            f64::from(*self)
        };
        v.to_cbor(encoder)
    }
}

impl ToCbor for half::f16 {
    fn to_cbor(&self, encoder: &mut Encoder) {
        encoder.data.push((7 << 5) | 25);
        encoder.data.extend(self.to_be_bytes())
    }
}

impl ToCbor for () {
    fn to_cbor(&self, encoder: &mut Encoder) {
        encoder.emit_null()
    }
}

impl ToCbor for bool {
    fn to_cbor(&self, encoder: &mut Encoder) {
        encoder.emit_bool(*self)
    }
}

impl ToCbor for str {
    fn to_cbor(&self, encoder: &mut Encoder) {
        encoder.emit_text(self)
    }
}

impl ToCbor for String {
    fn to_cbor(&self, encoder: &mut Encoder) {
        encoder.emit_text(self)
    }
}

/// Borrowed byte string, for emitting `&[u8]` as major type 2 rather than
/// as an array of integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bytes<'a>(pub &'a [u8]);

impl ToCbor for Bytes<'_> {
    fn to_cbor(&self, encoder: &mut Encoder) {
        encoder.emit_bytes(self.0)
    }
}

/// Owned byte string.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteBuf(pub Vec<u8>);

impl ToCbor for ByteBuf {
    fn to_cbor(&self, encoder: &mut Encoder) {
        encoder.emit_bytes(&self.0)
    }
}

impl From<Vec<u8>> for ByteBuf {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

/// Pre-encoded CBOR, emitted verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Raw<'a>(pub &'a [u8]);

impl ToCbor for Raw<'_> {
    fn to_cbor(&self, encoder: &mut Encoder) {
        encoder.emit_raw_slice(self.0)
    }
}

impl<const N: usize> ToCbor for [u8; N] {
    fn to_cbor(&self, encoder: &mut Encoder) {
        encoder.emit_bytes(self)
    }
}

impl<T> ToCbor for Option<T>
where
    T: ToCbor,
{
    fn to_cbor(&self, encoder: &mut Encoder) {
        match self {
            Some(value) => encoder.emit(value),
            None => encoder.emit_absent(),
        }
    }
}

impl<T> ToCbor for [T]
where
    T: ToCbor,
{
    fn to_cbor(&self, encoder: &mut Encoder) {
        encoder.emit_slice(self)
    }
}

impl<T> ToCbor for Vec<T>
where
    T: ToCbor,
{
    fn to_cbor(&self, encoder: &mut Encoder) {
        encoder.emit_slice(self)
    }
}

impl<T> ToCbor for &T
where
    T: ToCbor + ?Sized,
{
    fn to_cbor(&self, encoder: &mut Encoder) {
        (**self).to_cbor(encoder)
    }
}

impl<T> ToCbor for Box<T>
where
    T: ToCbor + ?Sized,
{
    fn to_cbor(&self, encoder: &mut Encoder) {
        (**self).to_cbor(encoder)
    }
}

impl<K, V> ToCbor for BTreeMap<K, V>
where
    K: ToCbor,
    V: ToCbor,
{
    fn to_cbor(&self, encoder: &mut Encoder) {
        encoder.emit_map(Some(self.len()), |m| {
            for (k, v) in self {
                m.emit(k);
                m.emit(v);
            }
        })
    }
}

impl<K, V, S> ToCbor for HashMap<K, V, S>
where
    K: ToCbor,
    V: ToCbor,
{
    fn to_cbor(&self, encoder: &mut Encoder) {
        encoder.emit_map(Some(self.len()), |m| {
            for (k, v) in self {
                m.emit(k);
                m.emit(v);
            }
        })
    }
}

macro_rules! impl_tuple_to_cbor {
    ($( ($($name:ident : $idx:tt),+) ),*) => {
        $(
            impl<$($name),+> ToCbor for ($($name,)+)
            where
                $($name: ToCbor),+
            {
                fn to_cbor(&self, encoder: &mut Encoder) {
                    encoder.emit_array(Some([$($idx),+].len()), |a| {
                        $(a.emit(&self.$idx);)+
                    })
                }
            }
        )*
    };
}

impl_tuple_to_cbor!(
    (A: 0),
    (A: 0, B: 1),
    (A: 0, B: 1, C: 2),
    (A: 0, B: 1, C: 2, D: 3),
    (A: 0, B: 1, C: 2, D: 3, E: 4),
    (A: 0, B: 1, C: 2, D: 3, E: 4, F: 5),
    (A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6),
    (A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7)
);

impl ToCbor for Item {
    fn to_cbor(&self, encoder: &mut Encoder) {
        match self {
            Item::Unsigned(n) => encoder.emit_unsigned(*n),
            Item::Negative(n) => encoder.emit_negative(*n),
            Item::Bytes(b) => encoder.emit_bytes(b),
            Item::Text(s) => encoder.emit_text(s),
            Item::Array(items) => encoder.emit_slice(items),
            Item::Map(pairs) => encoder.emit_map(Some(pairs.len()), |m| {
                for (k, v) in pairs {
                    m.emit(k);
                    m.emit(v);
                }
            }),
            Item::Tagged(tag, item) => encoder.emit_tagged(item.as_ref(), [*tag]),
            Item::Bool(b) => encoder.emit_bool(*b),
            Item::Null => encoder.emit_null(),
            Item::Undefined => encoder.emit_undefined(),
            Item::Simple(s) => encoder.emit_simple(*s),
            Item::Float(f) => encoder.emit(f),
        }
    }
}

pub fn emit<T>(value: &T) -> Vec<u8>
where
    T: ToCbor + ?Sized,
{
    let mut e = Encoder::new();
    e.emit(value);
    e.build()
}

pub fn emit_with_options<T>(value: &T, options: &Options) -> Vec<u8>
where
    T: ToCbor + ?Sized,
{
    let mut e = Encoder::with_options(*options);
    e.emit(value);
    e.build()
}

pub fn emit_tagged<T, I>(value: &T, tags: I) -> Vec<u8>
where
    T: ToCbor + ?Sized,
    I: IntoIterator<Item = u64>,
{
    let mut e = Encoder::new();
    e.emit_tagged(value, tags);
    e.build()
}

pub fn emit_byte_stream<F>(f: F) -> Vec<u8>
where
    F: FnOnce(&mut ByteStream),
{
    let mut e = Encoder::new();
    e.emit_byte_stream(f);
    e.build()
}

pub fn emit_text_stream<F>(f: F) -> Vec<u8>
where
    F: FnOnce(&mut TextStream),
{
    let mut e = Encoder::new();
    e.emit_text_stream(f);
    e.build()
}

pub fn emit_array<F>(count: Option<usize>, f: F) -> Vec<u8>
where
    F: FnOnce(&mut Array),
{
    let mut e = Encoder::new();
    e.emit_array(count, f);
    e.build()
}

pub fn emit_map<F>(count: Option<usize>, f: F) -> Vec<u8>
where
    F: FnOnce(&mut Map),
{
    let mut e = Encoder::new();
    e.emit_map(count, f);
    e.build()
}
