/*!
CBOR (RFC 8949) encoding and decoding, with tag-driven derive support for
user-defined types.

```
use cbor_tags::{FromCbor, ToCbor};

#[derive(Debug, PartialEq, ToCbor, FromCbor)]
#[cbor(tag = 1000)]
struct Point {
    x: i32,
    y: i32,
}

let data = cbor_tags::to_vec(&Point { x: 1, y: 2 });
assert_eq!(data, [0xd9, 0x03, 0xe8, 0xa2, 0x61, 0x78, 0x01, 0x61, 0x79, 0x02]);
assert_eq!(cbor_tags::decode::<Point>(&data), Ok(Point { x: 1, y: 2 }));
```
*/

extern crate self as cbor_tags;

pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod io;
pub mod item;
pub mod reflect;
pub mod registry;
pub mod tags;
pub mod well_known;

pub use config::{AbsentFields, FieldEncoding, Options};
pub use decode::{Decoder, FromCbor};
pub use encode::{ByteBuf, Bytes, Encoder, Raw, ToCbor};
pub use error::{ConfigError, EncodeError, Error, ErrorKind};
pub use io::{Cursor, IoSink, Sink, SliceSink};
pub use item::{Item, Simple};
pub use reflect::{Field, Record};
pub use registry::{Decoded, Registry, RegistryBuilder, TypeDescriptor};
pub use tags::{Tagged, TaggedType, make_tag};

#[cfg(feature = "derive")]
pub use cbor_tags_derive::{FromCbor, ToCbor};

/// Encode `value` into a new buffer.
pub fn to_vec<T>(value: &T) -> Vec<u8>
where
    T: ToCbor + ?Sized,
{
    encode::emit(value)
}

/// Encode `value` into `sink`, returning the number of bytes written.
///
/// The encoding is completed before the sink is written, so a sink that
/// is too small receives nothing.
pub fn encode<T, S>(value: &T, sink: &mut S) -> Result<usize, EncodeError>
where
    T: ToCbor + ?Sized,
    S: Sink + ?Sized,
{
    encode_with(value, sink, &Options::default())
}

pub fn encode_with<T, S>(value: &T, sink: &mut S, options: &Options) -> Result<usize, EncodeError>
where
    T: ToCbor + ?Sized,
    S: Sink + ?Sized,
{
    let data = encode::emit_with_options(value, options);
    sink.write_all(&data)?;
    Ok(data.len())
}

/// Decode exactly one item from `data`; trailing bytes are an error.
pub fn decode<T>(data: &[u8]) -> Result<T, Error>
where
    T: FromCbor,
{
    decode_with(data, &Options::default())
}

pub fn decode_with<T>(data: &[u8], options: &Options) -> Result<T, Error>
where
    T: FromCbor,
{
    let mut decoder = Decoder::with_options(data, *options);
    let value = T::from_cbor(&mut decoder)?;
    decoder.finish()?;
    Ok(value)
}

/// Decode the first item of `data`, returning it and its encoded length.
pub fn decode_prefix<T>(data: &[u8], options: &Options) -> Result<(T, usize), Error>
where
    T: FromCbor,
{
    let mut decoder = Decoder::with_options(data, *options);
    let value = T::from_cbor(&mut decoder)?;
    Ok((value, decoder.offset()))
}

/// Decode one item of any shape. Tags are kept, whether known or not.
pub fn decode_any(data: &[u8]) -> Result<Item, Error> {
    decode_with(data, &Options::default())
}

pub fn decode_any_with(data: &[u8], options: &Options) -> Result<Item, Error> {
    decode_with(data, options)
}



#[cfg(all(test, feature = "derive"))]
mod reflect_tests;
