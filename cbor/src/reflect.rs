/*!
Record and variant layouts, driven by the `Record` contract rather than by
hand-written per-type code.

`#[derive(ToCbor, FromCbor)]` generates `Record` impls for structs and calls
the helpers here for enums; the same functions are available for types that
implement `Record` by hand.
*/

use super::*;
use super::decode::Header;

/// One field of a record, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// The map key used in map layout.
    pub name: &'static str,
    /// Optional fields may be missing on decode, and are written as absent
    /// when `Record::is_absent` says so.
    pub optional: bool,
}

impl Field {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            optional: false,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            optional: true,
        }
    }
}

/// A type describable as a sequence of named fields.
///
/// `Builder` collects decoded fields in any order; `build` turns it into the
/// value, or names the first required field that was never decoded.
pub trait Record: Sized {
    const FIELDS: &'static [Field];

    /// A layout that overrides `Options::field_encoding`.
    const ENCODING: Option<FieldEncoding> = None;

    type Builder: Default;

    fn is_absent(&self, _index: usize) -> bool {
        false
    }

    fn encode_field(&self, index: usize, encoder: &mut Encoder);

    fn decode_field(
        builder: &mut Self::Builder,
        index: usize,
        decoder: &mut Decoder<'_>,
    ) -> Result<(), Error>;

    fn build(builder: Self::Builder) -> Result<Self, &'static str>;
}

/// Write fields as an array or a map.
///
/// Absent optional fields keep their slot in an array as null or undefined;
/// in a map they are left out unless `Options::absent_fields` asks for a
/// marker.
pub fn encode_fields<A, F>(
    encoder: &mut Encoder,
    fields: &[Field],
    forced: Option<FieldEncoding>,
    is_absent: A,
    mut encode: F,
) where
    A: Fn(usize) -> bool,
    F: FnMut(usize, &mut Encoder),
{
    let absent = |index: usize| fields[index].optional && is_absent(index);
    match forced.unwrap_or(encoder.options().field_encoding) {
        FieldEncoding::Array => encoder.emit_array(Some(fields.len()), |a| {
            for index in 0..fields.len() {
                if absent(index) {
                    a.emit_absent();
                } else {
                    a.emit_with(|e| encode(index, e));
                }
            }
        }),
        FieldEncoding::Map => {
            let omit = encoder.options().absent_fields == AbsentFields::Omit;
            let count = (0..fields.len())
                .filter(|&index| !(omit && absent(index)))
                .count();
            encoder.emit_map(Some(count), |m| {
                for (index, field) in fields.iter().enumerate() {
                    if absent(index) {
                        if !omit {
                            m.emit(field.name);
                            m.emit_absent();
                        }
                    } else {
                        m.emit(field.name);
                        m.emit_with(|e| encode(index, e));
                    }
                }
            })
        }
    }
}

/// Read fields from either layout, calling `decode` with each field's index.
///
/// Array items are matched to fields by position and extra items are an
/// error. Map keys are matched by name: unknown keys are skipped, and only
/// the first occurrence of a repeated key is decoded.
pub fn decode_fields<F>(decoder: &mut Decoder<'_>, fields: &[Field], mut decode: F) -> Result<(), Error>
where
    F: FnMut(usize, &mut Decoder<'_>) -> Result<(), Error>,
{
    let start = decoder.offset();
    match decoder.peek_header()? {
        Header::Array(_) => decoder.array(|a| {
            for index in 0..fields.len() {
                if a.try_with(|d| decode(index, d))?.is_none() {
                    break;
                }
            }
            Ok(())
        }),
        Header::Map(_) => decoder.map(|m| {
            let mut seen = vec![false; fields.len()];
            while let Some(key) = m.try_item()? {
                match key
                    .as_text()
                    .and_then(|k| fields.iter().position(|f| f.name == k))
                {
                    Some(index) if !seen[index] => {
                        seen[index] = true;
                        m.with(|d| decode(index, d))?;
                    }
                    _ => {
                        m.skip()?;
                    }
                }
            }
            Ok(())
        }),
        h => Err(Decoder::type_error("Array or Map", &h, start)),
    }
}

pub fn encode_record<R>(value: &R, encoder: &mut Encoder)
where
    R: Record,
{
    encode_fields(
        encoder,
        R::FIELDS,
        R::ENCODING,
        |index| value.is_absent(index),
        |index, e| value.encode_field(index, e),
    )
}

pub fn decode_record<R>(decoder: &mut Decoder<'_>) -> Result<R, Error>
where
    R: Record,
{
    let start = decoder.offset();
    let mut builder = R::Builder::default();
    decode_fields(decoder, R::FIELDS, |index, d| {
        R::decode_field(&mut builder, index, d)
    })?;
    R::build(builder).map_err(|name| Error::new(ErrorKind::MissingField(name), start))
}

/// Write `[id, payload]`.
pub fn encode_variant<F>(encoder: &mut Encoder, id: u64, payload: F)
where
    F: FnOnce(&mut Encoder),
{
    encoder.emit_array(Some(2), |a| {
        a.emit(&id);
        a.emit_with(payload);
    })
}

/// Read `[id, payload]`; `f` returns `None` for an id it does not know.
pub fn decode_variant<T, F>(decoder: &mut Decoder<'_>, ty: &'static str, f: F) -> Result<T, Error>
where
    F: FnOnce(u64, &mut Decoder<'_>) -> Result<Option<T>, Error>,
{
    let start = decoder.offset();
    decoder.array(|a| {
        let id = a.parse::<u64>()?;
        a.with(|d| f(id, d))?.ok_or(Error::new(
            ErrorKind::UnknownVariant {
                ty,
                discriminant: id,
            },
            start,
        ))
    })
}

/// Read a bare discriminant; `f` returns `None` for one it does not know.
pub fn decode_unit_variant<T, F>(decoder: &mut Decoder<'_>, ty: &'static str, f: F) -> Result<T, Error>
where
    F: FnOnce(u64) -> Option<T>,
{
    let start = decoder.offset();
    let id = decoder.parse::<u64>()?;
    f(id).ok_or(Error::new(
        ErrorKind::UnknownVariant {
            ty,
            discriminant: id,
        },
        start,
    ))
}

/// Read `tag(payload)`; `f` returns `None` for a tag it does not know.
pub fn decode_tagged_variant<T, F>(
    decoder: &mut Decoder<'_>,
    ty: &'static str,
    f: F,
) -> Result<T, Error>
where
    F: FnOnce(u64, &mut Decoder<'_>) -> Result<Option<T>, Error>,
{
    let start = decoder.offset();
    decoder.tagged(|tag, d| {
        f(tag, d)?.ok_or(Error::new(
            ErrorKind::UnknownVariant {
                ty,
                discriminant: tag,
            },
            start,
        ))
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    #[derive(Debug, PartialEq)]
    struct Reading {
        sensor: String,
        value: i32,
        unit: Option<String>,
    }

    impl Record for Reading {
        const FIELDS: &'static [Field] = &[
            Field::required("sensor"),
            Field::required("value"),
            Field::optional("unit"),
        ];

        type Builder = (Option<String>, (Option<i32>, (Option<Option<String>>, ())));

        fn is_absent(&self, index: usize) -> bool {
            index == 2 && self.unit.is_none()
        }

        fn encode_field(&self, index: usize, encoder: &mut Encoder) {
            match index {
                0 => encoder.emit(&self.sensor),
                1 => encoder.emit(&self.value),
                _ => encoder.emit(&self.unit),
            }
        }

        fn decode_field(
            builder: &mut Self::Builder,
            index: usize,
            decoder: &mut Decoder<'_>,
        ) -> Result<(), Error> {
            match index {
                0 => builder.0 = Some(decoder.parse()?),
                1 => builder.1.0 = Some(decoder.parse()?),
                _ => builder.1.1.0 = Some(decoder.parse()?),
            }
            Ok(())
        }

        fn build(builder: Self::Builder) -> Result<Self, &'static str> {
            let (sensor, (value, (unit, ()))) = builder;
            Ok(Self {
                sensor: sensor.ok_or("sensor")?,
                value: value.ok_or("value")?,
                unit: unit.unwrap_or_default(),
            })
        }
    }

    impl ToCbor for Reading {
        fn to_cbor(&self, encoder: &mut Encoder) {
            encode_record(self, encoder)
        }
    }

    impl FromCbor for Reading {
        fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
            decode_record(decoder)
        }
    }

    fn reading() -> Reading {
        Reading {
            sensor: "t".to_string(),
            value: -5,
            unit: None,
        }
    }

    #[test]
    fn map_layout() {
        let data = to_vec(&reading());
        assert_eq!(data, hex!("a2 66 73656e736f72 61 74 65 76616c7565 24"));
        assert_eq!(decode::<Reading>(&data).unwrap(), reading());

        let options = Options::default().with_absent_fields(AbsentFields::Null);
        let data = encode::emit_with_options(&reading(), &options);
        assert_eq!(
            data,
            hex!("a3 66 73656e736f72 61 74 65 76616c7565 24 64 756e6974 f6")
        );
        assert_eq!(decode::<Reading>(&data).unwrap(), reading());
    }

    #[test]
    fn array_layout() {
        let options = Options::default().with_field_encoding(FieldEncoding::Array);
        let data = encode::emit_with_options(&reading(), &options);
        assert_eq!(data, hex!("83 61 74 24 f6"));
        assert_eq!(decode::<Reading>(&data).unwrap(), reading());

        let options = options.with_absent_fields(AbsentFields::Undefined);
        assert_eq!(
            encode::emit_with_options(&reading(), &options),
            hex!("83 61 74 24 f7")
        );

        // Trailing optional fields may be left off
        assert_eq!(decode::<Reading>(&hex!("82 61 74 24")).unwrap(), reading());

        assert_eq!(
            decode::<Reading>(&hex!("84 61 74 24 f6 00")).unwrap_err().kind,
            ErrorKind::AdditionalItems
        );
    }

    #[test]
    fn map_keys() {
        // Unknown keys are skipped, the first duplicate wins
        let data = hex!(
            "a4 61 7a 80 65 76616c7565 01 65 76616c7565 02 66 73656e736f72 61 74"
        );
        assert_eq!(
            decode::<Reading>(&data).unwrap(),
            Reading {
                sensor: "t".to_string(),
                value: 1,
                unit: None,
            }
        );

        let e = decode::<Reading>(&hex!("a1 65 76616c7565 01")).unwrap_err();
        assert_eq!(e.kind, ErrorKind::MissingField("sensor"));
        assert_eq!(e.offset, 0);

        assert_eq!(
            decode::<Reading>(&hex!("01")).unwrap_err().kind,
            ErrorKind::InvalidMajorType {
                expected: "Array or Map",
                found: "Unsigned Integer"
            }
        );
    }

    #[test]
    fn variants() {
        let mut e = Encoder::new();
        encode_variant(&mut e, 1, |e| e.emit("x"));
        let data = e.build();
        assert_eq!(data, hex!("82 01 61 78"));

        let mut d = Decoder::new(&data);
        let r = decode_variant(&mut d, "Shape", |id, d| match id {
            1 => d.parse::<String>().map(Some),
            _ => Ok(None),
        });
        assert_eq!(r, Ok("x".to_string()));

        let mut d = Decoder::new(&data);
        let r = decode_variant(&mut d, "Shape", |_, _| Ok(None::<String>));
        assert_eq!(
            r.unwrap_err().kind,
            ErrorKind::UnknownVariant {
                ty: "Shape",
                discriminant: 1
            }
        );

        let tagged = hex!("d8 64 f6");
        let mut d = Decoder::new(&tagged);
        let r = decode_tagged_variant(&mut d, "Shape", |tag, d| match tag {
            100 => d.parse::<()>().map(|_| Some(tag)),
            _ => Ok(None),
        });
        assert_eq!(r, Ok(100));
    }
}
