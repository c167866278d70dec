use super::*;
use hex_literal::hex;

#[derive(Debug, Clone, PartialEq, ToCbor, FromCbor)]
#[cbor(tag = 1000)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Debug, PartialEq, ToCbor, FromCbor)]
#[cbor(encoding = "array")]
struct Span {
    start: u64,
    end: u64,
}

#[derive(Debug, Default, PartialEq, ToCbor, FromCbor)]
struct Config {
    #[cbor(rename = "n")]
    name: String,
    port: Option<u16>,
    #[cbor(default)]
    retries: u8,
}

#[derive(Debug, PartialEq, ToCbor, FromCbor)]
enum Shape {
    Empty,
    Circle(u32),
    Rect(u32, u32),
    #[cbor(id = 10)]
    Labelled { label: String, size: Option<u32> },
}

#[derive(Debug, PartialEq, ToCbor, FromCbor)]
enum Message {
    #[cbor(tag = 40000)]
    Ping(u64),
    #[cbor(tag = 40001)]
    Text(String),
    #[cbor(tag = 40002)]
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, ToCbor, FromCbor)]
enum Level {
    Low,
    #[cbor(id = 30)]
    High,
    Mid,
}

#[derive(Debug, PartialEq, ToCbor, FromCbor)]
struct Pair<T> {
    first: T,
    second: T,
}

#[derive(Debug, PartialEq, ToCbor, FromCbor)]
#[cbor(tag = 1001)]
struct Meters(f64);

#[derive(Debug, PartialEq, ToCbor, FromCbor)]
struct Rgb(u8, u8, u8);

#[derive(Debug, PartialEq, ToCbor, FromCbor)]
struct Marker;

#[derive(Debug, PartialEq, ToCbor, FromCbor)]
struct Drawing {
    origin: Point,
    shapes: Vec<Shape>,
    note: Option<String>,
}

#[derive(ToCbor)]
struct Borrowed<'a> {
    key: &'a str,
}

fn config() -> Config {
    Config {
        name: "a".to_string(),
        port: None,
        retries: 3,
    }
}

#[test]
fn tagged_record() {
    let data = to_vec(&Point { x: 1, y: 2 });
    assert_eq!(data, hex!("d9 03e8 a2 61 78 01 61 79 02"));
    assert_eq!(decode::<Point>(&data), Ok(Point { x: 1, y: 2 }));
    assert_eq!(<Point as TaggedType>::TAG, 1000);

    // Fields may arrive in any order
    assert_eq!(
        decode::<Point>(&hex!("d9 03e8 a2 61 79 02 61 78 01")),
        Ok(Point { x: 1, y: 2 })
    );

    let e = decode::<Point>(&hex!("a2 61 78 01 61 79 02")).unwrap_err();
    assert_eq!(
        e.kind,
        ErrorKind::TagMismatch {
            expected: 1000,
            found: None
        }
    );
    assert_eq!(
        decode::<Point>(&hex!("d9 03e9 a2 61 78 01 61 79 02"))
            .unwrap_err()
            .kind,
        ErrorKind::TagMismatch {
            expected: 1000,
            found: Some(1001)
        }
    );

    let e = decode::<Point>(&hex!("d9 03e8 a1 61 78 01")).unwrap_err();
    assert_eq!((e.kind, e.offset), (ErrorKind::MissingField("y"), 3));
}

#[test]
fn record_layouts() {
    let p = Point { x: 1, y: -2 };
    let options = Options::default().with_field_encoding(FieldEncoding::Array);
    let data = encode::emit_with_options(&p, &options);
    assert_eq!(data, hex!("d9 03e8 82 01 21"));
    assert_eq!(decode::<Point>(&data), Ok(p.clone()));
    assert_eq!(decode_with::<Point>(&data, &options), Ok(p));

    assert_eq!(
        decode::<Point>(&hex!("d9 03e8 83 01 02 03")).unwrap_err().kind,
        ErrorKind::AdditionalItems
    );

    // A fixed layout ignores the options
    let span = Span { start: 1, end: 5 };
    assert_eq!(to_vec(&span), hex!("82 01 05"));
    assert_eq!(
        encode::emit_with_options(&span, &Options::default()),
        hex!("82 01 05")
    );
    assert_eq!(<Span as Record>::ENCODING, Some(FieldEncoding::Array));
    assert_eq!(
        decode::<Span>(&hex!("a2 63 656e64 05 65 7374617274 01")),
        Ok(span)
    );
}

#[test]
fn optional_fields() {
    let data = to_vec(&config());
    assert_eq!(data, hex!("a2 61 6e 61 61 67 72657472696573 03"));
    assert_eq!(decode::<Config>(&data), Ok(config()));

    let c = Config {
        port: Some(8080),
        ..config()
    };
    let data = to_vec(&c);
    assert_eq!(
        data,
        hex!("a3 61 6e 61 61 64 706f7274 19 1f90 67 72657472696573 03")
    );
    assert_eq!(decode::<Config>(&data), Ok(c));

    let options = Options::default().with_absent_fields(AbsentFields::Null);
    assert_eq!(
        encode::emit_with_options(&config(), &options),
        hex!("a3 61 6e 61 61 64 706f7274 f6 67 72657472696573 03")
    );
    let options = Options::default()
        .with_field_encoding(FieldEncoding::Array)
        .with_absent_fields(AbsentFields::Undefined);
    let data = encode::emit_with_options(&config(), &options);
    assert_eq!(data, hex!("83 61 61 f7 03"));
    assert_eq!(decode::<Config>(&data), Ok(config()));

    // Omitted, null and undefined all decode as absent
    for data in [
        &hex!("a1 61 6e 61 61")[..],
        &hex!("a2 61 6e 61 61 64 706f7274 f6")[..],
        &hex!("a2 61 6e 61 61 64 706f7274 f7")[..],
        &hex!("a2 61 6e 61 61 67 72657472696573 f6")[..],
        &hex!("a2 61 6e 61 61 67 72657472696573 f7")[..],
        &hex!("83 61 61 f6 f6")[..],
        &hex!("83 61 61 f7 f7")[..],
    ] {
        assert_eq!(
            decode::<Config>(data),
            Ok(Config {
                retries: 0,
                ..config()
            })
        );
    }

    assert_eq!(
        decode::<Config>(&hex!("a0")).unwrap_err().kind,
        ErrorKind::MissingField("n")
    );
    assert_eq!(
        <Config as Record>::FIELDS,
        &[
            Field::required("n"),
            Field::optional("port"),
            Field::optional("retries")
        ]
    );
}

#[test]
fn indexed_variants() {
    for (shape, data) in [
        (Shape::Empty, &hex!("82 00 f6")[..]),
        (Shape::Circle(5), &hex!("82 01 05")[..]),
        (Shape::Rect(2, 3), &hex!("82 02 82 02 03")[..]),
        (
            Shape::Labelled {
                label: "a".to_string(),
                size: None,
            },
            &hex!("82 0a a1 65 6c6162656c 61 61")[..],
        ),
        (
            Shape::Labelled {
                label: "a".to_string(),
                size: Some(7),
            },
            &hex!("82 0a a2 65 6c6162656c 61 61 64 73697a65 07")[..],
        ),
    ] {
        assert_eq!(to_vec(&shape), data);
        assert_eq!(decode::<Shape>(data), Ok(shape));
    }

    let e = decode::<Shape>(&hex!("82 05 f6")).unwrap_err();
    assert_eq!(
        (e.kind, e.offset),
        (
            ErrorKind::UnknownVariant {
                ty: "Shape",
                discriminant: 5
            },
            0
        )
    );
    assert_eq!(
        decode::<Shape>(&hex!("82 02 83 02 03 04")).unwrap_err().kind,
        ErrorKind::AdditionalItems
    );
    assert_eq!(
        decode::<Shape>(&hex!("82 0a a0")).unwrap_err().kind,
        ErrorKind::MissingField("label")
    );
}

#[test]
fn tagged_variants() {
    for (message, data) in [
        (Message::Ping(1), &hex!("d9 9c40 01")[..]),
        (Message::Text("x".to_string()), &hex!("d9 9c41 61 78")[..]),
        (Message::Stop, &hex!("d9 9c42 f6")[..]),
    ] {
        assert_eq!(to_vec(&message), data);
        assert_eq!(decode::<Message>(data), Ok(message));
    }

    assert_eq!(
        decode::<Message>(&hex!("d9 9c43 00")).unwrap_err().kind,
        ErrorKind::UnknownVariant {
            ty: "Message",
            discriminant: 40003
        }
    );
    assert_eq!(
        decode::<Message>(&hex!("01")).unwrap_err().kind,
        ErrorKind::InvalidMajorType {
            expected: "Tag",
            found: "Unsigned Integer"
        }
    );
}

#[test]
fn unit_variants() {
    for (level, data) in [
        (Level::Low, &hex!("00")[..]),
        (Level::High, &hex!("18 1e")[..]),
        (Level::Mid, &hex!("02")[..]),
    ] {
        assert_eq!(to_vec(&level), data);
        assert_eq!(decode::<Level>(data), Ok(level));
    }
    assert_eq!(
        to_vec(&vec![Level::Mid, Level::Low]),
        hex!("82 02 00")
    );

    let e = decode::<Level>(&hex!("01")).unwrap_err();
    assert_eq!(
        (e.kind, e.offset),
        (
            ErrorKind::UnknownVariant {
                ty: "Level",
                discriminant: 1
            },
            0
        )
    );
    assert_eq!(
        decode::<Level>(&hex!("82 00 f6")).unwrap_err().kind,
        ErrorKind::InvalidMajorType {
            expected: "Integer",
            found: "Array"
        }
    );
}

#[test]
fn tuple_and_unit_structs() {
    assert_eq!(to_vec(&Meters(1.5)), hex!("d9 03e9 f9 3e00"));
    assert_eq!(decode::<Meters>(&hex!("d9 03e9 f9 3e00")), Ok(Meters(1.5)));
    assert_eq!(to_vec(&Rgb(1, 2, 3)), hex!("83 01 02 03"));
    assert_eq!(decode::<Rgb>(&hex!("83 01 02 03")), Ok(Rgb(1, 2, 3)));
    assert_eq!(to_vec(&Marker), hex!("f6"));
    assert_eq!(decode::<Marker>(&hex!("f6")), Ok(Marker));
}

#[test]
fn generics() {
    let pair = Pair {
        first: 1u8,
        second: 2,
    };
    let data = to_vec(&pair);
    assert_eq!(data, hex!("a2 65 6669727374 01 66 7365636f6e64 02"));
    assert_eq!(decode::<Pair<u8>>(&data), Ok(pair));
    assert_eq!(
        decode::<Pair<String>>(&data).unwrap_err().kind,
        ErrorKind::InvalidMajorType {
            expected: "Text String",
            found: "Unsigned Integer"
        }
    );

    assert_eq!(
        to_vec(&Borrowed { key: "k" }),
        hex!("a1 63 6b6579 61 6b")
    );
}

#[test]
fn nested_records() {
    let drawing = Drawing {
        origin: Point { x: 0, y: 0 },
        shapes: vec![Shape::Circle(1), Shape::Empty],
        note: None,
    };
    let data = to_vec(&drawing);
    assert_eq!(
        data,
        hex!(
            "a2 66 6f726967696e d9 03e8 a2 61 78 00 61 79 00"
            "66 736861706573 82 82 01 01 82 00 f6"
        )
    );
    assert_eq!(decode::<Drawing>(&data), Ok(drawing));

    let item = decode_any(&data).unwrap();
    assert_eq!(
        item.get(&Item::from("origin")).map(|i| i.to_string()),
        Some(r#"1000({"x": 0, "y": 0})"#.to_string())
    );
    assert_eq!(to_vec(&item), data);
}

#[test]
fn registered_records() {
    let mut builder = RegistryBuilder::with_well_known();
    builder.register::<Point>().unwrap();
    builder
        .register_tag(40100, TypeDescriptor::of::<Shape>())
        .unwrap();
    let registry = builder.build();

    let p = Point { x: 3, y: 4 };
    let data = registry.to_vec(&p).unwrap();
    assert_eq!(data, to_vec(&p));
    assert_eq!(registry.decode(&data).unwrap().downcast::<Point>().unwrap(), p);

    let data = registry.to_vec(&Shape::Circle(2)).unwrap();
    assert_eq!(data, hex!("d9 9ca4 82 01 02"));
    assert_eq!(
        registry.decode(&data).unwrap().downcast::<Shape>().unwrap(),
        Shape::Circle(2)
    );
}
