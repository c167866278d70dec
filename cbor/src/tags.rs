/*!
Tag numbers bound to types at compile time, and tags chosen at run time.
*/

use super::*;

/// A type that is always written as `tag(payload)` with the tag `TAG`.
///
/// Implemented by `#[derive(ToCbor)]` for types declared with
/// `#[cbor(tag = N)]`, and by the well-known tag types.
pub trait TaggedType {
    const TAG: u64;
}

/// A value wrapped in a tag picked at run time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tagged<T> {
    pub tag: u64,
    pub value: T,
}

pub fn make_tag<T>(tag: u64, value: T) -> Tagged<T> {
    Tagged { tag, value }
}

impl<T> Tagged<T> {
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> ToCbor for Tagged<T>
where
    T: ToCbor,
{
    fn to_cbor(&self, encoder: &mut Encoder) {
        encoder.emit_tagged(&self.value, [self.tag])
    }
}

/// Accepts any tag; check `tag` afterwards, or use `Decoder::expect_tag`
/// when only one tag is acceptable.
impl<T> FromCbor for Tagged<T>
where
    T: FromCbor,
{
    fn from_cbor(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        decoder.tagged(|tag, d| {
            Ok(Tagged {
                tag,
                value: T::from_cbor(d)?,
            })
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn runtime_tags() {
        let data = encode::emit(&make_tag(1000, "x"));
        assert_eq!(data, hex!("d9 03e8 61 78"));

        let t = decode::<Tagged<String>>(&data).unwrap();
        assert_eq!(t.tag, 1000);
        assert_eq!(t.into_inner(), "x");

        assert_eq!(
            decode::<Tagged<String>>(&hex!("61 78")).unwrap_err().kind,
            ErrorKind::InvalidMajorType {
                expected: "Tag",
                found: "Text String"
            }
        );
    }

    #[test]
    fn expected_tag() {
        let tagged = hex!("c1 01");
        let mut d = Decoder::new(&tagged);
        assert_eq!(
            d.expect_tag(2, |d| d.parse::<u8>()).unwrap_err().kind,
            ErrorKind::TagMismatch {
                expected: 2,
                found: Some(1)
            }
        );

        let untagged = hex!("01");
        let mut d = Decoder::new(&untagged);
        assert_eq!(
            d.expect_tag(2, |d| d.parse::<u8>()).unwrap_err().kind,
            ErrorKind::TagMismatch {
                expected: 2,
                found: None
            }
        );

        let mut d = Decoder::new(&tagged);
        assert_eq!(d.expect_tag(1, |d| d.parse::<u8>()), Ok(1));
    }
}
