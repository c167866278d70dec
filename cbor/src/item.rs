/*!
The owned CBOR data model, used wherever a value's shape is not known at
compile time.
*/

use core::fmt;

/// An unassigned simple value: 0..=19 or 32..=255.
///
/// 20..=23 are false/true/null/undefined and 24..=31 are reserved, so
/// neither can be held here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Simple(u8);

impl Simple {
    pub fn new(value: u8) -> Option<Self> {
        match value {
            0..=19 | 32.. => Some(Self(value)),
            _ => None,
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Unsigned(u64),
    /// The value `-1 - n`.
    Negative(u64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Item>),
    /// Pairs in encoded order; duplicate keys are kept as found.
    Map(Vec<(Item, Item)>),
    Tagged(u64, Box<Item>),
    Bool(bool),
    Null,
    Undefined,
    Simple(Simple),
    Float(f64),
}

impl Item {
    pub fn tagged(tag: u64, item: impl Into<Item>) -> Self {
        Self::Tagged(tag, Box::new(item.into()))
    }

    /// Human readable name of the item's type, as used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Unsigned(_) => "Unsigned Integer",
            Self::Negative(_) => "Negative Integer",
            Self::Bytes(_) => "Byte String",
            Self::Text(_) => "Text String",
            Self::Array(_) => "Array",
            Self::Map(_) => "Map",
            Self::Tagged(..) => "Tag",
            Self::Bool(_) => "Boolean",
            Self::Null => "Null",
            Self::Undefined => "Undefined",
            Self::Simple(_) => "Simple Value",
            Self::Float(_) => "Float",
        }
    }

    /// The integer value of an `Unsigned` or `Negative` item.
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Self::Unsigned(n) => Some(*n as i128),
            Self::Negative(n) => Some(-1 - *n as i128),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Item]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Item, Item)]> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a map entry; the first matching key wins.
    pub fn get(&self, key: &Item) -> Option<&Item> {
        self.as_map()?
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// The tag number and tagged item, if this is a tag.
    pub fn as_tagged(&self) -> Option<(u64, &Item)> {
        match self {
            Self::Tagged(tag, item) => Some((*tag, item)),
            _ => None,
        }
    }

    /// Strip any number of tags, returning the innermost item.
    pub fn untagged(&self) -> &Item {
        let mut item = self;
        while let Self::Tagged(_, inner) = item {
            item = inner;
        }
        item
    }
}

macro_rules! impl_item_from_uint {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Item {
                fn from(value: $ty) -> Self {
                    Self::Unsigned(value as u64)
                }
            }
        )*
    };
}

impl_item_from_uint!(u8, u16, u32, u64, usize);

macro_rules! impl_item_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Item {
                fn from(value: $ty) -> Self {
                    let value = value as i64;
                    if value >= 0 {
                        Self::Unsigned(value as u64)
                    } else {
                        Self::Negative(!(value as u64))
                    }
                }
            }
        )*
    };
}

impl_item_from_int!(i8, i16, i32, i64, isize);

impl From<f64> for Item {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for Item {
    fn from(value: f32) -> Self {
        Self::Float(value.into())
    }
}

impl From<bool> for Item {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Item {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Item {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&[u8]> for Item {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Vec<Item>> for Item {
    fn from(value: Vec<Item>) -> Self {
        Self::Array(value)
    }
}

impl From<Vec<(Item, Item)>> for Item {
    fn from(value: Vec<(Item, Item)>) -> Self {
        Self::Map(value)
    }
}

impl From<Simple> for Item {
    fn from(value: Simple) -> Self {
        Self::Simple(value)
    }
}

impl<T: Into<Item>> From<Option<T>> for Item {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        f.write_str("NaN")
    } else if v.is_infinite() {
        f.write_str(if v.is_sign_positive() {
            "Infinity"
        } else {
            "-Infinity"
        })
    } else if v != 0.0 && (v.abs() >= 1e16 || v.abs() < 1e-5) {
        write!(f, "{v:e}")
    } else if v.fract() == 0.0 {
        write!(f, "{v:.1}")
    } else {
        write!(f, "{v}")
    }
}

fn write_text(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

/// CBOR diagnostic notation (RFC 8949, section 8).
impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned(n) => write!(f, "{n}"),
            Self::Negative(n) => write!(f, "{}", -1 - *n as i128),
            Self::Bytes(b) => {
                f.write_str("h'")?;
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                f.write_str("'")
            }
            Self::Text(s) => write_text(f, s),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Self::Tagged(tag, item) => write!(f, "{tag}({item})"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null => f.write_str("null"),
            Self::Undefined => f.write_str("undefined"),
            Self::Simple(s) => write!(f, "simple({})", s.value()),
            Self::Float(v) => write_float(f, *v),
        }
    }
}
