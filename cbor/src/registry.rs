/*!
Run-time tag dispatch.

A `RegistryBuilder` binds tag numbers to types, then freezes into an
immutable `Registry`. A registry can be passed around explicitly, or
installed once as the process-wide registry.
*/

use super::*;
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;
use tracing::{debug, trace};

type EncodeFn = fn(&dyn Any, &mut Encoder) -> bool;
type DecodeFn = fn(&mut Decoder<'_>) -> Result<Box<dyn Any + Send + Sync>, Error>;

/// Type-erased encode and decode functions for one type.
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    name: &'static str,
    type_id: TypeId,
    owns_tag: bool,
    encode: EncodeFn,
    decode: DecodeFn,
}

impl TypeDescriptor {
    /// A type whose encoding is the content of the tag it is registered
    /// with; the registry writes and strips the tag.
    pub fn of<T>() -> Self
    where
        T: ToCbor + FromCbor + Send + Sync + 'static,
    {
        Self {
            name: core::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            owns_tag: false,
            encode: |value, encoder| match value.downcast_ref::<T>() {
                Some(value) => {
                    encoder.emit(value);
                    true
                }
                None => false,
            },
            decode: |decoder| {
                Ok(Box::new(T::from_cbor(decoder)?) as Box<dyn Any + Send + Sync>)
            },
        }
    }

    /// A `TaggedType`, which writes and checks its own tag.
    pub fn tagged<T>() -> Self
    where
        T: TaggedType + ToCbor + FromCbor + Send + Sync + 'static,
    {
        Self {
            owns_tag: true,
            ..Self::of::<T>()
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

impl core::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("owns_tag", &self.owns_tag)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    by_tag: BTreeMap<u64, TypeDescriptor>,
    by_type: HashMap<TypeId, (u64, TypeDescriptor)>,
    shared_tags: bool,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder with the library's well-known tag types already
    /// registered.
    pub fn with_well_known() -> Self {
        use super::well_known::*;

        let mut builder = Self::new();
        for (tag, desc) in [
            (DateTime::TAG, TypeDescriptor::tagged::<DateTime>()),
            (EpochTime::TAG, TypeDescriptor::tagged::<EpochTime>()),
            (BigUint::TAG, TypeDescriptor::tagged::<BigUint>()),
            (BigNegative::TAG, TypeDescriptor::tagged::<BigNegative>()),
            (EncodedCbor::TAG, TypeDescriptor::tagged::<EncodedCbor>()),
            (Uri::TAG, TypeDescriptor::tagged::<Uri>()),
        ] {
            builder.insert(tag, desc);
        }
        builder
    }

    /// Allow more than one type per tag. The first type registered for a tag
    /// is the one decode produces; every registered type can be encoded.
    pub fn allow_shared_tags(mut self, allow: bool) -> Self {
        self.shared_tags = allow;
        self
    }

    fn insert(&mut self, tag: u64, desc: TypeDescriptor) {
        trace!("Registering {} for tag {tag}", desc.name);
        self.by_tag.entry(tag).or_insert(desc);
        self.by_type.insert(desc.type_id, (tag, desc));
    }

    pub fn register_tag(&mut self, tag: u64, desc: TypeDescriptor) -> Result<(), ConfigError> {
        if self.by_type.contains_key(&desc.type_id) {
            return Err(ConfigError::DuplicateType(desc.name));
        }
        if let Some(existing) = self.by_tag.get(&tag) {
            if !self.shared_tags {
                return Err(ConfigError::DuplicateTag {
                    tag,
                    existing: existing.name,
                    new: desc.name,
                });
            }
            debug!(
                "Tag {tag} shared by {} and {}, decode produces {}",
                existing.name, desc.name, existing.name
            );
        }
        self.insert(tag, desc);
        Ok(())
    }

    pub fn register<T>(&mut self) -> Result<(), ConfigError>
    where
        T: TaggedType + ToCbor + FromCbor + Send + Sync + 'static,
    {
        self.register_tag(T::TAG, TypeDescriptor::tagged::<T>())
    }

    pub fn build(self) -> Registry {
        debug!(
            "Tag registry built with {} tags and {} types",
            self.by_tag.len(),
            self.by_type.len()
        );
        Registry {
            by_tag: self.by_tag,
            by_type: self.by_type,
        }
    }
}

/// The result of a registry decode.
pub enum Decoded {
    /// A registered type, ready to downcast.
    Typed {
        tag: u64,
        value: Box<dyn Any + Send + Sync>,
    },
    /// Anything else, un-interpreted.
    Item(Item),
}

impl Decoded {
    pub fn is<T: Any>(&self) -> bool {
        matches!(self, Self::Typed { value, .. } if value.is::<T>())
    }

    /// The typed value, or `self` unchanged if it is not a `T`.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        match self {
            Self::Typed { tag, value } => match value.downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(value) => Err(Self::Typed { tag, value }),
            },
            item => Err(item),
        }
    }

    pub fn into_item(self) -> Option<Item> {
        match self {
            Self::Item(item) => Some(item),
            Self::Typed { .. } => None,
        }
    }
}

impl core::fmt::Debug for Decoded {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Typed { tag, .. } => f.debug_struct("Typed").field("tag", tag).finish(),
            Self::Item(item) => f.debug_tuple("Item").field(item).finish(),
        }
    }
}

#[derive(Debug)]
pub struct Registry {
    by_tag: BTreeMap<u64, TypeDescriptor>,
    by_type: HashMap<TypeId, (u64, TypeDescriptor)>,
}

impl Registry {
    pub fn tag_of(&self, type_id: TypeId) -> Option<u64> {
        self.by_type.get(&type_id).map(|(tag, _)| *tag)
    }

    pub fn type_of(&self, tag: u64) -> Option<&TypeDescriptor> {
        self.by_tag.get(&tag)
    }

    pub fn decode(&self, data: &[u8]) -> Result<Decoded, Error> {
        self.decode_with(data, &Options::default())
    }

    /// Decode one complete item. A top-level tag with a registration
    /// produces the registered type; anything else is returned as an `Item`.
    pub fn decode_with(&self, data: &[u8], options: &Options) -> Result<Decoded, Error> {
        let mut decoder = Decoder::with_options(data, *options);
        let r = match decoder
            .peek_tag()?
            .and_then(|tag| self.by_tag.get(&tag).map(|desc| (tag, desc)))
        {
            Some((tag, desc)) if desc.owns_tag => Decoded::Typed {
                tag,
                value: (desc.decode)(&mut decoder)?,
            },
            Some((tag, desc)) => Decoded::Typed {
                tag,
                value: decoder.tagged(|_, d| (desc.decode)(d))?,
            },
            None => {
                trace!("No registered tag, decoding as an item");
                Decoded::Item(decoder.item()?)
            }
        };
        decoder.finish()?;
        Ok(r)
    }

    /// Encode a registered type, with its tag.
    pub fn to_vec(&self, value: &dyn Any) -> Result<Vec<u8>, EncodeError> {
        self.to_vec_with(value, &Options::default())
    }

    pub fn to_vec_with(&self, value: &dyn Any, options: &Options) -> Result<Vec<u8>, EncodeError> {
        let (tag, desc) = self
            .by_type
            .get(&value.type_id())
            .ok_or(EncodeError::UnregisteredType(value.type_id()))?;

        let mut encoder = Encoder::with_options(*options);
        if !desc.owns_tag {
            encoder.emit_tag(*tag);
        }
        if !(desc.encode)(value, &mut encoder) {
            return Err(EncodeError::UnregisteredType(value.type_id()));
        }
        Ok(encoder.build())
    }

    /// Encode a registered type into `sink`, returning the encoded length.
    pub fn encode<S>(&self, value: &dyn Any, sink: &mut S) -> Result<usize, EncodeError>
    where
        S: Sink + ?Sized,
    {
        let data = self.to_vec(value)?;
        sink.write_all(&data)?;
        Ok(data.len())
    }
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Install the process-wide registry. This can only happen once.
pub fn install(registry: Registry) -> Result<(), ConfigError> {
    GLOBAL
        .set(registry)
        .map_err(|_| ConfigError::AlreadyInstalled)?;
    debug!("Process-wide tag registry installed");
    Ok(())
}

pub fn global() -> Result<&'static Registry, ConfigError> {
    GLOBAL.get().ok_or(ConfigError::NotInstalled)
}
