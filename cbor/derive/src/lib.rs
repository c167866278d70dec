//! Derive macros for `cbor-tags`.
//!
//! Provides `#[derive(ToCbor)]` and `#[derive(FromCbor)]`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    Data, DeriveInput, Fields, GenericParam, Generics, Ident, LitInt, LitStr, Member, Type,
    parse_macro_input, parse_quote, spanned::Spanned,
};

#[derive(Clone, Copy)]
enum Encoding {
    Array,
    Map,
}

#[derive(Default)]
struct ContainerAttrs {
    tag: Option<u64>,
    encoding: Option<Encoding>,
}

#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    default: bool,
}

#[derive(Default)]
struct VariantAttrs {
    id: Option<u64>,
    tag: Option<u64>,
}

fn parse_container_attrs(attrs: &[syn::Attribute]) -> syn::Result<ContainerAttrs> {
    let mut r = ContainerAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("cbor")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("tag") {
                r.tag = Some(meta.value()?.parse::<LitInt>()?.base10_parse()?);
            } else if meta.path.is_ident("encoding") {
                let value: LitStr = meta.value()?.parse()?;
                r.encoding = Some(match value.value().as_str() {
                    "array" => Encoding::Array,
                    "map" => Encoding::Map,
                    _ => return Err(meta.error("expected \"array\" or \"map\"")),
                });
            } else {
                return Err(meta.error("unsupported cbor attribute"));
            }
            Ok(())
        })?;
    }
    Ok(r)
}

fn parse_field_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
    let mut r = FieldAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("cbor")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                r.rename = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("default") {
                r.default = true;
            } else {
                return Err(meta.error("unsupported cbor field attribute"));
            }
            Ok(())
        })?;
    }
    Ok(r)
}

fn parse_variant_attrs(attrs: &[syn::Attribute]) -> syn::Result<VariantAttrs> {
    let mut r = VariantAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("cbor")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                r.id = Some(meta.value()?.parse::<LitInt>()?.base10_parse()?);
            } else if meta.path.is_ident("tag") {
                r.tag = Some(meta.value()?.parse::<LitInt>()?.base10_parse()?);
            } else {
                return Err(meta.error("unsupported cbor variant attribute"));
            }
            Ok(())
        })?;
    }
    Ok(r)
}

fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(p) => p
            .path
            .segments
            .last()
            .is_some_and(|s| s.ident == "Option"),
        _ => false,
    }
}

/// One named field of a struct or struct variant.
struct Field<'a> {
    member: Member,
    binding: Ident,
    name: String,
    ty: &'a Type,
    is_option: bool,
    default: bool,
}

impl Field<'_> {
    fn optional(&self) -> bool {
        self.is_option || self.default
    }

    /// Reads the field's value into its slot; a null or undefined
    /// `#[cbor(default)]` value leaves the slot empty.
    fn parse_slot(&self) -> TokenStream2 {
        if self.default && !self.is_option {
            quote! {
                if decoder.try_null()? {
                    ::core::option::Option::None
                } else {
                    ::core::option::Option::Some(decoder.parse()?)
                }
            }
        } else {
            quote!(::core::option::Option::Some(decoder.parse()?))
        }
    }
}

fn named_fields(fields: &syn::FieldsNamed) -> syn::Result<Vec<Field<'_>>> {
    let mut r = Vec::new();
    for (index, f) in fields.named.iter().enumerate() {
        let attrs = parse_field_attrs(&f.attrs)?;
        let ident = f
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(f.span(), "expected a named field"))?;
        let name = attrs.rename.unwrap_or_else(|| ident.to_string());
        if r.iter().any(|other: &Field| other.name == name) {
            return Err(syn::Error::new(f.span(), format!("duplicate field name '{name}'")));
        }
        r.push(Field {
            member: Member::Named(ident),
            binding: format_ident!("__field{}", index),
            name,
            ty: &f.ty,
            is_option: is_option(&f.ty),
            default: attrs.default,
        });
    }
    Ok(r)
}

fn field_table(fields: &[Field]) -> TokenStream2 {
    let entries = fields.iter().map(|f| {
        let name = &f.name;
        if f.optional() {
            quote!(::cbor_tags::Field::optional(#name))
        } else {
            quote!(::cbor_tags::Field::required(#name))
        }
    });
    quote!(&[#(#entries),*])
}

fn encoding_tokens(encoding: Option<Encoding>) -> TokenStream2 {
    match encoding {
        None => quote!(::core::option::Option::None),
        Some(Encoding::Array) => {
            quote!(::core::option::Option::Some(::cbor_tags::FieldEncoding::Array))
        }
        Some(Encoding::Map) => {
            quote!(::core::option::Option::Some(::cbor_tags::FieldEncoding::Map))
        }
    }
}

/// A call to `reflect::encode_fields`, where `place` gives the expression
/// naming each field's value.
fn encode_fields_call<P>(
    encoder: &Ident,
    fields: &[Field],
    encoding: Option<Encoding>,
    place: P,
) -> TokenStream2
where
    P: Fn(&Field) -> TokenStream2,
{
    let table = field_table(fields);
    let encoding = encoding_tokens(encoding);

    let absent = fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.is_option)
        .map(|(index, f)| {
            let place = place(f);
            quote!(#index => #place.is_none(),)
        })
        .collect::<Vec<_>>();
    let is_absent = if absent.is_empty() {
        quote!(|_| false)
    } else {
        quote!(|index| match index {
            #(#absent)*
            _ => false,
        })
    };

    let emits = fields.iter().enumerate().map(|(index, f)| {
        let place = place(f);
        quote!(#index => encoder.emit(&#place),)
    });

    quote! {
        ::cbor_tags::reflect::encode_fields(
            #encoder,
            #table,
            #encoding,
            #is_absent,
            |index, encoder| match index {
                #(#emits)*
                _ => {}
            },
        )
    }
}

/// Statements decoding a record into locals, followed by `construct`
/// applied to the field initialisers.
fn decode_fields_block(
    decoder: &Ident,
    fields: &[Field],
    construct: impl FnOnce(Vec<TokenStream2>) -> TokenStream2,
) -> TokenStream2 {
    let table = field_table(fields);
    let slots = fields.iter().map(|f| {
        let binding = &f.binding;
        let ty = f.ty;
        quote!(let mut #binding: ::core::option::Option<#ty> = ::core::option::Option::None;)
    });
    let assigns = fields.iter().enumerate().map(|(index, f)| {
        let binding = &f.binding;
        let value = f.parse_slot();
        quote!(#index => #binding = #value,)
    });
    let inits = fields
        .iter()
        .map(|f| {
            let member = &f.member;
            let binding = &f.binding;
            let name = &f.name;
            if f.optional() {
                quote!(#member: #binding.unwrap_or_default())
            } else {
                quote!(#member: #binding.ok_or(::cbor_tags::Error::new(
                    ::cbor_tags::ErrorKind::MissingField(#name),
                    start,
                ))?)
            }
        })
        .collect();
    let value = construct(inits);

    quote! {
        #[allow(unused_variables)]
        let start = #decoder.offset();
        #(#slots)*
        ::cbor_tags::reflect::decode_fields(#decoder, #table, |index, decoder| {
            match index {
                #(#assigns)*
                _ => {}
            }
            Ok(())
        })?;
        #value
    }
}

fn add_bounds(generics: &Generics, bound: TokenStream2) -> Generics {
    let mut generics = generics.clone();
    let params = generics
        .params
        .iter()
        .filter_map(|p| match p {
            GenericParam::Type(t) => Some(t.ident.clone()),
            _ => None,
        })
        .collect::<Vec<_>>();
    let where_clause = generics.make_where_clause();
    for param in params {
        where_clause
            .predicates
            .push(parse_quote!(#param: #bound));
    }
    generics
}

/// One variant of an enum, with its wire discriminant.
struct Variant<'a> {
    ident: &'a Ident,
    discriminant: u64,
    fields: &'a Fields,
}

fn variants<'a>(
    name: &Ident,
    data: &'a syn::DataEnum,
) -> syn::Result<(Vec<Variant<'a>>, bool)> {
    let mut r = Vec::new();
    let mut tagged = 0;
    for (index, v) in data.variants.iter().enumerate() {
        let attrs = parse_variant_attrs(&v.attrs)?;
        if attrs.id.is_some() && attrs.tag.is_some() {
            return Err(syn::Error::new(
                v.span(),
                "a variant cannot have both an id and a tag",
            ));
        }
        if attrs.tag.is_some() {
            tagged += 1;
        }
        let discriminant = attrs.tag.or(attrs.id).unwrap_or(index as u64);
        if r.iter().any(|other: &Variant| other.discriminant == discriminant) {
            return Err(syn::Error::new(
                v.span(),
                format!("duplicate discriminant {discriminant} in {name}"),
            ));
        }
        r.push(Variant {
            ident: &v.ident,
            discriminant,
            fields: &v.fields,
        });
    }
    if r.is_empty() {
        return Err(syn::Error::new(
            name.span(),
            "cannot derive for an enum with no variants",
        ));
    }
    if tagged != 0 && tagged != r.len() {
        return Err(syn::Error::new(
            name.span(),
            "either every variant or no variant may have a tag",
        ));
    }
    Ok((r, tagged != 0))
}

/// Untagged enums of unit variants are written as their bare discriminant.
fn is_c_like(variants: &[Variant], tagged: bool) -> bool {
    !tagged && variants.iter().all(|v| matches!(v.fields, Fields::Unit))
}

/// Derive `ToCbor`, and `TaggedType` for types with `#[cbor(tag = N)]`.
///
/// # Attributes
///
/// - `#[cbor(tag = N)]` on the type: always written as `N(payload)`
/// - `#[cbor(encoding = "array" | "map")]` on the type: fixes the record
///   layout instead of following `Options::field_encoding`
/// - `#[cbor(rename = "...")]` on a field: the map key to use
/// - `#[cbor(default)]` on a field: may be missing when decoded
/// - `#[cbor(id = N)]` or `#[cbor(tag = N)]` on a variant: its discriminant
///
/// An enum whose variants are all units and untagged is written as the
/// bare discriminant integer.
#[proc_macro_derive(ToCbor, attributes(cbor))]
pub fn derive_to_cbor(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_to_cbor(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derive `FromCbor`, and `Record` for structs with named fields.
///
/// Takes the same attributes as `ToCbor`.
#[proc_macro_derive(FromCbor, attributes(cbor))]
pub fn derive_from_cbor(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_from_cbor(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_to_cbor(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let attrs = parse_container_attrs(&input.attrs)?;
    let generics = add_bounds(&input.generics, quote!(::cbor_tags::ToCbor));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let encoder = format_ident!("encoder");

    let body = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => {
                let fields = named_fields(fields)?;
                encode_fields_call(&encoder, &fields, attrs.encoding, |f| {
                    let member = &f.member;
                    quote!(self.#member)
                })
            }
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                quote!(encoder.emit(&self.0))
            }
            Fields::Unnamed(fields) => {
                let count = fields.unnamed.len();
                let members = (0..count).map(syn::Index::from);
                quote! {
                    encoder.emit_array(::core::option::Option::Some(#count), |a| {
                        #(a.emit(&self.#members);)*
                    })
                }
            }
            Fields::Unit => quote!(encoder.emit_null()),
        },
        Data::Enum(data) => {
            let (variants, tagged) = variants(name, data)?;
            let arms = if is_c_like(&variants, tagged) {
                variants
                    .iter()
                    .map(|v| {
                        let ident = v.ident;
                        let discriminant = v.discriminant;
                        quote!(Self::#ident => encoder.emit(&#discriminant),)
                    })
                    .collect::<Vec<_>>()
            } else {
                variants
                    .iter()
                    .map(|v| encode_variant_arm(v, tagged, attrs.encoding))
                    .collect::<syn::Result<Vec<_>>>()?
            };
            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "ToCbor cannot be derived for unions",
            ));
        }
    };

    let (tag_impl, emit_tag) = match attrs.tag {
        Some(tag) => (
            quote! {
                impl #impl_generics ::cbor_tags::TaggedType for #name #ty_generics #where_clause {
                    const TAG: u64 = #tag;
                }
            },
            quote!(encoder.emit_tag(#tag);),
        ),
        None => (quote!(), quote!()),
    };

    Ok(quote! {
        #tag_impl

        impl #impl_generics ::cbor_tags::ToCbor for #name #ty_generics #where_clause {
            fn to_cbor(&self, encoder: &mut ::cbor_tags::Encoder) {
                #emit_tag
                #body
            }
        }
    })
}

fn encode_variant_arm(
    v: &Variant,
    tagged: bool,
    encoding: Option<Encoding>,
) -> syn::Result<TokenStream2> {
    let ident = v.ident;
    let e = format_ident!("e");
    let (pattern, payload) = match v.fields {
        Fields::Unit => (quote!(Self::#ident), quote!(e.emit_null())),
        Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
            (quote!(Self::#ident(__field0)), quote!(e.emit(__field0)))
        }
        Fields::Unnamed(fields) => {
            let count = fields.unnamed.len();
            let bindings = (0..count)
                .map(|i| format_ident!("__field{}", i))
                .collect::<Vec<_>>();
            (
                quote!(Self::#ident(#(#bindings),*)),
                quote! {
                    e.emit_array(::core::option::Option::Some(#count), |a| {
                        #(a.emit(#bindings);)*
                    })
                },
            )
        }
        Fields::Named(fields) => {
            let fields = named_fields(fields)?;
            let members = fields.iter().map(|f| &f.member);
            let bindings = fields.iter().map(|f| &f.binding);
            (
                quote!(Self::#ident { #(#members: #bindings),* }),
                encode_fields_call(&e, &fields, encoding, |f| {
                    let binding = &f.binding;
                    quote!((*#binding))
                }),
            )
        }
    };

    let discriminant = v.discriminant;
    Ok(if tagged {
        quote! {
            #pattern => {
                encoder.emit_tag(#discriminant);
                let e = encoder;
                #payload
            }
        }
    } else {
        quote! {
            #pattern => ::cbor_tags::reflect::encode_variant(encoder, #discriminant, |e| {
                #payload
            }),
        }
    })
}

fn expand_from_cbor(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let attrs = parse_container_attrs(&input.attrs)?;
    // The generated `Record` impl encodes as well as decodes
    let bound = match &input.data {
        Data::Struct(syn::DataStruct {
            fields: Fields::Named(_),
            ..
        }) => quote!(::cbor_tags::ToCbor + ::cbor_tags::FromCbor),
        _ => quote!(::cbor_tags::FromCbor),
    };
    let generics = add_bounds(&input.generics, bound);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let mut record_impl = quote!();
    let body = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => {
                let fields = named_fields(fields)?;
                let record = record_items(&fields, attrs.encoding);
                record_impl = quote! {
                    impl #impl_generics ::cbor_tags::Record for #name #ty_generics #where_clause {
                        #record
                    }
                };
                quote!(::cbor_tags::reflect::decode_record(decoder))
            }
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                quote!(Ok(Self(decoder.parse()?)))
            }
            Fields::Unnamed(fields) => {
                let parses = fields.unnamed.iter().map(|_| quote!(a.parse()?));
                quote!(decoder.array(|a| Ok(Self(#(#parses),*))))
            }
            Fields::Unit => quote! {
                decoder.null()?;
                Ok(Self)
            },
        },
        Data::Enum(data) => {
            let (variants, tagged) = variants(name, data)?;
            let ty = name.to_string();
            if is_c_like(&variants, tagged) {
                let arms = variants.iter().map(|v| {
                    let ident = v.ident;
                    let discriminant = v.discriminant;
                    quote!(#discriminant => ::core::option::Option::Some(Self::#ident),)
                });
                quote! {
                    ::cbor_tags::reflect::decode_unit_variant(decoder, #ty, |discriminant| match discriminant {
                        #(#arms)*
                        _ => ::core::option::Option::None,
                    })
                }
            } else {
                let arms = variants
                    .iter()
                    .map(|v| decode_variant_arm(v))
                    .collect::<syn::Result<Vec<_>>>()?;
                let helper = if tagged {
                    quote!(decode_tagged_variant)
                } else {
                    quote!(decode_variant)
                };
                quote! {
                    ::cbor_tags::reflect::#helper(decoder, #ty, |discriminant, d| match discriminant {
                        #(#arms)*
                        _ => Ok(::core::option::Option::None),
                    })
                }
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "FromCbor cannot be derived for unions",
            ));
        }
    };

    let body = match attrs.tag {
        Some(tag) => quote!(decoder.expect_tag(#tag, |decoder| { #body })),
        None => body,
    };

    Ok(quote! {
        #record_impl

        impl #impl_generics ::cbor_tags::FromCbor for #name #ty_generics #where_clause {
            fn from_cbor(
                decoder: &mut ::cbor_tags::Decoder<'_>,
            ) -> ::core::result::Result<Self, ::cbor_tags::Error> {
                #body
            }
        }
    })
}

/// The items of a `Record` impl. `Builder` is a nested tuple of one
/// `Option` slot per field: `(Option<A>, (Option<B>, ()))`.
fn record_items(fields: &[Field], encoding: Option<Encoding>) -> TokenStream2 {
    let table = field_table(fields);
    let encoding = encoding_tokens(encoding);

    let builder_ty = fields.iter().rev().fold(quote!(()), |rest, f| {
        let ty = f.ty;
        quote!((::core::option::Option<#ty>, #rest))
    });
    let builder_pattern = fields.iter().rev().fold(quote!(()), |rest, f| {
        let binding = &f.binding;
        quote!((#binding, #rest))
    });

    let one = syn::Index::from(1);
    let zero = syn::Index::from(0);
    let assigns = fields.iter().enumerate().map(|(index, f)| {
        let mut slot = quote!(builder);
        for _ in 0..index {
            slot = quote!(#slot.#one);
        }
        let value = f.parse_slot();
        quote!(#index => #slot.#zero = #value,)
    });

    let absent = fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.is_option)
        .map(|(index, f)| {
            let member = &f.member;
            quote!(#index => self.#member.is_none(),)
        });

    let emits = fields.iter().enumerate().map(|(index, f)| {
        let member = &f.member;
        quote!(#index => encoder.emit(&self.#member),)
    });

    let inits = fields.iter().map(|f| {
        let member = &f.member;
        let binding = &f.binding;
        let name = &f.name;
        if f.optional() {
            quote!(#member: #binding.unwrap_or_default())
        } else {
            quote!(#member: #binding.ok_or(#name)?)
        }
    });

    quote! {
        const FIELDS: &'static [::cbor_tags::Field] = #table;
        const ENCODING: ::core::option::Option<::cbor_tags::FieldEncoding> = #encoding;

        type Builder = #builder_ty;

        fn is_absent(&self, index: usize) -> bool {
            match index {
                #(#absent)*
                _ => false,
            }
        }

        #[allow(unused_variables)]
        fn encode_field(&self, index: usize, encoder: &mut ::cbor_tags::Encoder) {
            match index {
                #(#emits)*
                _ => {}
            }
        }

        #[allow(unused_variables)]
        fn decode_field(
            builder: &mut Self::Builder,
            index: usize,
            decoder: &mut ::cbor_tags::Decoder<'_>,
        ) -> ::core::result::Result<(), ::cbor_tags::Error> {
            match index {
                #(#assigns)*
                _ => {}
            }
            Ok(())
        }

        fn build(builder: Self::Builder) -> ::core::result::Result<Self, &'static str> {
            let #builder_pattern = builder;
            Ok(Self {
                #(#inits),*
            })
        }
    }
}

fn decode_variant_arm(v: &Variant) -> syn::Result<TokenStream2> {
    let ident = v.ident;
    let discriminant = v.discriminant;
    let d = format_ident!("d");
    let body = match v.fields {
        Fields::Unit => quote! {
            d.null()?;
            Ok(::core::option::Option::Some(Self::#ident))
        },
        Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
            quote!(Ok(::core::option::Option::Some(Self::#ident(d.parse()?))))
        }
        Fields::Unnamed(fields) => {
            let parses = fields.unnamed.iter().map(|_| quote!(a.parse()?));
            quote! {
                d.array(|a| Ok(Self::#ident(#(#parses),*))).map(::core::option::Option::Some)
            }
        }
        Fields::Named(fields) => {
            let fields = named_fields(fields)?;
            decode_fields_block(&d, &fields, |inits| {
                quote!(Ok(::core::option::Option::Some(Self::#ident { #(#inits),* })))
            })
        }
    };
    Ok(quote! {
        #discriminant => { #body }
    })
}
