use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Data, DeriveInput, Fields, GenericArgument, Ident, LitStr, PathArguments,
    Type, Visibility,
};

/// Derives `ordered_json::Marshal`.
///
/// Structs with named fields become records: the macro declares their
/// fields for the field plan and gives the encoder positional access to
/// them. Container attribute `#[json(hook = "json")]` routes the type through
/// its `MarshalJson` impl instead, `#[json(hook = "text")]` through
/// `MarshalText` (which also makes the type usable as a map key).
///
/// # Example
///
/// ```ignore
/// #[derive(Marshal)]
/// #[json(rename_all = "camelCase")]
/// pub struct Block {
///     pub block_hash: String,
///     #[json(omitempty)]
///     pub nonce: u64,
///     #[json(embed)]
///     pub header: Header,
///     #[json(skip)]
///     pub cached: Vec<u8>,
/// }
/// ```
///
/// Field attributes: `rename = "..."`, `omitempty`, `string`, `skip`,
/// `embed`. Embedded fields may be `T`, `Box<T>`, `Option<T>` or
/// `Option<Box<T>>` where `T` is itself a derived record. Only `pub` fields
/// are encoded, except that embedded records are always traversed.
#[proc_macro_derive(Marshal, attributes(json))]
pub fn derive_marshal(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match marshal_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derives `ordered_json::Unmarshal`. Accepts the same attributes as
/// `Marshal`; embedded records behind `Option` are allocated with
/// `Default` on first write.
#[proc_macro_derive(Unmarshal, attributes(json))]
pub fn derive_unmarshal(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match unmarshal_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Hook {
    Json,
    Text,
}

#[derive(Clone, Copy)]
enum RenameAll {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
}

impl RenameAll {
    fn parse(lit: &LitStr) -> syn::Result<Self> {
        Ok(match lit.value().as_str() {
            "lowercase" => RenameAll::Lower,
            "UPPERCASE" => RenameAll::Upper,
            "PascalCase" => RenameAll::Pascal,
            "camelCase" => RenameAll::Camel,
            "snake_case" => RenameAll::Snake,
            "SCREAMING_SNAKE_CASE" => RenameAll::ScreamingSnake,
            "kebab-case" => RenameAll::Kebab,
            other => {
                return Err(syn::Error::new_spanned(
                    lit,
                    format!("unknown rename_all rule '{other}'"),
                ))
            }
        })
    }

    /// Applies the rule to a snake_case field identifier.
    fn apply(self, field: &str) -> String {
        match self {
            RenameAll::Lower | RenameAll::Snake => field.to_string(),
            RenameAll::Upper | RenameAll::ScreamingSnake => field.to_ascii_uppercase(),
            RenameAll::Kebab => field.replace('_', "-"),
            RenameAll::Pascal | RenameAll::Camel => {
                let mut out = String::with_capacity(field.len());
                let mut upper = matches!(self, RenameAll::Pascal);
                for c in field.chars() {
                    if c == '_' {
                        upper = true;
                    } else if upper {
                        out.push(c.to_ascii_uppercase());
                        upper = false;
                    } else {
                        out.push(c);
                    }
                }
                out
            }
        }
    }
}

struct Container {
    hook: Option<Hook>,
    rename_all: Option<RenameAll>,
}

fn container_attrs(input: &DeriveInput) -> syn::Result<Container> {
    let mut container = Container {
        hook: None,
        rename_all: None,
    };
    for attr in &input.attrs {
        if !attr.path().is_ident("json") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("hook") {
                let value: LitStr = meta.value()?.parse()?;
                container.hook = Some(match value.value().as_str() {
                    "json" => Hook::Json,
                    "text" => Hook::Text,
                    _ => return Err(meta.error("expected hook = \"json\" or hook = \"text\"")),
                });
            } else if meta.path.is_ident("rename_all") {
                let value: LitStr = meta.value()?.parse()?;
                container.rename_all = Some(RenameAll::parse(&value)?);
            } else {
                return Err(meta.error("unknown json container attribute"));
            }
            Ok(())
        })?;
    }
    Ok(container)
}

/// How an embedded record is held by its field.
#[derive(Clone, Copy)]
enum Holder {
    Direct,
    Boxed,
    Optional,
    OptionalBoxed,
}

struct FieldSpec {
    ident: Ident,
    name: String,
    exported: bool,
    rename: Option<String>,
    omit_empty: bool,
    quoted: bool,
    skip: bool,
    embed: Option<(Holder, Type)>,
}

fn field_specs(input: &DeriveInput, container: &Container) -> syn::Result<Vec<FieldSpec>> {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields.named.iter().collect::<Vec<_>>(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    name,
                    "records need named fields; use #[json(hook = \"json\")] for tuple structs",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "only structs can be records; use #[json(hook = \"json\")] or #[json(hook = \"text\")]",
            ))
        }
    };

    let mut specs = Vec::with_capacity(fields.len());
    for field in fields {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
        let raw = ident.to_string();
        let raw = raw.strip_prefix("r#").unwrap_or(&raw).to_string();
        let mut spec = FieldSpec {
            name: match container.rename_all {
                Some(rule) => rule.apply(&raw),
                None => raw,
            },
            ident,
            exported: matches!(field.vis, Visibility::Public(_)),
            rename: None,
            omit_empty: false,
            quoted: false,
            skip: false,
            embed: None,
        };

        let mut embed = false;
        for attr in &field.attrs {
            if !attr.path().is_ident("json") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value: LitStr = meta.value()?.parse()?;
                    spec.rename = Some(value.value());
                } else if meta.path.is_ident("omitempty") {
                    spec.omit_empty = true;
                } else if meta.path.is_ident("string") {
                    spec.quoted = true;
                } else if meta.path.is_ident("skip") {
                    spec.skip = true;
                } else if meta.path.is_ident("embed") {
                    embed = true;
                } else {
                    return Err(meta.error("unknown json field attribute"));
                }
                Ok(())
            })?;
        }
        if embed {
            spec.embed = Some(embedded_holder(&field.ty));
        }
        specs.push(spec);
    }
    Ok(specs)
}

/// Splits `Box<T>`, `Option<T>` and `Option<Box<T>>` into holder and `T`.
fn embedded_holder(ty: &Type) -> (Holder, Type) {
    match single_argument(ty, "Option") {
        Some(inner) => match single_argument(&inner, "Box") {
            Some(record) => (Holder::OptionalBoxed, record),
            None => (Holder::Optional, inner),
        },
        None => match single_argument(ty, "Box") {
            Some(record) => (Holder::Boxed, record),
            None => (Holder::Direct, ty.clone()),
        },
    }
}

fn single_argument(ty: &Type, wrapper: &str) -> Option<Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner.clone()),
        _ => None,
    }
}

/// `FieldDecl` builder chain for each field. `record_trait` is the trait
/// whose `describe()` supplies embedded record types.
fn declarations(specs: &[FieldSpec], record_trait: &TokenStream2) -> Vec<TokenStream2> {
    specs
        .iter()
        .map(|spec| {
            let name = &spec.name;
            let exported = spec.exported;
            let mut decl = quote! { ::ordered_json::plan::FieldDecl::new(#name, #exported) };
            if let Some(rename) = &spec.rename {
                decl = quote! { #decl.rename(#rename) };
            }
            if spec.omit_empty {
                decl = quote! { #decl.omit_empty() };
            }
            if spec.quoted {
                decl = quote! { #decl.quoted() };
            }
            if spec.skip {
                decl = quote! { #decl.skip() };
            }
            if let (Some((_, record)), false) = (&spec.embed, spec.skip) {
                decl = quote! { #decl.embed(<#record as #record_trait>::describe()) };
            }
            decl
        })
        .collect()
}

fn marshal_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let container = container_attrs(input)?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    match container.hook {
        Some(Hook::Json) => {
            return Ok(quote! {
                impl #impl_generics ::ordered_json::Marshal for #name #ty_generics #where_clause {
                    fn marshal(
                        &self,
                        ctx: &mut ::ordered_json::Context,
                    ) -> ::ordered_json::Result<::ordered_json::Value> {
                        ::ordered_json::marshal_json_hook(self, ctx)
                    }

                    fn marshal_absent(
                        ctx: &mut ::ordered_json::Context,
                    ) -> ::ordered_json::Result<::ordered_json::Value> {
                        ::ordered_json::marshal_json_hook_absent::<Self>(ctx)
                    }
                }
            })
        }
        Some(Hook::Text) => {
            return Ok(quote! {
                impl #impl_generics ::ordered_json::Marshal for #name #ty_generics #where_clause {
                    fn marshal(
                        &self,
                        ctx: &mut ::ordered_json::Context,
                    ) -> ::ordered_json::Result<::ordered_json::Value> {
                        ::ordered_json::marshal_text_hook(self, ctx)
                    }
                }

                impl #impl_generics ::ordered_json::MapKey for #name #ty_generics #where_clause {
                    fn key_text(&self) -> ::ordered_json::Result<::std::string::String> {
                        ::ordered_json::MarshalText::marshal_text(self)
                    }
                }
            })
        }
        None => {}
    }

    let specs = field_specs(input, &container)?;
    let decls = declarations(&specs, &quote! { ::ordered_json::Record });
    let arms = specs.iter().enumerate().map(|(index, spec)| {
        let ident = &spec.ident;
        let access = match (&spec.embed, spec.skip) {
            (_, true) => quote! { ::ordered_json::Field::Missing },
            (None, false) => quote! {
                ::ordered_json::Field::Value(&self.#ident as &dyn ::ordered_json::Marshal)
            },
            (Some((holder, _)), false) => match holder {
                Holder::Direct => quote! {
                    ::ordered_json::Field::Embedded(Some(&self.#ident as &dyn ::ordered_json::Record))
                },
                Holder::Boxed => quote! {
                    ::ordered_json::Field::Embedded(Some(&*self.#ident as &dyn ::ordered_json::Record))
                },
                Holder::Optional => quote! {
                    ::ordered_json::Field::Embedded(
                        self.#ident
                            .as_ref()
                            .map(|inner| inner as &dyn ::ordered_json::Record),
                    )
                },
                Holder::OptionalBoxed => quote! {
                    ::ordered_json::Field::Embedded(
                        self.#ident
                            .as_deref()
                            .map(|inner| inner as &dyn ::ordered_json::Record),
                    )
                },
            },
        };
        quote! { #index => #access, }
    });

    Ok(quote! {
        impl #impl_generics ::ordered_json::Marshal for #name #ty_generics #where_clause {
            fn marshal(
                &self,
                ctx: &mut ::ordered_json::Context,
            ) -> ::ordered_json::Result<::ordered_json::Value> {
                ::ordered_json::marshal_record(self, ctx)
            }
        }

        impl #impl_generics ::ordered_json::Record for #name #ty_generics #where_clause {
            fn declare() -> ::std::vec::Vec<::ordered_json::plan::FieldDecl> {
                ::std::vec![#(#decls),*]
            }

            fn record_type(&self) -> ::ordered_json::plan::RecordType {
                <Self as ::ordered_json::Record>::describe()
            }

            #[allow(unused_variables)]
            fn field(&self, index: usize) -> ::ordered_json::Field<'_> {
                match index {
                    #(#arms)*
                    _ => ::ordered_json::Field::Missing,
                }
            }
        }
    })
}

fn unmarshal_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let container = container_attrs(input)?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    match container.hook {
        Some(Hook::Json) => {
            return Ok(quote! {
                impl #impl_generics ::ordered_json::Unmarshal for #name #ty_generics #where_clause {
                    fn unmarshal(
                        &mut self,
                        d: &mut ::ordered_json::Decoder<'_>,
                    ) -> ::ordered_json::Result<()> {
                        ::ordered_json::unmarshal_json_hook(self, d)
                    }
                }
            })
        }
        Some(Hook::Text) => {
            return Ok(quote! {
                impl #impl_generics ::ordered_json::Unmarshal for #name #ty_generics #where_clause {
                    fn unmarshal(
                        &mut self,
                        d: &mut ::ordered_json::Decoder<'_>,
                    ) -> ::ordered_json::Result<()> {
                        ::ordered_json::unmarshal_text_hook(self, d)
                    }
                }

                impl #impl_generics ::ordered_json::FromMapKey for #name #ty_generics #where_clause {
                    fn from_map_key(key: &str) -> ::ordered_json::Result<Self> {
                        let mut value = <Self as ::std::default::Default>::default();
                        ::ordered_json::UnmarshalText::unmarshal_text(&mut value, key)?;
                        Ok(value)
                    }
                }
            })
        }
        None => {}
    }

    let specs = field_specs(input, &container)?;
    let decls = declarations(&specs, &quote! { ::ordered_json::RecordMut });
    let arms = specs.iter().enumerate().map(|(index, spec)| {
        let ident = &spec.ident;
        let access = match (&spec.embed, spec.skip) {
            (_, true) => quote! { ::ordered_json::FieldMut::Missing },
            (None, false) => quote! {
                ::ordered_json::FieldMut::Value(&mut self.#ident as &mut dyn ::ordered_json::Unmarshal)
            },
            (Some((holder, _)), false) => match holder {
                Holder::Direct => quote! {
                    ::ordered_json::FieldMut::Embedded(&mut self.#ident as &mut dyn ::ordered_json::RecordMut)
                },
                Holder::Boxed => quote! {
                    ::ordered_json::FieldMut::Embedded(&mut *self.#ident as &mut dyn ::ordered_json::RecordMut)
                },
                Holder::Optional => quote! {
                    ::ordered_json::FieldMut::Embedded(
                        self.#ident.get_or_insert_with(::std::default::Default::default)
                            as &mut dyn ::ordered_json::RecordMut,
                    )
                },
                Holder::OptionalBoxed => quote! {
                    ::ordered_json::FieldMut::Embedded(
                        &mut **self.#ident.get_or_insert_with(::std::default::Default::default)
                            as &mut dyn ::ordered_json::RecordMut,
                    )
                },
            },
        };
        quote! { #index => #access, }
    });

    Ok(quote! {
        impl #impl_generics ::ordered_json::Unmarshal for #name #ty_generics #where_clause {
            fn unmarshal(
                &mut self,
                d: &mut ::ordered_json::Decoder<'_>,
            ) -> ::ordered_json::Result<()> {
                ::ordered_json::unmarshal_record(self, d)
            }
        }

        impl #impl_generics ::ordered_json::RecordMut for #name #ty_generics #where_clause {
            fn declare() -> ::std::vec::Vec<::ordered_json::plan::FieldDecl> {
                ::std::vec![#(#decls),*]
            }

            fn record_type(&self) -> ::ordered_json::plan::RecordType {
                <Self as ::ordered_json::RecordMut>::describe()
            }

            #[allow(unused_variables)]
            fn field_mut(&mut self, index: usize) -> ::ordered_json::FieldMut<'_> {
                match index {
                    #(#arms)*
                    _ => ::ordered_json::FieldMut::Missing,
                }
            }
        }
    })
}
