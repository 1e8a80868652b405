//! `#[derive(Injectable)]` expansion.

use darling::ast::{Data, Fields, Style};
use darling::{Error, FromDeriveInput, FromField};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, GenericArgument, Ident, PathArguments, Type};

#[derive(FromDeriveInput)]
#[darling(attributes(mawrid), supports(struct_named, struct_unit))]
struct InjectableInput {
    ident: Ident,
    generics: syn::Generics,
    data: Data<(), InjectableField>,
    #[darling(default)]
    no_link: bool,
}

#[derive(FromField)]
#[darling(attributes(mawrid))]
struct InjectableField {
    ident: Option<Ident>,
    ty: Type,
    key: Option<String>,
    #[darling(default)]
    default: bool,
}

enum Shape<'a> {
    Required(&'a Type),
    Optional(&'a Type),
}

pub(crate) fn expand(input: &DeriveInput) -> Result<TokenStream, Error> {
    let input = InjectableInput::from_derive_input(input)?;

    if !input.generics.params.is_empty() {
        return Err(
            Error::custom("Injectable cannot be derived for generic types").with_span(&input.generics)
        );
    }

    let fields = match input.data {
        Data::Struct(fields) => fields,
        Data::Enum(_) => return Err(Error::unsupported_shape("enum")),
    };

    let body = build_body(&fields)?;
    let ident = &input.ident;

    let submission = if input.no_link {
        quote!()
    } else {
        quote! {
            ::mawrid::__private::inventory::submit! {
                ::mawrid::ConstructorEntry::injectable::<#ident>()
            }
        }
    };

    Ok(quote! {
        impl ::mawrid::Injectable for #ident {
            #[allow(unused_variables)]
            fn inject(resolver: &dyn ::mawrid::Resolvable) -> ::mawrid::Result<Self> {
                #[allow(unused_imports)]
                use ::mawrid::ResolvableExt as _;
                ::std::result::Result::Ok(#body)
            }
        }

        #submission
    })
}

fn build_body(fields: &Fields<InjectableField>) -> Result<TokenStream, Error> {
    if fields.style == Style::Unit {
        return Ok(quote!(Self));
    }

    let mut errors = Error::accumulator();
    let inits: Vec<TokenStream> = fields
        .iter()
        .filter_map(|field| errors.handle(field_init(field)))
        .collect();
    errors.finish()?;

    Ok(quote!(Self { #(#inits),* }))
}

fn field_init(field: &InjectableField) -> Result<TokenStream, Error> {
    let name = field
        .ident
        .as_ref()
        .ok_or_else(|| Error::custom("fields must be named").with_span(&field.ty))?;

    if field.default {
        if field.key.is_some() {
            return Err(Error::custom("`key` and `default` cannot be combined").with_span(name));
        }
        return Ok(quote!(#name: ::std::default::Default::default()));
    }

    let identity = |target: &Type| match &field.key {
        Some(key) => quote!(::mawrid::Identity::<#target>::named(#key)),
        None => quote!(::mawrid::Identity::<#target>::of()),
    };

    match classify(&field.ty) {
        Some(Shape::Required(target)) => {
            let identity = identity(target);
            Ok(quote!(#name: resolver.resolve(&#identity)?))
        }
        Some(Shape::Optional(target)) => {
            let identity = identity(target);
            Ok(quote! {
                #name: match resolver.resolve(&#identity) {
                    ::std::result::Result::Ok(value) => ::std::option::Option::Some(value),
                    ::std::result::Result::Err(err) if err.is_circular() => {
                        return ::std::result::Result::Err(err);
                    }
                    ::std::result::Result::Err(_) => ::std::option::Option::None,
                }
            })
        }
        None => Err(Error::custom(
            "Injectable fields must be `Arc<T>`, `Option<Arc<T>>` or marked `#[mawrid(default)]`",
        )
        .with_span(&field.ty)),
    }
}

fn classify(ty: &Type) -> Option<Shape<'_>> {
    if let Some(target) = single_argument(ty, "Arc") {
        return Some(Shape::Required(target));
    }
    let inner = single_argument(ty, "Option")?;
    single_argument(inner, "Arc").map(Shape::Optional)
}

/// `T` when `ty` is `<wrapper><T>`, matched on the last path segment.
fn single_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}
