//! Procedural macros for the docmapper project.
//!
//! `#[derive(DocumentType)]` declares a document type. The declared fields come from the
//! `fields` attribute or, when it is absent, from the names of the struct's fields:
//!
//! ```ignore
//! use docmapper::prelude::*;
//!
//! #[derive(DocumentType)]
//! #[document(fields = ["line1", "line2", "state", "city", "zip"])]
//! pub struct Address;
//!
//! #[derive(DocumentType)]
//! #[document(collection = "people", id = "uuid", name = "app::User")]
//! pub struct User {
//!     name: (),
//!     address: (),
//! }
//! ```
//!
//! Supported keys of `#[document(...)]`:
//!
//! - `fields = [..]`: declared field names
//! - `collection = ".."`: collection name override
//! - `id = "object_id" | "uuid"`: primary key strategy
//! - `name = ".."`: discriminator override (defaults to the Rust type path)

#[allow(unused_extern_crates)]
extern crate self as docmapper_macros;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Data, DataStruct, DeriveInput, Expr, ExprArray, ExprLit, Fields, Lit, LitStr, ext::IdentExt,
    parse_macro_input,
};

#[derive(Default)]
struct DocumentArgs {
    fields: Option<Vec<LitStr>>,
    collection: Option<LitStr>,
    id: Option<LitStr>,
    name: Option<LitStr>,
}

fn parse_args(input: &DeriveInput) -> syn::Result<DocumentArgs> {
    let mut args = DocumentArgs::default();

    for attr in input
        .attrs
        .iter()
        .filter(|attr| attr.path().is_ident("document"))
    {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("fields") {
                let array: ExprArray = meta.value()?.parse()?;
                let names = array
                    .elems
                    .iter()
                    .map(|elem| match elem {
                        Expr::Lit(ExprLit { lit: Lit::Str(name), .. }) => Ok(name.clone()),
                        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
                    })
                    .collect::<syn::Result<Vec<_>>>()?;

                args.fields = Some(names);
                Ok(())
            } else if meta.path.is_ident("collection") {
                args.collection = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("id") {
                args.id = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("name") {
                args.name = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported document attribute, expected `fields`, `collection`, `id` or `name`"))
            }
        })?;
    }

    Ok(args)
}

fn struct_fields(input: &DeriveInput) -> syn::Result<Vec<LitStr>> {
    match &input.data {
        Data::Struct(DataStruct { fields: Fields::Named(named), .. }) => Ok(named
            .named
            .iter()
            .filter_map(|field| field.ident.as_ref())
            .map(|ident| LitStr::new(&ident.unraw().to_string(), ident.span()))
            .collect()),
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            "DocumentType needs `#[document(fields = [..])]` unless derived on a struct with named fields",
        )),
    }
}

fn id_strategy(id: &LitStr) -> syn::Result<TokenStream2> {
    match id.value().as_str() {
        "object_id" => Ok(quote! { ::docmapper::schema::IdStrategy::ObjectId }),
        "uuid" => Ok(quote! { ::docmapper::schema::IdStrategy::Uuid }),
        _ => Err(syn::Error::new_spanned(id, "expected \"object_id\" or \"uuid\"")),
    }
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let args = parse_args(&input)?;
    let fields = match args.fields {
        Some(fields) => fields,
        None => struct_fields(&input)?,
    };

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let type_name = args.name.map(|name| {
        quote! {
            fn type_name() -> &'static str {
                #name
            }
        }
    });

    let collection_name = args.collection.map(|collection| {
        quote! {
            fn collection_name() -> ::std::string::String {
                ::std::string::String::from(#collection)
            }
        }
    });

    let id_strategy = match &args.id {
        Some(id) => {
            let strategy = id_strategy(id)?;
            Some(quote! {
                fn id_strategy() -> ::docmapper::schema::IdStrategy {
                    #strategy
                }
            })
        }
        None => None,
    };

    Ok(quote! {
        impl #impl_generics ::docmapper::schema::DocumentType for #ident #ty_generics #where_clause {
            fn fields() -> &'static [&'static str] {
                &[#(#fields),*]
            }

            #type_name
            #collection_name
            #id_strategy
        }
    })
}

/// Implements `docmapper::schema::DocumentType`. See the crate docs for the attributes.
#[proc_macro_derive(DocumentType, attributes(document))]
pub fn derive_document_type(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
