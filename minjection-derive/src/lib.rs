//! Derive macro for minjection
//!
//! `#[derive(Inject)]` implements `minjection::Inject` for a struct by
//! offering every `Injected<T>` field to the injector, in declaration order.
//!
//! # Example
//!
//! ```rust,ignore
//! use minjection::{Container, Inject, Injected, interface};
//!
//! struct Database;
//! struct Title;
//! interface!(Title => String);
//!
//! #[derive(Default, Inject)]
//! struct ViewController {
//!     // Keyed by the concrete type `Database`
//!     db: Injected<Database>,
//!     // Keyed by the interface `Title`
//!     #[inject(interface = Title)]
//!     title: Injected<String>,
//!     // Left alone
//!     #[inject(skip)]
//!     subtitle: Injected<String>,
//!     // Not an `Injected` slot, ignored
//!     taps: u64,
//! }
//!
//! let container = Container::new();
//! container.register_instance(Database);
//! container.register_interface_instance::<Title, _>("Inbox".to_string());
//!
//! let controller = ViewController::default();
//! container.inject_properties(&controller).unwrap();
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Type};

/// Derive macro for automatic field injection.
///
/// # Attributes
///
/// - `#[inject(interface = K)]` - Resolve the field through the interface tag `K`
///   instead of its value type.
/// - `#[inject(skip)]` - Never inject this field.
///
/// Fields whose type is not `Injected<_>` are ignored.
#[proc_macro_derive(Inject, attributes(inject))]
pub fn derive_inject(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // Only support structs with named fields
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Inject can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Inject can only be derived for structs",
            ));
        }
    };

    let mut steps = Vec::new();

    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let label = field_name.to_string();
        let attr = parse_inject_attr(&field.attrs)?;

        if !is_injected(&field.ty) {
            if attr.is_some() {
                return Err(syn::Error::new_spanned(
                    &field.ty,
                    "#[inject] can only be used on Injected<T> fields",
                ));
            }
            continue;
        }

        match attr {
            Some(InjectAttr::Skip) => {}
            Some(InjectAttr::Interface(key)) => steps.push(quote! {
                injector.interface::<#key>(#label, &self.#field_name)?;
            }),
            None => steps.push(quote! {
                injector.field(#label, &self.#field_name)?;
            }),
        }
    }

    let unused = steps.is_empty().then(|| quote! { let _ = injector; });

    Ok(quote! {
        impl #impl_generics ::minjection::Inject for #name #ty_generics #where_clause {
            fn inject(
                &self,
                injector: &mut ::minjection::Injector<'_>,
            ) -> ::minjection::Result<()> {
                #unused
                #(#steps)*
                ::std::result::Result::Ok(())
            }
        }
    })
}

/// Parsed `#[inject(...)]` options
enum InjectAttr {
    Skip,
    Interface(Type),
}

/// Find and parse the #[inject] attribute
fn parse_inject_attr(attrs: &[Attribute]) -> syn::Result<Option<InjectAttr>> {
    let mut parsed = None;

    for attr in attrs {
        if !attr.path().is_ident("inject") {
            continue;
        }
        if parsed.is_some() {
            return Err(syn::Error::new_spanned(attr, "duplicate #[inject] attribute"));
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                parsed = Some(InjectAttr::Skip);
                Ok(())
            } else if meta.path.is_ident("interface") {
                let key: Type = meta.value()?.parse()?;
                parsed = Some(InjectAttr::Interface(key));
                Ok(())
            } else {
                Err(meta.error("expected `skip` or `interface = Tag`"))
            }
        })?;

        if parsed.is_none() {
            return Err(syn::Error::new_spanned(attr, "expected #[inject(skip)] or #[inject(interface = Tag)]"));
        }
    }

    Ok(parsed)
}

/// Whether `ty` is `Injected<T>` (any path ending in `Injected`)
fn is_injected(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Injected"
                && matches!(segment.arguments, syn::PathArguments::AngleBracketed(_));
        }
    }
    false
}
