extern crate proc_macro2;

use proc_macro_crate::{FoundCrate, crate_name};
use proc_macro2::{Span, TokenStream};
use quote::{quote, quote_spanned};
use syn::{Data, DeriveInput, Field, Fields, Ident, Meta, NestedMeta, parse_macro_input, spanned::Spanned};

/// Generates the parameter table of a struct: `clone_to` copies every field marked with
/// `#[parameter(..)]` according to its kind, `parameters` enumerates them in declaration order.
/// Unmarked fields (flags, trackables, back pointers) are left alone.
#[proc_macro_derive(Parameterized, attributes(parameter))]
pub fn derive_parameterized(item: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    derive_parameterized_internal(input).into()
}

#[derive(Clone, Copy)]
enum Kind {
    Value,
    Base,
    Child,
    List,
    Animated,
    Tracked,
    Reference,
}

impl Kind {
    fn from_ident(ident: &Ident) -> Option<Kind> {
        match ident.to_string().as_str() {
            "value" => Some(Kind::Value),
            "base" => Some(Kind::Base),
            "child" => Some(Kind::Child),
            "list" => Some(Kind::List),
            "animated" => Some(Kind::Animated),
            "tracked" => Some(Kind::Tracked),
            "reference" => Some(Kind::Reference),
            _ => None,
        }
    }

    fn variant(&self) -> Ident {
        let name = match self {
            Kind::Value => "Value",
            Kind::Base => "Base",
            Kind::Child => "Child",
            Kind::List => "List",
            Kind::Animated => "Animated",
            Kind::Tracked => "Tracked",
            Kind::Reference => "Reference",
        };
        Ident::new(name, Span::call_site())
    }
}

fn parameter_kind(field: &Field) -> Option<Kind> {
    let attr = field.attrs.iter().find(|attr| attr.path.is_ident("parameter"))?;
    let meta = attr
        .parse_meta()
        .unwrap_or_else(|e| panic!("malformed `#[parameter]` attribute: {}", e));

    match meta {
        Meta::Path(_) => Some(Kind::Value),
        Meta::List(list) => {
            let kind = match list.nested.first() {
                Some(NestedMeta::Meta(Meta::Path(path))) => path.get_ident().and_then(Kind::from_ident),
                _ => None,
            };
            Some(kind.unwrap_or_else(|| {
                panic!("`#[parameter(..)]` expects one of value, base, child, list, animated, tracked, reference")
            }))
        }
        Meta::NameValue(_) => panic!("`#[parameter = ..]` is not supported"),
    }
}

pub(crate) fn derive_parameterized_internal(input: DeriveInput) -> TokenStream {
    let found_crate = crate_name("scenedoc").expect("scenedoc is present in `Cargo.toml`");

    let crate_name = match found_crate {
        FoundCrate::Itself => quote!(crate),
        FoundCrate::Name(name) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(#ident)
        }
    };

    let ident = input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match input.data {
        Data::Struct(s) => match s.fields {
            Fields::Named(fields) => fields.named,
            _ => panic!(
                "`#[derive(Parameterized)]` only supports named struct fields at the moment: {}",
                ident
            ),
        },
        _ => panic!("`#[derive(Parameterized)]` is only available on structs: {}", ident),
    };

    let marked = fields
        .iter()
        .filter_map(|f| parameter_kind(f).map(|kind| (f, kind)))
        .collect::<Vec<_>>();

    let clones = marked.iter().map(|(f, kind)| {
        let name = &f.ident;
        match kind {
            Kind::Value => quote_spanned! {f.span()=>
                target.#name = ::core::clone::Clone::clone(&self.#name);
            },
            Kind::Base => quote_spanned! {f.span()=>
                #crate_name::parameter::Parameterized::clone_to(&self.#name, &mut target.#name);
            },
            _ => quote_spanned! {f.span()=>
                #crate_name::parameter::CloneParameter::clone_parameter(&self.#name, &mut target.#name);
            },
        }
    });

    let infos = marked.iter().map(|(f, kind)| {
        let name = &f.ident;
        match kind {
            Kind::Base => quote_spanned! {f.span()=>
                parameters.extend(#crate_name::parameter::Parameterized::parameters(&self.#name));
            },
            _ => {
                let variant = kind.variant();
                quote_spanned! {f.span()=>
                    parameters.push(#crate_name::parameter::ParameterInfo::new(
                        stringify!(#name),
                        #crate_name::parameter::ParameterKind::#variant,
                    ));
                }
            }
        }
    });

    quote!(
        impl #impl_generics #crate_name::parameter::Parameterized for #ident #ty_generics #where_clause {
            fn clone_to(&self, target: &mut Self) {
                #(#clones)*
            }

            fn parameters(&self) -> Vec<#crate_name::parameter::ParameterInfo> {
                let mut parameters = Vec::new();
                #(#infos)*
                parameters
            }
        }
    )
}
