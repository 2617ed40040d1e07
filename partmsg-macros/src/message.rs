//! `#[derive(Message)]`.
//!
//! ```rust,ignore
//! #[derive(Message)]
//! #[message(name = "physics", abstract)]
//! struct PhysicsChanged;
//!
//! #[derive(Message)]
//! #[message(args = (f64,), parent = PhysicsChanged, collect)]
//! struct MassChanged;
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Attribute, DeriveInput, Ident, LitStr, Path, Token, Type,
    ext::IdentExt,
    parse::{Parse, ParseStream},
    parse_macro_input,
};

/// Arguments of the `#[message(...)]` attribute.
#[derive(Default)]
pub(crate) struct MessageArgs {
    pub args: Option<Type>,
    pub parent: Option<Path>,
    pub name: Option<LitStr>,
    pub is_abstract: bool,
    pub collect: bool,
}

impl Parse for MessageArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut parsed = MessageArgs::default();

        while !input.is_empty() {
            // `abstract` is a reserved word, so accept any identifier.
            let ident = input.call(Ident::parse_any)?;

            match ident.to_string().as_str() {
                "args" => {
                    input.parse::<Token![=]>()?;
                    parsed.args = Some(input.parse()?);
                }
                "parent" => {
                    input.parse::<Token![=]>()?;
                    parsed.parent = Some(input.parse()?);
                }
                "name" => {
                    input.parse::<Token![=]>()?;
                    parsed.name = Some(input.parse()?);
                }
                "abstract" => parsed.is_abstract = true,
                "collect" => parsed.collect = true,
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown message attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(parsed)
    }
}

fn message_args(attrs: &[Attribute]) -> syn::Result<MessageArgs> {
    let mut found: Option<MessageArgs> = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("message")) {
        if found.is_some() {
            return Err(syn::Error::new_spanned(attr, "duplicate #[message] attribute"));
        }
        found = Some(attr.parse_args()?);
    }
    Ok(found.unwrap_or_default())
}

/// Implementation of `#[derive(Message)]`.
pub fn derive_message_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let args = match message_args(&input.attrs) {
        Ok(args) => args,
        Err(err) => return err.to_compile_error().into(),
    };

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    if args.collect && !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &input.generics,
            "`collect` is not supported on generic messages",
        )
        .to_compile_error()
        .into();
    }

    let arg_list = args
        .args
        .as_ref()
        .map(|ty| quote! { #ty })
        .unwrap_or_else(|| quote! { () });
    let named = args.name.as_ref().map(|name| quote! { .named(#name) });
    let parent = args
        .parent
        .as_ref()
        .map(|parent| quote! { .with_parent::<#parent>() });
    let abstract_ = args.is_abstract.then(|| quote! { .abstract_() });

    let collect = args.collect.then(|| {
        quote! {
            ::partmsg::inventory::submit! {
                ::partmsg::CollectedMessage::new(::partmsg::MessageKey::of::<#ident>)
            }
        }
    });

    let expanded = quote! {
        impl #impl_generics ::partmsg::Message for #ident #ty_generics #where_clause {
            type Args = #arg_list;

            fn declaration() -> ::partmsg::MessageDecl {
                ::partmsg::MessageDecl::of::<Self>() #named #parent #abstract_
            }
        }

        #collect
    };

    TokenStream::from(expanded)
}
