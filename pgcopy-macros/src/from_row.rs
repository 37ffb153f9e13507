use proc_macro::TokenStream;
use quote::quote;
use syn::{token::{Brace, Paren}, *};

pub fn from_row(input: DeriveInput) -> Result<TokenStream> {
    let DeriveInput { attrs: _, vis: _, ident, mut generics, data } = input;
    let Data::Struct(data) = data else {
        error!("only struct are currently supported")
    };

    let mut head = quote! {};
    let mut output = quote! {};

    match data.fields {
        Fields::Unnamed(FieldsUnnamed { unnamed, .. }) => {
            head = quote! { let mut iter = row.into_iter(); };
            let body = (0..unnamed.len())
                .map(|_|quote! { iter.try_next()?.decode()?, });
            Paren::default().surround(&mut output, |e|e.extend(body));
        },
        Fields::Named(FieldsNamed { named, .. }) => {
            let body = named
                .into_iter()
                .filter_map(|e|e.ident)
                .map(|id|(id.to_string(),id))
                .map(|(name,id)|quote! { #id: row.try_get(#name)?, });
            Brace::default().surround(&mut output, |e|e.extend(body));
        }
        Fields::Unit => {}
    };

    for ty in generics.type_params_mut() {
        ty.bounds.push(syn::parse_quote!(::pgcopy::Decode));
    }

    let (g1, g2, g3) = generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #g1 ::pgcopy::FromRow for #ident #g2 #g3 {
            #[allow(unused_variables)]
            fn from_row(row: ::pgcopy::Row) -> Result<Self, ::pgcopy::DecodeError> {
                #head
                Ok(Self #output)
            }
        }
    }.into())
}
