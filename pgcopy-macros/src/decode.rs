use proc_macro::TokenStream;
use quote::quote;
use syn::*;

pub fn decode(input: DeriveInput) -> Result<TokenStream> {
    let DeriveInput { attrs: _, vis: _, ident, mut generics, data } = input;

    let body = match data {
        Data::Struct(st) => match st.fields {
            Fields::Unnamed(FieldsUnnamed { unnamed, .. }) => {
                if unnamed.len() != 1 {
                    error!("only one field struct is supported")
                }

                quote! {
                    Ok(Self(::pgcopy::Decode::decode(value)?))
                }
            }
            Fields::Named(FieldsNamed { named, .. }) => {
                if named.len() != 1 {
                    error!("only one field struct is supported")
                }

                let name = named.into_iter().next().and_then(|e|e.ident);
                quote! {
                    Ok(Self {
                        #name: ::pgcopy::Decode::decode(value)?,
                    })
                }
            },
            Fields::Unit => error!("unit struct is not supported"),
        },
        Data::Enum(_) => error!("enum is not yet supported"),
        Data::Union(_) => error!("union is not supported"),
    };

    for ty in generics.type_params_mut() {
        ty.bounds.push(syn::parse_quote!(::pgcopy::Decode));
    }

    let (g1, g2, g3) = generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #g1 ::pgcopy::Decode for #ident #g2 #g3 {
            fn decode(value: ::pgcopy::Value) -> Result<Self, ::pgcopy::DecodeError> {
                #body
            }
        }
    }.into())
}
