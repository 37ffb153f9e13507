//! Derive macros for `pgcopy`.
use proc_macro::TokenStream;
use syn::DeriveInput;

macro_rules! error {
    ($($tt:tt)*) => {
        return Err(syn::Error::new(proc_macro::Span::call_site().into(), format!($($tt)*)))
    };
}

mod from_row;
mod decode;

/// Derive `FromRow`.
///
/// Named field is looked up by its name in the row mapping, tuple struct
/// field is taken by position.
#[proc_macro_derive(FromRow)]
pub fn from_row(input: TokenStream) -> TokenStream {
    match from_row::from_row(syn::parse_macro_input!(input as DeriveInput)) {
        Ok(ok) => ok,
        Err(err) => err.into_compile_error().into(),
    }
}

/// Derive `Decode` for single field struct.
#[proc_macro_derive(Decode)]
pub fn decode(input: TokenStream) -> TokenStream {
    match decode::decode(syn::parse_macro_input!(input as DeriveInput)) {
        Ok(ok) => ok,
        Err(err) => err.into_compile_error().into(),
    }
}
