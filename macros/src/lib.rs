extern crate proc_macro;

macro_rules! bail {
    ($item:expr, $fmt:literal $($tts:tt)*) => {
        return Err(Error::new_spanned(
            &$item,
            format!(concat!("render-shield: ", $fmt) $($tts)*)
        ))
    }
}

mod derive;

use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Error, Result, parse_quote};

/// Convert a struct into a `render_shield::Value`.
///
/// ```ignore
/// # use render_shield::ToValue;
/// #[derive(ToValue)]
/// struct Props {
///     id: u32,
///     #[shield(rename = "label")]
///     title: String,
///     #[shield(skip)]
///     scratch: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(ToValue, attributes(shield))]
pub fn to_value(stream: TokenStream) -> TokenStream {
    let item = syn::parse_macro_input!(stream as syn::DeriveInput);
    derive::expand(item)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
