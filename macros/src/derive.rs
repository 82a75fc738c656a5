use super::*;

/// Derive `ToValue` for a struct.
pub fn expand(mut item: syn::DeriveInput) -> Result<proc_macro2::TokenStream> {
    let data = match &item.data {
        syn::Data::Struct(data) => data,
        syn::Data::Enum(data) => {
            bail!(data.enum_token, "enums are not supported")
        }
        syn::Data::Union(data) => {
            bail!(data.union_token, "unions are not supported")
        }
    };

    let body = match &data.fields {
        syn::Fields::Named(fields) => {
            let mut inserts = vec![];
            for field in &fields.named {
                let attrs = Attrs::parse(field)?;
                if attrs.skip {
                    continue;
                }

                let Some(ident) = &field.ident else { continue };
                let key = match attrs.rename {
                    Some(lit) => lit.value(),
                    None => ident.unraw().to_string(),
                };

                inserts.push(quote! {
                    map.insert(
                        #key,
                        ::render_shield::ToValue::to_value(&self.#ident),
                    );
                });
            }

            quote! {
                #[allow(unused_mut)]
                let mut map = ::render_shield::Map::new();
                #(#inserts)*
                ::render_shield::Value::from(map)
            }
        }
        syn::Fields::Unnamed(fields) => {
            let mut items = vec![];
            for (i, field) in fields.unnamed.iter().enumerate() {
                let attrs = Attrs::parse(field)?;
                if let Some(lit) = &attrs.rename {
                    bail!(lit, "tuple fields cannot be renamed");
                }
                if attrs.skip {
                    continue;
                }

                let index = syn::Index::from(i);
                items.push(quote! {
                    ::render_shield::ToValue::to_value(&self.#index)
                });
            }

            quote! {
                ::render_shield::Value::from(
                    ::std::vec::Vec::<::render_shield::Value>::from([#(#items),*])
                )
            }
        }
        syn::Fields::Unit => quote! {
            ::render_shield::Value::from(::render_shield::Map::new())
        },
    };

    // Every type parameter must itself be convertible.
    for param in item.generics.type_params_mut() {
        param.bounds.push(parse_quote!(::render_shield::ToValue));
    }

    let name = &item.ident;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::render_shield::ToValue for #name #ty_generics
        #where_clause
        {
            fn to_value(&self) -> ::render_shield::Value {
                #body
            }
        }
    })
}

/// The `#[shield(...)]` attributes of a field.
#[derive(Default)]
struct Attrs {
    skip: bool,
    rename: Option<syn::LitStr>,
}

impl Attrs {
    fn parse(field: &syn::Field) -> Result<Self> {
        let mut attrs = Self::default();
        for attr in &field.attrs {
            if !attr.path().is_ident("shield") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    attrs.skip = true;
                    Ok(())
                } else if meta.path.is_ident("rename") {
                    attrs.rename = Some(meta.value()?.parse()?);
                    Ok(())
                } else {
                    Err(meta.error("expected `skip` or `rename`"))
                }
            })?;
        }
        Ok(attrs)
    }
}
