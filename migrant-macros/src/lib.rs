use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

/// Procedural macro to derive the `WireRecord` trait for plain structs.
///
/// Every named field must implement `WireField`. The generated codec writes
/// the fields in declaration order with no padding or separators, so the
/// record size is the sum of the field sizes.
///
/// # Example
///
/// ```rust,ignore
/// use migrant_core::WireRecord;
///
/// #[derive(Clone, Copy, WireRecord)]
/// struct Sample {
///     id: i32,
///     weight: f64,
/// }
///
/// assert_eq!(Sample::WIRE_SIZE, 12);
/// ```
#[proc_macro_derive(WireRecord)]
pub fn derive_wire_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(&input.generics, "WireRecord cannot be derived for generic types")
            .to_compile_error()
            .into();
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            other => {
                return syn::Error::new_spanned(other, "WireRecord requires named fields")
                    .to_compile_error()
                    .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(name, "WireRecord can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    let idents: Vec<_> = fields.iter().filter_map(|f| f.ident.clone()).collect();
    let types: Vec<_> = fields.iter().map(|f| f.ty.clone()).collect();

    let expanded = quote! {
        impl ::migrant_core::wire::WireRecord for #name {
            const WIRE_SIZE: usize = 0 #( + <#types as ::migrant_core::wire::WireField>::WIRE_SIZE )*;

            fn put<B: ::migrant_core::bytes::BufMut>(&self, buf: &mut B) {
                #( ::migrant_core::wire::WireField::put(&self.#idents, buf); )*
            }

            fn get<B: ::migrant_core::bytes::Buf>(buf: &mut B) -> Self {
                Self {
                    #( #idents: <#types as ::migrant_core::wire::WireField>::get(buf), )*
                }
            }
        }
    };

    TokenStream::from(expanded)
}
