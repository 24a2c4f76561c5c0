use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Field};

/// Generates `{Name}Table`, a `Vec`-backed row store, plus its `Table` impl.
///
/// Every field is read through the crate-wide `FromByteStream` seam, uniformly passing
/// `sizes: &IndexSizes` along - table rows have no special-cased field types anymore, unlike
/// the heap-size-only scheme this replaced.
pub fn derive(tokens: proc_macro::TokenStream) -> TokenStream {
    let DeriveInput { ident, data, .. } = syn::parse(tokens).unwrap();

    let data = match data {
        Data::Struct(data) => data,
        Data::Enum(_) => panic!("Enums are not supported"),
        Data::Union(_) => panic!("Unions are not supported"),
    };

    let table = format_ident!("{}Table", ident);
    let reads = data.fields.iter().map(|Field { ident, ty, .. }| {
        quote!(#ident: <#ty as crate::utilities::FromByteStream>::read(stream, sizes)?)
    });

    quote! {
        #[derive(Debug)]
        pub struct #table {
            rows: Vec<#ident>,
        }

        impl #table {
            pub(crate) fn read(
                stream: &mut std::io::Cursor<&[u8]>,
                sizes: &crate::metadata::indices::sizes::IndexSizes,
                len: usize,
            ) -> std::io::Result<Self> {
                let mut rows = Vec::with_capacity(len);
                for _ in 0..len {
                    rows.push(#ident { #(#reads),* })
                }
                Ok(Self { rows })
            }

            pub fn rows(&self) -> &[#ident] {
                &self.rows
            }

            pub fn get(&self, index: usize) -> Option<&#ident> {
                self.rows.get(index)
            }
        }

        impl crate::metadata::table::Table for #table {
            fn len(&self) -> usize {
                self.rows.len()
            }

            fn kind(&self) -> crate::metadata::table::TableKind {
                crate::metadata::table::TableKind::#ident
            }
        }
    }
}
