use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input,
    DeriveInput,
};

#[proc_macro_derive(RegisterSerde)]
/// Derived on a 4 byte packed_struct to convert it to and from the 32-bit word of a PFSM register
pub fn derive_register_serde(tokens: TokenStream) -> TokenStream {
    let input = parse_macro_input!(tokens as DeriveInput);
    let reg_name = input.ident;
    let generated = quote! {
        impl crate::registers::RegisterValue for #reg_name {
            fn to_word(&self) -> crate::registers::RegisterResult<u32> {
                let bytes: [u8; 4] = ::packed_struct::PackedStruct::pack(self)?;
                Ok(u32::from_be_bytes(bytes))
            }

            fn from_word(word: u32) -> crate::registers::RegisterResult<Self> {
                Ok(<Self as ::packed_struct::PackedStruct>::unpack(&word.to_be_bytes())?)
            }
        }
    };
    TokenStream::from(generated)
}
