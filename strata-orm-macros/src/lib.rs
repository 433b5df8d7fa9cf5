mod model;
mod projection;

use model::derive_database_model;
use proc_macro::TokenStream;
use proc_macro_error2::proc_macro_error;
use projection::derive_projection;

#[proc_macro_error]
#[proc_macro_derive(DatabaseModel, attributes(strata_orm))]
pub fn database_model(input: TokenStream) -> TokenStream {
    derive_database_model(input.into()).into()
}

#[proc_macro_error]
#[proc_macro_derive(Projection, attributes(strata_orm))]
pub fn projection(input: TokenStream) -> TokenStream {
    derive_projection(input.into()).into()
}
