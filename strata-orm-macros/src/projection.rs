use darling::{FromDeriveInput, FromField, ast::Data, util::Flag};
use proc_macro_error2::abort;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, Ident, Type, parse2};

#[derive(FromField)]
#[darling(attributes(strata_orm))]
struct ProjectionField {
    ident: Option<Ident>,
    ty: Type,
    /// The binding name, if it differs from the field name.
    name: Option<String>,
}

#[derive(FromDeriveInput)]
#[darling(attributes(strata_orm))]
struct ProjectionTarget {
    ident: Ident,
    data: Data<(), ProjectionField>,
    fields: Flag,
    setters: Flag,
    constructor: Option<Ident>,
}

struct TargetField {
    ident: Ident,
    name: String,
    ty: Type,
}

pub fn derive_projection(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match parse2(input) {
        Ok(e) => e,
        Err(e) => return e.to_compile_error(),
    };

    let target = match ProjectionTarget::from_derive_input(&input) {
        Ok(e) => e,
        Err(e) => return e.write_errors(),
    };

    let struct_name = &target.ident;

    let Some(struct_data) = target.data.take_struct() else {
        abort! {
            struct_name, "Target is not a struct";
            note = "This macro must be run on a struct.";
        };
    };

    if !target.fields.is_present() && !target.setters.is_present() && target.constructor.is_none()
    {
        abort! {
            struct_name, "No binding strategy selected";
            note = "Use #[strata_orm(fields)], #[strata_orm(setters)] and/or #[strata_orm(constructor = \"new\")].";
        };
    }

    let fields = struct_data
        .fields
        .iter()
        .map(|e| {
            let Some(ident) = &e.ident else {
                abort! {
                    e.ident, "Field has no name";
                    note = "This macro must not be run on tuple structs";
                };
            };

            TargetField {
                ident: ident.clone(),
                name: e.name.clone().unwrap_or_else(|| ident.to_string()),
                ty: e.ty.clone(),
            }
        })
        .collect::<Vec<_>>();

    let names = fields.iter().map(|e| &e.name).collect::<Vec<_>>();

    let field_impl = target.fields.is_present().then(|| {
        let arms = fields.iter().map(|e| {
            let ident = &e.ident;
            let name = &e.name;
            let ty = &e.ty;

            quote! {
                #name => self.#ident = <#ty as ::strata_orm::query::value::ColumnType>::from_value(value)?,
            }
        });

        quote! {
            impl ::strata_orm::query::projection::FieldTarget for #struct_name {
                const FIELDS: &'static [&'static str] = &[#(#names),*];

                fn write_field(
                    &mut self,
                    name: &str,
                    value: ::strata_orm::query::value::Value,
                ) -> ::strata_orm::Result<()> {
                    match name {
                        #(
                            #arms
                        )*
                        other => {
                            return Err(::strata_orm::Error::ProjectionBinding(format!(
                                "{} has no field named `{other}`",
                                stringify!(#struct_name)
                            )));
                        }
                    }
                    Ok(())
                }
            }
        }
    });

    let setter_impl = target.setters.is_present().then(|| {
        let arms = fields.iter().map(|e| {
            let setter = format_ident!("set_{}", e.ident);
            let name = &e.name;
            let ty = &e.ty;

            quote! {
                #name => self.#setter(<#ty as ::strata_orm::query::value::ColumnType>::from_value(value)?),
            }
        });

        quote! {
            impl ::strata_orm::query::projection::SetterTarget for #struct_name {
                const SETTERS: &'static [&'static str] = &[#(#names),*];

                fn call_setter(
                    &mut self,
                    name: &str,
                    value: ::strata_orm::query::value::Value,
                ) -> ::strata_orm::Result<()> {
                    match name {
                        #(
                            #arms
                        )*
                        other => {
                            return Err(::strata_orm::Error::ProjectionBinding(format!(
                                "{} has no setter for `{other}`",
                                stringify!(#struct_name)
                            )));
                        }
                    }
                    Ok(())
                }
            }
        }
    });

    let constructor_impl = target.constructor.as_ref().map(|constructor| {
        let arity = fields.len();
        let arguments = fields.iter().map(|e| {
            let ty = &e.ty;

            quote! {
                <#ty as ::strata_orm::query::value::ColumnType>::from_value(
                    values.next().unwrap_or(::strata_orm::query::value::Value::Null),
                )?
            }
        });

        quote! {
            impl ::strata_orm::query::projection::ConstructorTarget for #struct_name {
                const ARITY: usize = #arity;

                fn construct(
                    values: ::std::vec::Vec<::strata_orm::query::value::Value>,
                ) -> ::strata_orm::Result<Self> {
                    if values.len() != #arity {
                        return Err(::strata_orm::Error::ProjectionBinding(format!(
                            "{}::{} takes {} arguments, got {}",
                            stringify!(#struct_name),
                            stringify!(#constructor),
                            #arity,
                            values.len()
                        )));
                    }

                    let mut values = values.into_iter();
                    Ok(Self::#constructor(#(#arguments),*))
                }
            }
        }
    });

    quote! {
        #field_impl

        #setter_impl

        #constructor_impl
    }
}
