use convert_case::{Case, Casing};
use darling::{FromDeriveInput, FromField, ast::Data, util::Flag};
use proc_macro_error2::{abort, emit_error};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Ident, Type, parse2};

#[derive(FromField, Debug, Clone)]
#[darling(attributes(strata_orm))]
struct DeriveModelField {
    ident: Option<Ident>,
    ty: Type,
    column: Option<String>,
    /// Marks a `Loaded<...>` relationship field, which is not a column.
    relation: Flag,
}

#[derive(FromDeriveInput)]
#[darling(attributes(strata_orm))]
struct DeriveModelTarget {
    ident: Ident,
    table: Option<String>,
    primary_key: Ident,
    data: Data<(), DeriveModelField>,
}

#[derive(Clone)]
struct TargetColumn {
    field_ident: Ident,
    db_name: String,
    struct_name: String,
    ty: Type,
}

pub fn derive_database_model(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match parse2(input) {
        Ok(e) => e,
        Err(e) => return e.to_compile_error(),
    };

    let target = match DeriveModelTarget::from_derive_input(&input) {
        Ok(r) => r,
        Err(e) => return e.write_errors(),
    };

    let Some(struct_data) = target.data.take_struct() else {
        abort! {
            input, "Target is not a struct.";
            note = "This macro must be run on a struct.";
        };
    };

    let mut columns = vec![];
    let mut relations = vec![];

    for field in &struct_data.fields {
        let Some(ident) = &field.ident else {
            abort! {
                field.ident, "Field has no ident.";
                note = "This macro cannot be run on tuple structs.";
            };
        };

        if field.relation.is_present() {
            relations.push(ident.clone());
            continue;
        }

        columns.push(TargetColumn {
            field_ident: ident.clone(),
            db_name: field.column.clone().unwrap_or_else(|| ident.to_string()),
            struct_name: ident.to_string().to_case(Case::Pascal),
            ty: field.ty.clone(),
        });
    }

    // Make sure all columns have unique names.
    if let Some(duplicate) = columns
        .iter()
        .find(|e| columns.iter().filter(|o| e.db_name.eq(&o.db_name)).count() > 1)
    {
        columns.iter().for_each(|e| {
            if columns.iter().filter(|o| e.db_name.eq(&o.db_name)).count() > 1 {
                emit_error! {
                    e.field_ident.span(), "Clashing occurrence of \"{}\" here.", e.db_name
                };
            }
        });

        abort! {
            duplicate.field_ident.span(), "Duplicate column definition \"{}\"", duplicate.db_name;
            note = "Columns must have unique names, if necessary use the #[strata_orm(column = \"my_column_name\")] attribute to specify a unique name.";
        }
    }

    let Some(primary_key_struct_ident) = columns.iter().find_map(|e| {
        if e.field_ident.eq(&target.primary_key) {
            Some(Ident::new(e.struct_name.as_str(), e.field_ident.span()))
        } else {
            None
        }
    }) else {
        abort! {
            input, "Missing primary key.";
            note = "You need to specify which column is supposed to act as the primary key, using #[strata_orm(primary_key = \"field_name\")]";
        }
    };

    let columns_module = {
        let column_impls = columns.iter().map(|e| {
            let struct_name = Ident::new(e.struct_name.as_str(), e.field_ident.span());
            let db_name = &e.db_name;
            let ty = &e.ty;

            quote! {
                #[derive(Debug, Clone, Copy, Default)]
                pub struct #struct_name;

                impl ::strata_orm::entity::column::Column for #struct_name {
                    type Type = #ty;
                    type Entity = super::Entity;
                    const NAME: &'static str = #db_name;
                }
            }
        });

        quote! {
            pub mod columns {
                #[allow(unused_imports)]
                use super::*;

                #(
                    #column_impls
                )*
            }
        }
    };

    let model_ident = &target.ident;

    let entity_impl = {
        let table_name = target
            .table
            .unwrap_or_else(|| target.ident.to_string().to_case(Case::Snake));

        let column_names_decl = columns.iter().map(|e| &e.db_name);

        quote! {
            #[derive(Debug, Clone, Copy, Default)]
            pub struct Entity;

            impl ::strata_orm::entity::Entity for Entity {
                type PrimaryKeyColumn = columns::#primary_key_struct_ident;

                type Model = #model_ident;

                const TABLE_NAME: &'static str = #table_name;

                const COLUMN_NAMES: &'static [&'static str] = &[
                    #(#column_names_decl),*
                ];
            }
        }
    };

    let model_impl = {
        let column_field_assignments = columns.iter().map(|e| {
            let field_ident = &e.field_ident;
            let column_struct_name = Ident::new(e.struct_name.as_str(), field_ident.span());

            quote! {
                #field_ident: columns::#column_struct_name::value_from_row(row, prefix)?,
            }
        });

        let relation_field_assignments = relations.iter().map(|e| {
            quote! {
                #e: ::strata_orm::entity::relation::Loaded::Unresolved,
            }
        });

        let value_arms = columns.iter().map(|e| {
            let field_ident = &e.field_ident;
            let db_name = &e.db_name;

            quote! {
                #db_name => Some(::strata_orm::query::value::ColumnType::into_value(self.#field_ident.clone())),
            }
        });

        let resolved_arms = relations.iter().map(|e| {
            let path = e.to_string();

            quote! {
                #path => self.#e.is_resolved(),
            }
        });

        quote! {
            impl ::strata_orm::query::parse::ParseFromRow for #model_ident {
                fn parse_from_row(
                    row: &::strata_orm::sqlx::any::AnyRow,
                    prefix: &str,
                ) -> ::strata_orm::Result<Self> {
                    use ::strata_orm::entity::column::Column;

                    Ok(Self {
                        #(
                            #column_field_assignments
                        )*
                        #(
                            #relation_field_assignments
                        )*
                    })
                }
            }

            impl ::strata_orm::entity::model::Model for #model_ident {
                type Entity = Entity;

                fn value_of(&self, column: &str) -> ::std::option::Option<::strata_orm::query::value::Value> {
                    match column {
                        #(
                            #value_arms
                        )*
                        _ => None,
                    }
                }

                fn is_resolved(&self, path: &str) -> bool {
                    match path {
                        #(
                            #resolved_arms
                        )*
                        _ => false,
                    }
                }
            }
        }
    };

    quote! {
        #model_impl

        #entity_impl

        #columns_module
    }
}
