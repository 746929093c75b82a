//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the migrations under `backend/migrations`.
//! Row structs in `models.rs` derive `QueryableByName` against them, so a
//! column type drifting from the migration fails at compile time.

diesel::table! {
    /// Registered accounts. `email` carries a unique constraint.
    users (id) {
        id -> Int8,
        name -> Varchar,
        email -> Varchar,
        /// One-way password hash; never projected into responses.
        password -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Catalogue products. Soft-deleted rows keep a `deleted_at` stamp.
    products (id) {
        id -> Int8,
        name -> Varchar,
        description -> Nullable<Varchar>,
        price -> Float8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(users, products);
