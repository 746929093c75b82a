//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL repositories using Diesel and diesel-async
//! - **memory**: in-process repository and key-value store
//! - **cache**: Redis key-value store
//! - **marketplace**: reqwest transport and Shopee token refresher
//! - **security**: bcrypt password hashing and JWT tokens
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod cache;
pub mod marketplace;
pub mod memory;
pub mod persistence;
pub mod security;
