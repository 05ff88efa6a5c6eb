//! Emporium Core - Shared domain types.
//!
//! This crate provides the types shared by every Emporium component:
//! - `storefront` - Public store, cart, checkout and admin panel
//! - `cli` - Migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, money, roles, SKUs and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
