// src/lib.rs

//! Order/payment lifecycle service for a multi-tenant storefront.
//!
//! The crate owns the one subsystem of the platform where consistency is
//! hard-won: checkout with atomic inventory reservation, payment-intent
//! creation against an external gateway, client-side payment verification,
//! asynchronous webhook reconciliation and refunds. Everything else the
//! platform does (catalog CRUD, auth, media, rendering) is an external
//! collaborator reached through the traits in [`stores`] and [`gateway`].

pub mod config;
pub mod errors;
pub mod gateway;
pub mod models;
pub mod services;
pub mod state;
pub mod stores;
pub mod web;
