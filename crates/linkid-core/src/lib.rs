//! Core types and the identity-resolution algorithm for linkid.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::ContactStore`]; the HTTP boundary
//! drives [`resolver::Resolver`] and renders [`view::ClusterView`].

pub mod contact;
pub mod error;
pub mod memory;
pub mod resolver;
pub mod store;
pub mod view;

pub use error::{Error, Result};
