//! # ObjectQL
//!
//! A schema-driven GraphQL query layer for content object graphs.
//!
//! Given a catalog of class definitions, this crate generates a dynamic
//! GraphQL schema whose field resolvers read a content-object store through
//! a small set of collaborator traits: an object repository, a permission
//! gate, and a field extraction service. Relation attributes resolve across
//! the graph at query time, filtered by per-object read permissions.

#[macro_use]
extern crate tracing;

pub mod catalog;
pub mod gql;
pub mod iam;
pub mod session;
pub mod store;

pub use gql::QueryEnv;
pub use session::Session;
