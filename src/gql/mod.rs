//! Dynamic GraphQL schema generation over a class catalog.
//!
//! This module implements a GraphQL schema that is generated from the class
//! definitions of a [`Catalog`]. The schema is regenerated whenever the
//! catalog changes and can be cached per catalog.
//!
//! The subsystem is split into layers:
//!
//! - **Schema assembly** ([`schema`]) -- the entry point that builds a complete
//!   `async_graphql::dynamic::Schema` from the catalog and a [`SchemaConfig`].
//! - **Class queries** (`classes`) -- generates Query root fields and Object types for each
//!   exposed class.
//! - **Field configs** ([`fields`]) -- maps one attribute declaration to a generated field:
//!   name, type, description, and resolver.
//! - **Relation resolution** ([`relation`]) -- resolves stored and reverse relation attributes
//!   into permission-filtered element sequences at query time.
//! - **Extraction** ([`extract`]) -- the requested-field tree and the service that populates
//!   element descriptors per recursion level.
//! - **Identification** ([`ident`]) -- element lookup by type and id or fullpath.
//! - **Caching** ([`cache`]) -- caches generated schemas keyed by catalog name.
//! - **Error handling** ([`error`]) -- domain error type ([`GqlError`]) with helper constructors.
//! - **Utilities** (`utils`, `ext`) -- shared helpers for value conversion and
//!   `async_graphql` extensions.

pub mod cache;
mod classes;
pub mod error;
mod ext;
pub mod extract;
pub mod fields;
pub mod ident;
pub mod relation;
pub mod schema;
mod utils;

pub use cache::{Invalidator, Optimistic, Pessimistic, SchemaCache};
pub use error::GqlError;
pub use extract::{ElementDescriptor, ExtractionService, Selection, StoredValueExtractor};
pub use fields::FieldDescriptor;
pub use schema::{ClassesConfig, SchemaConfig, generate_schema};
pub use utils::ResolverArgs;

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::iam::PermissionGate;
use crate::session::Session;
use crate::store::ObjectRepository;

/// Everything resolvers need, bundled once at schema-build time.
///
/// Collaborators are injected here and cloned into resolver closures; nothing
/// is looked up from ambient state at query time. The bundle is cheap to
/// clone and safe to share across concurrent queries.
#[derive(Clone)]
pub struct QueryEnv {
	pub catalog: Arc<Catalog>,
	pub store: Arc<dyn ObjectRepository>,
	pub gate: Arc<dyn PermissionGate>,
	pub extractor: Arc<dyn ExtractionService>,
	pub session: Arc<Session>,
}

impl QueryEnv {
	/// Bundles the collaborators with the default extraction service.
	pub fn new(
		catalog: Arc<Catalog>,
		store: Arc<dyn ObjectRepository>,
		gate: Arc<dyn PermissionGate>,
		session: Session,
	) -> Self {
		Self {
			catalog,
			store,
			gate,
			extractor: Arc::new(StoredValueExtractor),
			session: Arc::new(session),
		}
	}

	pub fn with_extractor(mut self, extractor: Arc<dyn ExtractionService>) -> Self {
		self.extractor = extractor;
		self
	}
}
