use tokio::sync::RwLock;

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use async_graphql::dynamic::Schema;
use uuid::Uuid;

use super::QueryEnv;
use super::error::GqlError;
use super::schema::{SchemaConfig, generate_schema};

#[async_trait::async_trait]
pub trait Invalidator: Debug + Clone + Send + Sync + 'static {
	type MetaData: Debug + Clone + Send + Sync + Hash;

	fn is_valid(env: &QueryEnv, meta: &Self::MetaData) -> bool;

	async fn generate(
		env: &QueryEnv,
		config: &SchemaConfig,
	) -> Result<(Schema, Self::MetaData), GqlError>;
}

/// Regenerates on every request.
#[derive(Debug, Clone, Copy)]
pub struct Pessimistic;

#[async_trait::async_trait]
impl Invalidator for Pessimistic {
	type MetaData = ();

	fn is_valid(_env: &QueryEnv, _meta: &Self::MetaData) -> bool {
		false
	}

	async fn generate(
		env: &QueryEnv,
		config: &SchemaConfig,
	) -> Result<(Schema, Self::MetaData), GqlError> {
		let schema = generate_schema(env, config)?;
		Ok((schema, ()))
	}
}

/// Reuses a cached schema until the catalog revision moves.
#[derive(Debug, Clone, Copy)]
pub struct Optimistic;

#[async_trait::async_trait]
impl Invalidator for Optimistic {
	type MetaData = Uuid;

	fn is_valid(env: &QueryEnv, meta: &Self::MetaData) -> bool {
		env.catalog.revision() == *meta
	}

	async fn generate(
		env: &QueryEnv,
		config: &SchemaConfig,
	) -> Result<(Schema, Self::MetaData), GqlError> {
		let schema = generate_schema(env, config)?;
		Ok((schema, env.catalog.revision()))
	}
}

#[derive(Clone)]
pub struct SchemaCache<I: Invalidator = Pessimistic> {
	inner: Arc<RwLock<BTreeMap<String, (Schema, I::MetaData)>>>,
	pub config: SchemaConfig,
	_invalidator: PhantomData<I>,
}

impl<I: Invalidator> Debug for SchemaCache<I> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SchemaCache")
			.field("inner", &self.inner)
			.field("config", &self.config)
			.field("_invalidator", &self._invalidator)
			.finish()
	}
}

impl<I: Invalidator> SchemaCache<I> {
	pub fn new(config: SchemaConfig) -> Self {
		SchemaCache {
			inner: Default::default(),
			config,
			_invalidator: PhantomData,
		}
	}

	/// Returns the schema for the catalog behind `env`, regenerating it when
	/// the invalidation policy says the cached one can no longer be trusted.
	pub async fn get_schema(&self, env: &QueryEnv) -> Result<Schema, GqlError> {
		let catalog = env.catalog.name();
		{
			let guard = self.inner.read().await;
			if let Some(cand) = guard.get(catalog) {
				if I::is_valid(env, &cand.1) {
					return Ok(cand.0.clone());
				}
			}
		};

		let (schema, meta) = I::generate(env, &self.config).await?;

		{
			let mut guard = self.inner.write().await;
			guard.insert(catalog.to_owned(), (schema.clone(), meta));
		}

		Ok(schema)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::{Catalog, ClassDefinition, ClassId};
	use crate::iam::AllowAll;
	use crate::session::Session;
	use crate::store::MemoryStore;

	fn env_with_classes(names: &[&str]) -> QueryEnv {
		let mut catalog = Catalog::new("content");
		for (i, name) in names.iter().enumerate() {
			catalog.add_class(ClassDefinition::new(ClassId(i as u32 + 1), *name));
		}
		QueryEnv::new(
			Arc::new(catalog),
			Arc::new(MemoryStore::new()),
			Arc::new(AllowAll),
			Session::new(),
		)
	}

	#[test]
	fn invalidator_contracts() {
		let env = env_with_classes(&["song"]);
		assert!(!Pessimistic::is_valid(&env, &()));
		assert!(Optimistic::is_valid(&env, &env.catalog.revision()));
		assert!(!Optimistic::is_valid(&env, &Uuid::now_v7()));
	}

	#[tokio::test]
	async fn pessimistic_caches_track_every_catalog_change() {
		let cache: SchemaCache = SchemaCache::new(SchemaConfig::auto());

		let env = env_with_classes(&["song"]);
		let sdl = cache.get_schema(&env).await.unwrap().sdl();
		assert!(sdl.contains("type song"));
		assert!(!sdl.contains("type artist"));

		let env = env_with_classes(&["song", "artist"]);
		let sdl = cache.get_schema(&env).await.unwrap().sdl();
		assert!(sdl.contains("type artist"));
	}

	#[tokio::test]
	async fn optimistic_caches_regenerate_when_the_revision_moves() {
		let cache: SchemaCache<Optimistic> = SchemaCache::new(SchemaConfig::auto());

		let env = env_with_classes(&["song"]);
		let first = cache.get_schema(&env).await.unwrap();
		let again = cache.get_schema(&env).await.unwrap();
		assert_eq!(first.sdl(), again.sdl());

		let env = env_with_classes(&["song", "artist"]);
		let sdl = cache.get_schema(&env).await.unwrap().sdl();
		assert!(sdl.contains("type artist"));
	}

	#[tokio::test]
	async fn generation_failures_propagate() {
		let cache: SchemaCache = SchemaCache::new(SchemaConfig::default());
		let env = env_with_classes(&["song"]);

		let err = cache.get_schema(&env).await.unwrap_err();
		assert!(matches!(err, GqlError::NotConfigured));
	}
}
