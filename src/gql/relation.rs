//! Query-time resolution of relation attributes.

use async_graphql::dynamic::{FieldFuture, FieldValue, ResolverContext};

use super::QueryEnv;
use super::error::{GqlError, internal_error, resolver_error};
use super::extract::{ElementDescriptor, Selection, describe};
use super::fields::ResolverFn;
use super::utils::{ResolverArgs, descriptor_value, owned_args};
use crate::catalog::ReverseRelation;
use crate::store::{ElementType, RelationRef, Value};

/// Resolves the incoming side of relation rows owned by another class.
///
/// Resolution is read-only. The same parent, arguments, store and
/// permissions yield the same sequence in the same order on every call.
pub struct ReverseRelationResolver {
	relation: ReverseRelation,
	env: QueryEnv,
}

impl ReverseRelationResolver {
	pub fn new(relation: ReverseRelation, env: QueryEnv) -> Self {
		Self {
			relation,
			env,
		}
	}

	/// Turns the parent object's identity into the permission-filtered,
	/// extracted sequence of owning objects, in row order.
	///
	/// The parent is re-fetched by id before anything else: descriptors
	/// carry identity, not authority, and the store stays the single source
	/// of truth. Parent lookup failures are not masked. A `None` row answer
	/// from the store passes through unchanged; it is not the same thing as
	/// an empty sequence.
	pub async fn resolve(
		&self,
		parent: Option<&ElementDescriptor>,
		args: &ResolverArgs,
		selection: &Selection,
	) -> Result<Option<Vec<ElementDescriptor>>, GqlError> {
		let parent = parent.ok_or(GqlError::MissingParentIdentity)?;
		let object = self
			.env
			.store
			.get_by_id(parent.id)
			.await
			.map_err(GqlError::from)?
			.ok_or_else(|| resolver_error(format!("object {} no longer exists", parent.id)))?;

		let rows = self
			.env
			.store
			.get_inverse_relations(&self.relation.owner_field, self.relation.owner_class, object.id)
			.await
			.map_err(GqlError::from)?;
		let Some(rows) = rows else {
			return Ok(None);
		};

		materialize(&self.env, rows, args, selection).await.map(Some)
	}
}

/// Resolves stored (forward) relation values read off the parent object.
pub struct RelationResolver {
	attribute: String,
	env: QueryEnv,
}

impl RelationResolver {
	pub fn new(attribute: impl Into<String>, env: QueryEnv) -> Self {
		Self {
			attribute: attribute.into(),
			env,
		}
	}

	/// Stored rows of a relation collection, admitted one by one. An absent
	/// stored value resolves to null rather than an empty sequence.
	pub async fn resolve_many(
		&self,
		parent: Option<&ElementDescriptor>,
		args: &ResolverArgs,
		selection: &Selection,
	) -> Result<Option<Vec<ElementDescriptor>>, GqlError> {
		match self.stored_value(parent).await? {
			None | Some(Value::None) => Ok(None),
			Some(Value::Relations(rows)) => {
				materialize(&self.env, rows, args, selection).await.map(Some)
			}
			Some(_) => Err(internal_error(format!(
				"attribute `{}` does not hold relation rows",
				self.attribute
			))),
		}
	}

	/// A singular stored relation. Dangling and denied targets resolve to
	/// null, the singular rendition of silent omission.
	pub async fn resolve_one(
		&self,
		parent: Option<&ElementDescriptor>,
		args: &ResolverArgs,
		selection: &Selection,
	) -> Result<Option<ElementDescriptor>, GqlError> {
		match self.stored_value(parent).await? {
			None | Some(Value::None) => Ok(None),
			Some(Value::Relation(row)) => admit(&self.env, row, args, selection).await,
			Some(_) => Err(internal_error(format!(
				"attribute `{}` does not hold a single relation",
				self.attribute
			))),
		}
	}

	/// Reads the attribute off the descriptor when extraction already copied
	/// it, else from the freshly fetched object.
	async fn stored_value(
		&self,
		parent: Option<&ElementDescriptor>,
	) -> Result<Option<Value>, GqlError> {
		let parent = parent.ok_or(GqlError::MissingParentIdentity)?;
		if let Some(value) = parent.value(&self.attribute) {
			return Ok(Some(value.clone()));
		}
		let object = self
			.env
			.store
			.get_by_id(parent.id)
			.await
			.map_err(GqlError::from)?
			.ok_or_else(|| resolver_error(format!("object {} no longer exists", parent.id)))?;
		Ok(object.value(&self.attribute).cloned())
	}
}

/// Admits the rows of one relation in order. Gaps close up; nothing is
/// padded or re-ordered.
async fn materialize(
	env: &QueryEnv,
	rows: Vec<RelationRef>,
	args: &ResolverArgs,
	selection: &Selection,
) -> Result<Vec<ElementDescriptor>, GqlError> {
	let mut out = Vec::with_capacity(rows.len());
	for row in rows {
		if let Some(desc) = admit(env, row, args, selection).await? {
			out.push(desc);
		}
	}
	Ok(out)
}

/// One row of the admission loop. `Ok(None)` is the silent-omission case:
/// non-object rows, rows whose object cannot be fetched, and objects the
/// caller may not read, all indistinguishable from absence in the result.
/// Extraction failures are not omission cases and propagate.
async fn admit(
	env: &QueryEnv,
	row: RelationRef,
	args: &ResolverArgs,
	selection: &Selection,
) -> Result<Option<ElementDescriptor>, GqlError> {
	if row.element_type != ElementType::Object {
		return Ok(None);
	}
	let Ok(Some(object)) = env.store.get_by_id(row.id).await else {
		return Ok(None);
	};
	if !env.gate.can_read(&object).await {
		return Ok(None);
	}
	describe(env, &object, args, selection).await.map(Some)
}

pub(crate) fn make_reverse_relation_resolver(
	relation: ReverseRelation,
	env: QueryEnv,
) -> ResolverFn {
	Box::new(move |ctx: ResolverContext| {
		let resolver = ReverseRelationResolver::new(relation.clone(), env.clone());
		FieldFuture::new(async move {
			let parent = ctx.parent_value.downcast_ref::<ElementDescriptor>();
			let args = owned_args(&ctx);
			let selection = Selection::from_field(ctx.ctx.field());
			match resolver.resolve(parent, &args, &selection).await? {
				Some(items) => {
					Ok(Some(FieldValue::list(items.into_iter().map(descriptor_value))))
				}
				None => Ok(None),
			}
		})
	})
}

pub(crate) fn make_relation_list_resolver(
	attribute: String,
	tagged: bool,
	env: QueryEnv,
) -> ResolverFn {
	Box::new(move |ctx: ResolverContext| {
		let resolver = RelationResolver::new(attribute.clone(), env.clone());
		FieldFuture::new(async move {
			let parent = ctx.parent_value.downcast_ref::<ElementDescriptor>();
			let args = owned_args(&ctx);
			let selection = Selection::from_field(ctx.ctx.field());
			match resolver.resolve_many(parent, &args, &selection).await? {
				Some(items) => Ok(Some(FieldValue::list(
					items.into_iter().map(|desc| tag_value(desc, tagged)),
				))),
				None => Ok(None),
			}
		})
	})
}

pub(crate) fn make_single_relation_resolver(
	attribute: String,
	tagged: bool,
	env: QueryEnv,
) -> ResolverFn {
	Box::new(move |ctx: ResolverContext| {
		let resolver = RelationResolver::new(attribute.clone(), env.clone());
		FieldFuture::new(async move {
			let parent = ctx.parent_value.downcast_ref::<ElementDescriptor>();
			let args = owned_args(&ctx);
			let selection = Selection::from_field(ctx.ctx.field());
			match resolver.resolve_one(parent, &args, &selection).await? {
				Some(desc) => Ok(Some(tag_value(desc, tagged))),
				None => Ok(None),
			}
		})
	})
}

/// Union-typed fields need the concrete type name on the value; fields with
/// exactly one target class resolve against that type directly.
fn tag_value(desc: ElementDescriptor, tagged: bool) -> FieldValue<'static> {
	if tagged {
		let ty = desc.type_name.clone();
		descriptor_value(desc).with_type(ty)
	} else {
		descriptor_value(desc)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use async_trait::async_trait;

	use super::*;
	use crate::catalog::{
		AttributeDeclaration, AttributeKind, Catalog, ClassDefinition, ClassId, ValueKind,
	};
	use crate::iam::{AllowAll, PermissionGate, WorkspaceRules};
	use crate::session::Session;
	use crate::store::{MemoryStore, ObjectId, ObjectNode, ObjectRepository};

	const SONG: ClassId = ClassId(1);
	const ARTIST: ClassId = ClassId(2);

	fn catalog() -> Catalog {
		Catalog::new("content")
			.with_class(
				ClassDefinition::new(SONG, "song").with_attribute(AttributeDeclaration::new(
					"title",
					AttributeKind::Value(ValueKind::String),
				)),
			)
			.with_class(ClassDefinition::new(ARTIST, "artist"))
	}

	fn env_with(store: Arc<dyn ObjectRepository>, gate: Arc<dyn PermissionGate>) -> QueryEnv {
		QueryEnv::new(Arc::new(catalog()), store, gate, Session::new())
	}

	/// Store wrapper counting repository calls.
	struct CountingStore {
		inner: MemoryStore,
		lookups: AtomicUsize,
	}

	impl CountingStore {
		fn new(inner: MemoryStore) -> Self {
			Self {
				inner,
				lookups: AtomicUsize::new(0),
			}
		}

		fn count(&self) -> usize {
			self.lookups.load(Ordering::SeqCst)
		}
	}

	#[async_trait]
	impl ObjectRepository for CountingStore {
		async fn get_by_id(&self, id: ObjectId) -> anyhow::Result<Option<ObjectNode>> {
			self.lookups.fetch_add(1, Ordering::SeqCst);
			self.inner.get_by_id(id).await
		}

		async fn get_by_path(&self, path: &str) -> anyhow::Result<Option<ObjectNode>> {
			self.lookups.fetch_add(1, Ordering::SeqCst);
			self.inner.get_by_path(path).await
		}

		async fn list(
			&self,
			class: ClassId,
			start: usize,
			limit: Option<usize>,
		) -> anyhow::Result<Vec<ObjectNode>> {
			self.lookups.fetch_add(1, Ordering::SeqCst);
			self.inner.list(class, start, limit).await
		}

		async fn get_inverse_relations(
			&self,
			owner_field: &str,
			owner_class: ClassId,
			target: ObjectId,
		) -> anyhow::Result<Option<Vec<RelationRef>>> {
			self.lookups.fetch_add(1, Ordering::SeqCst);
			self.inner.get_inverse_relations(owner_field, owner_class, target).await
		}
	}

	fn parent_descriptor(id: i64) -> ElementDescriptor {
		let object = ObjectNode::new(id, ARTIST, format!("/artists/{id}"));
		ElementDescriptor::new(&object, "artist")
	}

	async fn seeded_store() -> MemoryStore {
		let store = MemoryStore::new();
		store.insert(ObjectNode::new(10, ARTIST, "/artists/ada")).await;
		for (id, title) in [(20, "Twenty"), (21, "TwentyOne"), (22, "TwentyTwo")] {
			let song = ObjectNode::new(id, SONG, format!("/songs/{id}"));
			store.insert(song.with_value("title", title)).await;
			store.link(ObjectId(id), "artists", RelationRef::object(10)).await.unwrap();
		}
		store
	}

	fn reverse_resolver(env: &QueryEnv) -> ReverseRelationResolver {
		ReverseRelationResolver::new(ReverseRelation::new("artists", SONG), env.clone())
	}

	#[tokio::test]
	async fn missing_parent_identity_fails_without_touching_the_store() {
		let store = Arc::new(CountingStore::new(seeded_store().await));
		let env = env_with(store.clone(), Arc::new(AllowAll));

		let err = reverse_resolver(&env)
			.resolve(None, &ResolverArgs::new(), &Selection::default())
			.await
			.unwrap_err();

		assert!(matches!(err, GqlError::MissingParentIdentity));
		assert_eq!(store.count(), 0);
	}

	#[tokio::test]
	async fn the_no_data_sentinel_passes_through_unchanged() {
		let store = MemoryStore::new();
		store.insert(ObjectNode::new(10, ARTIST, "/artists/ada")).await;
		let env = env_with(Arc::new(store), Arc::new(AllowAll));

		let out = reverse_resolver(&env)
			.resolve(Some(&parent_descriptor(10)), &ResolverArgs::new(), &Selection::default())
			.await
			.unwrap();

		assert!(out.is_none());
	}

	#[tokio::test]
	async fn a_true_empty_sequence_stays_an_empty_sequence() {
		let store = seeded_store().await;
		for id in [20, 21, 22] {
			store.unlink(ObjectId(id), "artists", ObjectId(10)).await.unwrap();
		}
		let env = env_with(Arc::new(store), Arc::new(AllowAll));

		let out = reverse_resolver(&env)
			.resolve(Some(&parent_descriptor(10)), &ResolverArgs::new(), &Selection::default())
			.await
			.unwrap();

		assert_eq!(out.map(|items| items.len()), Some(0));
	}

	#[tokio::test]
	async fn fully_readable_rows_resolve_in_row_order() {
		let env = env_with(Arc::new(seeded_store().await), Arc::new(AllowAll));

		let out = reverse_resolver(&env)
			.resolve(Some(&parent_descriptor(10)), &ResolverArgs::new(), &Selection::of(["title"]))
			.await
			.unwrap()
			.unwrap();

		let ids: Vec<_> = out.iter().map(|d| d.id.0).collect();
		assert_eq!(ids, vec![20, 21, 22]);
		assert_eq!(out[0].value("title"), Some(&Value::String("Twenty".to_owned())));
	}

	#[tokio::test]
	async fn denied_and_dangling_rows_are_omitted_without_reordering() {
		let store = seeded_store().await;
		store.remove(ObjectId(22)).await;
		let gate = WorkspaceRules::new().allow("/").deny("/songs/21");
		let env = env_with(Arc::new(store), Arc::new(gate));

		let out = reverse_resolver(&env)
			.resolve(Some(&parent_descriptor(10)), &ResolverArgs::new(), &Selection::default())
			.await
			.unwrap()
			.unwrap();

		assert_eq!(out.len(), 1);
		assert_eq!(out[0].id, ObjectId(20));
		assert_eq!(out[0].type_name, "song");
	}

	/// Store answering inverse lookups with a fixed row list, so tests can
	/// hand the resolver rows the object-only [`MemoryStore`] never records.
	struct FixedRows {
		inner: MemoryStore,
		rows: Vec<RelationRef>,
	}

	#[async_trait]
	impl ObjectRepository for FixedRows {
		async fn get_by_id(&self, id: ObjectId) -> anyhow::Result<Option<ObjectNode>> {
			self.inner.get_by_id(id).await
		}

		async fn get_by_path(&self, path: &str) -> anyhow::Result<Option<ObjectNode>> {
			self.inner.get_by_path(path).await
		}

		async fn list(
			&self,
			class: ClassId,
			start: usize,
			limit: Option<usize>,
		) -> anyhow::Result<Vec<ObjectNode>> {
			self.inner.list(class, start, limit).await
		}

		async fn get_inverse_relations(
			&self,
			_owner_field: &str,
			_owner_class: ClassId,
			_target: ObjectId,
		) -> anyhow::Result<Option<Vec<RelationRef>>> {
			Ok(Some(self.rows.clone()))
		}
	}

	#[tokio::test]
	async fn non_object_rows_are_omitted() {
		let store = FixedRows {
			inner: seeded_store().await,
			rows: vec![
				RelationRef {
					id: ObjectId(500),
					element_type: ElementType::Asset,
				},
				RelationRef::object(20),
				RelationRef {
					id: ObjectId(600),
					element_type: ElementType::Document,
				},
				RelationRef::object(22),
			],
		};
		let env = env_with(Arc::new(store), Arc::new(AllowAll));

		let out = reverse_resolver(&env)
			.resolve(Some(&parent_descriptor(10)), &ResolverArgs::new(), &Selection::default())
			.await
			.unwrap()
			.unwrap();

		let ids: Vec<_> = out.iter().map(|d| d.id.0).collect();
		assert_eq!(ids, vec![20, 22]);
	}

	#[tokio::test]
	async fn resolution_is_idempotent() {
		let store = seeded_store().await;
		store.remove(ObjectId(21)).await;
		let env = env_with(Arc::new(store), Arc::new(AllowAll));
		let resolver = reverse_resolver(&env);
		let parent = parent_descriptor(10);

		let first = resolver
			.resolve(Some(&parent), &ResolverArgs::new(), &Selection::default())
			.await
			.unwrap()
			.unwrap();
		let second = resolver
			.resolve(Some(&parent), &ResolverArgs::new(), &Selection::default())
			.await
			.unwrap()
			.unwrap();

		let ids = |items: &[ElementDescriptor]| items.iter().map(|d| d.id.0).collect::<Vec<_>>();
		assert_eq!(ids(&first), ids(&second));
		assert_eq!(ids(&first), vec![20, 22]);
	}

	#[tokio::test]
	async fn a_vanished_parent_fails_the_field() {
		let store = seeded_store().await;
		store.remove(ObjectId(10)).await;
		let env = env_with(Arc::new(store), Arc::new(AllowAll));

		let err = reverse_resolver(&env)
			.resolve(Some(&parent_descriptor(10)), &ResolverArgs::new(), &Selection::default())
			.await
			.unwrap_err();

		assert_eq!(err.to_string(), "Error resolving request: object 10 no longer exists");
	}

	#[tokio::test]
	async fn forward_collections_resolve_stored_rows() {
		let env = env_with(Arc::new(seeded_store().await), Arc::new(AllowAll));
		let resolver = RelationResolver::new("artists", env.clone());
		let song = ObjectNode::new(20, SONG, "/songs/20");
		let parent = ElementDescriptor::new(&song, "song");

		let out = resolver
			.resolve_many(Some(&parent), &ResolverArgs::new(), &Selection::default())
			.await
			.unwrap()
			.unwrap();

		assert_eq!(out.len(), 1);
		assert_eq!(out[0].id, ObjectId(10));
	}

	#[tokio::test]
	async fn forward_collections_without_stored_rows_resolve_to_null() {
		let store = MemoryStore::new();
		store.insert(ObjectNode::new(20, SONG, "/songs/20")).await;
		let env = env_with(Arc::new(store), Arc::new(AllowAll));
		let resolver = RelationResolver::new("artists", env.clone());
		let song = ObjectNode::new(20, SONG, "/songs/20");
		let parent = ElementDescriptor::new(&song, "song");

		let out = resolver
			.resolve_many(Some(&parent), &ResolverArgs::new(), &Selection::default())
			.await
			.unwrap();

		assert!(out.is_none());
	}

	#[tokio::test]
	async fn singular_relations_null_out_dangling_and_denied_targets() {
		let store = MemoryStore::new();
		store.insert(ObjectNode::new(10, ARTIST, "/artists/ada")).await;
		store.insert(ObjectNode::new(11, ARTIST, "/artists/hidden")).await;
		for (id, artist) in [(20, 10), (21, 99), (22, 11)] {
			let song = ObjectNode::new(id, SONG, format!("/songs/{id}"))
				.with_value("mainArtist", RelationRef::object(artist));
			store.insert(song).await;
		}
		let gate = WorkspaceRules::new().allow("/").deny("/artists/hidden");
		let env = env_with(Arc::new(store), Arc::new(gate));
		let resolver = RelationResolver::new("mainArtist", env.clone());

		let descriptor_for = |id: i64| {
			let song = ObjectNode::new(id, SONG, format!("/songs/{id}"));
			ElementDescriptor::new(&song, "song")
		};

		let resolved = resolver
			.resolve_one(Some(&descriptor_for(20)), &ResolverArgs::new(), &Selection::default())
			.await
			.unwrap();
		assert_eq!(resolved.map(|d| d.id), Some(ObjectId(10)));

		let dangling = resolver
			.resolve_one(Some(&descriptor_for(21)), &ResolverArgs::new(), &Selection::default())
			.await
			.unwrap();
		assert!(dangling.is_none());

		let denied = resolver
			.resolve_one(Some(&descriptor_for(22)), &ResolverArgs::new(), &Selection::default())
			.await
			.unwrap();
		assert!(denied.is_none());
	}
}
