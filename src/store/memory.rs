//! In-memory reference implementation of the object repository.

use std::collections::BTreeMap;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ElementType, ObjectId, ObjectNode, ObjectRepository, RelationRef, Value};
use crate::catalog::ClassId;

type InverseKey = (String, ClassId, ObjectId);

/// A BTreeMap-backed store, mainly for tests and embedding.
///
/// Relation rows are written on both sides by [`link`](Self::link) and live
/// independently of the objects they reference: removing an object leaves
/// its rows behind, exactly the dangling state resolvers must tolerate.
#[derive(Default)]
pub struct MemoryStore {
	objects: RwLock<BTreeMap<ObjectId, ObjectNode>>,
	inverse: RwLock<BTreeMap<InverseKey, Vec<RelationRef>>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts or replaces an object.
	pub async fn insert(&self, object: ObjectNode) {
		self.objects.write().await.insert(object.id, object);
	}

	/// Records `owner -[field]-> target` on both sides: a forward row in the
	/// owner's stored value and an inverse row under the target.
	pub async fn link(
		&self,
		owner: ObjectId,
		field: &str,
		target: RelationRef,
	) -> anyhow::Result<()> {
		let owner_class = {
			let mut objects = self.objects.write().await;
			let node =
				objects.get_mut(&owner).ok_or_else(|| anyhow!("unknown owner object {owner}"))?;
			let slot =
				node.values.entry(field.to_owned()).or_insert_with(|| Value::Relations(Vec::new()));
			match slot {
				Value::Relations(rows) => rows.push(target),
				_ => bail!("attribute `{field}` of object {owner} does not hold relation rows"),
			}
			node.class
		};
		let key = (field.to_owned(), owner_class, target.id);
		self.inverse.write().await.entry(key).or_default().push(RelationRef {
			id: owner,
			element_type: ElementType::Object,
		});
		Ok(())
	}

	/// Removes the `owner -[field]-> target` rows from both sides. Emptied
	/// row lists stay in place, so an unlinked pair keeps answering with an
	/// empty sequence rather than the no-data sentinel.
	pub async fn unlink(
		&self,
		owner: ObjectId,
		field: &str,
		target: ObjectId,
	) -> anyhow::Result<()> {
		let owner_class = {
			let mut objects = self.objects.write().await;
			let node =
				objects.get_mut(&owner).ok_or_else(|| anyhow!("unknown owner object {owner}"))?;
			if let Some(Value::Relations(rows)) = node.values.get_mut(field) {
				rows.retain(|r| r.id != target);
			}
			node.class
		};
		let key = (field.to_owned(), owner_class, target);
		if let Some(rows) = self.inverse.write().await.get_mut(&key) {
			rows.retain(|r| r.id != owner);
		}
		Ok(())
	}

	/// Deletes an object. Relation rows referencing it are deliberately kept.
	pub async fn remove(&self, id: ObjectId) -> bool {
		self.objects.write().await.remove(&id).is_some()
	}
}

#[async_trait]
impl ObjectRepository for MemoryStore {
	async fn get_by_id(&self, id: ObjectId) -> anyhow::Result<Option<ObjectNode>> {
		Ok(self.objects.read().await.get(&id).cloned())
	}

	async fn get_by_path(&self, path: &str) -> anyhow::Result<Option<ObjectNode>> {
		Ok(self.objects.read().await.values().find(|o| o.path == path).cloned())
	}

	async fn list(
		&self,
		class: ClassId,
		start: usize,
		limit: Option<usize>,
	) -> anyhow::Result<Vec<ObjectNode>> {
		let objects = self.objects.read().await;
		let iter = objects.values().filter(|o| o.class == class).skip(start).cloned();
		Ok(match limit {
			Some(n) => iter.take(n).collect(),
			None => iter.collect(),
		})
	}

	async fn get_inverse_relations(
		&self,
		owner_field: &str,
		owner_class: ClassId,
		target: ObjectId,
	) -> anyhow::Result<Option<Vec<RelationRef>>> {
		let key = (owner_field.to_owned(), owner_class, target);
		Ok(self.inverse.read().await.get(&key).cloned())
	}
}
