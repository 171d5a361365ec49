//! Field extraction: the requested-field tree and the service populating
//! element descriptors with it.

use std::collections::BTreeMap;

use async_graphql::SelectionField;
use async_graphql::dynamic::indexmap::IndexMap;
use async_trait::async_trait;

use super::QueryEnv;
use super::error::{GqlError, internal_error};
use super::utils::ResolverArgs;
use crate::catalog::ClassId;
use crate::session::Session;
use crate::store::{ElementType, ObjectId, ObjectNode, Value};

/// The tree of fields requested below one point of a query.
///
/// Every recursion level receives its remaining selection explicitly, so
/// nested resolution never reaches back into executor state it does not own.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
	fields: IndexMap<String, Selection>,
}

impl Selection {
	/// Captures the sub-selection of the field currently being resolved.
	pub fn from_field(field: SelectionField) -> Self {
		let mut fields = IndexMap::new();
		for sub in field.selection_set() {
			fields.insert(sub.name().to_owned(), Self::from_field(sub));
		}
		Self {
			fields,
		}
	}

	/// Builds a flat selection of leaf fields.
	pub fn of<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
		Self {
			fields: names.into_iter().map(|n| (n.to_owned(), Selection::default())).collect(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.fields.contains_key(name)
	}

	/// The sub-selection below `name`, if requested.
	pub fn field(&self, name: &str) -> Option<&Selection> {
		self.fields.get(name)
	}

	/// Requested field names in query order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.fields.keys().map(String::as_str)
	}
}

/// A graph element admitted into a query result: its identity tag plus the
/// values extracted for the requested selection.
///
/// Descriptors live for one resolver invocation. They are handed to the
/// executor as the parent value of nested fields and dropped with the
/// response; they are never persisted.
#[derive(Clone, Debug)]
pub struct ElementDescriptor {
	pub element_type: ElementType,
	pub id: ObjectId,
	pub class: ClassId,
	/// GraphQL type name of the wrapped element, used to tag concrete types
	/// behind interface and union fields.
	pub type_name: String,
	pub values: BTreeMap<String, Value>,
}

impl ElementDescriptor {
	pub fn new(object: &ObjectNode, type_name: impl Into<String>) -> Self {
		Self {
			element_type: ElementType::Object,
			id: object.id,
			class: object.class,
			type_name: type_name.into(),
			values: BTreeMap::new(),
		}
	}

	pub fn value(&self, name: &str) -> Option<&Value> {
		self.values.get(name)
	}
}

/// Populates descriptors with the requested fields of a resolved object.
///
/// Implementations own the per-level extraction policy. The relation
/// machinery calls this once per admitted object and forwards the result
/// without inspecting it; permissions for nested levels are re-applied by
/// the nested resolvers themselves, one level at a time.
#[async_trait]
pub trait ExtractionService: Send + Sync {
	async fn extract(
		&self,
		target: &mut ElementDescriptor,
		object: &ObjectNode,
		args: &ResolverArgs,
		session: &Session,
		selection: &Selection,
	) -> Result<(), GqlError>;
}

/// The default extraction service: copies the requested stored values onto
/// the descriptor. Relation and calculated attributes resolve through their
/// own field resolvers, so they are not materialized here.
#[derive(Clone, Copy, Debug, Default)]
pub struct StoredValueExtractor;

#[async_trait]
impl ExtractionService for StoredValueExtractor {
	async fn extract(
		&self,
		target: &mut ElementDescriptor,
		object: &ObjectNode,
		_args: &ResolverArgs,
		_session: &Session,
		selection: &Selection,
	) -> Result<(), GqlError> {
		for name in selection.names() {
			if let Some(value) = object.value(name) {
				target.values.insert(name.to_owned(), value.clone());
			}
		}
		Ok(())
	}
}

/// Wraps an admitted object into a descriptor and runs extraction for the
/// requested selection.
pub(crate) async fn describe(
	env: &QueryEnv,
	object: &ObjectNode,
	args: &ResolverArgs,
	selection: &Selection,
) -> Result<ElementDescriptor, GqlError> {
	let class = env.catalog.class_by_id(object.class).ok_or_else(|| {
		internal_error(format!("object {} has unknown class {}", object.id, object.class))
	})?;
	let mut target = ElementDescriptor::new(object, class.name.clone());
	env.extractor.extract(&mut target, object, args, &env.session, selection).await?;
	Ok(target)
}
