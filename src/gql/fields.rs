//! Generation of one schema field per attribute declaration.

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, ResolverContext, Type, TypeRef};
use async_graphql::Value as GqlValue;

use super::QueryEnv;
use super::error::{GqlError, internal_error, resolver_error};
use super::extract::ElementDescriptor;
use super::relation;
use super::schema::{kind_to_type, relation_type_name, value_to_gql_value};
use crate::catalog::{AttributeDeclaration, AttributeKind, CalculatedValue, ClassDefinition};
use crate::store::Value;

/// Resolver function stored on a generated field descriptor.
pub type ResolverFn = Box<dyn for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync>;

/// The generated shape of one attribute: name, schema type, description, and
/// the resolver computing its value.
///
/// Built once per class and attribute at schema-build time, immutable
/// thereafter, and shared read-only across concurrent queries.
pub struct FieldDescriptor {
	pub name: String,
	pub ty: TypeRef,
	pub description: Option<String>,
	pub resolver: ResolverFn,
}

impl std::fmt::Debug for FieldDescriptor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FieldDescriptor")
			.field("name", &self.name)
			.field("ty", &self.ty)
			.field("description", &self.description)
			.finish_non_exhaustive()
	}
}

impl FieldDescriptor {
	/// Hands the descriptor to the schema library.
	pub(crate) fn into_field(self) -> Field {
		let mut field = Field::new(self.name, self.ty, self.resolver);
		if let Some(description) = self.description {
			field = field.description(description);
		}
		field
	}
}

/// Builds the field descriptor for one attribute of a class.
///
/// Dispatches over the attribute kind; every arm funnels through [`enrich`],
/// which fills the parts shared by all generators, and supplies its own type
/// and resolver. Binary attributes have no query representation and abort
/// generation.
pub fn field_config(
	attr: &AttributeDeclaration,
	class: &ClassDefinition,
	env: &QueryEnv,
	types: &mut Vec<Type>,
) -> Result<FieldDescriptor, GqlError> {
	match &attr.kind {
		AttributeKind::Value(kind) => {
			let ty = non_null_if(attr.mandatory, kind_to_type(kind));
			Ok(enrich(attr, ty, make_value_resolver(attr.name.clone(), env.clone())))
		}
		AttributeKind::Calculated(calc) => {
			let ty = match &calc.returns {
				Some(kind) => kind_to_type(kind),
				None => TypeRef::named("any"),
			};
			let ty = non_null_if(attr.mandatory, ty);
			let resolver = make_calculated_resolver(attr.name.clone(), calc.clone(), env.clone());
			Ok(enrich(attr, ty, resolver))
		}
		AttributeKind::Relation(target) => {
			let name = relation_type_name(target, env, types)?;
			let ty = non_null_if(attr.mandatory, TypeRef::named(name));
			let tagged = target.classes.len() != 1;
			let resolver =
				relation::make_single_relation_resolver(attr.name.clone(), tagged, env.clone());
			Ok(enrich(attr, ty, resolver))
		}
		AttributeKind::RelationCollection(target) => {
			let name = relation_type_name(target, env, types)?;
			let ty = list_type(&name, attr.mandatory);
			let tagged = target.classes.len() != 1;
			let resolver =
				relation::make_relation_list_resolver(attr.name.clone(), tagged, env.clone());
			Ok(enrich(attr, ty, resolver))
		}
		AttributeKind::ReverseRelationCollection(rel) => {
			let owner = env.catalog.class_by_id(rel.owner_class).ok_or_else(|| {
				GqlError::SchemaError(format!(
					"reverse relation `{}` on class `{}` references unknown class {}",
					attr.name, class.name, rel.owner_class
				))
			})?;
			let ty = list_type(&owner.name, attr.mandatory);
			let resolver = relation::make_reverse_relation_resolver(rel.clone(), env.clone());
			Ok(enrich(attr, ty, resolver))
		}
		AttributeKind::Binary => Err(GqlError::UnsupportedAttributeKind {
			class: class.name.clone(),
			attribute: attr.name.clone(),
			kind: attr.kind.to_string(),
		}),
	}
}

/// The enrichment step shared by every generator: declared name in, tooltip
/// as description, kind-specific type and resolver attached.
fn enrich(attr: &AttributeDeclaration, ty: TypeRef, resolver: ResolverFn) -> FieldDescriptor {
	FieldDescriptor {
		name: attr.name.clone(),
		ty,
		description: attr.tooltip.clone(),
		resolver,
	}
}

fn non_null_if(mandatory: bool, ty: TypeRef) -> TypeRef {
	if mandatory {
		TypeRef::NonNull(Box::new(ty))
	} else {
		ty
	}
}

fn list_type(name: &str, mandatory: bool) -> TypeRef {
	if mandatory {
		TypeRef::named_nn_list_nn(name)
	} else {
		TypeRef::named_nn_list(name)
	}
}

pub(crate) fn downcast_parent<'a>(
	ctx: &'a ResolverContext,
) -> Result<&'a ElementDescriptor, GqlError> {
	ctx.parent_value
		.downcast_ref::<ElementDescriptor>()
		.ok_or_else(|| internal_error("failed to downcast parent value"))
}

/// Resolves the generated `id` field from the descriptor identity.
pub(crate) fn make_id_resolver() -> ResolverFn {
	Box::new(|ctx: ResolverContext| {
		FieldFuture::new(async move {
			let parent = downcast_parent(&ctx)?;
			Ok(Some(FieldValue::value(GqlValue::from(parent.id.to_string()))))
		})
	})
}

/// Resolves a stored value attribute: extracted values are read off the
/// descriptor, anything else is fetched from the store on demand.
fn make_value_resolver(attr_name: String, env: QueryEnv) -> ResolverFn {
	Box::new(move |ctx: ResolverContext| {
		let attr_name = attr_name.clone();
		let env = env.clone();
		FieldFuture::new(async move {
			let parent = downcast_parent(&ctx)?;

			let value = match parent.value(&attr_name) {
				Some(v) => Some(v.clone()),
				None => {
					let object = env.store.get_by_id(parent.id).await.map_err(GqlError::from)?;
					object.and_then(|o| o.value(&attr_name).cloned())
				}
			};

			match value {
				None | Some(Value::None) => Ok(None),
				Some(v) => Ok(Some(FieldValue::value(value_to_gql_value(&v)?))),
			}
		})
	})
}

/// Resolves a calculated attribute by evaluating the calculator bound to the
/// declaration against the freshly fetched object. No relation traversal, no
/// permission checks.
fn make_calculated_resolver(attr_name: String, calc: CalculatedValue, env: QueryEnv) -> ResolverFn {
	Box::new(move |ctx: ResolverContext| {
		let attr_name = attr_name.clone();
		let calc = calc.clone();
		let env = env.clone();
		FieldFuture::new(async move {
			let parent = downcast_parent(&ctx)?;
			let object = env
				.store
				.get_by_id(parent.id)
				.await
				.map_err(GqlError::from)?
				.ok_or_else(|| resolver_error(format!("object {} no longer exists", parent.id)))?;

			let value = calc
				.calculator
				.calculate(&object, &env.session)
				.map_err(|e| resolver_error(format!("calculation of `{attr_name}` failed: {e}")))?;

			match value {
				Value::None => Ok(None),
				v => Ok(Some(FieldValue::value(value_to_gql_value(&v)?))),
			}
		})
	})
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::catalog::{Catalog, ClassId, RelationTarget, ReverseRelation, ValueKind};
	use crate::iam::AllowAll;
	use crate::session::Session;
	use crate::store::{MemoryStore, ObjectNode};

	fn noop_calculation(_object: &ObjectNode, _session: &Session) -> anyhow::Result<Value> {
		Ok(Value::None)
	}

	fn test_env() -> QueryEnv {
		let catalog = Catalog::new("content")
			.with_class(ClassDefinition::new(ClassId(1), "song"))
			.with_class(ClassDefinition::new(ClassId(2), "artist"))
			.with_class(ClassDefinition::new(ClassId(3), "label"));
		QueryEnv::new(
			Arc::new(catalog),
			Arc::new(MemoryStore::new()),
			Arc::new(AllowAll),
			Session::new(),
		)
	}

	fn calculated(name: &str, tooltip: &str) -> AttributeDeclaration {
		let calc = CalculatedValue::new(noop_calculation);
		AttributeDeclaration::new(name, AttributeKind::Calculated(calc)).with_tooltip(tooltip)
	}

	#[test]
	fn configs_carry_declared_name_and_tooltip_regardless_of_class() {
		let env = test_env();
		let attr = calculated("fullName", "Computed name");
		for class_name in ["song", "artist"] {
			let class = env.catalog.class(class_name).unwrap();
			let mut types = Vec::new();
			let fd = field_config(&attr, class, &env, &mut types).unwrap();
			assert_eq!(fd.name, "fullName");
			assert_eq!(fd.description.as_deref(), Some("Computed name"));
			assert_eq!(fd.ty.to_string(), "any");
		}
	}

	#[test]
	fn typed_calculations_use_their_declared_kind() {
		let env = test_env();
		let class = env.catalog.class("song").unwrap();
		let calc = CalculatedValue::new(noop_calculation).returning(ValueKind::String);
		let attr = AttributeDeclaration::new("displayName", AttributeKind::Calculated(calc));
		let mut types = Vec::new();
		let fd = field_config(&attr, class, &env, &mut types).unwrap();
		assert_eq!(fd.ty.to_string(), "String");
	}

	#[test]
	fn value_kinds_map_to_schema_types() {
		let env = test_env();
		let class = env.catalog.class("song").unwrap();
		let cases = [
			(ValueKind::String, false, "String"),
			(ValueKind::String, true, "String!"),
			(ValueKind::Int, false, "Int"),
			(ValueKind::Decimal, false, "decimal"),
			(ValueKind::Datetime, false, "datetime"),
			(ValueKind::List(Box::new(ValueKind::Int)), false, "[Int]"),
		];
		for (kind, mandatory, expected) in cases {
			let mut attr = AttributeDeclaration::new("field", AttributeKind::Value(kind));
			if mandatory {
				attr = attr.mandatory();
			}
			let mut types = Vec::new();
			let fd = field_config(&attr, class, &env, &mut types).unwrap();
			assert_eq!(fd.ty.to_string(), expected);
		}
	}

	#[test]
	fn relation_fields_use_the_target_class_type() {
		let env = test_env();
		let class = env.catalog.class("song").unwrap();
		let mut types = Vec::new();

		let single = AttributeDeclaration::new(
			"mainArtist",
			AttributeKind::Relation(RelationTarget::to([ClassId(2)])),
		);
		let fd = field_config(&single, class, &env, &mut types).unwrap();
		assert_eq!(fd.ty.to_string(), "artist");

		let multi = AttributeDeclaration::new(
			"owner",
			AttributeKind::Relation(RelationTarget::to([ClassId(2), ClassId(3)])),
		);
		let fd = field_config(&multi, class, &env, &mut types).unwrap();
		assert_eq!(fd.ty.to_string(), "artist_or_label");
		assert_eq!(types.len(), 1);

		let collection = AttributeDeclaration::new(
			"artists",
			AttributeKind::RelationCollection(RelationTarget::to([ClassId(2)])),
		);
		let fd = field_config(&collection, class, &env, &mut types).unwrap();
		assert_eq!(fd.ty.to_string(), "[artist!]");
	}

	#[test]
	fn reverse_relations_point_at_the_owning_class() {
		let env = test_env();
		let class = env.catalog.class("artist").unwrap();
		let attr = AttributeDeclaration::new(
			"songs",
			AttributeKind::ReverseRelationCollection(ReverseRelation::new("artists", ClassId(1))),
		);
		let mut types = Vec::new();
		let fd = field_config(&attr, class, &env, &mut types).unwrap();
		assert_eq!(fd.ty.to_string(), "[song!]");

		let broken = AttributeDeclaration::new(
			"ghosts",
			AttributeKind::ReverseRelationCollection(ReverseRelation::new("x", ClassId(99))),
		);
		let err = field_config(&broken, class, &env, &mut types).unwrap_err();
		assert!(matches!(err, GqlError::SchemaError(_)));
	}

	#[test]
	fn binary_attributes_abort_generation() {
		let env = test_env();
		let class = env.catalog.class("song").unwrap();
		let attr = AttributeDeclaration::new("cover", AttributeKind::Binary);
		let mut types = Vec::new();
		let err = field_config(&attr, class, &env, &mut types).unwrap_err();
		match err {
			GqlError::UnsupportedAttributeKind {
				class,
				attribute,
				kind,
			} => {
				assert_eq!(class, "song");
				assert_eq!(attribute, "cover");
				assert_eq!(kind, "binary");
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}
}
