use async_graphql::Name;
use async_graphql::Value as GqlValue;
use async_graphql::dynamic::indexmap::IndexMap;
use async_graphql::dynamic::{
	Interface, InterfaceField, Object, Scalar, Schema, Type, TypeRef, Union,
};
use serde_json::Number;

use super::QueryEnv;
use super::classes::process_classes;
use super::error::{GqlError, internal_error, resolver_error, schema_error};
use super::ext::NamedContainer;
use crate::catalog::{ClassDefinition, RelationTarget, ValueKind};
use crate::store::Value;

/// Which classes a generated schema exposes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ClassesConfig {
	/// Nothing is exposed and generation refuses to run.
	#[default]
	None,
	/// Every class in the catalog.
	Auto,
	Include(Vec<String>),
	Exclude(Vec<String>),
}

#[derive(Clone, Debug, Default)]
pub struct SchemaConfig {
	pub classes: ClassesConfig,
}

impl SchemaConfig {
	pub fn auto() -> Self {
		Self {
			classes: ClassesConfig::Auto,
		}
	}
}

/// Builds an executable schema over the catalog's exposed classes.
///
/// Generation is pure over the catalog snapshot held by `env`; the store is
/// only touched later, by the resolvers baked into the schema.
pub fn generate_schema(env: &QueryEnv, config: &SchemaConfig) -> Result<Schema, GqlError> {
	let all = env.catalog.classes();
	let classes: Vec<ClassDefinition> = match &config.classes {
		ClassesConfig::None => return Err(GqlError::NotConfigured),
		ClassesConfig::Auto => all.to_vec(),
		ClassesConfig::Include(inc) => {
			all.iter().filter(|c| inc.contains_name(&c.name)).cloned().collect()
		}
		ClassesConfig::Exclude(exc) => {
			all.iter().filter(|c| !exc.contains_name(&c.name)).cloned().collect()
		}
	};
	if classes.is_empty() {
		return Err(schema_error("no classes found in catalog"));
	}

	let query = Object::new("Query");
	let mut types: Vec<Type> = Vec::new();

	trace!(catalog = env.catalog.name(), "generating schema");

	let query = process_classes(&classes, query, &mut types, env)?;

	let mut schema = Schema::build("Query", None, None).register(query);
	for ty in types {
		trace!("adding type: {ty:?}");
		schema = schema.register(ty);
	}

	macro_rules! register_scalar {
		($schema:ident, $name:literal, $desc:literal) => {
			$schema = $schema.register(Type::Scalar(Scalar::new($name).description($desc)));
		};
		($schema:ident, $name:literal, $desc:literal, $url:literal) => {
			$schema = $schema.register(Type::Scalar(
				Scalar::new($name).description($desc).specified_by_url($url),
			));
		};
	}

	register_scalar!(schema, "any", "Any value the store can hold");
	register_scalar!(
		schema,
		"datetime",
		"String encoded datetime",
		"https://datatracker.ietf.org/doc/html/rfc3339"
	);
	register_scalar!(schema, "decimal", "String encoded decimal number");
	register_scalar!(schema, "object", "A free-form object of named values");

	let element_interface = Interface::new("element")
		.field(InterfaceField::new("id", TypeRef::named_nn(TypeRef::ID)));
	schema = schema.register(element_interface);

	schema
		.finish()
		.map_err(|e| schema_error(format!("there was an error generating schema: {e:?}")))
}

pub(crate) fn kind_to_type(kind: &ValueKind) -> TypeRef {
	match kind {
		ValueKind::Any => TypeRef::named("any"),
		ValueKind::Bool => TypeRef::named(TypeRef::BOOLEAN),
		ValueKind::Int => TypeRef::named(TypeRef::INT),
		ValueKind::Float => TypeRef::named(TypeRef::FLOAT),
		ValueKind::Decimal => TypeRef::named("decimal"),
		ValueKind::String => TypeRef::named(TypeRef::STRING),
		ValueKind::Datetime => TypeRef::named("datetime"),
		ValueKind::Object => TypeRef::named("object"),
		ValueKind::List(inner) => TypeRef::List(Box::new(kind_to_type(inner))),
	}
}

/// GraphQL type name for a relation target: the interface when the target is
/// open, the class itself when there is exactly one, a union otherwise. The
/// union is registered on first use and shared by later fields naming the
/// same class combination.
pub(crate) fn relation_type_name(
	target: &RelationTarget,
	env: &QueryEnv,
	types: &mut Vec<Type>,
) -> Result<String, GqlError> {
	let mut names = Vec::with_capacity(target.classes.len());
	for id in &target.classes {
		let class = env
			.catalog
			.class_by_id(*id)
			.ok_or_else(|| schema_error(format!("relation target references unknown class {id}")))?;
		names.push(class.name.clone());
	}
	match names.as_slice() {
		[] => Ok("element".to_owned()),
		[single] => Ok(single.clone()),
		_ => {
			let ty_name = names.join("_or_");
			let registered =
				types.iter().any(|t| matches!(t, Type::Union(u) if u.type_name() == ty_name));
			if !registered {
				let mut tmp_union = Union::new(ty_name.clone())
					.description(format!("An element which is one of: {}", names.join(", ")));
				for n in names {
					tmp_union = tmp_union.possible_type(n);
				}
				types.push(Type::Union(tmp_union));
			}
			Ok(ty_name)
		}
	}
}

pub(crate) fn value_to_gql_value(v: &Value) -> Result<GqlValue, GqlError> {
	let out = match v {
		Value::None => GqlValue::Null,
		Value::Bool(b) => GqlValue::Boolean(*b),
		Value::Int(i) => GqlValue::Number((*i).into()),
		Value::Float(f) => GqlValue::Number(
			Number::from_f64(*f)
				.ok_or_else(|| resolver_error("unimplemented: graceful NaN and Inf handling"))?,
		),
		Value::Decimal(d) => GqlValue::String(d.to_string()),
		Value::String(s) => GqlValue::String(s.clone()),
		Value::Datetime(d) => GqlValue::String(d.to_rfc3339()),
		Value::List(l) => {
			let items: Result<Vec<GqlValue>, GqlError> = l.iter().map(value_to_gql_value).collect();
			GqlValue::List(items?)
		}
		Value::Object(o) => {
			let fields: Result<IndexMap<Name, GqlValue>, GqlError> =
				o.iter().map(|(k, v)| value_to_gql_value(v).map(|gv| (Name::new(k), gv))).collect();
			GqlValue::Object(fields?)
		}
		Value::Relation(_) | Value::Relations(_) => {
			return Err(internal_error("found relation rows in plain value position"));
		}
	};
	Ok(out)
}
