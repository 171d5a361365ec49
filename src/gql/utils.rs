use async_graphql::dynamic::indexmap::IndexMap;
use async_graphql::dynamic::{FieldValue, ResolverContext};
use async_graphql::{Name, Value as GqlValue};

use super::error::{GqlError, internal_error, resolver_error};
use super::extract::ElementDescriptor;
use crate::store::ObjectId;

pub(crate) trait GqlValueUtils {
	fn as_i64(&self) -> Option<i64>;
	fn as_string(&self) -> Option<String>;
}

impl GqlValueUtils for GqlValue {
	fn as_i64(&self) -> Option<i64> {
		if let GqlValue::Number(n) = self {
			n.as_i64()
		} else {
			None
		}
	}

	fn as_string(&self) -> Option<String> {
		if let GqlValue::String(s) = self {
			Some(s.to_owned())
		} else {
			None
		}
	}
}

/// Owned snapshot of a resolver's arguments, forwarded opaquely into nested
/// extraction.
pub type ResolverArgs = IndexMap<Name, GqlValue>;

pub(crate) fn owned_args(ctx: &ResolverContext) -> ResolverArgs {
	ctx.args.as_index_map().clone()
}

/// Hands a descriptor to the executor as the parent value of nested fields.
pub(crate) fn descriptor_value(desc: ElementDescriptor) -> FieldValue<'static> {
	FieldValue::owned_any(desc)
}

/// ID arguments arrive as strings or numbers depending on the client.
pub(crate) fn parse_id_value(val: &GqlValue) -> Option<ObjectId> {
	match val {
		GqlValue::String(s) => ObjectId::parse(s),
		GqlValue::Number(n) => n.as_i64().map(ObjectId),
		_ => None,
	}
}

pub(crate) fn id_from_value(val: &GqlValue) -> Result<ObjectId, GqlError> {
	parse_id_value(val).ok_or_else(|| match val {
		GqlValue::String(s) => resolver_error(format!("invalid id: {s}")),
		v => resolver_error(format!("invalid id: {v}")),
	})
}

pub(crate) fn parse_id_arg(args: &ResolverArgs, name: &str) -> Result<ObjectId, GqlError> {
	let Some(val) = args.get(name) else {
		return Err(internal_error(format!("Schema validation failed: No {name} found")));
	};
	id_from_value(val)
}
