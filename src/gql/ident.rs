//! Shared element identification for lookup roots.

use async_graphql::Value as GqlValue;

use super::error::{GqlError, resolver_error};
use super::utils::{GqlValueUtils, ResolverArgs, id_from_value};
use crate::store::{ElementType, ObjectNode, ObjectRepository};

/// Resolves the `type` / `id` / `fullpath` argument triple to an element.
///
/// The type tag is validated first, then exactly one of `id` and `fullpath`
/// must be present. A well-formed lookup that matches nothing is `Ok(None)`;
/// everything else is a resolver error naming the offending argument.
pub async fn element_by_type_and_id_or_path(
	args: &ResolverArgs,
	default_type: Option<ElementType>,
	store: &dyn ObjectRepository,
) -> Result<Option<ObjectNode>, GqlError> {
	let element_type = match args.get("type").and_then(GqlValueUtils::as_string) {
		Some(tag) => ElementType::parse(&tag)
			.ok_or_else(|| resolver_error(format!("The type `{tag}` is not supported")))?,
		None => default_type.ok_or_else(|| resolver_error("type expected"))?,
	};
	// Only objects live in the repository; other element kinds have no
	// queryable home here.
	if element_type != ElementType::Object {
		return Err(resolver_error(format!(
			"The type `{}` is not supported",
			element_type.as_str()
		)));
	}

	let id = args.get("id").filter(|v| !matches!(v, GqlValue::Null));
	let fullpath = args.get("fullpath").filter(|v| !matches!(v, GqlValue::Null));

	match (id, fullpath) {
		(Some(_), Some(_)) => Err(resolver_error("either id or fullpath expected but not both")),
		(None, None) => Err(resolver_error("either id or fullpath expected")),
		(Some(val), None) => {
			let id = id_from_value(val)?;
			store.get_by_id(id).await.map_err(GqlError::from)
		}
		(None, Some(val)) => {
			let Some(path) = val.as_string() else {
				return Err(resolver_error(format!("invalid fullpath: {val}")));
			};
			store.get_by_path(&path).await.map_err(GqlError::from)
		}
	}
}
