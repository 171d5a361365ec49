use std::sync::Arc;

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, Object, Type, TypeRef};

use super::QueryEnv;
use super::error::GqlError;
use super::extract::{Selection, describe};
use super::fields::{field_config, make_id_resolver};
use super::ident;
use super::utils::{GqlValueUtils, descriptor_value, owned_args, parse_id_arg};
use crate::catalog::{ClassDefinition, ClassId};

macro_rules! limit_input {
	() => {
		InputValue::new("limit", TypeRef::named(TypeRef::INT))
	};
}

macro_rules! start_input {
	() => {
		InputValue::new("start", TypeRef::named(TypeRef::INT))
	};
}

macro_rules! id_input {
	() => {
		InputValue::new("id", TypeRef::named_nn(TypeRef::ID))
	};
}

/// Adds the root fields and object type for every exposed class.
///
/// Each class contributes a listing root named after the class and a
/// `_get_<class>` lookup root; the `_get` root resolving arbitrary exposed
/// elements is added once at the end.
pub(crate) fn process_classes(
	classes: &[ClassDefinition],
	mut query: Object,
	types: &mut Vec<Type>,
	env: &QueryEnv,
) -> Result<Object, GqlError> {
	for class in classes {
		trace!("Adding class: {}", class.name);
		let class_id = class.id;

		let env1 = env.clone();
		query = query.field(
			Field::new(
				class.name.clone(),
				TypeRef::named_nn_list_nn(class.name.clone()),
				move |ctx| {
					let env1 = env1.clone();
					FieldFuture::new(async move {
						let args = owned_args(&ctx);
						trace!("received request with args: {args:?}");

						let start = args
							.get("start")
							.and_then(GqlValueUtils::as_i64)
							.and_then(|s| usize::try_from(s).ok())
							.unwrap_or(0);
						let limit = args
							.get("limit")
							.and_then(GqlValueUtils::as_i64)
							.and_then(|l| usize::try_from(l).ok());

						let selection = Selection::from_field(ctx.ctx.field());
						let objects =
							env1.store.list(class_id, start, limit).await.map_err(GqlError::from)?;

						let mut out = Vec::with_capacity(objects.len());
						for object in objects {
							if !env1.gate.can_read(&object).await {
								continue;
							}
							let desc = describe(&env1, &object, &args, &selection).await?;
							out.push(descriptor_value(desc));
						}
						Ok(Some(FieldValue::list(out)))
					})
				},
			)
			.description(if let Some(d) = &class.description {
				d.to_string()
			} else {
				format!(
					"Generated from class `{}`\nallows listing objects of the class",
					class.name
				)
			})
			.argument(limit_input!())
			.argument(start_input!()),
		);

		let env2 = env.clone();
		let single_ty = TypeRef::named(class.name.clone());
		query = query.field(
			Field::new(format!("_get_{}", class.name), single_ty, move |ctx| {
				let env2 = env2.clone();
				FieldFuture::new(async move {
					let args = owned_args(&ctx);
					let id = parse_id_arg(&args, "id")?;

					let Some(object) = env2.store.get_by_id(id).await.map_err(GqlError::from)?
					else {
						return Ok(None);
					};
					if object.class != class_id || !env2.gate.can_read(&object).await {
						return Ok(None);
					}

					let selection = Selection::from_field(ctx.ctx.field());
					let desc = describe(&env2, &object, &args, &selection).await?;
					Ok(Some(descriptor_value(desc)))
				})
			})
			.description(format!(
				"Generated from class `{}`\nallows querying a single object of the class by ID",
				class.name
			))
			.argument(id_input!()),
		);

		let mut class_ty_obj = Object::new(class.name.clone())
			.field(Field::new("id", TypeRef::named_nn(TypeRef::ID), make_id_resolver()))
			.implement("element");

		for attr in class.attributes.iter() {
			if attr.name == "id" {
				// "id" is already defined above and keeps its identity
				// semantics, a declaration never shadows it.
				continue;
			}
			class_ty_obj = class_ty_obj.field(field_config(attr, class, env, types)?.into_field());
		}

		types.push(Type::Object(class_ty_obj));
	}

	let exposed: Arc<[ClassId]> = classes.iter().map(|c| c.id).collect();
	let env3 = env.clone();
	query = query.field(
		Field::new("_get", TypeRef::named("element"), move |ctx| {
			let env3 = env3.clone();
			let exposed = exposed.clone();
			FieldFuture::new(async move {
				let args = owned_args(&ctx);
				let Some(object) =
					ident::element_by_type_and_id_or_path(&args, None, &*env3.store).await?
				else {
					return Ok(None);
				};
				if !exposed.contains(&object.class) || !env3.gate.can_read(&object).await {
					return Ok(None);
				}

				let selection = Selection::from_field(ctx.ctx.field());
				let desc = describe(&env3, &object, &args, &selection).await?;
				let ty = desc.type_name.clone();
				Ok(Some(descriptor_value(desc).with_type(ty)))
			})
		})
		.description("Allows fetching arbitrary elements".to_string())
		.argument(InputValue::new("type", TypeRef::named(TypeRef::STRING)))
		.argument(InputValue::new("id", TypeRef::named(TypeRef::ID)))
		.argument(InputValue::new("fullpath", TypeRef::named(TypeRef::STRING))),
	);

	Ok(query)
}
