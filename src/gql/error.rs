use thiserror::Error;

#[derive(Debug, Error)]
pub enum GqlError {
	#[error("Store error: {0}")]
	StoreError(anyhow::Error),
	#[error("Error generating schema: {0}")]
	SchemaError(String),
	#[error("Error resolving request: {0}")]
	ResolverError(String),
	#[error("Internal Error: {0}")]
	InternalError(String),
	#[error("No classes are exposed for this catalog")]
	NotConfigured,
	#[error("Attribute `{attribute}` on class `{class}` has kind `{kind}` which cannot be queried")]
	UnsupportedAttributeKind {
		class: String,
		attribute: String,
		kind: String,
	},
	#[error("Parent value carries no object identity")]
	MissingParentIdentity,
}

pub fn schema_error(msg: impl Into<String>) -> GqlError {
	GqlError::SchemaError(msg.into())
}

pub fn resolver_error(msg: impl Into<String>) -> GqlError {
	GqlError::ResolverError(msg.into())
}

pub fn internal_error(msg: impl Into<String>) -> GqlError {
	let msg = msg.into();
	error!("{}", msg);
	GqlError::InternalError(msg)
}

impl From<anyhow::Error> for GqlError {
	fn from(value: anyhow::Error) -> Self {
		GqlError::StoreError(value)
	}
}

impl From<GqlError> for async_graphql::Error {
	fn from(value: GqlError) -> Self {
		async_graphql::Error::new(value.to_string())
	}
}
