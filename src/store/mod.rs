//! The content-object graph model and the repository trait that reads it.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::catalog::ClassId;

mod memory;

pub use memory::MemoryStore;

/// Process-wide unique identifier of a graph element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub i64);

impl ObjectId {
	/// Parses the decimal form used in query arguments.
	pub fn parse(s: &str) -> Option<Self> {
		s.trim().parse().ok().map(ObjectId)
	}
}

impl fmt::Display for ObjectId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Identity tag of a graph element.
///
/// Only objects are queryable through this layer; the other tags exist so
/// relation rows and identification arguments can carry them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementType {
	Object,
	Asset,
	Document,
}

impl ElementType {
	/// Parses the lowercase tag used in queries and relation rows.
	pub fn parse(s: &str) -> Option<Self> {
		match s {
			"object" => Some(Self::Object),
			"asset" => Some(Self::Asset),
			"document" => Some(Self::Document),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Object => "object",
			Self::Asset => "asset",
			Self::Document => "document",
		}
	}
}

impl fmt::Display for ElementType {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A reference to a graph element as stored in relation rows.
///
/// References are identity only; the referenced element is not materialized
/// until a resolver fetches it, and it may no longer exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationRef {
	pub id: ObjectId,
	pub element_type: ElementType,
}

impl RelationRef {
	pub fn object(id: i64) -> Self {
		Self {
			id: ObjectId(id),
			element_type: ElementType::Object,
		}
	}
}

/// A stored attribute value.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
	#[default]
	None,
	Bool(bool),
	Int(i64),
	Float(f64),
	Decimal(Decimal),
	String(String),
	Datetime(DateTime<Utc>),
	List(Vec<Value>),
	Object(BTreeMap<String, Value>),
	Relation(RelationRef),
	Relations(Vec<RelationRef>),
}

impl Value {
	pub fn is_none(&self) -> bool {
		matches!(self, Value::None)
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Value::Bool(v)
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Int(v)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Float(v)
	}
}

impl From<Decimal> for Value {
	fn from(v: Decimal) -> Self {
		Value::Decimal(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::String(v.to_owned())
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::String(v)
	}
}

impl From<DateTime<Utc>> for Value {
	fn from(v: DateTime<Utc>) -> Self {
		Value::Datetime(v)
	}
}

impl From<RelationRef> for Value {
	fn from(v: RelationRef) -> Self {
		Value::Relation(v)
	}
}

impl<V> From<Vec<V>> for Value
where
	V: Into<Value>,
{
	fn from(v: Vec<V>) -> Self {
		Value::List(v.into_iter().map(Into::into).collect())
	}
}

/// An object instance in the content graph.
///
/// Objects are owned by the repository; this layer only ever reads them.
#[derive(Clone, Debug)]
pub struct ObjectNode {
	pub id: ObjectId,
	pub class: ClassId,
	/// Full path of the element, used for by-path lookups and workspace
	/// permission rules.
	pub path: String,
	pub values: BTreeMap<String, Value>,
}

impl ObjectNode {
	pub fn new(id: i64, class: ClassId, path: impl Into<String>) -> Self {
		Self {
			id: ObjectId(id),
			class,
			path: path.into(),
			values: BTreeMap::new(),
		}
	}

	pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.values.insert(name.into(), value.into());
		self
	}

	pub fn value(&self, name: &str) -> Option<&Value> {
		self.values.get(name)
	}
}

/// Read access to the content-object graph.
///
/// Implementations are shared, read-mostly services; the query layer never
/// mutates through this trait.
#[async_trait]
pub trait ObjectRepository: Send + Sync {
	/// Fetches an object by id.
	async fn get_by_id(&self, id: ObjectId) -> anyhow::Result<Option<ObjectNode>>;

	/// Fetches an object by its full path.
	async fn get_by_path(&self, path: &str) -> anyhow::Result<Option<ObjectNode>>;

	/// Lists objects of a class in id order, skipping `start` and returning
	/// at most `limit` when given.
	async fn list(
		&self,
		class: ClassId,
		start: usize,
		limit: Option<usize>,
	) -> anyhow::Result<Vec<ObjectNode>>;

	/// Looks up the relation rows pointing at `target` through the
	/// `owner_field` attribute owned by `owner_class`, in row order.
	///
	/// `None` means the store holds no relation data for this combination at
	/// all, as opposed to an empty row list. Callers forward that
	/// distinction; they never collapse one into the other.
	async fn get_inverse_relations(
		&self,
		owner_field: &str,
		owner_class: ClassId,
		target: ObjectId,
	) -> anyhow::Result<Option<Vec<RelationRef>>>;
}
