//! Class definitions describing the queryable shape of content objects.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::session::Session;
use crate::store::{ObjectNode, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(pub u32);

impl fmt::Display for ClassId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Static type of a stored attribute value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValueKind {
	Any,
	Bool,
	Int,
	Float,
	Decimal,
	String,
	Datetime,
	Object,
	List(Box<ValueKind>),
}

/// Computes the value of a calculated attribute from its containing object.
pub trait Calculator: Send + Sync {
	fn calculate(&self, object: &ObjectNode, session: &Session) -> anyhow::Result<Value>;
}

impl<F> Calculator for F
where
	F: Fn(&ObjectNode, &Session) -> anyhow::Result<Value> + Send + Sync,
{
	fn calculate(&self, object: &ObjectNode, session: &Session) -> anyhow::Result<Value> {
		self(object, session)
	}
}

/// A calculated attribute: the bound calculator plus its declared return
/// kind. Untyped calculations surface as the `any` scalar.
#[derive(Clone)]
pub struct CalculatedValue {
	pub returns: Option<ValueKind>,
	pub calculator: Arc<dyn Calculator>,
}

impl CalculatedValue {
	pub fn new(calculator: impl Calculator + 'static) -> Self {
		Self {
			returns: None,
			calculator: Arc::new(calculator),
		}
	}

	pub fn returning(mut self, kind: ValueKind) -> Self {
		self.returns = Some(kind);
		self
	}
}

impl fmt::Debug for CalculatedValue {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("CalculatedValue").field("returns", &self.returns).finish_non_exhaustive()
	}
}

/// Allowed target classes of a stored relation attribute.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelationTarget {
	pub classes: Vec<ClassId>,
}

impl RelationTarget {
	pub fn to(classes: impl IntoIterator<Item = ClassId>) -> Self {
		Self {
			classes: classes.into_iter().collect(),
		}
	}
}

/// The owning side of a reverse relation attribute.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReverseRelation {
	/// Name of the forward relation attribute on the owning class.
	pub owner_field: String,
	/// Class whose objects own the forward relation rows.
	pub owner_class: ClassId,
}

impl ReverseRelation {
	pub fn new(owner_field: impl Into<String>, owner_class: ClassId) -> Self {
		Self {
			owner_field: owner_field.into(),
			owner_class,
		}
	}
}

/// Behavioral kind of an attribute declaration.
#[derive(Clone, Debug)]
pub enum AttributeKind {
	/// A plain stored value.
	Value(ValueKind),
	/// Derived on demand by a calculator bound to the declaration.
	Calculated(CalculatedValue),
	/// A singular stored relation to another object.
	Relation(RelationTarget),
	/// A stored list of relations to other objects.
	RelationCollection(RelationTarget),
	/// The incoming side of relation rows owned by another class.
	ReverseRelationCollection(ReverseRelation),
	/// A raw payload. Not representable in the query schema.
	Binary,
}

impl fmt::Display for AttributeKind {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let s = match self {
			AttributeKind::Value(_) => "value",
			AttributeKind::Calculated(_) => "calculated value",
			AttributeKind::Relation(_) => "relation",
			AttributeKind::RelationCollection(_) => "relation collection",
			AttributeKind::ReverseRelationCollection(_) => "reverse relation collection",
			AttributeKind::Binary => "binary",
		};
		f.write_str(s)
	}
}

/// A named, typed attribute belonging to a class definition.
#[derive(Clone, Debug)]
pub struct AttributeDeclaration {
	pub name: String,
	pub kind: AttributeKind,
	/// Human-readable description, surfaced as the generated field's
	/// description.
	pub tooltip: Option<String>,
	/// Mandatory attributes generate non-null field types.
	pub mandatory: bool,
}

impl AttributeDeclaration {
	pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
		Self {
			name: name.into(),
			kind,
			tooltip: None,
			mandatory: false,
		}
	}

	pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
		self.tooltip = Some(tooltip.into());
		self
	}

	pub fn mandatory(mut self) -> Self {
		self.mandatory = true;
		self
	}
}

/// The type descriptor for one category of content objects.
///
/// Attributes keep declaration order and are unique by name. Definitions are
/// immutable at query time; schema generation walks them exactly once.
#[derive(Clone, Debug)]
pub struct ClassDefinition {
	pub id: ClassId,
	pub name: String,
	pub description: Option<String>,
	pub attributes: Vec<AttributeDeclaration>,
}

impl ClassDefinition {
	pub fn new(id: ClassId, name: impl Into<String>) -> Self {
		Self {
			id,
			name: name.into(),
			description: None,
			attributes: Vec::new(),
		}
	}

	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	pub fn with_attribute(mut self, attribute: AttributeDeclaration) -> Self {
		self.attributes.push(attribute);
		self
	}

	pub fn attribute(&self, name: &str) -> Option<&AttributeDeclaration> {
		self.attributes.iter().find(|a| a.name == name)
	}
}

/// The set of class definitions a schema is generated from.
///
/// The revision stamp changes whenever a class is added, which lets schema
/// caches decide whether a generated schema is still current.
#[derive(Clone, Debug)]
pub struct Catalog {
	name: String,
	revision: Uuid,
	classes: Vec<ClassDefinition>,
}

impl Catalog {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			revision: Uuid::now_v7(),
			classes: Vec::new(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn revision(&self) -> Uuid {
		self.revision
	}

	pub fn classes(&self) -> &[ClassDefinition] {
		&self.classes
	}

	pub fn class(&self, name: &str) -> Option<&ClassDefinition> {
		self.classes.iter().find(|c| c.name == name)
	}

	pub fn class_by_id(&self, id: ClassId) -> Option<&ClassDefinition> {
		self.classes.iter().find(|c| c.id == id)
	}

	pub fn add_class(&mut self, class: ClassDefinition) {
		self.revision = Uuid::now_v7();
		self.classes.push(class);
	}

	pub fn with_class(mut self, class: ClassDefinition) -> Self {
		self.add_class(class);
		self
	}
}
