//! Read-permission checks applied to resolved objects.

use async_trait::async_trait;

use crate::store::ObjectNode;

/// Decides whether the current caller may read an object.
///
/// Gates are shared, read-mostly services. Resolvers call them once per
/// candidate object and silently drop denied objects from their results.
#[async_trait]
pub trait PermissionGate: Send + Sync {
	async fn can_read(&self, object: &ObjectNode) -> bool;
}

/// Grants every read. The default gate for embedded and test setups.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

#[async_trait]
impl PermissionGate for AllowAll {
	async fn can_read(&self, _object: &ObjectNode) -> bool {
		true
	}
}

#[derive(Clone, Debug)]
struct WorkspaceRule {
	path: String,
	read: bool,
}

/// Path-based read rules.
///
/// A rule covers an object whose path equals the rule path or lives below
/// it. The most specific covering rule decides; an uncovered path is denied.
/// Among equally specific rules the one added last wins.
#[derive(Clone, Debug, Default)]
pub struct WorkspaceRules {
	rules: Vec<WorkspaceRule>,
}

impl WorkspaceRules {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn allow(mut self, path: impl Into<String>) -> Self {
		self.rules.push(WorkspaceRule {
			path: path.into(),
			read: true,
		});
		self
	}

	pub fn deny(mut self, path: impl Into<String>) -> Self {
		self.rules.push(WorkspaceRule {
			path: path.into(),
			read: false,
		});
		self
	}

	fn covers(rule: &str, path: &str) -> bool {
		match path.strip_prefix(rule) {
			Some(rest) => rest.is_empty() || rest.starts_with('/') || rule.ends_with('/'),
			None => false,
		}
	}
}

#[async_trait]
impl PermissionGate for WorkspaceRules {
	async fn can_read(&self, object: &ObjectNode) -> bool {
		self.rules
			.iter()
			.filter(|r| Self::covers(&r.path, &object.path))
			.max_by_key(|r| r.path.len())
			.map(|r| r.read)
			.unwrap_or(false)
	}
}
