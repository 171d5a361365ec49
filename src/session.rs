/// A per-caller context handed through every resolver invocation.
///
/// The session never influences which objects exist; it only feeds the
/// permission gate and calculated values with caller identity and locale.
#[derive(Clone, Debug, Default)]
pub struct Session {
	/// Identifier of the acting user, if authenticated.
	pub user: Option<String>,
	/// Preferred content locale.
	pub locale: Option<String>,
}

impl Session {
	/// Creates an anonymous session.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_user(mut self, user: impl Into<String>) -> Self {
		self.user = Some(user.into());
		self
	}

	pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
		self.locale = Some(locale.into());
		self
	}
}
