use std::ops::Deref;

pub trait Named {
	fn name(&self) -> &str;
}

impl Named for String {
	fn name(&self) -> &str {
		self
	}
}

pub trait NamedContainer {
	fn contains_name(&self, name: &str) -> bool;
}

impl<I, N> NamedContainer for I
where
	I: Deref<Target = [N]>,
	N: Named,
{
	fn contains_name(&self, name: &str) -> bool {
		self.iter().any(|n| n.name() == name)
	}
}
