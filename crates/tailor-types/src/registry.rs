//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Each pluggable implementation module provides a `Registry` struct that
/// declares the name used to reference it in configuration (for example
/// `"memory"` for `storage.implementations.memory`) and its factory function.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
