//! Router modules, split by who may reach them.

/// Pages anyone may read. Handlers that render differently for the author take a
/// `Viewer` instead of requiring a login.
pub mod public;

/// Everything that writes. The whole router sits behind the `AuthUser` route layer, so an
/// anonymous request is redirected to the login page before any handler runs.
pub mod authenticated;
