//! Workspace root. See the crates under `crates/` for the actual code;
//! this package exists to anchor workspace-wide tooling (git hooks).
