mod snapshot;
pub use snapshot::Snapshot;
mod symbol;
pub(crate) use symbol::is_safe_identifier;
pub use symbol::Symbol;
