pub mod batch;
pub mod classify;
pub mod diagnostics;
pub mod entry;
pub mod meta;

pub use batch::{build_index, usable_entries};
pub use classify::ResourceKind;
pub use diagnostics::Diagnostics;
pub use entry::IndexEntry;
