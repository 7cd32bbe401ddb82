//! Cross-platform atomic filesystem primitives and scoped transactional
//! staging. This is the host-file I/O layer `strata-core` builds its
//! `TempStore` and `ContainerNode::save` on: every write the core performs
//! against the host filesystem goes through an `atomic_write` or a
//! `Workspace` commit, never a bare `std::fs::write`.

mod error;
mod permissions;
mod primitives;
mod resource;
mod workflow;

pub use error::{Error, Result};
pub use permissions::PermissionMode;
pub use primitives::{
    atomic_read, atomic_symlink, atomic_write, copy_dir_all, hardlink_or_copy, replace_dir,
    AtomicWriteOptions, FallbackStrategy, HardlinkOrCopyOptions, ReplaceDirOptions,
};
pub use resource::{Content, Resource, ResourceOptions};
pub use workflow::{Transaction, Workspace};
