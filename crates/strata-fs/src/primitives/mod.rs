pub mod atomic_write;
pub mod copy_dir;
pub mod hardlink;
pub mod replace_dir;
pub mod symlink;

pub use atomic_write::{atomic_read, atomic_write, AtomicWriteOptions};
pub use copy_dir::copy_dir_all;
pub use hardlink::{hardlink_or_copy, FallbackStrategy, HardlinkOrCopyOptions};
pub use replace_dir::{replace_dir, ReplaceDirOptions};
pub use symlink::atomic_symlink;
