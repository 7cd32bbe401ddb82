//! Command surface: one struct per subcommand, each with a `run` method,
//! mirroring the teacher's `cli::ls::Ls` shape. No subcommand implements
//! per-format business logic; each one calls straight through to
//! `strata_core::Engine` and prints what comes back.

mod cat;
mod list;
mod open;
mod same_file;
mod save;

pub use cat::Cat;
pub use list::List;
pub use open::Open;
pub use same_file::SameFile;
pub use save::Save;

#[derive(clap::Parser)]
#[command(
    name = "strata",
    version = env!("CARGO_PKG_VERSION"),
    about = "Nested archive/disk traversal engine",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand)]
pub enum Command {
    /// Resolve an extended-archive path and report what was found.
    Open(Open),
    /// List the directory or archive entries at the end of a path.
    #[command(alias = "ls")]
    List(List),
    /// Dump the payload of a single-entry wrapper at the end of a path.
    Cat(Cat),
    /// Compare two host-file paths for same-file equivalence.
    #[command(name = "same-file")]
    SameFile(SameFile),
    /// Flush a tree's pending writes back out to its host file.
    Save(Save),
}

/// Human-readable tag for a node's content kind, used by several
/// subcommands to describe what a walk landed on.
pub(crate) fn describe_kind(kind: &strata_core::node::Kind) -> &'static str {
    match kind {
        strata_core::node::Kind::HostFile => "host file",
        strata_core::node::Kind::Archive => "archive",
        strata_core::node::Kind::DiskImage => "disk image",
        strata_core::node::Kind::Partition => "partition",
    }
}

impl Command {
    pub fn run(self) -> anyhow::Result<()> {
        match self {
            Command::Open(cmd) => cmd.run(),
            Command::List(cmd) => cmd.run(),
            Command::Cat(cmd) => cmd.run(),
            Command::SameFile(cmd) => cmd.run(),
            Command::Save(cmd) => cmd.run(),
        }
    }
}
