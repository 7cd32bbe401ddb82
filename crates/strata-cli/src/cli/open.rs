use anyhow::Context;
use strata_core::{Engine, Hook};

#[derive(Debug, clap::Args)]
pub struct Open {
    /// Colon-delimited extended-archive path, e.g. `outer.zip:inner.bin`.
    path: String,

    /// Allow the path to end on a directory entry instead of erroring.
    #[arg(long)]
    allow_dir_end: bool,

    /// Open the host file for reading only.
    #[arg(long)]
    read_only: bool,
}

impl Open {
    pub fn run(self) -> anyhow::Result<()> {
        let mut engine = Engine::new();
        let hook = Hook::new();
        let result = engine
            .open_ext_archive(&self.path, self.allow_dir_end, self.read_only, &hook)
            .with_context(|| format!("failed to open {:?}", self.path))?;

        let tree = engine.tree(result.root).expect("just-opened tree is present");
        let kind = super::describe_kind(&tree.get(result.leaf).kind);

        match &result.ending_dir_entry {
            Some(dir_entry) => {
                println!("resolved to directory {:?} inside {kind}", dir_entry.name);
            }
            None => {
                println!("resolved to a {kind}");
            }
        }

        Ok(())
    }
}
