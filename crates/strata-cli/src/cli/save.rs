use anyhow::Context;
use strata_core::{Engine, Hook, SaveOutcome};

#[derive(Debug, clap::Args)]
pub struct Save {
    /// Colon-delimited extended-archive path identifying the tree to save.
    path: String,

    #[arg(long)]
    allow_dir_end: bool,
}

impl Save {
    pub fn run(self) -> anyhow::Result<()> {
        let mut engine = Engine::new();
        let hook = Hook::new();
        let result = engine
            .open_ext_archive(&self.path, self.allow_dir_end, false, &hook)
            .with_context(|| format!("failed to open {:?}", self.path))?;

        match engine.save_tree(result.root, None)? {
            SaveOutcome::Saved => println!("saved"),
            SaveOutcome::Cancelled => println!("cancelled"),
        }
        Ok(())
    }
}
