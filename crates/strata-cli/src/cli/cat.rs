use anyhow::Context;
use std::io::Write;
use strata_core::traits::{Archive, ForkKind};
use strata_core::{Engine, Hook};

#[derive(Debug, clap::Args)]
pub struct Cat {
    /// Colon-delimited extended-archive path ending on a single-entry wrapper.
    path: String,
}

impl Cat {
    pub fn run(self) -> anyhow::Result<()> {
        let mut engine = Engine::new();
        let hook = Hook::new();
        let result = engine
            .open_ext_archive(&self.path, false, true, &hook)
            .with_context(|| format!("failed to open {:?}", self.path))?;

        let tree = engine.tree(result.root).expect("just-opened tree is present");
        let leaf = tree.get(result.leaf);

        let archive = leaf
            .as_archive()
            .context("leaf is not an archive; nothing to cat")?;
        anyhow::ensure!(
            archive.is_single_entry(),
            "leaf archive has more than one entry; extend the path to name one"
        );
        let entry = archive
            .find_first()
            .context("single-entry archive reported no entry")?;

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        archive.extract_part(&entry, ForkKind::Data, &mut out)?;
        out.flush()?;
        Ok(())
    }
}
