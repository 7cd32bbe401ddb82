use anyhow::Context;
use strata_core::traits::{Archive, DiskImage, Filesystem};
use strata_core::{Engine, Hook};

#[derive(Debug, clap::Args)]
pub struct List {
    /// Colon-delimited extended-archive path.
    path: String,

    #[arg(long)]
    read_only: bool,
}

impl List {
    pub fn run(self) -> anyhow::Result<()> {
        let mut engine = Engine::new();
        let hook = Hook::new();
        let result = engine
            .open_ext_archive(&self.path, true, self.read_only, &hook)
            .with_context(|| format!("failed to open {:?}", self.path))?;

        let tree = engine.tree(result.root).expect("just-opened tree is present");
        let leaf = tree.get(result.leaf);

        if let Some(dir_entry) = &result.ending_dir_entry {
            let fs = leaf
                .filesystem()
                .context("directory entry resolved outside a filesystem node")?;
            for entry in fs.iter_dir(dir_entry)? {
                println!("{}{}", entry.name, if entry.is_dir { "/" } else { "" });
            }
            return Ok(());
        }

        if let Some(archive) = leaf.as_archive() {
            for entry in archive.entries() {
                println!("{entry}");
            }
            return Ok(());
        }

        if let Some(fs) = leaf.filesystem() {
            let root = fs.volume_dir();
            for entry in fs.iter_dir(&root)? {
                println!("{}{}", entry.name, if entry.is_dir { "/" } else { "" });
            }
            return Ok(());
        }

        if let Some(disk) = leaf.as_disk_image() {
            for note in disk.notes() {
                println!("{note}");
            }
            return Ok(());
        }

        anyhow::bail!("nothing listable at the end of {:?}", self.path)
    }
}
