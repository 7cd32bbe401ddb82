use strata_core::Engine;

#[derive(Debug, clap::Args)]
pub struct SameFile {
    path_a: String,
    path_b: String,
}

impl SameFile {
    pub fn run(self) -> anyhow::Result<()> {
        let engine = Engine::new();
        let same = engine.same_host_file(&self.path_a, &self.path_b)?;
        println!("{same}");
        Ok(())
    }
}
