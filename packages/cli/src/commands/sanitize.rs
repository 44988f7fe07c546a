use anyhow::{Context, Result};
use clap::Args;
use pagecraft_markup::Sanitizer;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct SanitizeArgs {
    /// Markup file to clean
    pub file: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub fn sanitize(args: SanitizeArgs, cwd: &Path) -> Result<()> {
    let path = cwd.join(&args.file);
    let markup = fs::read_to_string(&path).with_context(|| format!("Cannot read {}", path.display()))?;
    let cleaned = Sanitizer::default().sanitize(&markup);

    match args.out {
        Some(out) => fs::write(cwd.join(out), cleaned)?,
        None => println!("{}", cleaned),
    }
    Ok(())
}
