use super::open_page;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use pagecraft_workspace::EditorConfig;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Page schema JSON file
    pub schema: PathBuf,

    /// Template directory (overrides config)
    #[arg(short, long)]
    pub templates: Option<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub async fn render(args: RenderArgs, cwd: &Path) -> Result<()> {
    let config = EditorConfig::load(cwd)?;
    let (session, report) = open_page(&config, cwd, args.templates.as_deref(), &args.schema).await?;
    let page = session.render_page();

    match args.out {
        Some(out) => {
            let out = cwd.join(out);
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&out, page)?;
            println!(
                "{} Rendered {} blocks → {}",
                "✓".green(),
                report.blocks,
                out.display()
            );
        }
        None => println!("{}", page),
    }

    Ok(())
}
