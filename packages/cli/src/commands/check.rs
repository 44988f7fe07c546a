use super::open_page;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use pagecraft_workspace::{check_markup, AssetChecker, EditorConfig};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Page schema JSON file
    pub schema: PathBuf,

    /// Template directory (overrides config)
    #[arg(short, long)]
    pub templates: Option<String>,

    /// Asset root (overrides config)
    #[arg(short, long)]
    pub assets: Option<String>,

    /// Fail when any link is unreachable
    #[arg(long)]
    pub strict: bool,
}

pub async fn check(args: CheckArgs, cwd: &Path) -> Result<()> {
    let config = EditorConfig::load(cwd)?;
    let (session, _) = open_page(&config, cwd, args.templates.as_deref(), &args.schema).await?;

    let asset_root = match &args.assets {
        Some(dir) => cwd.join(dir),
        None => config.asset_root(cwd),
    };
    let warnings = check_markup(&AssetChecker::new(asset_root), &session.render_page()).await;

    if warnings.is_empty() {
        println!("{} All links reachable", "✓".green());
        return Ok(());
    }

    for warning in &warnings {
        println!("  {} {} - {}", "✗".red(), warning.url, warning.reason.dimmed());
    }
    println!();
    println!("{} {} unreachable links", "⚠️".yellow(), warnings.len());

    if args.strict {
        return Err(anyhow!("{} unreachable links", warnings.len()));
    }
    Ok(())
}
