pub mod check;
pub mod init;
pub mod inspect;
pub mod render;
pub mod sanitize;

pub use check::{check, CheckArgs};
pub use init::{init, InitArgs};
pub use inspect::{inspect, InspectArgs};
pub use render::{render, RenderArgs};
pub use sanitize::{sanitize, SanitizeArgs};

use anyhow::{Context, Result};
use colored::Colorize;
use pagecraft_workspace::{
    DeserializeReport, DirectoryFetcher, EditorConfig, EditorSession, SessionOptions, TemplateCache,
};
use std::path::Path;
use std::sync::Arc;

/// Template cache over the configured template directory, or `templates` if given
pub(crate) fn template_cache(config: &EditorConfig, cwd: &Path, templates: Option<&str>) -> TemplateCache {
    let dir = match templates {
        Some(dir) => cwd.join(dir),
        None => config.template_dir(cwd),
    };
    TemplateCache::new(Arc::new(DirectoryFetcher::new(dir)), config.template_ttl())
}

/// Session holding the page stored in `schema_path`
pub(crate) async fn open_page(
    config: &EditorConfig,
    cwd: &Path,
    templates: Option<&str>,
    schema_path: &Path,
) -> Result<(EditorSession, DeserializeReport)> {
    let json = std::fs::read_to_string(cwd.join(schema_path))
        .with_context(|| format!("Cannot read {}", schema_path.display()))?;

    let options = SessionOptions {
        history_max_levels: config.history_max_levels,
        history_quiescence: config.history_quiescence(),
        missing_template: config.missing_template,
    };
    let session = EditorSession::with_options(template_cache(config, cwd, templates), options);
    let report = session.load_schema_json(&json).await?;

    for skipped in &report.skipped {
        eprintln!(
            "  {} skipped {} ({} blocks): {}",
            "⚠️".yellow(),
            skipped.template_ref.bright_white(),
            skipped.subtree_len,
            skipped.error
        );
    }

    Ok((session, report))
}
