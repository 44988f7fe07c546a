use super::template_cache;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use pagecraft_markup::FieldKind;
use pagecraft_workspace::EditorConfig;
use std::path::Path;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Template reference, e.g. `hero` or `sections/hero`
    pub template_ref: String,

    /// Template directory (overrides config)
    #[arg(short, long)]
    pub templates: Option<String>,

    /// Print the settings schema as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn inspect(args: InspectArgs, cwd: &Path) -> Result<()> {
    let config = EditorConfig::load(cwd)?;
    let cache = template_cache(&config, cwd, args.templates.as_deref());
    let cached = cache.load(&args.template_ref).await?;
    let template = &cached.template;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&template.schema)?);
        return Ok(());
    }

    println!("{} {}", "Template".bright_blue().bold(), template.template_ref.bright_white());
    println!("  revision: {}", template.revision_hash);

    if template.areas.is_empty() {
        println!("  areas:    {}", "none".dimmed());
    } else {
        println!("  areas:    {}", template.areas.join(", "));
    }

    let unbound = template.unbound_placeholders();
    if !unbound.is_empty() {
        println!(
            "  {} placeholders without a setting: {}",
            "⚠️".yellow(),
            unbound.join(", ")
        );
    }

    if template.schema.is_empty() {
        println!("  settings: {}", "none".dimmed());
        return Ok(());
    }

    println!("  settings:");
    for field in &template.schema.fields {
        let kind = match &field.kind {
            FieldKind::Text => "text".to_string(),
            FieldKind::TextArea => "textarea".to_string(),
            FieldKind::Select { options } => format!("select [{}]", options.join(", ")),
            FieldKind::Toggle { on_value } => format!("toggle ({})", on_value),
        };
        let label = field
            .label
            .as_deref()
            .map(|l| format!(" \"{}\"", l))
            .unwrap_or_default();
        println!(
            "    {} {}{} = {:?}",
            field.name.green(),
            kind.dimmed(),
            label,
            field.default
        );
    }

    Ok(())
}
