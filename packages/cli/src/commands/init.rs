use anyhow::Result;
use clap::Args;
use colored::Colorize;
use pagecraft_workspace::{EditorConfig, DEFAULT_CONFIG_NAME};
use std::fs;
use std::path::Path;

const EXAMPLE_TEMPLATE: &str = r#"<section class="hero">
  <h1>{title}</h1>
  <p data-toggle="show_intro" data-match="yes">{intro}</p>
  <div data-area="content"></div>
  <template data-settings-schema>
    <input name="title" value="Welcome" data-label="Heading">
    <textarea name="intro" data-label="Intro">A page built with Pagecraft.</textarea>
    <input type="checkbox" name="show_intro" value="yes" checked>
  </template>
</section>
"#;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Template directory
    #[arg(short, long, default_value = "templates")]
    pub templates: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = cwd.join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Pagecraft project...".bright_blue().bold());

    let config = EditorConfig {
        template_dir: args.templates.clone(),
        ..EditorConfig::default()
    };

    let template_dir = config.template_dir(cwd);
    if !template_dir.exists() {
        fs::create_dir_all(&template_dir)?;
        println!("  {} Created {}/", "✓".green(), args.templates);
    }

    let example = template_dir.join("hero.html");
    if !example.exists() {
        fs::write(&example, EXAMPLE_TEMPLATE)?;
        println!("  {} Created hero.html", "✓".green());
    }

    let asset_root = config.asset_root(cwd);
    if !asset_root.exists() {
        fs::create_dir_all(&asset_root)?;
        println!("  {} Created {}/", "✓".green(), config.asset_root);
    }

    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: pagecraft inspect hero");
    println!("  2. Add templates to {}/", args.templates);

    Ok(())
}
