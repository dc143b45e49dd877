//! AWS Account Indicator CLI

use anyhow::{Context, Result};
use aws_account_indicator::config::{default_config_path, default_settings_path, IndicatorConfig};
use aws_account_indicator::editor::SettingsEditor;
use aws_account_indicator::models::{GlobalSettingsPatch, PageCapture, RoleKey};
use aws_account_indicator::report::{generate_report, inspect};
use aws_account_indicator::store::JsonFileSettingsStore;
use aws_account_indicator::utils::helpers::format_account_number;
use aws_account_indicator::{cli, load_capture};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use futures::executor::block_on;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "aws-account-indicator")]
#[command(about = "Detect AWS console accounts and manage watermark settings", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    /// JSON5 config file with timings and overlay geometry
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log detection decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the account and role in a saved page capture
    Detect {
        /// Capture file (JSON)
        #[arg(long)]
        capture: PathBuf,

        /// Print the detection as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run detection over every capture in a directory
    Scan {
        #[arg(long)]
        dir: PathBuf,
    },

    /// Write a markdown detection report for a capture
    Report {
        #[arg(long)]
        capture: PathBuf,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Manage account display settings
    Accounts {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Manage role display settings
    Roles {
        #[command(subcommand)]
        action: RoleAction,
    },

    /// Show or change watermark settings
    Global {
        #[command(subcommand)]
        action: GlobalAction,
    },

    /// Export settings to a JSON file
    Export {
        /// Output path (defaults to a dated file name in the current directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Replace settings from an exported file
    Import {
        file: PathBuf,
    },

    /// Delete every account, role and watermark setting
    Reset {
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Menu-driven settings manager
    Interactive,
}

#[derive(Subcommand)]
enum AccountAction {
    List {
        #[arg(short, long, default_value = "")]
        filter: String,
    },
    Add {
        number: String,
        name: String,
        #[arg(long, default_value = "#ff9500")]
        color: String,
    },
    Remove {
        number: String,
    },
    BulkRemove {
        #[arg(required = true)]
        numbers: Vec<String>,
    },
    Search {
        term: String,
    },
}

#[derive(Subcommand)]
enum GlobalAction {
    Show,
    Set {
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        #[arg(long)]
        disable: bool,

        #[arg(long)]
        opacity: Option<f64>,

        #[arg(long)]
        size: Option<u32>,
    },
}

#[derive(Subcommand)]
enum RoleAction {
    List,
    Add {
        account: String,
        role: String,
        /// Shown instead of the role name
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "#ff9500")]
        color: String,
    },
    Remove {
        /// `<account>:<role>`
        key: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}", "❌ Failed!".red().bold());
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "aws_account_indicator=debug"
        } else {
            "warn"
        })
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = IndicatorConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let settings_path = cli
        .settings
        .clone()
        .or(config.settings_path.clone())
        .unwrap_or_else(default_settings_path);

    match cli.command {
        Commands::Detect { capture, json } => detect(&capture, &settings_path, json),
        Commands::Scan { dir } => scan(&dir),
        Commands::Report { capture, out } => report(&capture, &settings_path, out),
        Commands::Accounts { action } => accounts(&settings_path, action),
        Commands::Roles { action } => roles(&settings_path, action),
        Commands::Global { action } => global(&settings_path, action),
        Commands::Export { out } => export(&settings_path, out),
        Commands::Import { file } => import(&settings_path, &file),
        Commands::Reset { yes } => reset(&settings_path, yes),
        Commands::Interactive => cli::run_interactive_mode(&settings_path),
    }
}

fn open_editor(settings_path: &Path) -> SettingsEditor<JsonFileSettingsStore> {
    block_on(SettingsEditor::open(JsonFileSettingsStore::new(settings_path)))
}

fn read_capture(path: &Path) -> Result<PageCapture> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(load_capture(&content)?)
}

fn detect(path: &Path, settings_path: &Path, json: bool) -> Result<()> {
    let capture = read_capture(path)?;
    let editor = open_editor(settings_path);
    let report = inspect(&capture, editor.settings());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match (&report.detection.account, &report.resolved) {
        (Some(account), Some(resolved)) => {
            println!(
                "{} {}",
                "✅ Account:".green().bold(),
                format_account_number(account.as_str())
            );
            if let Some(role) = report.detection.role.role_name.as_deref() {
                println!("   Role: {}", role);
            }
            println!("   Watermark: {}", resolved.display_name.bold());
            println!("   Colors: {} on {}", resolved.text_color, resolved.background_color);
            if let Some(strategy) = report.winning_strategy() {
                println!("   {}", format!("via {}", strategy).dimmed());
            }
        }
        _ => println!("{}", "⚠️  No account number found".yellow()),
    }
    Ok(())
}

fn scan(dir: &Path) -> Result<()> {
    let captures: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();

    let progress = ProgressBar::new(captures.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut rows = Vec::new();
    let mut failures = 0;
    for path in &captures {
        progress.set_message(path.display().to_string());
        match read_capture(path) {
            Ok(capture) => {
                let detection = aws_account_indicator::detector::detect_capture(&capture);
                rows.push((path.clone(), detection));
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable capture");
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    println!("{}", "📊 Scan Results".bold().blue());
    println!("{}", "=".repeat(50).blue());
    let mut found = 0;
    for (path, detection) in &rows {
        let account = match &detection.account {
            Some(account) => {
                found += 1;
                format_account_number(account.as_str()).green()
            }
            None => "not found".yellow(),
        };
        let role = detection.role.role_name.as_deref().unwrap_or("-");
        println!("{}  {}  {}", account, role, path.display().to_string().dimmed());
    }
    println!();
    println!(
        "Detected {}/{} capture(s), {} unreadable",
        found,
        rows.len(),
        failures
    );
    Ok(())
}

fn report(path: &Path, settings_path: &Path, output: Option<PathBuf>) -> Result<()> {
    let capture = read_capture(path)?;
    let editor = open_editor(settings_path);
    let markdown = generate_report(&inspect(&capture, editor.settings()));

    match output {
        Some(output) => {
            std::fs::write(&output, markdown)?;
            println!("{}", format!("✅ Report written to {}", output.display()).green());
        }
        None => print!("{}", markdown),
    }
    Ok(())
}

fn accounts(settings_path: &Path, action: AccountAction) -> Result<()> {
    let mut editor = open_editor(settings_path);
    match action {
        AccountAction::List { filter } => print_accounts(&editor, &filter),
        AccountAction::Search { term } => print_accounts(&editor, term.trim()),
        AccountAction::Add { number, name, color } => {
            let account = block_on(editor.save_account(&number, &name, &color, Utc::now()))?;
            println!("{}", format!("✅ Saved {}", format_account_number(account.as_str())).green());
        }
        AccountAction::Remove { number } => {
            if block_on(editor.delete_account(&number))? {
                println!("{}", format!("✅ Deleted {}", number).green());
            } else {
                println!("{}", format!("No account {}", number).yellow());
            }
        }
        AccountAction::BulkRemove { numbers } => {
            let removed = block_on(editor.bulk_delete_accounts(&numbers))?;
            println!("{}", format!("✅ Deleted {} account(s)", removed).green());
        }
    }
    Ok(())
}

fn print_accounts(editor: &SettingsEditor<JsonFileSettingsStore>, term: &str) {
    let accounts = editor.filter_accounts(term);
    if accounts.is_empty() {
        println!("{}", "No matching accounts".yellow());
    }
    for (number, config) in accounts {
        println!(
            "{}  {}  {}",
            format_account_number(number).bold(),
            config.name,
            config.color.as_deref().unwrap_or("-").dimmed()
        );
    }
}

fn roles(settings_path: &Path, action: RoleAction) -> Result<()> {
    let mut editor = open_editor(settings_path);
    match action {
        RoleAction::List => {
            let roles = &editor.settings().role_settings;
            if roles.is_empty() {
                println!("{}", "No roles configured".yellow());
            }
            for (key, config) in roles {
                println!(
                    "{}  {}  {}",
                    key.bold(),
                    config.name,
                    config.color.as_deref().unwrap_or("-").dimmed()
                );
            }
        }
        RoleAction::Add {
            account,
            role,
            name,
            color,
        } => {
            let key = block_on(editor.save_role(&account, &role, &name, &color, Utc::now()))?;
            println!("{}", format!("✅ Saved role {}", key).green());
        }
        RoleAction::Remove { key } => {
            let key: RoleKey = key.parse().map_err(anyhow::Error::msg)?;
            if block_on(editor.delete_role(&key))? {
                println!("{}", format!("✅ Deleted role {}", key).green());
            } else {
                println!("{}", format!("No role {}", key).yellow());
            }
        }
    }
    Ok(())
}

fn global(settings_path: &Path, action: GlobalAction) -> Result<()> {
    let mut editor = open_editor(settings_path);
    let globals = match action {
        GlobalAction::Show => editor.settings().global_settings.clone(),
        GlobalAction::Set {
            enable,
            disable,
            opacity,
            size,
        } => {
            let patch = GlobalSettingsPatch {
                enable_watermark: match (enable, disable) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
                watermark_opacity: opacity,
                watermark_size: size,
            };
            if patch.is_empty() {
                anyhow::bail!("nothing to set; pass --enable, --disable, --opacity or --size");
            }
            block_on(editor.update_global(&patch))?
        }
    };

    println!("Watermark: {}", if globals.enable_watermark { "on".green() } else { "off".red() });
    println!("Opacity:   {}", globals.watermark_opacity);
    println!("Size:      {}px", globals.watermark_size);
    Ok(())
}

fn export(settings_path: &Path, output: Option<PathBuf>) -> Result<()> {
    let editor = open_editor(settings_path);
    let (file_name, json) = editor.export(Utc::now())?;
    let output = output.unwrap_or_else(|| PathBuf::from(file_name));
    std::fs::write(&output, json)?;
    println!("{}", format!("✅ Exported to {}", output.display()).green());
    Ok(())
}

fn import(settings_path: &Path, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let mut editor = open_editor(settings_path);
    let summary = block_on(editor.import(&json))?;
    println!(
        "{}",
        format!(
            "✅ Imported {} account(s) and {} role(s)",
            summary.accounts, summary.roles
        )
        .green()
    );
    Ok(())
}

fn reset(settings_path: &Path, yes: bool) -> Result<()> {
    if !yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Delete every account, role and watermark setting?")
            .default(false)
            .interact()?;
        if !confirmed {
            return Ok(());
        }
    }
    let mut editor = open_editor(settings_path);
    block_on(editor.reset())?;
    println!("{}", "✅ Settings reset".green());
    Ok(())
}
