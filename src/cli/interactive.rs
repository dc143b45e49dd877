//! Interactive settings manager

use crate::editor::SettingsEditor;
use crate::models::{GlobalSettingsPatch, RoleKey};
use crate::store::JsonFileSettingsStore;
use crate::utils::helpers::format_account_number;
use anyhow::Result;
use chrono::Utc;
use colored::*;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, MultiSelect, Select};
use futures::executor::block_on;
use std::path::{Path, PathBuf};

const COLOR_PRESETS: &[(&str, &str)] = &[
    ("🟠 Orange", "#ff9500"),
    ("🔴 Red", "#ff3b30"),
    ("🟢 Green", "#34c759"),
    ("🔵 Blue", "#007aff"),
    ("🟣 Purple", "#af52de"),
    ("⚫ Gray", "#8e8e93"),
];

type Editor = SettingsEditor<JsonFileSettingsStore>;

/// Run the interactive menu against the settings file at `path`
pub fn run_interactive_mode(path: &Path) -> Result<()> {
    print_banner(path);
    let mut editor = block_on(SettingsEditor::open(JsonFileSettingsStore::new(path)));

    loop {
        println!();
        let options = vec![
            "📋 List accounts",
            "➕ Add or update account",
            "🎭 Add or update role",
            "🗑️  Delete accounts",
            "🗑️  Delete role",
            "🎨 Watermark settings",
            "📤 Export settings",
            "📥 Import settings",
            "♻️  Reset all settings",
            "❌ Exit",
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("What would you like to do?")
            .items(&options)
            .default(0)
            .interact()?;

        let outcome = match selection {
            0 => handle_list(&editor),
            1 => handle_save_account(&mut editor),
            2 => handle_save_role(&mut editor),
            3 => handle_delete_accounts(&mut editor),
            4 => handle_delete_role(&mut editor),
            5 => handle_global(&mut editor),
            6 => handle_export(&editor),
            7 => handle_import(&mut editor),
            8 => handle_reset(&mut editor),
            9 => {
                println!("\n{}", "Bye! 👋".green().bold());
                break;
            }
            _ => unreachable!(),
        };

        // Prompt errors end the session, rejected input only the action
        if let Err(e) = outcome {
            if e.downcast_ref::<dialoguer::Error>().is_some() {
                return Err(e);
            }
            println!("{}", format!("❌ {}", e).red());
        }
    }

    Ok(())
}

fn print_banner(path: &Path) {
    println!("{}", "╔══════════════════════════════════════════╗".blue());
    println!("{}", "║     🏷️  AWS Account Indicator settings     ║".blue().bold());
    println!("{}", "╚══════════════════════════════════════════╝".blue());
    println!("{}", format!("Settings file: {}", path.display()).dimmed());
}

fn handle_list(editor: &Editor) -> Result<()> {
    let term: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("🔍 Filter (number or name)")
        .allow_empty(true)
        .interact_text()?;

    let accounts = editor.filter_accounts(term.trim());
    if accounts.is_empty() {
        println!("{}", "No accounts configured".yellow());
    }
    for (number, config) in accounts {
        println!(
            "  {}  {}  {}",
            format_account_number(number).bold(),
            config.name,
            config.color.as_deref().unwrap_or("-").dimmed()
        );
    }

    let roles = &editor.settings().role_settings;
    if !roles.is_empty() {
        println!();
        println!("{}", "Roles:".bold());
        for (key, config) in roles {
            println!("  {}  {}", key, config.name);
        }
    }
    Ok(())
}

fn prompt_color(default: &str) -> Result<String> {
    let mut labels: Vec<&str> = COLOR_PRESETS.iter().map(|(label, _)| *label).collect();
    labels.push("✏️  Custom");

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("🎨 Color")
        .items(&labels)
        .default(0)
        .interact()?;

    if let Some((_, hex)) = COLOR_PRESETS.get(selection) {
        return Ok(hex.to_string());
    }
    Ok(Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Color (#rrggbb or rgb(r, g, b))")
        .with_initial_text(default)
        .interact_text()?)
}

fn handle_save_account(editor: &mut Editor) -> Result<()> {
    let number: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("🔢 Account number")
        .interact_text()?;
    let name: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("🏷️  Display name")
        .interact_text()?;
    let color = prompt_color("#ff9500")?;

    let account = block_on(editor.save_account(&number, &name, &color, Utc::now()))?;
    println!("{}", format!("✅ Saved {}", format_account_number(account.as_str())).green());
    Ok(())
}

fn handle_save_role(editor: &mut Editor) -> Result<()> {
    let account: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("🔢 Source account number")
        .interact_text()?;
    let role_name: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("🎭 Role name")
        .interact_text()?;
    let display_name: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("🏷️  Display name (empty to use role name)")
        .allow_empty(true)
        .interact_text()?;
    let color = prompt_color("#ff9500")?;

    let key = block_on(editor.save_role(&account, &role_name, &display_name, &color, Utc::now()))?;
    println!("{}", format!("✅ Saved role {}", key).green());
    Ok(())
}

fn handle_delete_accounts(editor: &mut Editor) -> Result<()> {
    let numbers: Vec<String> = editor
        .settings()
        .aws_account_settings
        .keys()
        .cloned()
        .collect();
    if numbers.is_empty() {
        println!("{}", "No accounts configured".yellow());
        return Ok(());
    }

    let labels: Vec<String> = editor
        .settings()
        .aws_account_settings
        .iter()
        .map(|(number, config)| format!("{}  {}", format_account_number(number), config.name))
        .collect();
    let chosen = MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Select accounts to delete (space to toggle)")
        .items(&labels)
        .interact()?;
    if chosen.is_empty() {
        return Ok(());
    }

    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Delete {} account(s)?", chosen.len()))
        .default(false)
        .interact()?;
    if !confirmed {
        return Ok(());
    }

    let selected: Vec<&String> = chosen.iter().map(|i| &numbers[*i]).collect();
    let removed = block_on(editor.bulk_delete_accounts(selected))?;
    println!("{}", format!("✅ Deleted {} account(s)", removed).green());
    Ok(())
}

fn handle_delete_role(editor: &mut Editor) -> Result<()> {
    let keys: Vec<String> = editor.settings().role_settings.keys().cloned().collect();
    if keys.is_empty() {
        println!("{}", "No roles configured".yellow());
        return Ok(());
    }

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Role to delete")
        .items(&keys)
        .default(0)
        .interact()?;

    let key: RoleKey = keys[selection].parse().map_err(anyhow::Error::msg)?;
    if block_on(editor.delete_role(&key))? {
        println!("{}", format!("✅ Deleted role {}", key).green());
    }
    Ok(())
}

fn handle_global(editor: &mut Editor) -> Result<()> {
    let current = editor.settings().global_settings.clone();

    let enable = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Show watermark?")
        .default(current.enable_watermark)
        .interact()?;
    let opacity: f64 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Opacity (0-1)")
        .default(current.watermark_opacity)
        .interact_text()?;
    let size: u32 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Font size (px)")
        .default(current.watermark_size)
        .interact_text()?;

    let patch = GlobalSettingsPatch {
        enable_watermark: Some(enable),
        watermark_opacity: Some(opacity),
        watermark_size: Some(size),
    };
    block_on(editor.update_global(&patch))?;
    println!("{}", "✅ Watermark settings saved".green());
    Ok(())
}

fn handle_export(editor: &Editor) -> Result<()> {
    let (file_name, json) = editor.export(Utc::now())?;
    let target: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("📂 Export to")
        .with_initial_text(file_name)
        .interact_text()?;
    std::fs::write(&target, json)?;
    println!("{}", format!("✅ Exported to {}", target).green());
    Ok(())
}

fn handle_import(editor: &mut Editor) -> Result<()> {
    let source: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("📂 Import from")
        .interact_text()?;
    let json = std::fs::read_to_string(PathBuf::from(source.trim()))?;

    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Replace all current account and role settings?")
        .default(false)
        .interact()?;
    if !confirmed {
        return Ok(());
    }

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

fn handle_reset(editor: &mut Editor) -> Result<()> {
    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Delete every account, role and watermark setting?")
        .default(false)
        .interact()?;
    if confirmed {
        block_on(editor.reset())?;
        println!("{}", "✅ Settings reset".green());
    }
    Ok(())
}
