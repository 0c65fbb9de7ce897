use anyhow::Context;
use clap::Parser;
use smeta_common::{detect_column_roles, normalize_unit};
use smeta_structure::cli::{Cli, Commands};
use smeta_structure::config::Config;
use smeta_structure::workbook::{self, AnalyzeSettings, Workbook};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("Не удалось загрузить настройки")?;

    match cli.command {
        Commands::Analyze { input, output, force, include_empty, unit_allow, no_require_qty } => {
            println!("📑 smeta - анализ структуры\n");

            println!("[1/3] Чтение книги...");
            let book = Workbook::load(&input)
                .with_context(|| format!("Не удалось прочитать {}", input.display()))?;
            println!("✔ Листов: {}\n", book.sheets.len());

            let mode = if force { " (повторное распознавание групп)" } else { "" };
            println!("[2/3] Анализ листов...{}", mode);
            let settings = AnalyzeSettings {
                include_empty_sections: include_empty || config.include_empty_sections,
                require_qty: no_require_qty.then_some(false),
                defaults: config,
                unit_allow,
                force,
            };
            let report = book.analyze(&settings)?;

            for sheet in &report.sheets {
                let s = &sheet.structure;
                println!(
                    "✔ {}: групп {}, позиций {}, без группы {}",
                    sheet.name,
                    s.groups.len(),
                    s.items.len(),
                    s.loose.len()
                );
                for notice in sheet.notices() {
                    println!("  ⚠ {}", notice);
                }
                if cli.verbose {
                    println!("    пропущено строк шапки: {}", s.stats.skipped_headers);
                    println!("    просмотрено строк: {}", s.stats.scanned_rows);
                    println!("    строк с цветом: {}", s.stats.colored_rows);
                    println!("    цветных с UNIT/QTY: {}", s.stats.filtered_by_unit_qty);
                    println!("    цветных без названия: {}", s.stats.filtered_by_empty_name);
                    for section in &s.sections {
                        println!("    {} ({})", section.path, section.items.len());
                    }
                }
            }
            println!();

            println!("[3/3] Сохранение результата...");
            let output = output.unwrap_or_else(|| workbook::default_output_path(&input));
            let json = serde_json::to_string_pretty(&report)?;
            std::fs::write(&output, json)
                .with_context(|| format!("Не удалось записать {}", output.display()))?;
            println!("✔ Результат: {}", output.display());

            println!("\n✅ Анализ завершён");
        }

        Commands::Units { raw } => {
            for unit in raw {
                println!("{} → {}", unit, normalize_unit(&unit));
            }
        }

        Commands::Roles { input } => {
            let book = Workbook::load(&input)
                .with_context(|| format!("Не удалось прочитать {}", input.display()))?;

            for sheet in &book.sheets {
                let roles = detect_column_roles(&sheet.rows);
                println!("{}:", sheet.name);
                for (col, code) in workbook::role_codes(&roles).iter().enumerate() {
                    if cli.verbose || code != "NONE" {
                        println!("  {}: {}", col, code);
                    }
                }
            }
        }

        Commands::Config { show, unit_allow, require_qty, include_empty } => {
            let mut config = config;
            let changed = unit_allow.is_some() || require_qty.is_some() || include_empty.is_some();

            if let Some(units) = unit_allow {
                config.unit_allow_raw = units;
            }
            if let Some(value) = require_qty {
                config.require_qty = value;
            }
            if let Some(value) = include_empty {
                config.include_empty_sections = value;
            }
            if changed {
                config.save()?;
                println!("✔ Настройки сохранены");
            }

            if show || !changed {
                println!("Настройки:");
                println!("  Разрешённые единицы: {}", config.unit_allow_raw);
                println!("  Требовать количество: {}", config.require_qty);
                println!("  Пустые разделы: {}", config.include_empty_sections);
                println!("  Файл: {}", Config::config_path()?.display());
            }
        }
    }

    Ok(())
}
