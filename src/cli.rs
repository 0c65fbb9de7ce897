use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "smeta")]
#[command(
    about = "Распознавание структуры сметы: позиции, цветовые группы, разделы",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Подробный вывод (статистика по листам)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Проанализировать листы книги (JSON) и сохранить структуру
    Analyze {
        /// JSON-файл книги
        #[arg(required = true)]
        input: PathBuf,

        /// Выходной JSON (по умолчанию: <вход>.structure.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Игнорировать сохранённые группы и распознать заново
        #[arg(long)]
        force: bool,

        /// Включать разделы без позиций
        #[arg(long)]
        include_empty: bool,

        /// Разрешённые единицы через запятую (перекрывает схему и настройки)
        #[arg(long)]
        unit_allow: Option<String>,

        /// Не требовать количество > 0
        #[arg(long)]
        no_require_qty: bool,
    },

    /// Показать каноническую форму единиц измерения
    Units {
        /// Единицы как в смете ("кв.м.", "м³" ...)
        #[arg(required = true)]
        raw: Vec<String>,
    },

    /// Показать автоопределённые роли колонок
    Roles {
        /// JSON-файл книги
        #[arg(required = true)]
        input: PathBuf,
    },

    /// Показать/изменить настройки по умолчанию
    Config {
        /// Показать настройки
        #[arg(long)]
        show: bool,

        /// Разрешённые единицы через запятую
        #[arg(long)]
        unit_allow: Option<String>,

        /// Требовать количество > 0
        #[arg(long)]
        require_qty: Option<bool>,

        /// Включать разделы без позиций
        #[arg(long)]
        include_empty: Option<bool>,
    },
}
