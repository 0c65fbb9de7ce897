use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmetaError {
    #[error(transparent)]
    Core(#[from] smeta_common::Error),

    #[error("Ошибка конфигурации: {0}")]
    Config(String),

    #[error("Файл не найден: {0}")]
    FileNotFound(String),

    #[error("Лист '{sheet}': сохранённые группы некорректны ({reason}). Запустите с --force для повторного распознавания")]
    ExistingGroups { sheet: String, reason: String },

    #[error("Ошибка разбора JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),
}

impl SmetaError {
    /// Ошибка схемы листа (роли колонок), а не данных или окружения
    pub fn is_configuration(&self) -> bool {
        matches!(self, SmetaError::Core(e) if e.is_configuration())
    }
}

pub type Result<T> = std::result::Result<T, SmetaError>;
