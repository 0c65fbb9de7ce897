//! Типы ошибок движка

use crate::schema::ColumnRole;
use thiserror::Error;

/// Общая ошибка движка.
///
/// `MissingRoles`, `HiddenNameColumn` и `UnknownRole` относятся к конфигурации и возникают до
/// начала сканирования строк. Во время сканирования ошибок нет.
#[derive(Error, Debug)]
pub enum Error {
    #[error("В схеме нет обязательных ролей: {}", format_roles(.0))]
    MissingRoles(Vec<ColumnRole>),

    #[error("Колонка NAME_OF_WORK ({0}) скрыта, анализ невозможен")]
    HiddenNameColumn(usize),

    #[error("Неизвестная роль колонки: {0}")]
    UnknownRole(String),

    #[error("Некорректная группа: {0}")]
    InvalidGroup(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Ошибка конфигурации схемы (в отличие от ошибок данных)
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingRoles(_) | Error::HiddenNameColumn(_) | Error::UnknownRole(_)
        )
    }
}

fn format_roles(roles: &[ColumnRole]) -> String {
    roles
        .iter()
        .map(|r| r.code())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Псевдоним Result движка
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_missing_roles() {
        let error = Error::MissingRoles(vec![ColumnRole::NameOfWork, ColumnRole::Unit]);
        let display = format!("{}", error);
        assert_eq!(display, "В схеме нет обязательных ролей: NAME_OF_WORK, UNIT");
    }

    #[test]
    fn test_error_display_hidden_name_column() {
        let error = Error::HiddenNameColumn(2);
        assert!(format!("{}", error).contains("(2)"));
    }

    #[test]
    fn test_error_display_unknown_role() {
        let error = Error::UnknownRole("GROUP-9".to_string());
        assert_eq!(format!("{}", error), "Неизвестная роль колонки: GROUP-9");
    }

    #[test]
    fn test_error_from_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
        assert!(!error.is_configuration());
    }

    #[test]
    fn test_is_configuration() {
        assert!(Error::HiddenNameColumn(0).is_configuration());
        assert!(Error::UnknownRole("X".into()).is_configuration());
        assert!(!Error::InvalidGroup("x".into()).is_configuration());
    }
}
