//! Книга сметы в JSON и анализ её листов
//!
//! Листы независимы и анализируются параллельно (rayon), результат
//! сохраняет порядок листов.

use crate::config::Config;
use crate::error::{Result, SmetaError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smeta_common::{
    analyze_sheet, detect_column_roles, load_groups, parse_allowed_units, parse_groups,
    validate_forest, AnalyzeOptions, ColumnRole, Group, Row, Schema, SchemaConfig, SheetStructure,
};
use std::path::{Path, PathBuf};

/// Входная книга
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<SheetInput>,
    /// Аннотация приложения со старыми раскладками групп
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<serde_json::Value>,
}

/// Лист книги
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetInput {
    #[serde(default)]
    pub name: String,
    pub rows: Vec<Row>,
    /// Без схемы роли колонок определяются по заголовкам
    #[serde(default)]
    pub schema: Option<SchemaConfig>,
    /// Сохранённые ручные группы
    #[serde(default)]
    pub groups: Option<Vec<serde_json::Value>>,
}

/// Результат анализа листа
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetReport {
    pub name: String,
    #[serde(flatten)]
    pub structure: SheetStructure,
}

impl SheetReport {
    /// Предупреждения для отчёта: лист без групп или без позиций
    pub fn notices(&self) -> Vec<String> {
        let mut notices = Vec::new();
        if self.structure.groups.is_empty() {
            notices.push(format!("{}: цветовые группы не найдены", self.name));
        }
        if self.structure.items.is_empty() {
            notices.push(format!("{}: позиции не найдены", self.name));
        }
        notices
    }
}

/// Результат анализа книги
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbookReport {
    pub sheets: Vec<SheetReport>,
}

/// Параметры команды analyze
#[derive(Debug, Clone, Default)]
pub struct AnalyzeSettings {
    /// Настройки для листов без схемы
    pub defaults: Config,
    /// Перекрывает unit_allow_raw схемы и настроек
    pub unit_allow: Option<String>,
    /// Перекрывает require_qty схемы и настроек
    pub require_qty: Option<bool>,
    pub include_empty_sections: bool,
    /// Игнорировать сохранённые группы
    pub force: bool,
}

impl Workbook {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SmetaError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Сохранённые группы листа: из самого листа или из аннотации
    pub fn existing_groups(&self, sheet_index: usize) -> Vec<Group> {
        match self.sheets.get(sheet_index).and_then(|s| s.groups.as_ref()) {
            Some(raw) => parse_groups(raw),
            None => self
                .annotation
                .as_ref()
                .map(|a| load_groups(a, sheet_index))
                .unwrap_or_default(),
        }
    }

    /// Проанализировать все листы параллельно
    pub fn analyze(&self, settings: &AnalyzeSettings) -> Result<WorkbookReport> {
        let sheets = self
            .sheets
            .par_iter()
            .enumerate()
            .map(|(i, sheet)| self.analyze_sheet(i, sheet, settings))
            .collect::<Result<Vec<_>>>()?;
        Ok(WorkbookReport { sheets })
    }

    fn analyze_sheet(
        &self,
        index: usize,
        sheet: &SheetInput,
        settings: &AnalyzeSettings,
    ) -> Result<SheetReport> {
        let schema = sheet_schema(sheet, settings)?;

        let existing_groups = if settings.force {
            None
        } else {
            let groups = self.existing_groups(index);
            if groups.is_empty() {
                None
            } else {
                validate_forest(&groups).map_err(|e| SmetaError::ExistingGroups {
                    sheet: sheet.name.clone(),
                    reason: e.to_string(),
                })?;
                Some(groups)
            }
        };

        let options = AnalyzeOptions {
            include_empty_sections: settings.include_empty_sections,
            existing_groups,
        };
        let structure = analyze_sheet(&sheet.rows, &schema, &options)?;

        Ok(SheetReport {
            name: sheet.name.clone(),
            structure,
        })
    }
}

/// Схема листа с учётом настроек и перекрытий командной строки
pub fn sheet_schema(sheet: &SheetInput, settings: &AnalyzeSettings) -> Result<Schema> {
    let mut schema = match &sheet.schema {
        Some(config) => Schema::try_from(config.clone())?,
        None => Schema::new(detect_column_roles(&sheet.rows))
            .with_require_qty(settings.defaults.require_qty)
            .with_unit_allow(parse_allowed_units(&settings.defaults.unit_allow_raw)),
    };

    if let Some(raw) = &settings.unit_allow {
        schema.unit_allow = parse_allowed_units(raw);
    }
    if let Some(require_qty) = settings.require_qty {
        schema.require_qty = require_qty;
    }

    Ok(schema)
}

/// Роли колонок листа в виде кодов
pub fn role_codes(roles: &[ColumnRole]) -> Vec<String> {
    roles.iter().map(|r| r.code()).collect()
}

/// Путь результата по умолчанию: `book.json` → `book.structure.json`
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "workbook".into());
    input.with_file_name(format!("{}.structure.json", stem))
}
