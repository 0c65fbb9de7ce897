//! Данные листа и результаты анализа
//!
//! - Row: строка листа (текст + цвет фона каждой ячейки)
//! - LineItem: найденная позиция сметы (техкарта)
//! - Group: цветовая группа (раздел/подраздел)

use crate::ranges::RowRange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Строка листа в том виде, в котором её отдаёт читатель Excel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Номер строки в листе (1-based)
    pub row_index: u32,
    #[serde(default)]
    pub cells: Vec<Option<String>>,
    /// Цвета фона (hex или null), выровнены с cells по колонкам
    #[serde(default)]
    pub colors: Vec<Option<String>>,
}

impl Row {
    pub fn new(row_index: u32, cells: Vec<Option<String>>, colors: Vec<Option<String>>) -> Self {
        Self { row_index, cells, colors }
    }

    /// Строка без цветов из текстовых значений
    pub fn from_texts(row_index: u32, cells: &[&str]) -> Self {
        Self {
            row_index,
            cells: cells.iter().map(|c| Some(c.to_string())).collect(),
            colors: Vec::new(),
        }
    }

    /// Задать цвет фона ячейки
    pub fn with_color(mut self, col: usize, color: &str) -> Self {
        if self.colors.len() <= col {
            self.colors.resize(col + 1, None);
        }
        self.colors[col] = Some(color.to_string());
        self
    }

    /// Обрезанный текст ячейки; пусто для отсутствующей
    pub fn text(&self, col: usize) -> &str {
        self.cells
            .get(col)
            .and_then(|c| c.as_deref())
            .map(str::trim)
            .unwrap_or("")
    }

    /// Сырой цвет ячейки
    pub fn color(&self, col: usize) -> Option<&str> {
        self.colors.get(col).and_then(|c| c.as_deref())
    }
}

/// Позиция сметы (техкарта)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub row_index: u32,
    pub name: String,
    pub unit_raw: String,
    pub unit_canonical: String,
    #[serde(default)]
    pub qty: Option<f64>,
    /// Значения ценовых колонок: код роли → текст ячейки
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub prices: BTreeMap<String, String>,
}

/// Группа строк (раздел сметы)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub uid: String,
    pub name: String,
    /// Канонический цвет `#RRGGBB`
    pub color: String,
    #[serde(default)]
    pub parent_uid: Option<String>,
    #[serde(default)]
    pub rows: Vec<RowRange>,
}

impl Group {
    /// Покрывает ли группа строку (любым из диапазонов)
    pub fn covers(&self, row_index: u32) -> bool {
        crate::ranges::point_in_ranges(row_index, &self.rows)
    }

    pub fn is_root(&self) -> bool {
        self.parent_uid.is_none()
    }
}
