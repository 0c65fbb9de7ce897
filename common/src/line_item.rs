//! Поиск позиций сметы (техкарт)
//!
//! Строка считается позицией, если одновременно:
//! 1. есть наименование (NAME_OF_WORK)
//! 2. есть единица измерения (UNIT), нормализуемая в непустую
//! 3. единица входит в разрешённые (если список задан)
//! 4. есть количество > 0 (если `require_qty`)

use crate::cells::{first_nonempty, first_quantity, positive_quantity};
use crate::error::Result;
use crate::schema::{ColumnRole, Schema};
use crate::types::{LineItem, Row};
use crate::unit::normalize_unit;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

/// Роли, без которых поиск позиций невозможен
pub const REQUIRED_ROLES: [ColumnRole; 2] = [ColumnRole::NameOfWork, ColumnRole::Unit];

/// Детектор позиций, настроенный под схему
#[derive(Debug, Clone)]
pub struct LineItemDetector {
    name_cols: Vec<usize>,
    unit_cols: Vec<usize>,
    qty_cols: Vec<usize>,
    /// (роль, первая видимая колонка) для ценовых ролей схемы
    price_cols: Vec<(ColumnRole, usize)>,
    unit_allow: BTreeSet<String>,
    require_qty: bool,
    hidden_rows: BTreeSet<u32>,
}

/// Кандидат для таблицы сопоставления: строка с названием или единицей
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub row_index: u32,
    pub name: String,
    pub unit: String,
    pub qty: String,
    #[serde(default)]
    pub prices: BTreeMap<String, String>,
}

impl LineItemDetector {
    /// Ошибка конфигурации, если в схеме нет NAME_OF_WORK или UNIT
    pub fn new(schema: &Schema) -> Result<Self> {
        schema.require_roles(&REQUIRED_ROLES)?;

        let price_cols = ColumnRole::PRICE_ROLES
            .iter()
            .filter_map(|role| {
                schema
                    .visible_columns(*role)
                    .first()
                    .map(|&col| (*role, col))
            })
            .collect();

        Ok(Self {
            name_cols: schema.visible_columns(ColumnRole::NameOfWork),
            unit_cols: schema.visible_columns(ColumnRole::Unit),
            qty_cols: schema.visible_columns(ColumnRole::Qty),
            price_cols,
            unit_allow: schema.unit_allow.clone(),
            require_qty: schema.require_qty,
            hidden_rows: schema.hidden_rows.clone(),
        })
    }

    /// Все позиции среди строк (в порядке строк)
    pub fn detect<R: Borrow<Row>>(&self, rows: &[R]) -> Vec<LineItem> {
        let items: Vec<LineItem> = rows
            .iter()
            .filter_map(|row| self.detect_row(row.borrow()))
            .collect();
        log::debug!("Найдено позиций: {} из {} строк", items.len(), rows.len());
        items
    }

    /// Проверка одной строки. `None`, если строка не позиция
    pub fn detect_row(&self, row: &Row) -> Option<LineItem> {
        if self.hidden_rows.contains(&row.row_index) {
            return None;
        }

        let name = first_nonempty(row, &self.name_cols)?;
        let unit_raw = first_nonempty(row, &self.unit_cols)?;

        let unit_canonical = normalize_unit(unit_raw);
        if unit_canonical.is_empty() {
            return None;
        }
        if !self.unit_allow.is_empty() && !self.unit_allow.contains(&unit_canonical) {
            return None;
        }

        let qty = if self.require_qty {
            Some(positive_quantity(row, &self.qty_cols)?)
        } else {
            first_quantity(row, &self.qty_cols)
        };

        Some(LineItem {
            row_index: row.row_index,
            name: name.to_string(),
            unit_raw: unit_raw.to_string(),
            unit_canonical,
            qty,
            prices: self.prices(row),
        })
    }

    /// Кандидаты без фильтрации по единице и количеству
    pub fn collect_candidates<R: Borrow<Row>>(&self, rows: &[R]) -> Vec<Candidate> {
        rows.iter()
            .map(<R as Borrow<Row>>::borrow)
            .filter(|row| !self.hidden_rows.contains(&row.row_index))
            .filter_map(|row| {
                let name = first_nonempty(row, &self.name_cols).unwrap_or("");
                let unit = first_nonempty(row, &self.unit_cols).unwrap_or("");
                if name.is_empty() && unit.is_empty() {
                    return None;
                }
                Some(Candidate {
                    row_index: row.row_index,
                    name: name.to_string(),
                    unit: unit.to_string(),
                    qty: first_nonempty(row, &self.qty_cols).unwrap_or("").to_string(),
                    prices: self.prices(row),
                })
            })
            .collect()
    }

    fn prices(&self, row: &Row) -> BTreeMap<String, String> {
        self.price_cols
            .iter()
            .filter_map(|(role, col)| {
                let value = row.text(*col);
                (!value.is_empty()).then(|| (role.code(), value.to_string()))
            })
            .collect()
    }
}
