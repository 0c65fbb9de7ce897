//! Схема колонок листа
//!
//! Роли колонок приходят строками (`"NAME_OF_WORK"`, `"GROUP-3"` …) и
//! разбираются один раз при построении [`Schema`]; дальше по строкам
//! ходит только закрытый enum [`ColumnRole`].

use crate::error::{Error, Result};
use crate::types::Row;
use crate::unit::parse_allowed_units;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Максимальный уровень групповой колонки (`GROUP-1` … `GROUP-6`)
pub const MAX_GROUP_LEVEL: u8 = 6;

/// Сколько верхних строк просматривается при автоопределении ролей
const HEADER_ZONE_ROWS: usize = 8;

/// Роль колонки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnRole {
    #[default]
    None,
    NameOfWork,
    Unit,
    Qty,
    /// Уровень иерархии 1..=6
    GroupLevel(u8),
    TechCard,
    Work,
    Material,
    UnitPriceOfMaterial,
    UnitPriceOfWork,
    UnitPriceOfMaterialsAndWorks,
    PriceForAllMaterial,
    PriceForAllWork,
    TotalPrice,
}

impl ColumnRole {
    /// Все ценовые роли в порядке отображения
    pub const PRICE_ROLES: [ColumnRole; 6] = [
        ColumnRole::UnitPriceOfMaterial,
        ColumnRole::UnitPriceOfWork,
        ColumnRole::UnitPriceOfMaterialsAndWorks,
        ColumnRole::PriceForAllMaterial,
        ColumnRole::PriceForAllWork,
        ColumnRole::TotalPrice,
    ];

    /// Код роли для сериализации
    pub fn code(&self) -> String {
        match self {
            ColumnRole::None => "NONE".into(),
            ColumnRole::NameOfWork => "NAME_OF_WORK".into(),
            ColumnRole::Unit => "UNIT".into(),
            ColumnRole::Qty => "QTY".into(),
            ColumnRole::GroupLevel(n) => format!("GROUP-{}", n),
            ColumnRole::TechCard => "TECH_CARD".into(),
            ColumnRole::Work => "WORK".into(),
            ColumnRole::Material => "MATERIAL".into(),
            ColumnRole::UnitPriceOfMaterial => "UNIT_PRICE_OF_MATERIAL".into(),
            ColumnRole::UnitPriceOfWork => "UNIT_PRICE_OF_WORK".into(),
            ColumnRole::UnitPriceOfMaterialsAndWorks => "UNIT_PRICE_OF_MATERIALS_AND_WORKS".into(),
            ColumnRole::PriceForAllMaterial => "PRICE_FOR_ALL_MATERIAL".into(),
            ColumnRole::PriceForAllWork => "PRICE_FOR_ALL_WORK".into(),
            ColumnRole::TotalPrice => "TOTAL_PRICE".into(),
        }
    }

    /// Заголовок роли для интерфейса
    pub fn title(&self) -> String {
        match self {
            ColumnRole::None => ":".into(),
            ColumnRole::NameOfWork => "НАИМЕНОВАНИЕ РАБОТ/ТК".into(),
            ColumnRole::Unit => "ЕД. ИЗМ.".into(),
            ColumnRole::Qty => "КОЛ-ВО".into(),
            ColumnRole::GroupLevel(n) => format!("Уровень {}", n),
            ColumnRole::TechCard => "Техкарта".into(),
            ColumnRole::Work => "Работа".into(),
            ColumnRole::Material => "Материал".into(),
            ColumnRole::UnitPriceOfMaterial => "ЦЕНА МАТ/ЕД".into(),
            ColumnRole::UnitPriceOfWork => "ЦЕНА РАБОТЫ/ЕД".into(),
            ColumnRole::UnitPriceOfMaterialsAndWorks => "ЦЕНА МАТ+РАБ/ЕД".into(),
            ColumnRole::PriceForAllMaterial => "ИТОГО МАТЕРИАЛ".into(),
            ColumnRole::PriceForAllWork => "ИТОГО РАБОТА".into(),
            ColumnRole::TotalPrice => "ОБЩАЯ ЦЕНА".into(),
        }
    }

    pub fn is_price(&self) -> bool {
        Self::PRICE_ROLES.contains(self)
    }

    pub fn is_group_level(&self) -> bool {
        matches!(self, ColumnRole::GroupLevel(_))
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for ColumnRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim();
        let role = match code {
            "" | "NONE" => ColumnRole::None,
            "NAME_OF_WORK" => ColumnRole::NameOfWork,
            "UNIT" => ColumnRole::Unit,
            "QTY" => ColumnRole::Qty,
            "TECH_CARD" => ColumnRole::TechCard,
            "WORK" => ColumnRole::Work,
            "MATERIAL" => ColumnRole::Material,
            "UNIT_PRICE_OF_MATERIAL" => ColumnRole::UnitPriceOfMaterial,
            "UNIT_PRICE_OF_WORK" => ColumnRole::UnitPriceOfWork,
            "UNIT_PRICE_OF_MATERIALS_AND_WORKS" => ColumnRole::UnitPriceOfMaterialsAndWorks,
            "PRICE_FOR_ALL_MATERIAL" => ColumnRole::PriceForAllMaterial,
            "PRICE_FOR_ALL_WORK" => ColumnRole::PriceForAllWork,
            "TOTAL_PRICE" => ColumnRole::TotalPrice,
            other => {
                let level = other
                    .strip_prefix("GROUP-")
                    .and_then(|n| n.parse::<u8>().ok())
                    .filter(|n| (1..=MAX_GROUP_LEVEL).contains(n));
                match level {
                    Some(n) => ColumnRole::GroupLevel(n),
                    None => return Err(Error::UnknownRole(other.to_string())),
                }
            }
        };
        Ok(role)
    }
}

impl TryFrom<String> for ColumnRole {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ColumnRole> for String {
    fn from(role: ColumnRole) -> Self {
        role.code()
    }
}

/// Схема листа: роли колонок и правила отбора позиций
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    pub col_roles: Vec<ColumnRole>,
    /// Разрешённые единицы (нормализованные). Пусто = любые
    pub unit_allow: BTreeSet<String>,
    pub require_qty: bool,
    /// Скрытые строки (row_index, 1-based)
    pub hidden_rows: BTreeSet<u32>,
    /// Скрытые колонки (0-based)
    pub hidden_cols: BTreeSet<usize>,
}

impl Schema {
    pub fn new(col_roles: Vec<ColumnRole>) -> Self {
        Self {
            col_roles,
            ..Default::default()
        }
    }

    pub fn with_unit_allow<I, S>(mut self, units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.unit_allow = crate::unit::normalize_units(units);
        self
    }

    pub fn with_require_qty(mut self, require_qty: bool) -> Self {
        self.require_qty = require_qty;
        self
    }

    pub fn with_hidden_rows(mut self, rows: impl IntoIterator<Item = u32>) -> Self {
        self.hidden_rows = rows.into_iter().collect();
        self
    }

    pub fn with_hidden_cols(mut self, cols: impl IntoIterator<Item = usize>) -> Self {
        self.hidden_cols = cols.into_iter().collect();
        self
    }

    /// Все индексы колонок с ролью (включая скрытые)
    pub fn columns(&self, role: ColumnRole) -> Vec<usize> {
        self.col_roles
            .iter()
            .enumerate()
            .filter(|(_, r)| **r == role)
            .map(|(i, _)| i)
            .collect()
    }

    /// Видимые индексы колонок с ролью
    pub fn visible_columns(&self, role: ColumnRole) -> Vec<usize> {
        self.columns(role)
            .into_iter()
            .filter(|i| !self.hidden_cols.contains(i))
            .collect()
    }

    pub fn has_role(&self, role: ColumnRole) -> bool {
        self.col_roles.contains(&role)
    }

    /// Проверка наличия обязательных ролей
    pub fn require_roles(&self, roles: &[ColumnRole]) -> Result<()> {
        let missing: Vec<ColumnRole> = roles
            .iter()
            .copied()
            .filter(|r| !self.has_role(*r))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingRoles(missing))
        }
    }

    /// Колонка названий для цветового анализа: первая NAME_OF_WORK, и она не скрыта
    pub fn name_column(&self) -> Result<usize> {
        let col = self
            .columns(ColumnRole::NameOfWork)
            .first()
            .copied()
            .ok_or_else(|| Error::MissingRoles(vec![ColumnRole::NameOfWork]))?;
        if self.hidden_cols.contains(&col) {
            return Err(Error::HiddenNameColumn(col));
        }
        Ok(col)
    }

    pub fn is_row_hidden(&self, row_index: u32) -> bool {
        self.hidden_rows.contains(&row_index)
    }
}

/// Схема в том виде, в котором её хранит приложение
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub col_roles: Vec<String>,
    #[serde(default)]
    pub unit_allow_raw: String,
    #[serde(default = "default_require_qty")]
    pub require_qty: bool,
    #[serde(default)]
    pub hidden_rows: Vec<u32>,
    #[serde(default)]
    pub hidden_cols: Vec<usize>,
}

fn default_require_qty() -> bool {
    true
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            col_roles: Vec::new(),
            unit_allow_raw: String::new(),
            require_qty: default_require_qty(),
            hidden_rows: Vec::new(),
            hidden_cols: Vec::new(),
        }
    }
}

impl TryFrom<SchemaConfig> for Schema {
    type Error = Error;

    fn try_from(config: SchemaConfig) -> Result<Self> {
        let col_roles = config
            .col_roles
            .iter()
            .map(|code| code.parse())
            .collect::<Result<Vec<ColumnRole>>>()?;

        Ok(Schema {
            col_roles,
            unit_allow: parse_allowed_units(&config.unit_allow_raw),
            require_qty: config.require_qty,
            hidden_rows: config.hidden_rows.into_iter().collect(),
            hidden_cols: config.hidden_cols.into_iter().collect(),
        })
    }
}

/// Автоопределение ролей колонок по заголовкам
///
/// Смотрит первые строки листа; ширина = самая длинная строка.
pub fn detect_column_roles(rows: &[Row]) -> Vec<ColumnRole> {
    lazy_static::lazy_static! {
        static ref LEVEL_RE: Regex = Regex::new(r"^ур(\d+)$").unwrap();
    }

    let max_cols = rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
    let mut roles = vec![ColumnRole::None; max_cols];

    for row in rows.iter().take(HEADER_ZONE_ROWS) {
        for (col, _) in row.cells.iter().enumerate() {
            let low = row.text(col).to_lowercase();
            if low.is_empty() {
                continue;
            }

            if low.contains("шифр") {
                roles[col] = ColumnRole::TechCard;
            } else if (low.contains("наименован") && low.contains("работ"))
                || low == "наименование"
            {
                roles[col] = ColumnRole::NameOfWork;
            } else if low.contains("ед.изм") || low.contains("ед. изм") {
                roles[col] = ColumnRole::Unit;
            } else if low.contains("кол-во") || low.contains("количество") || low == "колво" {
                roles[col] = ColumnRole::Qty;
            } else if let Some(cap) = LEVEL_RE.captures(&low) {
                if let Ok(n) = cap[1].parse::<u8>() {
                    if (1..=MAX_GROUP_LEVEL).contains(&n) {
                        roles[col] = ColumnRole::GroupLevel(n);
                    }
                }
            }
        }
    }

    // Уровни не найдены явно: пробуем колонки 5..8
    if !roles.iter().any(|r| r.is_group_level()) && max_cols >= 9 {
        for (level, col) in (5..9).enumerate() {
            if roles[col] == ColumnRole::None {
                roles[col] = ColumnRole::GroupLevel(level as u8 + 1);
            }
        }
    }

    roles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_row(index: u32, cells: &[&str]) -> Row {
        Row::from_texts(index, cells)
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("NAME_OF_WORK".parse::<ColumnRole>().unwrap(), ColumnRole::NameOfWork);
        assert_eq!("".parse::<ColumnRole>().unwrap(), ColumnRole::None);
        assert_eq!("GROUP-3".parse::<ColumnRole>().unwrap(), ColumnRole::GroupLevel(3));
        assert_eq!("TOTAL_PRICE".parse::<ColumnRole>().unwrap(), ColumnRole::TotalPrice);
    }

    #[test]
    fn test_role_from_str_rejects_unknown() {
        assert!(matches!("GROUP-7".parse::<ColumnRole>(), Err(Error::UnknownRole(_))));
        assert!(matches!("GROUP-0".parse::<ColumnRole>(), Err(Error::UnknownRole(_))));
        assert!(matches!("PRICE".parse::<ColumnRole>(), Err(Error::UnknownRole(_))));
    }

    #[test]
    fn test_role_serde_uses_codes() {
        let roles = vec![ColumnRole::NameOfWork, ColumnRole::GroupLevel(2), ColumnRole::Qty];
        let json = serde_json::to_string(&roles).unwrap();
        assert_eq!(json, r#"["NAME_OF_WORK","GROUP-2","QTY"]"#);

        let back: Vec<ColumnRole> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, roles);
        assert!(serde_json::from_str::<ColumnRole>(r#""GROUP-X""#).is_err());
    }

    #[test]
    fn test_price_roles() {
        assert!(ColumnRole::TotalPrice.is_price());
        assert!(!ColumnRole::Qty.is_price());
        assert_eq!(ColumnRole::UnitPriceOfWork.title(), "ЦЕНА РАБОТЫ/ЕД");
    }

    #[test]
    fn test_schema_from_config() {
        let config = SchemaConfig {
            col_roles: vec!["NAME_OF_WORK".into(), "UNIT".into(), "QTY".into()],
            unit_allow_raw: "м², шт., кв.м".into(),
            hidden_cols: vec![2],
            ..Default::default()
        };
        let schema = Schema::try_from(config).unwrap();

        assert!(schema.require_qty);
        assert_eq!(schema.unit_allow.len(), 2);
        assert!(schema.unit_allow.contains("м2"));
        assert!(schema.unit_allow.contains("шт"));
        assert!(schema.visible_columns(ColumnRole::Qty).is_empty());
        assert_eq!(schema.columns(ColumnRole::Qty), vec![2]);
    }

    #[test]
    fn test_schema_from_config_unknown_role() {
        let config = SchemaConfig {
            col_roles: vec!["NAME_OF_WORK".into(), "SOMETHING".into()],
            ..Default::default()
        };
        let err = Schema::try_from(config).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_schema_config_defaults() {
        let config: SchemaConfig = serde_json::from_str("{}").unwrap();
        assert!(config.require_qty);
        assert!(config.col_roles.is_empty());
    }

    #[test]
    fn test_require_roles() {
        let schema = Schema::new(vec![ColumnRole::NameOfWork, ColumnRole::Qty]);
        match schema.require_roles(&[ColumnRole::NameOfWork, ColumnRole::Unit]) {
            Err(Error::MissingRoles(missing)) => assert_eq!(missing, vec![ColumnRole::Unit]),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_name_column_hidden() {
        let schema = Schema::new(vec![ColumnRole::None, ColumnRole::NameOfWork])
            .with_hidden_cols([1]);
        assert!(matches!(schema.name_column(), Err(Error::HiddenNameColumn(1))));
    }

    #[test]
    fn test_detect_column_roles() {
        let rows = vec![
            header_row(1, &["Смета №5"]),
            header_row(2, &["Шифр", "Наименование работ", "Ед. изм.", "Кол-во", "ур1", "ур2"]),
        ];
        let roles = detect_column_roles(&rows);
        assert_eq!(
            roles,
            vec![
                ColumnRole::TechCard,
                ColumnRole::NameOfWork,
                ColumnRole::Unit,
                ColumnRole::Qty,
                ColumnRole::GroupLevel(1),
                ColumnRole::GroupLevel(2),
            ]
        );
    }

    #[test]
    fn test_detect_column_roles_fallback_levels() {
        let mut cells = vec![""; 10];
        cells[0] = "Наименование";
        let rows = vec![header_row(1, &cells)];
        let roles = detect_column_roles(&rows);

        assert_eq!(roles[0], ColumnRole::NameOfWork);
        assert_eq!(roles[5], ColumnRole::GroupLevel(1));
        assert_eq!(roles[8], ColumnRole::GroupLevel(4));
        assert_eq!(roles[9], ColumnRole::None);
    }

    #[test]
    fn test_detect_column_roles_empty() {
        assert!(detect_column_roles(&[]).is_empty());
    }
}
