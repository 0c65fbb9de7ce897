//! Доступ к ячейкам строки по набору колонок
//!
//! Все функции принимают уже отфильтрованные (видимые) индексы колонок.

use crate::types::Row;

/// Первое непустое (после trim) значение среди колонок
pub fn first_nonempty<'a>(row: &'a Row, cols: &[usize]) -> Option<&'a str> {
    cols.iter().map(|&c| row.text(c)).find(|v| !v.is_empty())
}

/// Есть ли в колонках значение, отличное от пустого/пробельного
pub fn has_meaningful_value(row: &Row, cols: &[usize]) -> bool {
    first_nonempty(row, cols).is_some()
}

/// Разбор количества: без пробелов, запятая → точка
///
/// `"10,5"` → 10.5, `"1 200"` → 1200.0
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Первое количество > 0 среди колонок
pub fn positive_quantity(row: &Row, cols: &[usize]) -> Option<f64> {
    cols.iter()
        .filter_map(|&c| parse_quantity(row.text(c)))
        .find(|&q| q > 0.0)
}

/// Первое числовое количество среди колонок (любого знака)
pub fn first_quantity(row: &Row, cols: &[usize]) -> Option<f64> {
    cols.iter().find_map(|&c| parse_quantity(row.text(c)))
}
