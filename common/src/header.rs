//! Поиск границы заголовка
//!
//! Сметы начинаются с «шапки»: название объекта, реквизиты, строка
//! заголовков колонок и строка с их номерами. Данные идут после неё.

use crate::types::Row;
use std::borrow::Borrow;
use std::collections::BTreeSet;

/// Ключевые слова строки заголовков колонок
pub const HEADER_KEYWORDS: [&str; 5] = ["НАИМЕНОВАНИЕ", "ЕД.ИЗМ", "КОЛ-ВО", "ШИФР", "П.П"];

/// Индекс (в срезе `rows`) первой строки данных
///
/// Строка заголовков + одна строка подзаголовка пропускаются.
/// Заголовок не найден → 0, весь лист считается данными.
pub fn find_data_start<R: Borrow<Row>>(
    rows: &[R],
    name_col: usize,
    unit_cols: &[usize],
    qty_cols: &[usize],
    hidden_cols: &BTreeSet<usize>,
) -> usize {
    let visible = |col: &usize| !hidden_cols.contains(col);
    let name_col = Some(name_col).filter(visible);
    let unit_col = unit_cols.iter().copied().find(visible);
    let qty_col = qty_cols.iter().copied().find(visible);

    for (pos, row) in rows.iter().enumerate() {
        let row: &Row = row.borrow();
        let text = [name_col, unit_col, qty_col]
            .iter()
            .flatten()
            .map(|&c| row.text(c))
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();

        if HEADER_KEYWORDS.iter().any(|k| text.contains(k)) {
            return (pos + 2).min(rows.len());
        }
    }

    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(texts: &[&[&str]]) -> Vec<Row> {
        texts
            .iter()
            .enumerate()
            .map(|(i, cells)| Row::from_texts(i as u32 + 1, cells))
            .collect()
    }

    #[test]
    fn test_header_found() {
        let rows = rows(&[
            &["Локальная смета №1", "", ""],
            &["Наименование работ", "Ед.изм.", "Кол-во"],
            &["1", "2", "3"],
            &["Штукатурка", "м2", "10"],
        ]);
        assert_eq!(find_data_start(&rows, 0, &[1], &[2], &BTreeSet::new()), 3);
    }

    #[test]
    fn test_header_keyword_in_unit_column_only() {
        let rows = rows(&[&["", "ед.изм", ""], &["", "", ""], &["Работа", "шт", "1"]]);
        assert_eq!(find_data_start(&rows, 0, &[1], &[2], &BTreeSet::new()), 2);
    }

    #[test]
    fn test_no_header() {
        let rows = rows(&[&["Раздел 1"], &["Работа А"]]);
        assert_eq!(find_data_start(&rows, 0, &[], &[], &BTreeSet::new()), 0);
    }

    #[test]
    fn test_header_on_last_row_clamps() {
        let rows = rows(&[&["Работа"], &["НАИМЕНОВАНИЕ"]]);
        assert_eq!(find_data_start(&rows, 0, &[], &[], &BTreeSet::new()), 2);
    }

    #[test]
    fn test_hidden_columns_ignored() {
        let rows = rows(&[&["", "ШИФР"], &["x", "y"], &["Работа", "1"]]);
        let hidden: BTreeSet<usize> = [1].into_iter().collect();
        assert_eq!(find_data_start(&rows, 0, &[1], &[], &hidden), 0);
        assert_eq!(find_data_start(&rows, 0, &[1], &[], &BTreeSet::new()), 2);
    }
}
