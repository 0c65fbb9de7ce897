//! Автоматическое построение групп по цветовой разметке
//!
//! Соглашение смет: однотипные разделы одного уровня красят одинаково.
//!
//! ## Алгоритм
//! 1. Строка с цветом в NAME_OF_WORK и пустыми UNIT/QTY открывает группу
//! 2. Имя группы берётся из ячейки NAME_OF_WORK
//! 3. Повтор цвета, уже открытого в стеке, закрывает этот уровень и всё,
//!    что глубже; новая группа становится соседней
//! 4. Новый цвет внутри группы открывает вложенную подгруппу (parent = вершина стека)
//! 5. В конце листа все открытые группы закрываются последней строкой
//!
//! ```text
//! 1: [синий]   "Раздел 1"    → G1 [1-4], уровень 0
//! 2:           "Работа А"
//! 3: [зелёный] "Подраздел"   → G2 [3-4], уровень 1, родитель G1
//! 4:           "Работа Б"
//! 5: [синий]   "Раздел 2"    → закрывает G2 и G1, G3 [5-5]
//! ```

use crate::cells::has_meaningful_value;
use crate::color::normalize_color;
use crate::error::Result;
use crate::header::find_data_start;
use crate::ranges::RowRange;
use crate::schema::{ColumnRole, Schema};
use crate::types::{Group, Row};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeSet, HashSet};

/// Статистика прохода по листу
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Пропущено строк шапки
    pub skipped_headers: usize,
    /// Обработано строк данных
    pub scanned_rows: usize,
    /// Строк с цветом в NAME_OF_WORK
    pub colored_rows: usize,
    /// Отфильтровано: цветная строка с UNIT/QTY
    pub filtered_by_unit_qty: usize,
    /// Отфильтровано: цветная строка без названия
    pub filtered_by_empty_name: usize,
    pub groups_created: usize,
}

/// Результат цветового анализа
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColorGroupAnalysis {
    /// Группы, родители раньше потомков (по началу диапазона)
    pub groups: Vec<Group>,
    /// Индекс первой строки данных среди видимых строк
    pub data_start: usize,
    pub stats: AnalysisStats,
}

/// Открытый уровень стека
#[derive(Debug)]
struct Frame {
    group: Group,
    color: String,
    start_row: u32,
}

/// Анализатор цветовой разметки, настроенный под схему
#[derive(Debug, Clone)]
pub struct ColorGroupAnalyzer {
    name_col: usize,
    unit_cols: Vec<usize>,
    qty_cols: Vec<usize>,
    hidden_cols: BTreeSet<usize>,
    hidden_rows: BTreeSet<u32>,
}

impl ColorGroupAnalyzer {
    /// Ошибка конфигурации, если NAME_OF_WORK нет или колонка скрыта
    pub fn new(schema: &Schema) -> Result<Self> {
        let name_col = schema.name_column()?;
        Ok(Self {
            name_col,
            unit_cols: schema.visible_columns(ColumnRole::Unit),
            qty_cols: schema.visible_columns(ColumnRole::Qty),
            hidden_cols: schema.hidden_cols.clone(),
            hidden_rows: schema.hidden_rows.clone(),
        })
    }

    pub fn name_col(&self) -> usize {
        self.name_col
    }

    /// Один проход по строкам со стеком открытых групп
    pub fn analyze<R: Borrow<Row>>(&self, rows: &[R]) -> ColorGroupAnalysis {
        let mut visible: Vec<&Row> = Vec::with_capacity(rows.len());
        for r in rows {
            let r: &Row = r.borrow();
            if !self.hidden_rows.contains(&r.row_index) {
                visible.push(r);
            }
        }
        let rows = visible;

        let mut stats = AnalysisStats::default();
        let data_start = find_data_start(
            &rows,
            self.name_col,
            &self.unit_cols,
            &self.qty_cols,
            &self.hidden_cols,
        );
        stats.skipped_headers = data_start;
        log::info!(
            "Анализ цветов: строк {}, колонка NAME_OF_WORK {}, начало данных {}",
            rows.len(),
            self.name_col,
            data_start
        );

        let mut stack: Vec<Frame> = Vec::new();
        let mut completed: Vec<Group> = Vec::new();

        for row in &rows[data_start..] {
            stats.scanned_rows += 1;

            let color = match normalize_color(row.color(self.name_col)) {
                Some(color) => color,
                None => continue,
            };
            stats.colored_rows += 1;

            // Цвет + UNIT/QTY означает позицию с оформлением, а не группу
            if has_meaningful_value(row, &self.unit_cols)
                || has_meaningful_value(row, &self.qty_cols)
            {
                stats.filtered_by_unit_qty += 1;
                log::debug!("Строка {}: {} с UNIT/QTY, не группа", row.row_index, color);
                continue;
            }

            // Цветной разделитель без текста
            let name = row.text(self.name_col);
            if name.is_empty() {
                stats.filtered_by_empty_name += 1;
                log::debug!("Строка {}: {} без названия, не группа", row.row_index, color);
                continue;
            }

            if let Some(level) = stack.iter().position(|f| f.color == color) {
                let end_row = row.row_index.saturating_sub(1);
                completed.extend(close_from_level(&mut stack, level, end_row));
            }

            let group = Group {
                uid: new_group_uid(),
                name: group_name(name, row.row_index),
                color: color.clone(),
                parent_uid: stack.last().map(|f| f.group.uid.clone()),
                rows: Vec::new(),
            };
            log::debug!(
                "Строка {}: открыта группа '{}' {} уровень {} стек [{}]",
                row.row_index,
                group.name,
                color,
                stack.len(),
                format_stack(&stack)
            );

            stack.push(Frame {
                group,
                color,
                start_row: row.row_index,
            });
        }

        if let Some(last) = rows.last() {
            if !stack.is_empty() {
                log::debug!(
                    "Конец листа: закрываю {} групп строкой {}",
                    stack.len(),
                    last.row_index
                );
                completed.extend(close_from_level(&mut stack, 0, last.row_index));
            }
        }

        // Родитель начинается не позже потомка, а одна строка открывает не более одной группы
        completed.sort_by_key(|g| g.rows.first().map(|r| r.start).unwrap_or(0));
        stats.groups_created = completed.len();

        if completed.is_empty() {
            log::warn!("Не найдено ни одной группы с цветовой разметкой");
        } else {
            let colors: BTreeSet<&str> = completed.iter().map(|g| g.color.as_str()).collect();
            log::info!(
                "Создано групп: {}, цвета: {}",
                completed.len(),
                colors.into_iter().collect::<Vec<_>>().join(", ")
            );
        }
        log::info!(
            "Строк с цветом: {}, отфильтровано UNIT/QTY: {}, без названия: {}",
            stats.colored_rows,
            stats.filtered_by_unit_qty,
            stats.filtered_by_empty_name
        );

        ColorGroupAnalysis {
            groups: completed,
            data_start,
            stats,
        }
    }
}

/// Закрыть все уровни стека начиная с `level` (включительно)
///
/// Диапазон каждой закрытой группы равен `[start_row, end_row]`.
/// Возвращает группы в порядке «предки раньше потомков».
fn close_from_level(stack: &mut Vec<Frame>, level: usize, end_row: u32) -> Vec<Group> {
    let closing = stack.split_off(level.min(stack.len()));
    let mut closed = Vec::with_capacity(closing.len());

    for frame in closing {
        let mut group = frame.group;
        // Номера строк могут идти не по возрастанию
        let end = end_row.max(frame.start_row);
        group.rows = vec![RowRange::new(frame.start_row, end)];
        closed.push(group);
    }

    closed
}

fn group_name(name: &str, row_index: u32) -> String {
    let name = name.trim();
    if name.is_empty() {
        format!("Группа {}", row_index)
    } else {
        name.to_string()
    }
}

/// `grp_` + 16 hex-символов
fn new_group_uid() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("grp_{}", &hex[..16])
}

fn format_stack(stack: &[Frame]) -> String {
    stack
        .iter()
        .map(|f| format!("{}:{}", f.color, f.group.name.chars().take(15).collect::<String>()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Проверка инварианта вложенности: диапазон предка содержит диапазоны потомков
///
/// Возвращает uid групп, нарушающих инвариант.
pub fn nesting_violations(groups: &[Group]) -> Vec<String> {
    let by_uid: std::collections::HashMap<&str, &Group> =
        groups.iter().map(|g| (g.uid.as_str(), g)).collect();

    groups
        .iter()
        .filter(|g| {
            let mut seen: HashSet<&str> = HashSet::new();
            let mut current = g.parent_uid.as_deref();
            while let Some(uid) = current {
                if !seen.insert(uid) {
                    break;
                }
                match by_uid.get(uid) {
                    Some(parent) => {
                        if !crate::ranges::ranges_cover(&parent.rows, &g.rows) {
                            return true;
                        }
                        current = parent.parent_uid.as_deref();
                    }
                    None => break,
                }
            }
            false
        })
        .map(|g| g.uid.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use proptest::prelude::*;

    const BLUE: &str = "#0000FF";
    const GREEN: &str = "#00FF00";

    fn schema() -> Schema {
        Schema::new(vec![ColumnRole::NameOfWork, ColumnRole::Unit, ColumnRole::Qty])
    }

    fn row(index: u32, name: &str, color: Option<&str>) -> Row {
        let r = Row::from_texts(index, &[name, "", ""]);
        match color {
            Some(c) => r.with_color(0, c),
            None => r,
        }
    }

    fn scenario_rows() -> Vec<Row> {
        vec![
            row(1, "Раздел 1", Some(BLUE)),
            row(2, "Работа А", None),
            row(3, "Подраздел", Some(GREEN)),
            row(4, "Работа Б", None),
            row(5, "Раздел 2", Some(BLUE)),
        ]
    }

    fn find<'a>(groups: &'a [Group], name: &str) -> &'a Group {
        groups.iter().find(|g| g.name == name).unwrap()
    }

    #[test]
    fn test_sections_and_subsection() {
        let analyzer = ColorGroupAnalyzer::new(&schema()).unwrap();
        let result = analyzer.analyze(&scenario_rows());
        let groups = &result.groups;

        assert_eq!(groups.len(), 3);
        let g1 = find(groups, "Раздел 1");
        let g2 = find(groups, "Подраздел");
        let g3 = find(groups, "Раздел 2");

        assert_eq!(g1.color, BLUE);
        assert_eq!(g1.rows, vec![RowRange::new(1, 4)]);
        assert!(g1.parent_uid.is_none());

        assert_eq!(g2.color, GREEN);
        assert_eq!(g2.rows, vec![RowRange::new(3, 4)]);
        assert_eq!(g2.parent_uid.as_deref(), Some(g1.uid.as_str()));

        assert_eq!(g3.rows, vec![RowRange::new(5, 5)]);
        assert!(g3.parent_uid.is_none());

        assert_eq!(result.stats.groups_created, 3);
        assert_eq!(result.stats.colored_rows, 3);
    }

    #[test]
    fn test_colored_row_with_unit_and_qty_is_not_group() {
        let analyzer = ColorGroupAnalyzer::new(&schema()).unwrap();
        let rows = vec![Row::from_texts(1, &["Кладка", "шт", "5"]).with_color(0, "#FFFF00")];
        let result = analyzer.analyze(&rows);

        assert!(result.groups.is_empty());
        assert_eq!(result.stats.filtered_by_unit_qty, 1);
    }

    #[test]
    fn test_colored_row_with_only_qty_is_not_group() {
        let analyzer = ColorGroupAnalyzer::new(&schema()).unwrap();
        let rows = vec![Row::from_texts(1, &["Кладка", "  ", "5"]).with_color(0, "#FFFF00")];
        assert!(analyzer.analyze(&rows).groups.is_empty());
    }

    #[test]
    fn test_decorative_separator_skipped() {
        let analyzer = ColorGroupAnalyzer::new(&schema()).unwrap();
        let rows = vec![
            row(1, "Раздел 1", Some(BLUE)),
            row(2, "   ", Some(BLUE)),
            row(3, "Работа", None),
        ];
        let result = analyzer.analyze(&rows);

        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].rows, vec![RowRange::new(1, 3)]);
        assert_eq!(result.stats.filtered_by_empty_name, 1);
    }

    #[test]
    fn test_header_rows_skipped() {
        let analyzer = ColorGroupAnalyzer::new(&schema()).unwrap();
        let rows = vec![
            Row::from_texts(1, &["Наименование", "Ед.изм.", "Кол-во"]).with_color(0, "#CCCCCC"),
            Row::from_texts(2, &["1", "2", "3"]).with_color(0, "#CCCCCC"),
            row(3, "Раздел 1", Some("#ccc")),
            row(4, "Работа", None),
        ];
        let result = analyzer.analyze(&rows);

        assert_eq!(result.data_start, 2);
        assert_eq!(result.stats.skipped_headers, 2);
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].color, "#CCCCCC");
        assert_eq!(result.groups[0].rows, vec![RowRange::new(3, 4)]);
    }

    #[test]
    fn test_malformed_colors_ignored() {
        let analyzer = ColorGroupAnalyzer::new(&schema()).unwrap();
        let rows = vec![row(1, "Раздел", Some("FF00FF00")), row(2, "Работа", Some("blue"))];
        assert!(analyzer.analyze(&rows).groups.is_empty());
    }

    #[test]
    fn test_deep_nesting_closes_middle_level() {
        let analyzer = ColorGroupAnalyzer::new(&schema()).unwrap();
        let rows = vec![
            row(1, "A", Some("#111111")),
            row(2, "A.1", Some("#222222")),
            row(3, "A.1.1", Some("#333333")),
            row(4, "работа", None),
            row(5, "A.2", Some("#222222")),
            row(6, "работа", None),
        ];
        let groups = analyzer.analyze(&rows).groups;

        assert_eq!(groups.len(), 4);
        let a = find(&groups, "A");
        let a1 = find(&groups, "A.1");
        let a11 = find(&groups, "A.1.1");
        let a2 = find(&groups, "A.2");

        assert_eq!(a.rows, vec![RowRange::new(1, 6)]);
        assert_eq!(a1.rows, vec![RowRange::new(2, 4)]);
        assert_eq!(a11.rows, vec![RowRange::new(3, 4)]);
        assert_eq!(a2.rows, vec![RowRange::new(5, 6)]);
        assert_eq!(a2.parent_uid.as_deref(), Some(a.uid.as_str()));
        assert_eq!(a11.parent_uid.as_deref(), Some(a1.uid.as_str()));
        // родители раньше потомков
        assert_eq!(groups[0].name, "A");
    }

    #[test]
    fn test_hidden_rows_excluded() {
        let schema = schema().with_hidden_rows([5]);
        let analyzer = ColorGroupAnalyzer::new(&schema).unwrap();
        let groups = analyzer.analyze(&scenario_rows()).groups;

        // строка 5 скрыта: Раздел 2 не открывается, лист кончается строкой 4
        assert_eq!(groups.len(), 2);
        assert_eq!(find(&groups, "Раздел 1").rows, vec![RowRange::new(1, 4)]);
    }

    #[test]
    fn test_hidden_unit_column_not_checked() {
        let schema = schema().with_hidden_cols([1]);
        let analyzer = ColorGroupAnalyzer::new(&schema).unwrap();
        let rows = vec![Row::from_texts(1, &["Раздел", "шт", ""]).with_color(0, BLUE)];
        assert_eq!(analyzer.analyze(&rows).groups.len(), 1);
    }

    #[test]
    fn test_hidden_name_column_refused() {
        let schema = schema().with_hidden_cols([0]);
        assert!(matches!(
            ColorGroupAnalyzer::new(&schema),
            Err(Error::HiddenNameColumn(0))
        ));
    }

    #[test]
    fn test_missing_name_role_refused() {
        let schema = Schema::new(vec![ColumnRole::Unit]);
        assert!(matches!(
            ColorGroupAnalyzer::new(&schema),
            Err(Error::MissingRoles(_))
        ));
    }

    #[test]
    fn test_empty_sheet() {
        let analyzer = ColorGroupAnalyzer::new(&schema()).unwrap();
        let result = analyzer.analyze::<Row>(&[]);
        assert!(result.groups.is_empty());
        assert_eq!(result.stats, AnalysisStats::default());
    }

    #[test]
    fn test_uid_format() {
        let uid = new_group_uid();
        assert!(uid.starts_with("grp_"));
        assert_eq!(uid.len(), 20);
        assert_ne!(uid, new_group_uid());
    }

    #[test]
    fn test_repeated_runs_match_except_uids() {
        let analyzer = ColorGroupAnalyzer::new(&schema()).unwrap();
        let key = |groups: &[Group]| -> Vec<(String, String, Vec<RowRange>, Option<String>)> {
            groups
                .iter()
                .map(|g| {
                    let parent = g
                        .parent_uid
                        .as_ref()
                        .and_then(|p| groups.iter().find(|x| &x.uid == p))
                        .map(|p| p.name.clone());
                    (g.name.clone(), g.color.clone(), g.rows.clone(), parent)
                })
                .collect()
        };

        let first = analyzer.analyze(&scenario_rows()).groups;
        let second = analyzer.analyze(&scenario_rows()).groups;
        assert_eq!(key(&first), key(&second));
    }

    fn arb_rows() -> impl Strategy<Value = Vec<Row>> {
        let colors = prop::sample::select(vec![
            None,
            Some("#F00"),
            Some("#0F0"),
            Some("#00F"),
            Some("#FF0"),
        ]);
        prop::collection::vec((colors, any::<bool>(), any::<bool>()), 0..40).prop_map(|cases| {
            cases
                .into_iter()
                .enumerate()
                .map(|(i, (color, named, priced))| {
                    let name = if named { format!("Строка {}", i) } else { String::new() };
                    let qty = if priced { "1" } else { "" };
                    let r = Row::from_texts(i as u32 + 1, &[name.as_str(), "", qty]);
                    match color {
                        Some(c) => r.with_color(0, c),
                        None => r,
                    }
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn every_group_closed_and_nested(rows in arb_rows()) {
            let analyzer = ColorGroupAnalyzer::new(&schema()).unwrap();
            let groups = analyzer.analyze(&rows).groups;

            for g in &groups {
                prop_assert_eq!(g.rows.len(), 1);
                prop_assert!(g.rows[0].is_valid());
            }
            let uids: HashSet<&str> = groups.iter().map(|g| g.uid.as_str()).collect();
            prop_assert_eq!(uids.len(), groups.len());
            prop_assert!(nesting_violations(&groups).is_empty());

            let opening_rows = rows
                .iter()
                .filter(|r| {
                    normalize_color(r.color(0)).is_some()
                        && !r.text(0).is_empty()
                        && r.text(2).is_empty()
                })
                .count();
            prop_assert_eq!(groups.len(), opening_rows);
        }
    }
}
