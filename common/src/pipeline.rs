//! Полный анализ листа: шапка → позиции → группы → дерево разделов
//!
//! Конфигурация проверяется до сканирования. Сам проход ошибок не
//! порождает, ноль групп или позиций считается нормальным результатом.

use crate::assign::{flatten_sections, GroupNode, GroupTreeAssigner, ItemAssignment, Section};
use crate::color_group::{AnalysisStats, ColorGroupAnalyzer};
use crate::error::Result;
use crate::header::find_data_start;
use crate::line_item::LineItemDetector;
use crate::schema::{ColumnRole, Schema};
use crate::types::{Group, LineItem, Row};
use serde::{Deserialize, Serialize};

/// Параметры анализа листа
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Включать в `sections` разделы без позиций
    pub include_empty_sections: bool,
    /// Готовые (ручные) группы: цветовой анализ пропускается
    pub existing_groups: Option<Vec<Group>>,
}

/// Структура листа для сохранения и экспорта
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetStructure {
    /// Индекс первой строки данных среди видимых строк
    pub data_start: usize,
    pub groups: Vec<Group>,
    /// Позиции с группой, в порядке строк
    pub items: Vec<ItemAssignment>,
    /// Позиции без группы
    pub loose: Vec<LineItem>,
    pub tree: Vec<GroupNode>,
    pub sections: Vec<Section>,
    pub stats: AnalysisStats,
}

/// Проанализировать один лист
pub fn analyze_sheet(
    rows: &[Row],
    schema: &Schema,
    options: &AnalyzeOptions,
) -> Result<SheetStructure> {
    let detector = LineItemDetector::new(schema)?;
    let analyzer = ColorGroupAnalyzer::new(schema)?;

    let visible: Vec<&Row> = rows
        .iter()
        .filter(|r| !schema.is_row_hidden(r.row_index))
        .collect();

    let data_start = find_data_start(
        &visible,
        analyzer.name_col(),
        &schema.visible_columns(ColumnRole::Unit),
        &schema.visible_columns(ColumnRole::Qty),
        &schema.hidden_cols,
    );
    let line_items = detector.detect(&visible[data_start..]);

    let (groups, stats) = match &options.existing_groups {
        Some(groups) => {
            log::info!("Используются готовые группы: {}", groups.len());
            let stats = AnalysisStats {
                skipped_headers: data_start,
                scanned_rows: visible.len() - data_start,
                ..Default::default()
            };
            (groups.clone(), stats)
        }
        None => {
            let analysis = analyzer.analyze(&visible);
            (analysis.groups, analysis.stats)
        }
    };

    let assigner = GroupTreeAssigner::new(&groups);
    let assignment = assigner.assign(&line_items);
    let tree = assigner.build_tree(&assignment);
    let sections = flatten_sections(&tree, options.include_empty_sections);
    let loose = assignment.loose().into_iter().cloned().collect();

    Ok(SheetStructure {
        data_start,
        items: assignment.entries,
        loose,
        tree,
        sections,
        stats,
        groups,
    })
}
