//! Smeta Structure Common Library
//!
//! Движок распознавания структуры сметы: единицы измерения, шапка,
//! позиции, цветовые группы и дерево разделов. Без ввода-вывода.

pub mod assign;
pub mod cells;
pub mod color;
pub mod color_group;
pub mod error;
pub mod header;
pub mod line_item;
pub mod loader;
pub mod pipeline;
pub mod ranges;
pub mod schema;
pub mod types;
pub mod unit;

pub use assign::{
    assign, flatten_sections, Assignment, GroupNode, GroupTreeAssigner, ItemAssignment, Section,
};
pub use color_group::{nesting_violations, AnalysisStats, ColorGroupAnalysis, ColorGroupAnalyzer};
pub use error::{Error, Result};
pub use header::find_data_start;
pub use line_item::{Candidate, LineItemDetector};
pub use loader::{load_groups, parse_groups, validate_forest, validate_group};
pub use pipeline::{analyze_sheet, AnalyzeOptions, SheetStructure};
pub use ranges::RowRange;
pub use schema::{detect_column_roles, ColumnRole, Schema, SchemaConfig};
pub use types::{Group, LineItem, Row};
pub use unit::{normalize_unit, normalize_units, parse_allowed_units};
