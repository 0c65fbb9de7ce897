//! Загрузка и проверка ручных групп
//!
//! Приложение хранило группы в разных раскладках аннотации листа:
//! - `schema.sheets[i].groups`
//! - `groups[i]` (массив групп)
//! - `groups[i].items`
//!
//! Поля тоже встречаются под разными именами, см. `group_from_value`.

use crate::color::is_canonical_color;
use crate::error::{Error, Result};
use crate::ranges::{ranges_cover, RowRange};
use crate::types::Group;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Имя группы по умолчанию
pub const DEFAULT_GROUP_NAME: &str = "Группа";
/// Цвет группы по умолчанию
pub const DEFAULT_GROUP_COLOR: &str = "#E0F7FA";

/// Группы листа из аннотации (пустой список, если их нет)
pub fn load_groups(annotation: &Value, sheet_index: usize) -> Vec<Group> {
    let raw = annotation
        .pointer(&format!("/schema/sheets/{}/groups", sheet_index))
        .and_then(Value::as_array)
        .or_else(|| {
            let entry = annotation.get("groups")?.get(sheet_index)?;
            entry
                .as_array()
                .or_else(|| entry.get("items").and_then(Value::as_array))
        });

    match raw {
        Some(raw) => parse_groups(raw),
        None => Vec::new(),
    }
}

/// Группы из массива записей аннотации; записи без uid пропускаются
pub fn parse_groups(raw: &[Value]) -> Vec<Group> {
    let groups: Vec<Group> = raw.iter().filter_map(group_from_value).collect();
    if groups.len() < raw.len() {
        log::warn!("Пропущено групп без uid: {}", raw.len() - groups.len());
    }
    groups
}

fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
}

fn group_from_value(value: &Value) -> Option<Group> {
    let uid = first_str(value, &["uid", "id", "gid"])?;
    let name = first_str(value, &["name", "title"]).unwrap_or(DEFAULT_GROUP_NAME);
    let color = first_str(value, &["color"]).unwrap_or(DEFAULT_GROUP_COLOR);
    let parent_uid = first_str(value, &["parent_uid", "parent", "parentId"]);

    let rows = ["rows", "ranges"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_array))
        .map(|ranges| ranges.iter().filter_map(range_from_value).collect())
        .unwrap_or_default();

    Some(Group {
        uid: uid.to_string(),
        name: name.to_string(),
        color: color.to_string(),
        parent_uid: parent_uid.map(str::to_string),
        rows,
    })
}

fn range_from_value(value: &Value) -> Option<RowRange> {
    let pair = value.as_array()?;
    if pair.len() < 2 {
        return None;
    }
    let start = u32::try_from(pair[0].as_u64()?).ok()?;
    let end = u32::try_from(pair[1].as_u64()?).ok()?;
    Some(RowRange::new(start, end))
}

/// Проверка полей новой группы
pub fn validate_group(name: &str, rows: &[RowRange], color: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidGroup("пустое имя группы".into()));
    }
    if rows.is_empty() || rows.iter().any(|r| !r.is_valid()) {
        return Err(Error::InvalidGroup(format!(
            "группа '{}': нужен хотя бы один корректный диапазон строк",
            name
        )));
    }
    if !is_canonical_color(color) {
        return Err(Error::InvalidGroup(format!(
            "группа '{}': цвет '{}' не в формате #RRGGBB",
            name, color
        )));
    }
    Ok(())
}

/// Проверка леса групп: уникальные uid, существующие родители,
/// вложенность диапазонов, отсутствие циклов
pub fn validate_forest(groups: &[Group]) -> Result<()> {
    let mut by_uid: HashMap<&str, &Group> = HashMap::new();
    for group in groups {
        if by_uid.insert(group.uid.as_str(), group).is_some() {
            return Err(Error::InvalidGroup(format!("повторяющийся uid '{}'", group.uid)));
        }
    }

    for group in groups {
        let Some(parent_uid) = group.parent_uid.as_deref() else {
            continue;
        };
        let parent = by_uid.get(parent_uid).ok_or_else(|| {
            Error::InvalidGroup(format!(
                "группа '{}': родитель '{}' не найден",
                group.name, parent_uid
            ))
        })?;
        if !ranges_cover(&parent.rows, &group.rows) {
            return Err(Error::InvalidGroup(format!(
                "группа '{}' выходит за пределы родителя '{}'",
                group.name, parent.name
            )));
        }
    }

    for group in groups {
        let mut seen = HashSet::new();
        let mut current = group;
        seen.insert(current.uid.as_str());
        while let Some(parent) = current
            .parent_uid
            .as_deref()
            .and_then(|p| by_uid.get(p).copied())
        {
            if !seen.insert(parent.uid.as_str()) {
                return Err(Error::InvalidGroup(format!(
                    "цикл родителей у группы '{}'",
                    group.name
                )));
            }
            current = parent;
        }
    }

    Ok(())
}
