//! Распределение позиций по группам и дерево разделов
//!
//! ## Правила
//! - позиция попадает в самую ГЛУБОКУЮ группу, покрывающую её строку
//! - группа покрывает строку, если её покрывает любой из диапазонов группы
//! - при равной глубине побеждает группа, идущая раньше во входном списке
//! - нет покрывающей группы → позиция «без группы» (loose)
//!
//! Глубина = число предков; цикл в parent_uid обрывается, а не зацикливается.
//! Все обходы дерева итеративные: глубина вложенности ограничена только памятью.

use crate::ranges::RowRange;
use crate::types::{Group, LineItem};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Разделитель пути раздела
pub const PATH_SEPARATOR: &str = " / ";

/// Позиция и её группа
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAssignment {
    pub item: LineItem,
    /// uid группы; `None`, если группы нет
    pub group_uid: Option<String>,
}

/// Результат распределения (в порядке позиций)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub entries: Vec<ItemAssignment>,
}

impl Assignment {
    /// Группа позиции по номеру строки
    pub fn group_of(&self, row_index: u32) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.item.row_index == row_index)
            .and_then(|e| e.group_uid.as_deref())
    }

    /// Позиции без группы
    pub fn loose(&self) -> Vec<&LineItem> {
        self.entries
            .iter()
            .filter(|e| e.group_uid.is_none())
            .map(|e| &e.item)
            .collect()
    }

    /// Позиции, отнесённые к группе
    pub fn items_of(&self, uid: &str) -> Vec<&LineItem> {
        self.entries
            .iter()
            .filter(|e| e.group_uid.as_deref() == Some(uid))
            .map(|e| &e.item)
            .collect()
    }
}

/// Узел дерева групп с позициями
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    pub uid: String,
    pub name: String,
    pub color: String,
    pub rows: Vec<RowRange>,
    pub items: Vec<LineItem>,
    pub children: Vec<GroupNode>,
}

// Снимаем поддерево со стека вручную, иначе глубокое дерево переполнит стек при drop
impl Drop for GroupNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Плоский раздел для отчёта
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// `"Раздел / Подраздел"`
    pub path: String,
    pub uid: String,
    pub color: String,
    pub items: Vec<LineItem>,
}

/// Распределитель позиций по лесу групп
#[derive(Debug)]
pub struct GroupTreeAssigner<'a> {
    groups: &'a [Group],
    depths: Vec<usize>,
    /// Индекс родителя для каждой группы (если родитель есть в наборе)
    parents: Vec<Option<usize>>,
}

impl<'a> GroupTreeAssigner<'a> {
    pub fn new(groups: &'a [Group]) -> Self {
        let index: HashMap<&str, usize> = groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g.uid.as_str(), i))
            .collect();

        let parents: Vec<Option<usize>> = groups
            .iter()
            .map(|g| {
                g.parent_uid
                    .as_deref()
                    .and_then(|p| index.get(p).copied())
            })
            .collect();

        let depths = compute_depths(&parents, groups);

        Self {
            groups,
            depths,
            parents,
        }
    }

    pub fn groups(&self) -> &'a [Group] {
        self.groups
    }

    /// Глубина группы (0 у корня)
    pub fn depth(&self, uid: &str) -> Option<usize> {
        self.groups
            .iter()
            .position(|g| g.uid == uid)
            .map(|i| self.depths[i])
    }

    /// Самая глубокая группа, покрывающая строку
    pub fn deepest_covering(&self, row_index: u32) -> Option<&'a Group> {
        let mut best: Option<usize> = None;
        for (i, group) in self.groups.iter().enumerate() {
            if !group.covers(row_index) {
                continue;
            }
            // строгое «>»: при равной глубине остаётся более ранняя группа
            if best.map_or(true, |b| self.depths[i] > self.depths[b]) {
                best = Some(i);
            }
        }
        best.map(|i| &self.groups[i])
    }

    /// Распределить позиции
    pub fn assign(&self, items: &[LineItem]) -> Assignment {
        let entries: Vec<ItemAssignment> = items
            .iter()
            .map(|item| ItemAssignment {
                item: item.clone(),
                group_uid: self
                    .deepest_covering(item.row_index)
                    .map(|g| g.uid.clone()),
            })
            .collect();

        let loose = entries.iter().filter(|e| e.group_uid.is_none()).count();
        log::info!(
            "Распределено позиций: {}, без группы: {}",
            entries.len() - loose,
            loose
        );

        Assignment { entries }
    }

    /// Дерево групп с прикреплёнными позициями
    ///
    /// Группы, недостижимые от корней (цикл в parent_uid), становятся корнями.
    pub fn build_tree(&self, assignment: &Assignment) -> Vec<GroupNode> {
        let order = self.preorder();
        let mut nodes: Vec<Option<GroupNode>> = self
            .groups
            .iter()
            .map(|group| {
                Some(GroupNode {
                    uid: group.uid.clone(),
                    name: group.name.clone(),
                    color: group.color.clone(),
                    rows: group.rows.clone(),
                    items: assignment.items_of(&group.uid).into_iter().cloned().collect(),
                    children: Vec::new(),
                })
            })
            .collect();

        // обратный прямой порядок: потомки готовы раньше предка
        let mut tree = Vec::new();
        for &(i, tree_parent) in order.iter().rev() {
            let Some(mut node) = nodes[i].take() else {
                continue;
            };
            node.children.reverse();
            match tree_parent {
                Some(p) => {
                    if let Some(parent) = nodes[p].as_mut() {
                        parent.children.push(node);
                    }
                }
                None => {
                    if self.parents[i].is_some() {
                        log::warn!(
                            "Группа '{}' вне дерева (цикл родителей), поднята в корень",
                            self.groups[i].name
                        );
                    }
                    tree.push(node);
                }
            }
        }
        tree.reverse();

        tree
    }

    /// Все группы в прямом порядке обхода с путями
    pub fn flatten_paths(&self) -> Vec<(String, &'a Group)> {
        let order = self.preorder();
        let mut paths: Vec<Option<String>> = vec![None; self.groups.len()];
        let mut result = Vec::with_capacity(order.len());

        for (i, tree_parent) in order {
            let parent_path = tree_parent.and_then(|p| paths[p].as_deref());
            let path = join_path(parent_path, &self.groups[i].name);
            paths[i] = Some(path.clone());
            result.push((path, &self.groups[i]));
        }

        result
    }

    /// Прямой порядок обхода леса: (индекс группы, родитель в дереве)
    ///
    /// Сначала обходятся настоящие корни, затем группы, оставшиеся
    /// непосещёнными из-за цикла; каждая группа встречается ровно один раз.
    fn preorder(&self) -> Vec<(usize, Option<usize>)> {
        let children = self.children_map();
        let mut visited = vec![false; self.groups.len()];
        let mut order = Vec::with_capacity(self.groups.len());

        let starts = self.root_indices().into_iter().chain(0..self.groups.len());
        for start in starts {
            if visited[start] {
                continue;
            }
            let mut stack: Vec<(usize, Option<usize>)> = vec![(start, None)];
            while let Some((i, tree_parent)) = stack.pop() {
                if visited[i] {
                    continue;
                }
                visited[i] = true;
                order.push((i, tree_parent));
                for &child in children[i].iter().rev() {
                    stack.push((child, Some(i)));
                }
            }
        }

        order
    }

    fn root_indices(&self) -> Vec<usize> {
        (0..self.groups.len())
            .filter(|&i| self.parents[i].is_none())
            .collect()
    }

    fn children_map(&self) -> Vec<Vec<usize>> {
        let mut children = vec![Vec::new(); self.groups.len()];
        for (i, parent) in self.parents.iter().enumerate() {
            if let Some(p) = parent {
                children[*p].push(i);
            }
        }
        children
    }
}

/// Глубины всех групп за один проход с запоминанием
///
/// Цепочка родителей поднимается до корня, до группы с уже известной
/// глубиной или до повтора (цикл). Повтор обрывает цепочку: верхняя
/// группа на пути получает глубину 0.
fn compute_depths(parents: &[Option<usize>], groups: &[Group]) -> Vec<usize> {
    let mut depths: Vec<Option<usize>> = vec![None; parents.len()];

    for start in 0..parents.len() {
        if depths[start].is_some() {
            continue;
        }

        let mut path = Vec::new();
        let mut on_path = HashSet::new();
        let mut current = start;
        let mut next = loop {
            if let Some(depth) = depths[current] {
                break depth + 1;
            }
            if !on_path.insert(current) {
                log::warn!("Цикл в цепочке родителей группы '{}'", groups[start].name);
                break 0;
            }
            path.push(current);
            match parents[current] {
                Some(parent) => current = parent,
                None => break 0,
            }
        };

        for &node in path.iter().rev() {
            depths[node] = Some(next);
            next += 1;
        }
    }

    depths.into_iter().map(|d| d.unwrap_or(0)).collect()
}

fn join_path(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(p) => format!("{}{}{}", p, PATH_SEPARATOR, name),
        None => name.to_string(),
    }
}

/// Распределить позиции по группам
pub fn assign(groups: &[Group], items: &[LineItem]) -> Assignment {
    GroupTreeAssigner::new(groups).assign(items)
}

/// Дерево → плоский список разделов (прямой обход)
///
/// `include_empty = false` оставляет только разделы с позициями.
pub fn flatten_sections(tree: &[GroupNode], include_empty: bool) -> Vec<Section> {
    let mut result = Vec::new();
    let mut stack: Vec<(&GroupNode, Option<String>)> =
        tree.iter().rev().map(|root| (root, None)).collect();

    while let Some((node, parent_path)) = stack.pop() {
        let path = join_path(parent_path.as_deref(), &node.name);
        for child in node.children.iter().rev() {
            stack.push((child, Some(path.clone())));
        }

        if include_empty || !node.items.is_empty() {
            result.push(Section {
                path,
                uid: node.uid.clone(),
                color: node.color.clone(),
                items: node.items.clone(),
            });
        }
    }

    result
}
