//! Нормализация единиц измерения
//!
//! - `м²`, `кв.м.`, `квадратный метр` → `м2`
//! - регистр, надстрочные ²/³, пробелы, точки и запятые не учитываются
//! - нераспознанная единица возвращается в сжатом виде, без ошибки

use regex::Regex;
use std::collections::BTreeSet;

lazy_static::lazy_static! {
    /// Таблица шаблонов (полное совпадение). Порядок важен: первое совпадение побеждает
    static ref UNIT_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("м2", full(r"м\^?2|квм|мкв|квадратн\w*метр\w*")),
        ("м3", full(r"м\^?3|кубм|мкуб|кубическ\w*метр\w*")),
        ("шт", full(r"шт|штука|штуки|штук")),
        ("пм", full(r"пм|погм|погонныйметр|погонныхметров")),
        ("компл", full(r"компл|комплект|комплекта|комплектов")),
        ("м", full(r"м|метр|метров|метра")),
        ("т", full(r"т|тонна|тонн|тонны")),
        ("кг", full(r"кг|килограмм|килограмма|килограммов")),
    ];
}

fn full(pattern: &str) -> Regex {
    Regex::new(&format!("^(?:{})$", pattern)).unwrap()
}

/// Сжатие: нижний регистр, ²/³ → 2/3, без пробелов, точек и запятых
fn compact(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| match c {
            '\u{00B2}' => '2',
            '\u{00B3}' => '3',
            other => other,
        })
        .filter(|c| !c.is_whitespace() && *c != '.' && *c != ',')
        .collect()
}

/// Привести единицу измерения к канонической форме
pub fn normalize_unit(raw: &str) -> String {
    let compact = compact(raw);
    if compact.is_empty() {
        return compact;
    }

    UNIT_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(&compact))
        .map(|(canonical, _)| canonical.to_string())
        .unwrap_or(compact)
}

/// Разбор строки разрешённых единиц (`"м2, шт, кв.м"`)
pub fn parse_allowed_units(csv: &str) -> BTreeSet<String> {
    normalize_units(csv.split(','))
}

/// Нормализация набора единиц; пустые отбрасываются
pub fn normalize_units<I, S>(units: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    units
        .into_iter()
        .map(|u| normalize_unit(u.as_ref()))
        .filter(|u| !u.is_empty())
        .collect()
}
