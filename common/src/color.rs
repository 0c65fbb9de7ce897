//! Нормализация цвета заливки к виду `#RRGGBB`

/// `"#abc"` → `"#AABBCC"`, `"00ff00"` → `"#00FF00"`, прочее → `None`
pub fn normalize_color(raw: Option<&str>) -> Option<String> {
    let upper = raw?.trim().to_uppercase();
    let hex = upper.strip_prefix('#').unwrap_or(&upper);

    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match hex.len() {
        6 => Some(format!("#{}", hex)),
        3 => {
            let doubled: String = hex.chars().flat_map(|c| [c, c]).collect();
            Some(format!("#{}", doubled))
        }
        _ => None,
    }
}

/// Строго ли цвет в каноническом виде `#RRGGBB`
pub fn is_canonical_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}
