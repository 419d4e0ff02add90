//! Waterbody name normalization and id minting.
//!
//! Feed names and registry names are compared after cleaning:
//! "Back River, Tidal Portion" and "BACK RIVER" both clean to "back river".

/// Trim, drop a trailing comma-qualifier clause, collapse whitespace, lower-case.
pub fn clean_name(raw: &str) -> String {
    let head = match raw.find(',') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    head.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Case-insensitive substring containment in either direction, on cleaned names.
/// Empty names never match.
pub fn names_match(a: &str, b: &str) -> bool {
    let a = clean_name(a);
    let b = clean_name(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// `("MD", "Back River, Tidal")` → `"md_back_river"`.
pub fn mint_waterbody_id(state: &str, name: &str) -> String {
    let state: String = state
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let slug = clean_name(name)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    format!("{state}_{slug}")
}
