//! Splitting free-text ingredient lines into quantity, unit and item.
//!
//! Quantities are recognised only at the start of a line; units only from a
//! closed table. Anything that does not fit is kept verbatim as the item, so
//! an odd line never loses the ingredient.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::Ingredient;
use crate::quantity::normalize_vulgar_fractions;

/// Canonical unit followed by every spelling that maps to it.
const UNIT_TABLE: &[(&str, &[&str])] = &[
    ("cup", &["cup", "cups", "c"]),
    ("tbsp", &["tbsp", "tbsps", "tbs", "tbl", "tablespoon", "tablespoons"]),
    ("tsp", &["tsp", "tsps", "teaspoon", "teaspoons"]),
    ("g", &["g", "gr", "gram", "grams", "gramme", "grammes"]),
    ("kg", &["kg", "kgs", "kilogram", "kilograms"]),
    ("mg", &["mg", "milligram", "milligrams"]),
    ("ml", &["ml", "milliliter", "milliliters", "millilitre", "millilitres"]),
    ("l", &["l", "liter", "liters", "litre", "litres"]),
    ("fl oz", &["fl oz", "fl. oz", "fluid ounce", "fluid ounces"]),
    ("oz", &["oz", "ounce", "ounces"]),
    ("lb", &["lb", "lbs", "pound", "pounds"]),
    ("qt", &["qt", "quart", "quarts"]),
    ("pt", &["pt", "pint", "pints"]),
    ("pinch", &["pinch", "pinches"]),
    ("dash", &["dash", "dashes"]),
    ("clove", &["clove", "cloves"]),
    ("can", &["can", "cans", "tin", "tins"]),
    ("jar", &["jar", "jars"]),
    ("package", &["package", "packages", "pack", "packs", "pkg"]),
    ("slice", &["slice", "slices"]),
    ("stick", &["stick", "sticks"]),
    ("bunch", &["bunch", "bunches"]),
    ("handful", &["handful", "handfuls"]),
    ("sprig", &["sprig", "sprigs"]),
    ("stalk", &["stalk", "stalks"]),
    ("head", &["head", "heads"]),
    ("piece", &["piece", "pieces", "pc", "pcs"]),
];

// Fractions come first so "1/2" is not read as "1" followed by "/2".
static LEADING_QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<qty>(?:\d+/\d+|\d+(?:[.,]\d+)?(?:\s+\d+/\d+)?)(?:\s*(?:-|–|to)\s*(?:\d+/\d+|\d+(?:[.,]\d+)?))?)(?P<rest>.*)$",
    )
    .expect("leading quantity pattern is valid")
});

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:[-*•·]+\s*|\d+[.)]\s+|step\s+\d+\s*[:.)-]?\s*)")
        .expect("list marker pattern is valid")
});

/// Maps any known spelling of a unit to its canonical abbreviation.
pub fn canonical_unit(unit: &str) -> Option<&'static str> {
    let normalized = unit.trim().trim_end_matches('.').to_lowercase();
    UNIT_TABLE
        .iter()
        .find(|(_, aliases)| aliases.contains(&normalized.as_str()))
        .map(|(canonical, _)| *canonical)
}

/// Key used to decide whether two units are the same.
pub fn unit_key(unit: &str) -> String {
    match canonical_unit(unit) {
        Some(canonical) => canonical.to_string(),
        None => unit.trim().to_lowercase(),
    }
}

/// Removes a leading bullet or step number ("- ", "2)", "Step 3:").
pub fn strip_list_marker(line: &str) -> &str {
    match LIST_MARKER.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
    .trim()
}

/// True when the line starts with a bullet marker.
pub fn has_bullet(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with('-') || trimmed.starts_with('*') || trimmed.starts_with('•')
}

/// Decomposes one ingredient line.
///
/// "2 cups flour" gives `("2", "cups", "flour")`, "500g chicken" gives
/// `("500", "g", "chicken")`, "3 large eggs" gives `("3", "", "large eggs")`.
/// A line without a leading quantity ("Salt to taste") is returned whole as
/// the item.
pub fn parse_ingredient_line(line: &str) -> Ingredient {
    let cleaned = normalize_vulgar_fractions(strip_list_marker(line));
    let cleaned = cleaned.trim();

    let Some(caps) = LEADING_QUANTITY.captures(cleaned) else {
        return Ingredient::new(cleaned, "", "");
    };
    let quantity = caps["qty"].trim().to_string();
    let rest = caps["rest"].trim_start();

    // "12-inch tortillas" and similar: a digit glued to a word that is not a unit.
    if rest.starts_with('-') {
        return Ingredient::new(cleaned, "", "");
    }

    let (unit, item) = split_unit(rest);
    let item = item
        .trim()
        .strip_prefix("of ")
        .unwrap_or(item.trim())
        .trim()
        .trim_start_matches(',')
        .trim();

    if item.is_empty() {
        return Ingredient::new(cleaned, "", "");
    }
    Ingredient::new(item, quantity, unit)
}

fn split_unit(rest: &str) -> (String, &str) {
    let lower = rest.to_lowercase();
    for two_word in ["fl oz", "fl. oz", "fluid ounces", "fluid ounce"] {
        if let Some(after) = lower.strip_prefix(two_word) {
            if after.is_empty() || after.starts_with(|c: char| c.is_whitespace() || c == '.') {
                let cut = two_word.len();
                return (rest[..cut].to_string(), rest[cut..].trim_start_matches('.'));
            }
        }
    }

    let token_len = rest
        .char_indices()
        .find(|(_, c)| !(c.is_alphabetic() || *c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    if token_len == 0 {
        return (String::new(), rest);
    }
    let token = &rest[..token_len];
    let after = &rest[token_len..];
    let boundary_ok = after.is_empty() || after.starts_with(|c: char| c.is_whitespace() || c == ',');
    if boundary_ok && canonical_unit(token).is_some() {
        (token.trim_end_matches('.').to_string(), after)
    } else {
        (String::new(), rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_unit_item() {
        assert_eq!(parse_ingredient_line("2 cups flour"), Ingredient::new("flour", "2", "cups"));
    }

    #[test]
    fn test_glued_metric_unit() {
        assert_eq!(
            parse_ingredient_line("500g chicken thighs"),
            Ingredient::new("chicken thighs", "500", "g")
        );
    }

    #[test]
    fn test_fraction_and_unicode_fraction() {
        assert_eq!(parse_ingredient_line("1/2 tsp salt"), Ingredient::new("salt", "1/2", "tsp"));
        assert_eq!(
            parse_ingredient_line("1½ tbsp. olive oil"),
            Ingredient::new("olive oil", "1 1/2", "tbsp")
        );
    }

    #[test]
    fn test_range_and_of() {
        assert_eq!(
            parse_ingredient_line("- 1-2 cans of chopped tomatoes"),
            Ingredient::new("chopped tomatoes", "1-2", "cans")
        );
    }

    #[test]
    fn test_count_without_unit() {
        assert_eq!(parse_ingredient_line("3 large eggs"), Ingredient::new("large eggs", "3", ""));
    }

    #[test]
    fn test_fluid_ounces() {
        assert_eq!(
            parse_ingredient_line("8 fl oz coconut milk"),
            Ingredient::new("coconut milk", "8", "fl oz")
        );
    }

    #[test]
    fn test_unrecognised_line_is_kept_whole() {
        assert_eq!(
            parse_ingredient_line("Salt and pepper to taste"),
            Ingredient::new("Salt and pepper to taste", "", "")
        );
        assert_eq!(parse_ingredient_line("12-inch tortillas"), Ingredient::new("12-inch tortillas", "", ""));
    }

    #[test]
    fn test_unit_keys_fold_plurals() {
        assert_eq!(unit_key("Cups"), "cup");
        assert_eq!(unit_key("tablespoons"), "tbsp");
        assert_eq!(unit_key("handful"), "handful");
        assert_eq!(unit_key("bag"), "bag");
    }
}
