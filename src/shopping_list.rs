//! Consolidating every recipe's ingredients into one shopping list.
//!
//! Items are grouped by a normalized name. Inside a group, quantities are
//! summed only within the same unit; a group that mixes units, or carries
//! quantities that are not plain numbers, gets a textual list instead. No
//! unit conversion is attempted.

use fraction::Fraction;
use std::collections::HashMap;

use crate::ingredient_line::unit_key;
use crate::models::{Recipe, ShoppingListItem};
use crate::quantity::{format_quantity, parse_quantity};

/// Normalized grouping key for an ingredient name.
///
/// Lowercases, trims, collapses whitespace, drops trailing punctuation and
/// folds a plural last word to its singular ("Cherry Tomatoes" and "cherry
/// tomato" share a key).
pub fn item_key(item: &str) -> String {
    let lower = item.to_lowercase();
    let mut words: Vec<String> = lower
        .split_whitespace()
        .map(|w| w.to_string())
        .collect();
    if let Some(last) = words.last_mut() {
        let trimmed = last.trim_end_matches(|c: char| c.is_ascii_punctuation()).to_string();
        *last = singularize(&trimmed);
    }
    words.retain(|w| !w.is_empty());
    words.join(" ")
}

fn singularize(word: &str) -> String {
    if word.len() > 4 && word.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    for suffix in ["oes", "ches", "shes", "sses", "xes"] {
        if word.len() > suffix.len() + 1 && word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.len() > 3 && word.ends_with('s') && !(word.ends_with("ss") || word.ends_with("us") || word.ends_with("is")) {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// Quantities collected for one unit within one item group.
#[derive(Debug)]
struct UnitBucket {
    /// Unit spelling as first seen.
    unit: String,
    /// Sum of the numeric quantities.
    total: Option<Fraction>,
    /// Quantities that are not plain numbers, e.g. "1-2" or "a pinch".
    textual: Vec<String>,
    /// The single contribution verbatim, used when nothing was merged.
    first_quantity: String,
    contributions: usize,
}

#[derive(Debug)]
struct ItemGroup {
    display_name: String,
    used_in_recipes: Vec<String>,
    buckets: HashMap<String, UnitBucket>,
}

impl ItemGroup {
    fn add(&mut self, quantity: &str, unit: &str) {
        let quantity = quantity.trim();
        let bucket = self.buckets.entry(unit_key(unit)).or_insert_with(|| UnitBucket {
            unit: unit.trim().to_string(),
            total: None,
            textual: Vec::new(),
            first_quantity: quantity.to_string(),
            contributions: 0,
        });
        bucket.contributions += 1;
        if quantity.is_empty() {
            return;
        }
        match parse_quantity(quantity) {
            Some(value) => bucket.total = Some(bucket.total.map_or(value, |t| t + value)),
            None => bucket.textual.push(quantity.to_string()),
        }
    }

    fn into_item(self, ingredient: String) -> ShoppingListItem {
        let mut buckets: Vec<(String, UnitBucket)> = self.buckets.into_iter().collect();
        buckets.sort_by(|a, b| a.0.cmp(&b.0));

        let (quantity, unit) = match buckets.as_slice() {
            [(_, bucket)] if bucket.contributions == 1 => {
                (bucket.first_quantity.clone(), bucket.unit.clone())
            }
            [(_, bucket)] if bucket.textual.is_empty() => (
                bucket.total.map(format_quantity).unwrap_or_default(),
                bucket.unit.clone(),
            ),
            _ => (joined_quantities(&buckets), String::new()),
        };

        ShoppingListItem {
            ingredient,
            quantity,
            unit,
            used_in_recipes: self.used_in_recipes,
        }
    }
}

/// "2 cups, 500 g, a pinch": per-unit sums first, then the leftovers, each
/// sorted so recipe order does not change the text.
fn joined_quantities(buckets: &[(String, UnitBucket)]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for (_, bucket) in buckets {
        if let Some(total) = bucket.total {
            parts.push(with_unit(&format_quantity(total), &bucket.unit));
        }
        let mut textual: Vec<String> = bucket
            .textual
            .iter()
            .map(|quantity| with_unit(quantity, &bucket.unit))
            .collect();
        textual.sort();
        parts.extend(textual);
    }
    parts.join(", ")
}

fn with_unit(quantity: &str, unit: &str) -> String {
    if unit.is_empty() {
        quantity.to_string()
    } else {
        format!("{} {}", quantity, unit)
    }
}

/// Builds the shopping list for a set of recipes.
///
/// Output order is the order in which each item first appears across the
/// recipes; `used_in_recipes` lists each recipe once, in first-seen order.
pub fn generate_shopping_list(recipes: &[Recipe]) -> Vec<ShoppingListItem> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, ItemGroup> = HashMap::new();

    for (index, recipe) in recipes.iter().enumerate() {
        let recipe_name = if recipe.name.trim().is_empty() {
            format!("Recipe {}", index + 1)
        } else {
            recipe.name.clone()
        };

        for ingredient in &recipe.ingredients {
            // Names made only of punctuation still get a line of their own.
            let key = match item_key(&ingredient.item) {
                key if key.is_empty() => ingredient.item.trim().to_lowercase(),
                key => key,
            };
            if key.is_empty() {
                continue;
            }
            let group = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key.clone());
                ItemGroup {
                    display_name: ingredient.item.trim().to_string(),
                    used_in_recipes: Vec::new(),
                    buckets: HashMap::new(),
                }
            });
            if !group.used_in_recipes.contains(&recipe_name) {
                group.used_in_recipes.push(recipe_name.clone());
            }
            group.add(&ingredient.quantity, &ingredient.unit);
        }
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .map(|group| {
            let name = group.display_name.clone();
            group.into_item(name)
        })
        .collect()
}
