use crate::models::Recipe;
use crate::preferences::PreferenceSet;

pub const CUISINES: &[&str] = &[
    "Italian",
    "Asian",
    "Mexican",
    "Mediterranean",
    "Indian",
    "French",
    "Thai",
    "Middle Eastern",
];

/// Starch keywords tracked so consecutive recipes do not all lean on rice.
pub const STARCH_KEYWORDS: &[&str] = &[
    "rice", "pasta", "noodle", "potato", "quinoa", "bulgur", "couscous", "polenta", "bread",
    "barley", "lentil", "chickpea", "bean", "flour", "wheat", "oat", "corn",
];

/// How many recent cuisines are skipped when picking the next one.
const CUISINE_MEMORY: usize = 3;
/// How many already-used ingredients are offered for sharing.
const SHARED_INGREDIENT_HINT: usize = 8;

/// What earlier recipes in the same meal plan already used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarietyHint {
    pub used_ingredients: Vec<String>,
    pub used_starches: Vec<String>,
    pub used_cuisines: Vec<String>,
}

impl VarietyHint {
    /// Folds a finished recipe into the hint.
    pub fn record(&mut self, recipe: &Recipe) {
        if !recipe.cuisine_inspiration.is_empty() {
            self.used_cuisines.push(recipe.cuisine_inspiration.clone());
        }
        for ingredient in &recipe.ingredients {
            let item = ingredient.item.trim();
            if item.is_empty() {
                continue;
            }
            let lower = item.to_lowercase();
            if !self.used_ingredients.iter().any(|i| i.to_lowercase() == lower) {
                self.used_ingredients.push(item.to_string());
            }
            if STARCH_KEYWORDS.iter().any(|k| lower.contains(k))
                && !self.used_starches.iter().any(|s| s.to_lowercase() == lower)
            {
                self.used_starches.push(item.to_string());
            }
        }
    }

    /// Picks the cuisine for a slot.
    ///
    /// Walks the rotation starting at the slot's own position and takes the
    /// first cuisine not among the last few used, so the choice depends only
    /// on the slot index and what came before.
    pub fn next_cuisine(&self, recipe_number: u32) -> &'static str {
        let recent: Vec<String> = self
            .used_cuisines
            .iter()
            .rev()
            .take(CUISINE_MEMORY)
            .map(|c| c.to_lowercase())
            .collect();
        let start = (recipe_number.saturating_sub(1) as usize) % CUISINES.len();
        (0..CUISINES.len())
            .map(|offset| CUISINES[(start + offset) % CUISINES.len()])
            .find(|cuisine| !recent.contains(&cuisine.to_lowercase()))
            .unwrap_or(CUISINES[start])
    }
}

/// Builds the prompt for one recipe slot.
///
/// Must-use ingredients are hard requirements in every prompt and disliked
/// foods are hard exclusions; liked foods are soft. Disliked foods are kept
/// out of every positive list, including the shared-ingredient hint.
///
/// # Arguments
/// * `preferences` - The validated preference set for the run
/// * `recipe_number` - 1-based slot index
/// * `hint` - Ingredients, starches and cuisines used by earlier slots
pub fn build_recipe_prompt(preferences: &PreferenceSet, recipe_number: u32, hint: &VarietyHint) -> String {
    let serving_size = preferences.serving_size();
    let cuisine = hint.next_cuisine(recipe_number);
    let mut constraints: Vec<String> = Vec::new();

    if !preferences.must_use_ingredients().is_empty() {
        constraints.push(format!(
            "MUST INCLUDE all of these ingredients in the ingredient list: {}.",
            preferences.must_use_ingredients().join(", ")
        ));
    }
    if !preferences.disliked_foods().is_empty() {
        constraints.push(format!(
            "NEVER USE any of these foods, in any form: {}.",
            preferences.disliked_foods().join(", ")
        ));
    }
    if !preferences.liked_foods().is_empty() {
        constraints.push(format!(
            "Where it fits, favour: {}.",
            preferences.liked_foods().join(", ")
        ));
    }

    let shared: Vec<&str> = hint
        .used_ingredients
        .iter()
        .filter(|item| !preferences.is_disliked(item))
        .take(SHARED_INGREDIENT_HINT)
        .map(String::as_str)
        .collect();
    if !shared.is_empty() {
        constraints.push(format!(
            "To keep the shopping list short, reuse some of: {}.",
            shared.join(", ")
        ));
    }
    if !hint.used_starches.is_empty() {
        constraints.push(format!(
            "Use a different carbohydrate than: {}.",
            hint.used_starches.join(", ")
        ));
    }

    let constraint_text = if constraints.is_empty() {
        String::new()
    } else {
        format!("\n{}\n", constraints.join("\n"))
    };

    format!(
        r#"Create a {cuisine} dinner recipe for {serving_size} people. This is recipe {recipe_number} of {total}.{constraint_text}
Respond with ONLY a JSON object, no markdown and no commentary, in this format:
{{
    "name": "Creative Recipe Name",
    "prep_time": "15 minutes",
    "cook_time": "30 minutes",
    "servings": {serving_size},
    "cuisine_inspiration": "{cuisine}",
    "difficulty": "Medium",
    "ingredients": [
        {{"item": "protein", "quantity": "600", "unit": "g"}},
        {{"item": "vegetable", "quantity": "400", "unit": "g"}},
        {{"item": "oil", "quantity": "2", "unit": "tbsp"}}
    ],
    "instructions": [
        "First step",
        "Second step"
    ]
}}"#,
        total = preferences.recipe_count(),
    )
}
