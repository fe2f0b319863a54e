use serde::Serialize;
use thiserror::Error;

pub const MAX_RECIPE_COUNT: u32 = 10;
pub const MAX_SERVING_SIZE: u32 = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreferenceError {
    #[error("recipe count must be between 1 and 10, got {0}")]
    RecipeCount(u32),
    #[error("serving size must be between 1 and 20, got {0}")]
    ServingSize(u32),
    #[error("'{0}' is listed both as a must-use ingredient and as a disliked food")]
    MustUseDisliked(String),
}

/// Food preferences for one generation run.
///
/// Only built through [`PreferenceSet::new`], so every instance has passed
/// validation.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct PreferenceSet {
    liked_foods: Vec<String>,
    disliked_foods: Vec<String>,
    must_use_ingredients: Vec<String>,
    recipe_count: u32,
    serving_size: u32,
}

impl PreferenceSet {
    /// Validates and normalizes a preference set.
    ///
    /// Entries are trimmed, empty entries dropped and duplicates removed
    /// case-insensitively (first spelling wins). A liked food that mentions
    /// a disliked one ("mushroom risotto" for "mushroom") is dropped; a
    /// must-use ingredient that does is rejected.
    pub fn new(
        liked_foods: Vec<String>,
        disliked_foods: Vec<String>,
        must_use_ingredients: Vec<String>,
        recipe_count: u32,
        serving_size: u32,
    ) -> Result<Self, PreferenceError> {
        if recipe_count == 0 || recipe_count > MAX_RECIPE_COUNT {
            return Err(PreferenceError::RecipeCount(recipe_count));
        }
        if serving_size == 0 || serving_size > MAX_SERVING_SIZE {
            return Err(PreferenceError::ServingSize(serving_size));
        }

        let disliked_foods = dedup_entries(disliked_foods);
        let must_use_ingredients = dedup_entries(must_use_ingredients);
        if let Some(conflict) = must_use_ingredients
            .iter()
            .find(|item| mentions_any(&disliked_foods, item))
        {
            return Err(PreferenceError::MustUseDisliked(conflict.clone()));
        }
        let liked_foods = dedup_entries(liked_foods)
            .into_iter()
            .filter(|item| !mentions_any(&disliked_foods, item))
            .collect();

        Ok(Self {
            liked_foods,
            disliked_foods,
            must_use_ingredients,
            recipe_count,
            serving_size,
        })
    }

    pub fn liked_foods(&self) -> &[String] {
        &self.liked_foods
    }

    pub fn disliked_foods(&self) -> &[String] {
        &self.disliked_foods
    }

    pub fn must_use_ingredients(&self) -> &[String] {
        &self.must_use_ingredients
    }

    pub fn recipe_count(&self) -> u32 {
        self.recipe_count
    }

    pub fn serving_size(&self) -> u32 {
        self.serving_size
    }

    /// True when `item` mentions any disliked food, e.g. "button mushrooms"
    /// for a dislike of "mushroom".
    pub fn is_disliked(&self, item: &str) -> bool {
        mentions_any(&self.disliked_foods, item)
    }
}

/// Who asked for a run, and with what preferences.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub requester: String,
    pub preferences: PreferenceSet,
    pub generate_images: bool,
}

impl RequestContext {
    pub fn new(requester: impl Into<String>, preferences: PreferenceSet) -> Self {
        Self {
            requester: requester.into(),
            preferences,
            generate_images: false,
        }
    }

    pub fn with_images(mut self, generate_images: bool) -> Self {
        self.generate_images = generate_images;
        self
    }
}

fn dedup_entries(entries: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let trimmed = entry.trim();
        if trimmed.is_empty() || contains_ignore_case(&result, trimmed) {
            continue;
        }
        result.push(trimmed.to_string());
    }
    result
}

fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

fn contains_ignore_case(list: &[String], needle: &str) -> bool {
    let needle = fold_case(needle);
    list.iter().any(|entry| fold_case(entry) == needle)
}

/// True when `item` contains any entry of `foods`, ignoring case.
fn mentions_any(foods: &[String], item: &str) -> bool {
    let item = fold_case(item);
    foods.iter().any(|food| item.contains(&fold_case(food)))
}
