use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Ingredient {
    pub item: String,
    pub quantity: String,
    pub unit: String,
}

impl Ingredient {
    pub fn new(item: impl Into<String>, quantity: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            quantity: quantity.into(),
            unit: unit.into(),
        }
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [self.quantity.as_str(), self.unit.as_str(), self.item.as_str()]
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Recipe {
    pub name: String,
    pub prep_time: String,
    pub cook_time: String,
    pub servings: u32,
    pub cuisine_inspiration: String,
    pub difficulty: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub ingredient: String,
    pub quantity: String,
    pub unit: String,
    pub used_in_recipes: Vec<String>,
}

impl ShoppingListItem {
    /// Quantity and unit as one string, e.g. "6 cups".
    pub fn display_quantity(&self) -> String {
        match (self.quantity.is_empty(), self.unit.is_empty()) {
            (true, _) => String::new(),
            (false, true) => self.quantity.clone(),
            (false, false) => format!("{} {}", self.quantity, self.unit),
        }
    }
}

impl fmt::Display for ShoppingListItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quantity = self.display_quantity();
        if quantity.is_empty() {
            write!(f, "{}", self.ingredient)?;
        } else {
            write!(f, "{} ({})", self.ingredient, quantity)?;
        }
        write!(f, " - {}", self.used_in_recipes.join(", "))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MealPlan {
    pub id: Uuid,
    pub owner: String,
    pub name: String,
    pub serving_size: u32,
    pub recipes: Vec<Recipe>,
    pub shopping_list: Vec<ShoppingListItem>,
    #[serde(default)]
    pub liked_foods_snapshot: Vec<String>,
    #[serde(default)]
    pub disliked_foods_snapshot: Vec<String>,
    #[serde(default)]
    pub must_use_ingredients_snapshot: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub rating: Option<u8>,
    #[serde(default)]
    pub notes: String,
}

impl MealPlan {
    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    /// The only mutation allowed on a persisted plan.
    pub fn rate(&mut self, rating: u8, notes: Option<String>) {
        self.rating = Some(rating);
        if let Some(notes) = notes {
            self.notes = notes;
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    GeneratingRecipes,
    GeneratingImages,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::GeneratingRecipes => 1,
            TaskStatus::GeneratingImages => 2,
            TaskStatus::Completed | TaskStatus::Failed => 3,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::GeneratingRecipes => "generating_recipes",
            TaskStatus::GeneratingImages => "generating_images",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Progress reached once every recipe slot is done. The rest of the range
/// belongs to image generation and saving.
pub const RECIPE_PHASE_PROGRESS: u8 = 90;

/// State of one in-flight generation run.
///
/// Every mutator keeps `status` moving forward and `progress` non-decreasing,
/// and leaves a terminal task untouched.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GenerationTask {
    pub id: Uuid,
    pub owner: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub recipes_completed: u32,
    pub recipes_total: u32,
    pub current_step: String,
    pub meal_plan_id: Option<Uuid>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GenerationTask {
    pub fn new(owner: impl Into<String>, recipes_total: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            status: TaskStatus::Pending,
            progress: 0,
            recipes_completed: 0,
            recipes_total,
            current_step: "Waiting to start".to_string(),
            meal_plan_id: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, status: TaskStatus, progress: u8, step: String) -> bool {
        if self.status.is_terminal() || status.rank() < self.status.rank() {
            return false;
        }
        self.status = status;
        self.progress = self.progress.max(progress.min(100));
        self.current_step = step;
        self.updated_at = Utc::now();
        true
    }

    pub fn start_recipes(&mut self) -> bool {
        let step = format!("Generating recipe 1/{}...", self.recipes_total);
        self.transition(TaskStatus::GeneratingRecipes, 0, step)
    }

    /// Marks one more recipe slot as done.
    pub fn record_recipe(&mut self, recipe_name: &str) -> bool {
        if self.recipes_completed >= self.recipes_total {
            return false;
        }
        let completed = self.recipes_completed + 1;
        let progress = (completed * RECIPE_PHASE_PROGRESS as u32 / self.recipes_total.max(1)) as u8;
        let step = format!(
            "Finished recipe {}/{}: {}",
            completed, self.recipes_total, recipe_name
        );
        if self.transition(TaskStatus::GeneratingRecipes, progress, step) {
            self.recipes_completed = completed;
            true
        } else {
            false
        }
    }

    pub fn start_images(&mut self) -> bool {
        self.transition(
            TaskStatus::GeneratingImages,
            RECIPE_PHASE_PROGRESS,
            "Generating recipe images...".to_string(),
        )
    }

    pub fn complete(&mut self, meal_plan_id: Uuid) -> bool {
        if self.transition(
            TaskStatus::Completed,
            100,
            "Recipe generation completed!".to_string(),
        ) {
            self.meal_plan_id = Some(meal_plan_id);
            true
        } else {
            false
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if self.transition(TaskStatus::Failed, 0, format!("Error: {}", message)) {
            self.error_message = Some(message);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_progress_through_happy_path() {
        let mut task = GenerationTask::new("ana", 3);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.start_recipes());
        assert!(task.record_recipe("One"));
        assert_eq!(task.progress, 30);
        assert!(task.record_recipe("Two"));
        assert!(task.record_recipe("Three"));
        assert_eq!(task.progress, RECIPE_PHASE_PROGRESS);
        assert!(!task.record_recipe("Four"));
        assert_eq!(task.recipes_completed, 3);

        let plan_id = Uuid::new_v4();
        assert!(task.complete(plan_id));
        assert_eq!(task.progress, 100);
        assert_eq!(task.meal_plan_id, Some(plan_id));
    }

    #[test]
    fn test_terminal_task_is_frozen() {
        let mut task = GenerationTask::new("ana", 2);
        task.start_recipes();
        task.record_recipe("One");
        assert!(task.fail("model unavailable"));
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.progress, 45);
        assert_eq!(task.error_message.as_deref(), Some("model unavailable"));
        assert_eq!(task.current_step, "Error: model unavailable");

        assert!(!task.record_recipe("Two"));
        assert!(!task.complete(Uuid::new_v4()));
        assert!(!task.fail("again"));
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.meal_plan_id, None);
        assert_eq!(task.error_message.as_deref(), Some("model unavailable"));
    }

    #[test]
    fn test_status_never_moves_backwards() {
        let mut task = GenerationTask::new("ana", 1);
        task.start_recipes();
        task.record_recipe("Only");
        assert!(task.start_images());
        assert!(!task.start_recipes());
        assert_eq!(task.status, TaskStatus::GeneratingImages);
        assert_eq!(task.progress, RECIPE_PHASE_PROGRESS);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::GeneratingRecipes).unwrap();
        assert_eq!(json, "\"generating_recipes\"");
        assert_eq!(TaskStatus::GeneratingImages.to_string(), "generating_images");
    }

    #[test]
    fn test_shopping_item_display() {
        let item = ShoppingListItem {
            ingredient: "flour".to_string(),
            quantity: "6".to_string(),
            unit: "cups".to_string(),
            used_in_recipes: vec!["Bread".to_string(), "Cake".to_string()],
        };
        assert_eq!(item.display_quantity(), "6 cups");
        assert_eq!(item.to_string(), "flour (6 cups) - Bread, Cake");
        assert_eq!(Ingredient::new("salt", "", "").to_string(), "salt");
    }
}
