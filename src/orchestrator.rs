//! Drives one meal-plan run from preferences to a persisted plan.
//!
//! Slots are generated one after another so each prompt can see what the
//! earlier recipes used. The task record is saved after every step; a run
//! that fails saves the failed task and never a plan.

use chrono::Utc;
use clap::ValueEnum;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::images::{DisabledImageGenerator, ImageGenerator};
use crate::model_invoker::{invoke_with_retry, RetryExhausted, RetryPolicy, TextGenerator};
use crate::models::{GenerationTask, MealPlan, Recipe};
use crate::preferences::{PreferenceSet, RequestContext};
use crate::prompt_builder::{build_recipe_prompt, VarietyHint};
use crate::recipe_parser::{fallback_recipe, parse_recipe_response, placeholder_ingredients};
use crate::shopping_list::generate_shopping_list;
use crate::store::{MealPlanStore, StoreError};

/// What happens when a slot exhausts its retries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SlotFailurePolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Put a simple placeholder recipe in the slot. The run still fails if
    /// no slot succeeded.
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub retry: RetryPolicy,
    /// Limit for a single model call.
    pub request_timeout: Duration,
    /// Limit for the whole run, if any.
    pub run_deadline: Option<Duration>,
    pub slot_failure: SlotFailurePolicy,
    pub generate_images: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(60),
            run_deadline: None,
            slot_failure: SlotFailurePolicy::Abort,
            generate_images: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("recipe {recipe_number} could not be generated: {source}")]
    Slot {
        recipe_number: u32,
        #[source]
        source: RetryExhausted,
    },
    #[error("none of the {0} recipes could be generated")]
    AllSlotsFailed(u32),
    #[error("meal plan generation did not finish within {0:?}")]
    DeadlineExceeded(Duration),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

pub struct RecipeGenerationOrchestrator {
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn MealPlanStore>,
    images: Arc<dyn ImageGenerator>,
    settings: GenerationSettings,
}

impl RecipeGenerationOrchestrator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn MealPlanStore>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            generator,
            store,
            images: Arc::new(DisabledImageGenerator),
            settings,
        }
    }

    pub fn with_image_generator(mut self, images: Arc<dyn ImageGenerator>) -> Self {
        self.images = images;
        self
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Creates a task for the request and runs it to the end.
    pub async fn run(&self, ctx: &RequestContext) -> Result<MealPlan, GenerationError> {
        let mut task = GenerationTask::new(ctx.requester.clone(), ctx.preferences.recipe_count());
        self.store.save_task(&task).await?;
        self.run_task(&mut task, ctx).await
    }

    /// Saves a pending task and runs it in the background.
    ///
    /// The returned id can be polled through the store while the run is in
    /// flight.
    pub async fn spawn(
        self: Arc<Self>,
        ctx: RequestContext,
    ) -> Result<(Uuid, JoinHandle<Result<MealPlan, GenerationError>>), GenerationError> {
        let mut task = GenerationTask::new(ctx.requester.clone(), ctx.preferences.recipe_count());
        self.store.save_task(&task).await?;
        let task_id = task.id;
        let handle = tokio::spawn(async move { self.run_task(&mut task, &ctx).await });
        Ok((task_id, handle))
    }

    /// Runs an already-saved pending task.
    pub async fn run_task(
        &self,
        task: &mut GenerationTask,
        ctx: &RequestContext,
    ) -> Result<MealPlan, GenerationError> {
        info!(
            task_id = %task.id,
            owner = %ctx.requester,
            recipes = ctx.preferences.recipe_count(),
            servings = ctx.preferences.serving_size(),
            "starting meal plan generation"
        );

        // The deadline stops at the commit.
        let assembled = match self.settings.run_deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.assemble_plan(task, ctx))
                .await
                .unwrap_or(Err(GenerationError::DeadlineExceeded(deadline))),
            None => self.assemble_plan(task, ctx).await,
        };
        let outcome = match assembled {
            Ok(plan) => self.commit(task, plan).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(plan) => {
                info!(task_id = %task.id, meal_plan_id = %plan.id, "meal plan generation completed");
                Ok(plan)
            }
            Err(e) => {
                error!(task_id = %task.id, error = %e, "meal plan generation failed");
                task.fail(e.to_string());
                if let Err(store_error) = self.store.save_task(task).await {
                    warn!(task_id = %task.id, error = %store_error, "could not save failed task");
                }
                Err(e)
            }
        }
    }

    /// Generates every slot and builds the plan without persisting it.
    async fn assemble_plan(
        &self,
        task: &mut GenerationTask,
        ctx: &RequestContext,
    ) -> Result<MealPlan, GenerationError> {
        let preferences = &ctx.preferences;
        let recipe_total = preferences.recipe_count();

        task.start_recipes();
        self.store.save_task(task).await?;

        let mut hint = VarietyHint::default();
        let mut recipes: Vec<Recipe> = Vec::with_capacity(recipe_total as usize);
        let mut failed_slots = 0;

        for recipe_number in 1..=recipe_total {
            let recipe = match self.generate_recipe(preferences, recipe_number, &hint).await {
                Ok(recipe) => {
                    hint.record(&recipe);
                    recipe
                }
                Err(exhausted) => match self.settings.slot_failure {
                    SlotFailurePolicy::Abort => {
                        return Err(GenerationError::Slot {
                            recipe_number,
                            source: exhausted,
                        })
                    }
                    SlotFailurePolicy::Placeholder => {
                        warn!(
                            task_id = %task.id,
                            recipe_number,
                            error = %exhausted,
                            "using a placeholder recipe"
                        );
                        failed_slots += 1;
                        fallback_recipe(
                            recipe_number,
                            preferences.serving_size(),
                            preferences.must_use_ingredients(),
                        )
                    }
                },
            };

            task.record_recipe(&recipe.name);
            self.store.save_task(task).await?;
            recipes.push(recipe);
        }

        if failed_slots == recipe_total {
            return Err(GenerationError::AllSlotsFailed(recipe_total));
        }

        if ctx.generate_images && self.settings.generate_images {
            task.start_images();
            self.store.save_task(task).await?;
            self.attach_images(&mut recipes).await;
        }

        let now = Utc::now();
        let plan = MealPlan {
            id: Uuid::new_v4(),
            owner: ctx.requester.clone(),
            name: format!("Meal Plan - {}", now.format("%B %d, %Y")),
            serving_size: preferences.serving_size(),
            shopping_list: generate_shopping_list(&recipes),
            recipes,
            liked_foods_snapshot: preferences.liked_foods().to_vec(),
            disliked_foods_snapshot: preferences.disliked_foods().to_vec(),
            must_use_ingredients_snapshot: preferences.must_use_ingredients().to_vec(),
            created_at: now,
            rating: None,
            notes: String::new(),
        };
        Ok(plan)
    }

    /// Persists the plan, then the completed task. `task` only turns
    /// terminal once that save succeeded, so a failed save still reaches
    /// the failure path.
    async fn commit(&self, task: &mut GenerationTask, plan: MealPlan) -> Result<MealPlan, GenerationError> {
        self.store.save_meal_plan(&plan).await?;
        let mut completed = task.clone();
        completed.complete(plan.id);
        self.store.save_task(&completed).await?;
        *task = completed;
        Ok(plan)
    }

    async fn generate_recipe(
        &self,
        preferences: &PreferenceSet,
        recipe_number: u32,
        hint: &VarietyHint,
    ) -> Result<Recipe, RetryExhausted> {
        let prompt = build_recipe_prompt(preferences, recipe_number, hint);
        let reply = invoke_with_retry(
            self.generator.as_ref(),
            &prompt,
            self.settings.request_timeout,
            &self.settings.retry,
        )
        .await?;
        debug!(recipe_number, reply = %reply, "raw model reply");

        let parsed = parse_recipe_response(&reply, recipe_number, preferences.serving_size());
        let mut recipe = parsed.into_recipe();
        let removed = drop_disliked_ingredients(&mut recipe, preferences);
        if removed > 0 {
            warn!(recipe_number, removed, recipe = %recipe.name, "removed disliked ingredients from recipe");
        }
        Ok(recipe)
    }

    async fn attach_images(&self, recipes: &mut [Recipe]) {
        for recipe in recipes.iter_mut() {
            match self.images.generate_image(recipe).await {
                Ok(path) => recipe.image_path = path,
                Err(e) => warn!(recipe = %recipe.name, error = %e, "image generation failed"),
            }
        }
    }
}

/// Removes ingredients naming a disliked food. A recipe left with nothing
/// gets the placeholder ingredient. Returns how many were removed.
pub fn drop_disliked_ingredients(recipe: &mut Recipe, preferences: &PreferenceSet) -> usize {
    let before = recipe.ingredients.len();
    recipe
        .ingredients
        .retain(|ingredient| !preferences.is_disliked(&ingredient.item));
    let removed = before - recipe.ingredients.len();
    if recipe.ingredients.is_empty() {
        recipe.ingredients = placeholder_ingredients();
    }
    removed
}
