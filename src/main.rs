use anyhow::{bail, Context, Result};
use foodpal::cli::{parse_args, Command};
use foodpal::config::Settings;
use foodpal::logging::init_logging;
use foodpal::models::{GenerationTask, MealPlan};
use foodpal::orchestrator::RecipeGenerationOrchestrator;
use foodpal::preferences::{PreferenceSet, RequestContext};
use foodpal::recipe_parser::parse_recipe_response;
use foodpal::store::MealPlanStore;
use std::sync::Arc;
use tokio::fs;
use tracing::info;

fn print_meal_plan(plan: &MealPlan) {
    println!("{} ({})", plan.name, plan.id);
    println!("Servings: {}", plan.serving_size);
    if let Some(rating) = plan.rating {
        println!("Rating: {}/5 {}", rating, plan.notes);
    }
    for (idx, recipe) in plan.recipes.iter().enumerate() {
        println!("\n{}. {} [{}, {}]", idx + 1, recipe.name, recipe.cuisine_inspiration, recipe.difficulty);
        println!("   Prep {} | Cook {} | Serves {}", recipe.prep_time, recipe.cook_time, recipe.servings);
        for ingredient in &recipe.ingredients {
            println!("   - {}", ingredient);
        }
        for (step, instruction) in recipe.instructions.iter().enumerate() {
            println!("   {}. {}", step + 1, instruction);
        }
    }
    println!("\nShopping list:");
    for item in &plan.shopping_list {
        println!("  - {}", item);
    }
}

fn print_task(task: &GenerationTask) {
    println!("Task {} [{}] {}%", task.id, task.status, task.progress);
    println!("  {}", task.current_step);
    println!("  Recipes: {}/{}", task.recipes_completed, task.recipes_total);
    if let Some(plan_id) = task.meal_plan_id {
        println!("  Meal plan: {}", plan_id);
    }
    if let Some(message) = &task.error_message {
        println!("  Error: {}", message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli_args = parse_args();
    init_logging(&cli_args.log_level, cli_args.log_json)?;

    let settings = Settings::from_args(&cli_args.model, cli_args.data_dir.clone());
    let store = Arc::new(settings.store());

    match cli_args.command {
        Command::Generate {
            user,
            liked,
            disliked,
            must_use,
            count,
            servings,
        } => {
            let preferences = PreferenceSet::new(liked, disliked, must_use, count, servings)
                .context("Invalid meal plan preferences")?;
            let ctx = RequestContext::new(user, preferences).with_images(settings.generate_images);

            let generator = Arc::new(settings.text_generator());
            info!(model = %generator.model(), "using model");
            let orchestrator =
                RecipeGenerationOrchestrator::new(generator, store.clone(), settings.generation_settings());

            let plan = orchestrator
                .run(&ctx)
                .await
                .context("Meal plan generation failed")?;
            print_meal_plan(&plan);
        }
        Command::History { user } => {
            let plans = store
                .list_meal_plans(&user)
                .await
                .with_context(|| format!("Failed to list meal plans for '{}'", user))?;
            if plans.is_empty() {
                println!("No meal plans for {}.", user);
            }
            for plan in plans {
                let rating = plan.rating.map(|r| format!("{}/5", r)).unwrap_or_else(|| "unrated".to_string());
                println!("{}  {}  {} recipes  {}", plan.id, plan.name, plan.recipe_count(), rating);
            }
        }
        Command::Show { plan_id } => {
            let Some(plan) = store
                .get_meal_plan(plan_id)
                .await
                .with_context(|| format!("Failed to load meal plan {}", plan_id))?
            else {
                bail!("Meal plan {} not found", plan_id);
            };
            print_meal_plan(&plan);
        }
        Command::Rate { plan_id, rating, notes } => {
            let plan = store
                .rate_meal_plan(plan_id, rating, notes)
                .await
                .with_context(|| format!("Failed to rate meal plan {}", plan_id))?;
            println!("Rated '{}' {}/5.", plan.name, rating);
        }
        Command::Task { task_id } => {
            let Some(task) = store
                .get_task(task_id)
                .await
                .with_context(|| format!("Failed to load task {}", task_id))?
            else {
                bail!("Task {} not found", task_id);
            };
            print_task(&task);
        }
        Command::Parse { file, servings } => {
            let reply = fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read model reply '{}'", file.display()))?;
            let parsed = parse_recipe_response(&reply, 1, servings);
            let strategy = parsed.strategy;
            let fallback_fields = parsed.fallback_fields();
            let recipe = parsed.into_recipe();
            println!("{}", serde_json::to_string_pretty(&recipe)?);
            println!("\nStrategy: {:?}", strategy);
            if fallback_fields.is_empty() {
                println!("All fields parsed.");
            } else {
                println!("Defaulted fields: {}", fallback_fields.join(", "));
            }
        }
    }

    Ok(())
}
