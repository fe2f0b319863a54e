use chrono::{Duration as ChronoDuration, Utc};
use foodpal::models::{GenerationTask, Ingredient, MealPlan, Recipe, TaskStatus};
use foodpal::shopping_list::generate_shopping_list;
use foodpal::store::{InMemoryStore, JsonFileStore, MealPlanStore, StoreError};
use tempfile::tempdir;
use uuid::Uuid;

fn sample_plan(owner: &str, days_ago: i64) -> MealPlan {
    let recipes = vec![Recipe {
        name: "Green Curry".to_string(),
        prep_time: "15 minutes".to_string(),
        cook_time: "20 minutes".to_string(),
        servings: 2,
        cuisine_inspiration: "Thai".to_string(),
        difficulty: "Medium".to_string(),
        ingredients: vec![
            Ingredient::new("coconut milk", "400", "ml"),
            Ingredient::new("green curry paste", "2", "tbsp"),
        ],
        instructions: vec!["Fry the paste.".to_string(), "Add the coconut milk.".to_string()],
        image_path: None,
    }];
    MealPlan {
        id: Uuid::new_v4(),
        owner: owner.to_string(),
        name: "Meal Plan - test".to_string(),
        serving_size: 2,
        shopping_list: generate_shopping_list(&recipes),
        recipes,
        liked_foods_snapshot: vec!["coconut".to_string()],
        disliked_foods_snapshot: Vec::new(),
        must_use_ingredients_snapshot: Vec::new(),
        created_at: Utc::now() - ChronoDuration::days(days_ago),
        rating: None,
        notes: String::new(),
    }
}

#[tokio::test]
async fn test_json_store_round_trips_plans_and_tasks() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());

    let plan = sample_plan("ana", 0);
    store.save_meal_plan(&plan).await.unwrap();
    assert!(dir.path().join("meal_plans").join(format!("{}.json", plan.id)).exists());
    assert_eq!(store.get_meal_plan(plan.id).await.unwrap(), Some(plan.clone()));

    let mut task = GenerationTask::new("ana", 1);
    store.save_task(&task).await.unwrap();
    task.start_recipes();
    task.record_recipe("Green Curry");
    task.complete(plan.id);
    store.save_task(&task).await.unwrap();

    let loaded = store.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, TaskStatus::Completed);
    assert_eq!(loaded.meal_plan_id, Some(plan.id));
    assert_eq!(loaded, task);
}

#[tokio::test]
async fn test_json_store_missing_records_are_none() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("never-created"));
    assert!(store.get_meal_plan(Uuid::new_v4()).await.unwrap().is_none());
    assert!(store.get_task(Uuid::new_v4()).await.unwrap().is_none());
    assert!(store.list_meal_plans("ana").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_json_store_lists_owner_plans_newest_first() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());
    let old = sample_plan("ana", 3);
    let new = sample_plan("ana", 0);
    let other = sample_plan("ben", 1);
    for plan in [&old, &other, &new] {
        store.save_meal_plan(plan).await.unwrap();
    }

    let ids: Vec<Uuid> = store
        .list_meal_plans("ana")
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![new.id, old.id]);
}

#[tokio::test]
async fn test_rating_is_validated_and_persisted() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());
    let plan = sample_plan("ana", 0);
    store.save_meal_plan(&plan).await.unwrap();

    for rating in [0, 6] {
        let result = store.rate_meal_plan(plan.id, rating, None).await;
        assert!(matches!(result, Err(StoreError::InvalidRating(r)) if r == rating));
    }

    let rated = store
        .rate_meal_plan(plan.id, 5, Some("Loved it".to_string()))
        .await
        .unwrap();
    assert_eq!(rated.rating, Some(5));

    let reloaded = store.get_meal_plan(plan.id).await.unwrap().unwrap();
    assert_eq!(reloaded.rating, Some(5));
    assert_eq!(reloaded.notes, "Loved it");
    assert_eq!(reloaded.recipes, plan.recipes);
    assert_eq!(reloaded.shopping_list, plan.shopping_list);

    let missing = store.rate_meal_plan(Uuid::new_v4(), 3, None).await;
    assert!(matches!(missing, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
async fn test_in_memory_store_keeps_task_history() {
    let store = InMemoryStore::new();
    let mut task = GenerationTask::new("ana", 2);
    store.save_task(&task).await.unwrap();
    task.start_recipes();
    store.save_task(&task).await.unwrap();
    task.record_recipe("One");
    store.save_task(&task).await.unwrap();

    let history = store.task_history().await;
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].status, TaskStatus::Pending);
    assert_eq!(history[2].progress, 45);
    assert_eq!(store.get_task(task.id).await.unwrap().unwrap().recipes_completed, 1);
}

#[tokio::test]
async fn test_in_memory_rating() {
    let store = InMemoryStore::new();
    let plan = sample_plan("ana", 0);
    store.save_meal_plan(&plan).await.unwrap();

    assert!(matches!(
        store.rate_meal_plan(plan.id, 9, None).await,
        Err(StoreError::InvalidRating(9))
    ));
    store.rate_meal_plan(plan.id, 4, None).await.unwrap();
    let plans = store.list_meal_plans("ana").await.unwrap();
    assert_eq!(plans[0].rating, Some(4));
    assert_eq!(plans[0].notes, "");
}
