use foodpal::models::{Ingredient, Recipe, ShoppingListItem};
use foodpal::shopping_list::generate_shopping_list;
use rand::seq::SliceRandom;
use rand::thread_rng;

fn recipe(name: &str, ingredients: &[(&str, &str, &str)]) -> Recipe {
    Recipe {
        name: name.to_string(),
        prep_time: "10 minutes".to_string(),
        cook_time: "30 minutes".to_string(),
        servings: 4,
        cuisine_inspiration: "International".to_string(),
        difficulty: "Medium".to_string(),
        ingredients: ingredients
            .iter()
            .map(|(quantity, unit, item)| Ingredient::new(*item, *quantity, *unit))
            .collect(),
        instructions: vec!["Cook it.".to_string()],
        image_path: None,
    }
}

fn find<'a>(list: &'a [ShoppingListItem], name: &str) -> &'a ShoppingListItem {
    list.iter()
        .find(|item| item.ingredient.eq_ignore_ascii_case(name))
        .unwrap_or_else(|| panic!("'{}' missing from {:?}", name, list))
}

#[test]
fn test_same_unit_quantities_are_summed() {
    let recipes = vec![
        recipe("Pancakes", &[("2", "cups", "flour")]),
        recipe("Flatbread", &[("2", "cups", "flour")]),
        recipe("Dumplings", &[("2", "cups", "flour")]),
    ];
    let list = generate_shopping_list(&recipes);

    assert_eq!(list.len(), 1);
    let flour = &list[0];
    assert_eq!(flour.ingredient, "flour");
    assert_eq!(flour.quantity, "6");
    assert_eq!(flour.unit, "cups");
    assert_eq!(flour.display_quantity(), "6 cups");
    assert_eq!(flour.used_in_recipes, vec!["Pancakes", "Flatbread", "Dumplings"]);
}

#[test]
fn test_unit_spellings_and_plurals_share_an_entry() {
    let recipes = vec![
        recipe("Salad", &[("1", "tablespoon", "olive oil"), ("2", "", "Tomatoes")]),
        recipe("Soup", &[("1 1/2", "tbsp", "Olive Oil"), ("3", "", "tomato")]),
    ];
    let list = generate_shopping_list(&recipes);

    assert_eq!(list.len(), 2);
    let oil = find(&list, "olive oil");
    assert_eq!(oil.quantity, "2 1/2");
    assert_eq!(oil.unit, "tablespoon");
    let tomatoes = find(&list, "tomatoes");
    assert_eq!(tomatoes.display_quantity(), "5");
    assert_eq!(tomatoes.used_in_recipes, vec!["Salad", "Soup"]);
}

#[test]
fn test_incompatible_units_are_joined_not_converted() {
    let recipes = vec![
        recipe("Cake", &[("2", "cups", "sugar")]),
        recipe("Jam", &[("500", "g", "sugar")]),
        recipe("Tea", &[("1", "cup", "sugar")]),
    ];
    let list = generate_shopping_list(&recipes);

    let sugar = find(&list, "sugar");
    assert_eq!(sugar.unit, "");
    assert_eq!(sugar.quantity, "3 cups, 500 g");
    assert_eq!(sugar.used_in_recipes, vec!["Cake", "Jam", "Tea"]);
}

#[test]
fn test_unparseable_quantities_are_kept_as_text() {
    let recipes = vec![
        recipe("Stew", &[("1-2", "", "bay leaves"), ("", "", "salt")]),
        recipe("Roast", &[("2", "", "Bay leaves"), ("a pinch", "", "salt")]),
    ];
    let list = generate_shopping_list(&recipes);

    let bay = find(&list, "bay leaves");
    assert_eq!(bay.quantity, "2, 1-2");
    let salt = find(&list, "salt");
    assert_eq!(salt.quantity, "a pinch");
    assert_eq!(salt.used_in_recipes, vec!["Stew", "Roast"]);
}

#[test]
fn test_single_contribution_keeps_original_text() {
    let list = generate_shopping_list(&[recipe("Curry", &[("1½", "tsp", "cumin"), ("0.50", "kg", "lamb")])]);
    assert_eq!(find(&list, "cumin").quantity, "1½");
    assert_eq!(find(&list, "lamb").display_quantity(), "0.50 kg");
}

#[test]
fn test_single_textual_contribution_keeps_its_unit() {
    let list = generate_shopping_list(&[recipe("Chili", &[("1-2", "cans", "tomatoes")])]);
    let tomatoes = find(&list, "tomatoes");
    assert_eq!(tomatoes.quantity, "1-2");
    assert_eq!(tomatoes.unit, "cans");
    assert_eq!(tomatoes.display_quantity(), "1-2 cans");
}

#[test]
fn test_punctuation_only_item_is_not_lost() {
    let list = generate_shopping_list(&[
        recipe("A", &[("1", "", "..."), ("2", "", "lime")]),
        recipe("B", &[("1", "", "...")]),
    ]);
    assert_eq!(list.len(), 2);
    let odd = find(&list, "...");
    assert_eq!(odd.quantity, "2");
    assert_eq!(odd.used_in_recipes, vec!["A", "B"]);
}

#[test]
fn test_distinct_recipes_with_shared_item_are_all_tracked() {
    let list = generate_shopping_list(&[
        recipe("Recipe 1 with basil", &[("1", "", "basil")]),
        recipe("Recipe 2 with basil", &[("1", "", "basil")]),
    ]);
    assert_eq!(
        find(&list, "basil").used_in_recipes,
        vec!["Recipe 1 with basil", "Recipe 2 with basil"]
    );
}

#[test]
fn test_output_follows_first_appearance() {
    let recipes = vec![
        recipe("First", &[("1", "", "onion"), ("2", "cloves", "garlic")]),
        recipe("Second", &[("1", "", "carrot"), ("1", "", "onion")]),
        recipe("Third", &[("3", "cloves", "garlic"), ("200", "ml", "stock")]),
    ];
    let list = generate_shopping_list(&recipes);
    let names: Vec<&str> = list.iter().map(|item| item.ingredient.as_str()).collect();
    assert_eq!(names, vec!["onion", "garlic", "carrot", "stock"]);
    assert_eq!(find(&list, "garlic").display_quantity(), "5 cloves");
    assert_eq!(find(&list, "onion").used_in_recipes, vec!["First", "Second"]);
}

#[test]
fn test_recipe_listed_once_per_item() {
    let list = generate_shopping_list(&[recipe(
        "Double Garlic",
        &[("2", "cloves", "garlic"), ("1", "clove", "Garlic")],
    )]);
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].used_in_recipes, vec!["Double Garlic"]);
    assert_eq!(list[0].display_quantity(), "3 cloves");
}

#[test]
fn test_consolidation_is_idempotent() {
    let recipes = vec![
        recipe("A", &[("2", "cups", "rice"), ("1", "", "lime")]),
        recipe("B", &[("1/2", "cup", "rice"), ("300", "g", "rice")]),
    ];
    assert_eq!(generate_shopping_list(&recipes), generate_shopping_list(&recipes));
}

#[test]
fn test_merged_quantities_do_not_depend_on_recipe_order() {
    let mut recipes = vec![
        recipe("A", &[("2", "cups", "rice"), ("1", "", "lime"), ("1", "tsp", "salt")]),
        recipe("B", &[("1/2", "cups", "rice"), ("2", "", "lime"), ("to taste", "", "salt")]),
        recipe("C", &[("300", "g", "rice"), ("1", "pinch", "salt")]),
        recipe("D", &[("1", "cups", "rice"), ("1", "", "lime")]),
    ];
    let baseline = generate_shopping_list(&recipes);
    assert_eq!(find(&baseline, "rice").quantity, "3 1/2 cups, 300 g");
    assert_eq!(find(&baseline, "salt").quantity, "to taste, 1 pinch, 1 tsp");

    let mut rng = thread_rng();
    for _ in 0..20 {
        recipes.shuffle(&mut rng);
        let shuffled = generate_shopping_list(&recipes);
        assert_eq!(shuffled.len(), baseline.len());
        for item in &baseline {
            let other = find(&shuffled, &item.ingredient);
            assert_eq!(other.display_quantity(), item.display_quantity());
            let mut expected = item.used_in_recipes.clone();
            let mut actual = other.used_in_recipes.clone();
            expected.sort();
            actual.sort();
            assert_eq!(actual, expected);
        }
    }
}

#[test]
fn test_empty_input_gives_empty_list() {
    assert!(generate_shopping_list(&[]).is_empty());
}
