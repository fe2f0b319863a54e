use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::ingredient_line::{has_bullet, parse_ingredient_line, strip_list_marker};
use crate::models::{Ingredient, Recipe};

pub const DEFAULT_PREP_TIME: &str = "20 minutes";
pub const DEFAULT_COOK_TIME: &str = "30 minutes";
pub const DEFAULT_CUISINE: &str = "International";
pub const DEFAULT_DIFFICULTY: &str = "Medium";
pub const PLACEHOLDER_INGREDIENT: &str = "main ingredient (not specified)";
pub const PLACEHOLDER_INSTRUCTION: &str =
    "Prepare the ingredients and cook until done; the generated steps could not be read.";
const MAX_SERVINGS: u32 = 100;

/// A field value together with where it came from.
///
/// `Fallback` means the model output did not contain a usable value and a
/// default was substituted.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted<T> {
    Parsed(T),
    Fallback(T),
}

impl<T> Extracted<T> {
    pub fn value(&self) -> &T {
        match self {
            Extracted::Parsed(v) | Extracted::Fallback(v) => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Extracted::Parsed(v) | Extracted::Fallback(v) => v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Extracted::Fallback(_))
    }

    fn or_fallback(found: Option<T>, default: impl FnOnce() -> T) -> Self {
        match found {
            Some(v) => Extracted::Parsed(v),
            None => Extracted::Fallback(default()),
        }
    }
}

/// How the bulk of the recipe was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// The reply was valid JSON as-is.
    Json,
    /// The reply was JSON after stripping fences, prose and trailing commas.
    CleanedJson,
    /// Labeled fields, section headers or fragments of broken JSON.
    Sections,
    /// Nothing structured was found.
    Unstructured,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecipe {
    pub strategy: ParseStrategy,
    pub name: Extracted<String>,
    pub prep_time: Extracted<String>,
    pub cook_time: Extracted<String>,
    pub servings: Extracted<u32>,
    pub cuisine_inspiration: Extracted<String>,
    pub difficulty: Extracted<String>,
    pub ingredients: Extracted<Vec<Ingredient>>,
    pub instructions: Extracted<Vec<String>>,
}

impl ParsedRecipe {
    /// Names of the fields that had to be defaulted.
    pub fn fallback_fields(&self) -> Vec<&'static str> {
        let flags = [
            ("name", self.name.is_fallback()),
            ("prep_time", self.prep_time.is_fallback()),
            ("cook_time", self.cook_time.is_fallback()),
            ("servings", self.servings.is_fallback()),
            ("cuisine_inspiration", self.cuisine_inspiration.is_fallback()),
            ("difficulty", self.difficulty.is_fallback()),
            ("ingredients", self.ingredients.is_fallback()),
            ("instructions", self.instructions.is_fallback()),
        ];
        flags
            .into_iter()
            .filter(|(_, fallback)| *fallback)
            .map(|(field, _)| field)
            .collect()
    }

    pub fn into_recipe(self) -> Recipe {
        Recipe {
            name: self.name.into_value(),
            prep_time: self.prep_time.into_value(),
            cook_time: self.cook_time.into_value(),
            servings: self.servings.into_value(),
            cuisine_inspiration: self.cuisine_inspiration.into_value(),
            difficulty: self.difficulty.into_value(),
            ingredients: self.ingredients.into_value(),
            instructions: self.instructions.into_value(),
            image_path: None,
        }
    }
}

/// Whatever a strategy managed to read; `None` means "not found".
#[derive(Debug, Default)]
struct RawFields {
    name: Option<String>,
    prep_time: Option<String>,
    cook_time: Option<String>,
    servings: Option<u32>,
    cuisine_inspiration: Option<String>,
    difficulty: Option<String>,
    ingredients: Option<Vec<Ingredient>>,
    instructions: Option<Vec<String>>,
}

impl RawFields {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.prep_time.is_none()
            && self.cook_time.is_none()
            && self.servings.is_none()
            && self.cuisine_inspiration.is_none()
            && self.difficulty.is_none()
            && self.ingredients.is_none()
            && self.instructions.is_none()
    }

    /// Fills the gaps in `self` from `other`.
    fn merge_missing(&mut self, other: RawFields) {
        self.name = self.name.take().or(other.name);
        self.prep_time = self.prep_time.take().or(other.prep_time);
        self.cook_time = self.cook_time.take().or(other.cook_time);
        self.servings = self.servings.take().or(other.servings);
        self.cuisine_inspiration = self.cuisine_inspiration.take().or(other.cuisine_inspiration);
        self.difficulty = self.difficulty.take().or(other.difficulty);
        self.ingredients = self.ingredients.take().or(other.ingredients);
        self.instructions = self.instructions.take().or(other.instructions);
    }
}

/// Parses one model reply into a recipe, never failing.
///
/// Strategies are tried from strict to loose: JSON, cleaned JSON, labeled
/// sections (including fragments of truncated JSON), then bullet/numbered
/// lines for the list fields. Whatever is still missing is filled with
/// defaults and marked as [`Extracted::Fallback`].
///
/// # Arguments
/// * `response_text` - Raw text returned by the model
/// * `recipe_number` - 1-based slot index, used for the fallback name
/// * `serving_size` - Requested servings, used when the reply has none
pub fn parse_recipe_response(response_text: &str, recipe_number: u32, serving_size: u32) -> ParsedRecipe {
    let (mut fields, mut strategy) = match serde_json::from_str::<Value>(response_text.trim()) {
        Ok(value) => (fields_from_json(&value), ParseStrategy::Json),
        Err(_) => match serde_json::from_str::<Value>(&clean_json_response(response_text)) {
            Ok(value) => (fields_from_json(&value), ParseStrategy::CleanedJson),
            Err(e) => {
                debug!(recipe_number, error = %e, "reply is not JSON, reading labeled sections");
                (fields_from_sections(response_text), ParseStrategy::Sections)
            }
        },
    };

    if strategy != ParseStrategy::Sections && fields.is_empty() {
        // Valid JSON but not a recipe object, e.g. a bare string.
        fields = fields_from_sections(response_text);
        strategy = ParseStrategy::Sections;
    }
    if fields.ingredients.is_none() || fields.instructions.is_none() {
        fields.merge_missing(fields_from_loose_lines(response_text));
    }
    if strategy == ParseStrategy::Sections && fields.is_empty() {
        strategy = ParseStrategy::Unstructured;
    }

    let parsed = finish(fields, strategy, recipe_number, serving_size);
    let fallbacks = parsed.fallback_fields();
    if !fallbacks.is_empty() {
        warn!(
            recipe_number,
            strategy = ?parsed.strategy,
            fields = ?fallbacks,
            "recipe reply was incomplete, defaults substituted"
        );
    }
    parsed
}

fn finish(fields: RawFields, strategy: ParseStrategy, recipe_number: u32, serving_size: u32) -> ParsedRecipe {
    ParsedRecipe {
        strategy,
        name: Extracted::or_fallback(fields.name, || format!("Recipe {}", recipe_number)),
        prep_time: Extracted::or_fallback(fields.prep_time, || DEFAULT_PREP_TIME.to_string()),
        cook_time: Extracted::or_fallback(fields.cook_time, || DEFAULT_COOK_TIME.to_string()),
        servings: Extracted::or_fallback(
            fields.servings.filter(|s| (1..=MAX_SERVINGS).contains(s)),
            || serving_size,
        ),
        cuisine_inspiration: Extracted::or_fallback(fields.cuisine_inspiration, || DEFAULT_CUISINE.to_string()),
        difficulty: Extracted::or_fallback(fields.difficulty, || DEFAULT_DIFFICULTY.to_string()),
        ingredients: Extracted::or_fallback(fields.ingredients, placeholder_ingredients),
        instructions: Extracted::or_fallback(fields.instructions, placeholder_instructions),
    }
}

pub fn placeholder_ingredients() -> Vec<Ingredient> {
    vec![Ingredient::new(PLACEHOLDER_INGREDIENT, "", "")]
}

pub fn placeholder_instructions() -> Vec<String> {
    vec![PLACEHOLDER_INSTRUCTION.to_string()]
}

/// A stand-in recipe for a slot whose model call never succeeded.
///
/// Must-use ingredients are listed so the plan still accounts for them. The
/// slot number is part of the name so two stand-ins never share one.
pub fn fallback_recipe(recipe_number: u32, serving_size: u32, must_use_ingredients: &[String]) -> Recipe {
    let name = if must_use_ingredients.is_empty() {
        format!("Simple Recipe {}", recipe_number)
    } else {
        format!("Recipe {} with {}", recipe_number, must_use_ingredients.join(", "))
    };
    let mut ingredients: Vec<Ingredient> = must_use_ingredients
        .iter()
        .map(|item| Ingredient::new(item.clone(), "", ""))
        .collect();
    if ingredients.is_empty() {
        ingredients = placeholder_ingredients();
    }
    Recipe {
        name,
        prep_time: DEFAULT_PREP_TIME.to_string(),
        cook_time: DEFAULT_COOK_TIME.to_string(),
        servings: serving_size,
        cuisine_inspiration: DEFAULT_CUISINE.to_string(),
        difficulty: "Easy".to_string(),
        ingredients,
        instructions: placeholder_instructions(),
        image_path: None,
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

static FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*```[a-zA-Z]*\s*$").expect("fence pattern is valid"));
static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("trailing comma pattern is valid"));

/// Cuts a JSON object out of a chatty model reply.
///
/// Strips markdown fences, anything before the first `{` and after the last
/// `}`, escaped single quotes and trailing commas.
pub fn clean_json_response(response_text: &str) -> String {
    let text = FENCE_OPEN.replace_all(response_text.trim(), "");
    let mut text: &str = &text;
    if let Some(start) = text.find('{') {
        text = &text[start..];
    }
    if let Some(end) = text.rfind('}') {
        text = &text[..=end];
    }
    let text = text.replace("\\'", "'");
    TRAILING_COMMA.replace_all(&text, "$1").into_owned()
}

fn fields_from_json(value: &Value) -> RawFields {
    let Some(obj) = recipe_object(value) else {
        return RawFields::default();
    };
    RawFields {
        name: string_field(obj, &["name", "title", "recipe_name", "recipe_title"]),
        prep_time: time_field(obj, &["prep_time", "prepTime", "preparation_time"]),
        cook_time: time_field(obj, &["cook_time", "cookTime", "cooking_time"]),
        servings: first_present(obj, &["servings", "serves", "yield"]).and_then(servings_from_value),
        cuisine_inspiration: string_field(obj, &["cuisine_inspiration", "cuisine"]),
        difficulty: string_field(obj, &["difficulty"]),
        ingredients: first_present(obj, &["ingredients"]).and_then(ingredients_from_value),
        instructions: first_present(obj, &["instructions", "steps", "directions", "method"])
            .and_then(instructions_from_value),
    }
}

/// Finds the recipe object, unwrapping `[ {...} ]` and `{"recipe": {...}}`.
fn recipe_object(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Array(items) => items.first().and_then(recipe_object),
        Value::Object(obj) => {
            for wrapper in ["recipe", "recipes"] {
                if let Some(inner) = obj.get(wrapper) {
                    if let Some(found) = recipe_object(inner) {
                        return Some(found);
                    }
                }
            }
            Some(obj)
        }
        _ => None,
    }
}

fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| obj.get(*key)).filter(|v| !v.is_null())
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    first_present(obj, keys).and_then(scalar_text)
}

/// Bare numbers are read as minutes.
fn time_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match first_present(obj, keys)? {
        Value::Number(n) => Some(format!("{} minutes", n)),
        other => scalar_text(other),
    }
}

fn servings_from_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(whole) => u32::try_from(whole).ok(),
            // `4.0` is still four servings; `2.5` is not a count.
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64)
                .map(|f| f as u32),
        },
        Value::String(s) => leading_integer(s),
        _ => None,
    }
}

fn leading_integer(text: &str) -> Option<u32> {
    let digits: String = text
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn ingredients_from_value(value: &Value) -> Option<Vec<Ingredient>> {
    let ingredients: Vec<Ingredient> = match value {
        Value::Array(items) => items.iter().filter_map(ingredient_from_value).collect(),
        Value::String(text) => text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(parse_ingredient_line)
            .collect(),
        _ => Vec::new(),
    };
    (!ingredients.is_empty()).then_some(ingredients)
}

fn ingredient_from_value(value: &Value) -> Option<Ingredient> {
    match value {
        Value::String(line) if !line.trim().is_empty() => Some(parse_ingredient_line(line)),
        Value::Object(obj) => {
            let item = string_field(obj, &["item", "name", "ingredient"])?;
            let quantity = string_field(obj, &["quantity", "amount", "qty"]).unwrap_or_default();
            let unit = string_field(obj, &["unit", "units"]).unwrap_or_default();
            if quantity.is_empty() && unit.is_empty() {
                // The model sometimes packs the whole line into "item".
                Some(parse_ingredient_line(&item))
            } else {
                Some(Ingredient::new(item, quantity, unit))
            }
        }
        _ => None,
    }
}

fn instructions_from_value(value: &Value) -> Option<Vec<String>> {
    let steps: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(obj) => string_field(obj, &["text", "step", "instruction", "description"]),
                other => scalar_text(other),
            })
            .map(|step| strip_list_marker(&step).to_string())
            .filter(|step| !step.is_empty())
            .collect(),
        Value::String(text) => text
            .lines()
            .map(strip_list_marker)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    (!steps.is_empty()).then_some(steps)
}

// ---------------------------------------------------------------------------
// Labeled sections and JSON fragments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Name,
    PrepTime,
    CookTime,
    Servings,
    Cuisine,
    Difficulty,
    Ingredients,
    Instructions,
}

static LABELED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<label>recipe name|name|title|prep(?:aration)? time|cook(?:ing)? time|servings|serves|yield|cuisine(?: inspiration)?|difficulty|ingredients|instructions|directions|method|steps)\s*(?::|\s-|–)\s*(?P<value>.*)$",
    )
    .expect("labeled line pattern is valid")
});

static BARE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<label>ingredients|instructions|directions|method|steps)\s*:?\s*$")
        .expect("bare header pattern is valid")
});

static NUMBERED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:\d+[.)]\s+|step\s+\d+\s*[:.)-]?\s*)\S").expect("numbered line pattern is valid")
});

static JSON_OBJECT_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^{}]*\}").expect("object fragment pattern is valid"));

static JSON_STRING_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).expect("string fragment pattern is valid"));

fn label_of(text: &str) -> Option<Label> {
    let label = match text.to_lowercase().as_str() {
        "recipe name" | "name" | "title" => Label::Name,
        "prep time" | "preparation time" => Label::PrepTime,
        "cook time" | "cooking time" => Label::CookTime,
        "servings" | "serves" | "yield" => Label::Servings,
        "cuisine" | "cuisine inspiration" => Label::Cuisine,
        "difficulty" => Label::Difficulty,
        "ingredients" => Label::Ingredients,
        "instructions" | "directions" | "method" | "steps" => Label::Instructions,
        _ => return None,
    };
    Some(label)
}

/// Drops markdown decoration: heading hashes, bold markers, leading bullets
/// in front of a label ("- **Prep time:** 10 min").
fn undecorate(line: &str) -> String {
    line.trim()
        .trim_start_matches('#')
        .replace("**", "")
        .replace("__", "")
        .trim()
        .to_string()
}

fn fields_from_sections(text: &str) -> RawFields {
    let mut fields = RawFields::default();
    let mut section: Option<Label> = None;
    let mut ingredient_lines: Vec<String> = Vec::new();
    let mut instruction_lines: Vec<String> = Vec::new();
    let mut heading_name: Option<String> = None;

    for raw_line in text.lines() {
        if raw_line.trim().is_empty() {
            continue;
        }
        let line = undecorate(raw_line);
        let unbulleted = undecorate(strip_list_marker(&line));

        let labeled = LABELED_LINE
            .captures(&unbulleted)
            .and_then(|caps| Some((label_of(&caps["label"])?, caps["value"].trim().to_string())))
            .or_else(|| {
                BARE_HEADER
                    .captures(&unbulleted)
                    .and_then(|caps| Some((label_of(&caps["label"])?, String::new())))
            });

        if let Some((label, value)) = labeled {
            let value = value.trim_matches(|c: char| c == '"' || c == ',').trim().to_string();
            section = None;
            match label {
                Label::Ingredients | Label::Instructions => {
                    section = Some(label);
                    if !value.is_empty() {
                        push_list_value(label, &value, &mut ingredient_lines, &mut instruction_lines);
                    }
                }
                _ if value.is_empty() => {}
                Label::Name => fields.name = fields.name.take().or(Some(value)),
                Label::PrepTime => fields.prep_time = fields.prep_time.take().or(Some(value)),
                Label::CookTime => fields.cook_time = fields.cook_time.take().or(Some(value)),
                Label::Servings => fields.servings = fields.servings.or(leading_integer(&value)),
                Label::Cuisine => {
                    fields.cuisine_inspiration = fields.cuisine_inspiration.take().or(Some(value))
                }
                Label::Difficulty => fields.difficulty = fields.difficulty.take().or(Some(value)),
            }
            continue;
        }

        match section {
            Some(label) => push_list_value(label, &line, &mut ingredient_lines, &mut instruction_lines),
            None => {
                if heading_name.is_none() && raw_line.trim_start().starts_with('#') && !line.is_empty() {
                    heading_name = Some(line);
                }
            }
        }
    }

    fields.name = fields.name.or(heading_name);
    let ingredients: Vec<Ingredient> = ingredient_lines.iter().map(|l| parse_ingredient_line(l)).collect();
    if !ingredients.is_empty() {
        fields.ingredients = Some(ingredients);
    }
    if !instruction_lines.is_empty() {
        fields.instructions = Some(instruction_lines);
    }

    fields.merge_missing(fields_from_json_fragments(text));
    fields
}

fn push_list_value(label: Label, value: &str, ingredients: &mut Vec<String>, instructions: &mut Vec<String>) {
    let cleaned = strip_list_marker(value);
    if cleaned.is_empty() {
        return;
    }
    match label {
        Label::Ingredients => ingredients.push(cleaned.to_string()),
        Label::Instructions => instructions.push(cleaned.to_string()),
        _ => {}
    }
}

/// Reads `"key": "value"` pairs and the `ingredients` / `instructions`
/// arrays out of JSON that does not parse, typically a reply cut off by the
/// token limit.
fn fields_from_json_fragments(text: &str) -> RawFields {
    RawFields {
        name: quoted_field(text, "name"),
        prep_time: quoted_field(text, "prep_time"),
        cook_time: quoted_field(text, "cook_time"),
        servings: quoted_number(text, "servings"),
        cuisine_inspiration: quoted_field(text, "cuisine_inspiration"),
        difficulty: quoted_field(text, "difficulty"),
        ingredients: json_array_body(text, "ingredients").and_then(|body| {
            let items: Vec<Ingredient> = JSON_OBJECT_FRAGMENT
                .find_iter(body)
                .filter_map(|m| serde_json::from_str::<Value>(&clean_json_response(m.as_str())).ok())
                .filter_map(|v| ingredient_from_value(&v))
                .collect();
            (!items.is_empty()).then_some(items)
        }),
        instructions: json_array_body(text, "instructions").and_then(|body| {
            let steps: Vec<String> = JSON_STRING_FRAGMENT
                .captures_iter(body)
                .map(|caps| caps[1].replace("\\\"", "\"").trim().to_string())
                .filter(|step| !step.is_empty())
                .collect();
            (!steps.is_empty()).then_some(steps)
        }),
    }
}

fn quoted_field(text: &str, key: &str) -> Option<String> {
    let pattern = format!(r#""{}"\s*:\s*"([^"]+)""#, regex::escape(key));
    let value = Regex::new(&pattern).ok()?.captures(text)?[1].trim().to_string();
    (!value.is_empty()).then_some(value)
}

fn quoted_number(text: &str, key: &str) -> Option<u32> {
    let pattern = format!(r#""{}"\s*:\s*"?(\d+)"#, regex::escape(key));
    Regex::new(&pattern).ok()?.captures(text)?[1].parse().ok()
}

/// The text of a JSON array after `"key": [`, up to its closing bracket or
/// the end of the input if the array was never closed.
fn json_array_body<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let pattern = format!(r#""{}"\s*:\s*\["#, regex::escape(key));
    let start = Regex::new(&pattern).ok()?.find(text)?.end();
    let body = &text[start..];
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ']' if depth == 0 => return Some(&body[..i]),
            ']' => depth -= 1,
            _ => {}
        }
    }
    Some(body)
}

// ---------------------------------------------------------------------------
// Loose lines
// ---------------------------------------------------------------------------

/// Last resort for list fields: bullet lines are ingredients, numbered lines
/// are steps.
fn fields_from_loose_lines(text: &str) -> RawFields {
    let mut ingredients = Vec::new();
    let mut instructions = Vec::new();
    for line in text.lines() {
        let plain = undecorate(strip_list_marker(line));
        if plain.is_empty() || LABELED_LINE.is_match(&plain) || BARE_HEADER.is_match(&plain) {
            continue;
        }
        if NUMBERED_LINE.is_match(line) {
            instructions.push(plain);
        } else if has_bullet(line) {
            ingredients.push(parse_ingredient_line(&plain));
        }
    }
    RawFields {
        ingredients: (!ingredients.is_empty()).then_some(ingredients),
        instructions: (!instructions.is_empty()).then_some(instructions),
        ..RawFields::default()
    }
}
