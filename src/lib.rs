pub mod api_connection;
pub mod cli;
pub mod config;
pub mod images;
pub mod ingredient_line;
pub mod logging;
pub mod model_invoker;
pub mod models;
pub mod orchestrator;
pub mod preferences;
pub mod prompt_builder;
pub mod quantity;
pub mod recipe_parser;
pub mod shopping_list;
pub mod store;
