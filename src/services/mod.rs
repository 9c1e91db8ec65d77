pub mod classifier;
pub mod food_database;
pub mod openrouter; // OpenRouter vision model

pub use classifier::{ImageClassifier, ImageInput, StaticClassifier};
pub use food_database::FoodDatabase;
pub use openrouter::OpenRouterClassifier;
