pub mod food_analyzer;
pub mod label_resolver;
pub mod pet_resolver;

pub use food_analyzer::FoodAnalyzer;
pub use label_resolver::LabelResolver;
pub use pet_resolver::resolve_pet;
