use serde::{Deserialize, Serialize};

/// A single (label, confidence) output of an image classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub identifier: String,
    pub confidence: f64,
}

impl Observation {
    pub fn new(identifier: impl Into<String>, confidence: f64) -> Self {
        Self {
            identifier: identifier.into(),
            confidence,
        }
    }
}

/// Reference table entry: calories per typical portion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodRecord {
    pub key: String,
    pub calories: u32,
    pub portion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    pub calories: u32,
    pub confidence: f64,
    pub portion_size: String,
}

impl FoodItem {
    pub fn calories_per_serving(&self) -> String {
        format!("{} kcal", self.calories)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub items: Vec<FoodItem>,
    pub total_calories: u32,
    pub is_food: bool,
    pub message: Option<String>,
}

impl AnalysisResult {
    /// Builds a result whose total and food flag are derived from `items`.
    pub fn from_items(items: Vec<FoodItem>) -> Self {
        let total_calories = items.iter().map(|item| item.calories).sum();
        let is_food = !items.is_empty();
        Self {
            items,
            total_calories,
            is_food,
            message: None,
        }
    }

    pub fn not_food(message: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            total_calories: 0,
            is_food: false,
            message: Some(message.into()),
        }
    }

    pub fn items_description(&self) -> String {
        self.items
            .iter()
            .map(|item| item.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PetKind {
    Dog,
    Cat,
    Other,
}

impl std::fmt::Display for PetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PetKind::Dog => "dog",
            PetKind::Cat => "cat",
            PetKind::Other => "other",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetPrediction {
    pub name: String,
    pub confidence: f64,
    pub kind: PetKind,
}
