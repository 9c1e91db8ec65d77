use anyhow::{Context, Result};
use serde::Deserialize;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::models::FoodRecord;

// Calories per 100g or per typical portion
const BUILTIN_FOODS: &[(&str, u32, &str)] = &[
    // Fruits
    ("apple", 52, "100g"),
    ("banana", 89, "100g"),
    ("orange", 47, "100g"),
    ("strawberry", 32, "100g"),
    ("grape", 69, "100g"),
    ("watermelon", 30, "100g"),
    ("pineapple", 50, "100g"),
    ("mango", 60, "100g"),
    ("pear", 57, "100g"),
    ("peach", 39, "100g"),
    // Vegetables
    ("broccoli", 34, "100g"),
    ("carrot", 41, "100g"),
    ("tomato", 18, "100g"),
    ("lettuce", 15, "100g"),
    ("cucumber", 16, "100g"),
    ("pepper", 31, "100g"),
    ("onion", 40, "100g"),
    ("potato", 77, "100g"),
    ("corn", 86, "100g"),
    ("mushroom", 22, "100g"),
    // Proteins
    ("chicken", 239, "100g"),
    ("beef", 250, "100g"),
    ("pork", 242, "100g"),
    ("fish", 206, "100g"),
    ("salmon", 208, "100g"),
    ("tuna", 132, "100g"),
    ("egg", 155, "2 unidades"),
    ("shrimp", 99, "100g"),
    // Dairy
    ("milk", 61, "1 taza"),
    ("cheese", 402, "100g"),
    ("yogurt", 59, "100g"),
    ("butter", 717, "100g"),
    ("cream", 345, "100g"),
    // Carbs
    ("bread", 265, "100g"),
    ("rice", 130, "100g"),
    ("pasta", 158, "100g"),
    ("pizza", 266, "1 rebanada"),
    ("bagel", 250, "1 unidad"),
    ("tortilla", 218, "100g"),
    ("oats", 389, "100g"),
    // Fast food
    ("hamburger", 295, "1 unidad"),
    ("hot dog", 290, "1 unidad"),
    ("french fries", 312, "100g"),
    ("burrito", 206, "1 unidad"),
    ("taco", 226, "1 unidad"),
    ("sandwich", 250, "1 unidad"),
    // Desserts
    ("cake", 257, "1 rebanada"),
    ("cookie", 502, "100g"),
    ("ice cream", 207, "100g"),
    ("chocolate", 546, "100g"),
    ("candy", 394, "100g"),
    ("doughnut", 452, "1 unidad"),
    ("brownie", 466, "1 unidad"),
    // Drinks
    ("coffee", 2, "1 taza"),
    ("tea", 1, "1 taza"),
    ("juice", 45, "1 taza"),
    ("soda", 140, "1 lata"),
    ("beer", 153, "1 lata"),
    ("wine", 123, "1 copa"),
    // Snacks
    ("chips", 536, "100g"),
    ("popcorn", 375, "100g"),
    ("nuts", 607, "100g"),
    ("pretzel", 380, "100g"),
    // Mexican
    ("quesadilla", 300, "1 unidad"),
    ("enchilada", 235, "1 unidad"),
    ("tamale", 126, "1 unidad"),
    ("guacamole", 160, "100g"),
    ("salsa", 36, "100g"),
    // Asian
    ("sushi", 143, "1 rollo"),
    ("ramen", 436, "1 tazón"),
    ("fried rice", 163, "100g"),
    ("dumpling", 41, "1 unidad"),
    // Other
    ("soup", 39, "1 tazón"),
    ("salad", 33, "100g"),
    ("wrap", 180, "1 unidad"),
];

const BUILTIN_KEYWORDS: &[&str] = &[
    "food", "meal", "dish", "plate", "bowl",
    "apple", "banana", "orange", "strawberry", "grape", "watermelon",
    "pineapple", "mango", "pear", "peach", "fruit",
    "broccoli", "carrot", "tomato", "lettuce", "cucumber", "pepper",
    "onion", "potato", "corn", "mushroom", "vegetable",
    "chicken", "beef", "pork", "fish", "salmon", "tuna", "egg",
    "shrimp", "meat", "seafood",
    "milk", "cheese", "yogurt", "butter", "cream", "dairy",
    "bread", "rice", "pasta", "pizza", "bagel", "tortilla", "oats",
    "noodle", "cereal",
    "hamburger", "burger", "hot dog", "french fries", "fries",
    "burrito", "taco", "sandwich",
    "cake", "cookie", "ice cream", "chocolate", "candy", "doughnut",
    "brownie", "dessert", "sweet",
    "coffee", "tea", "juice", "soda", "beer", "wine", "drink", "beverage",
    "chips", "popcorn", "nuts", "pretzel", "snack",
    "quesadilla", "enchilada", "tamale", "guacamole", "salsa",
    "sushi", "ramen", "fried rice", "dumpling",
    "soup", "salad", "wrap",
];

/// Looser terms used only by the fallback pass.
const BUILTIN_GENERIC_TERMS: &[&str] = &["food", "dish", "plate", "meal", "snack", "dessert"];

#[derive(Debug, Deserialize)]
struct DatabaseFile {
    foods: Vec<FoodRecord>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
    #[serde(default)]
    generic_terms: Option<Vec<String>>,
}

/// Reference table plus the keyword sets used to decide whether a label is food.
#[derive(Debug, Clone)]
pub struct FoodDatabase {
    records: Vec<FoodRecord>,
    exact: HashMap<String, usize>,
    // Record indices, longest key first, ties in declaration order
    partial_order: Vec<usize>,
    keywords: Vec<String>,
    generic_terms: Vec<String>,
}

impl Default for FoodDatabase {
    fn default() -> Self {
        let records = BUILTIN_FOODS
            .iter()
            .map(|(key, calories, portion)| FoodRecord {
                key: key.to_string(),
                calories: *calories,
                portion: portion.to_string(),
            })
            .collect();

        // Built-in keys are already normalized and unique
        Self::index(
            records,
            owned_terms(BUILTIN_KEYWORDS),
            owned_terms(BUILTIN_GENERIC_TERMS),
        )
    }
}

impl FoodDatabase {
    /// Parses a JSON database; missing keyword lists fall back to the built-in sets.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: DatabaseFile = serde_json::from_str(json).context("invalid food database JSON")?;
        let keywords = file
            .keywords
            .unwrap_or_else(|| owned_terms(BUILTIN_KEYWORDS));
        let generic_terms = file
            .generic_terms
            .unwrap_or_else(|| owned_terms(BUILTIN_GENERIC_TERMS));

        Self::build(file.foods, keywords, generic_terms)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read food database {}", path.display()))?;
        let db = Self::from_json(&json)?;
        log::info!("📚 Loaded {} foods from {}", db.len(), path.display());
        Ok(db)
    }

    fn build(
        records: Vec<FoodRecord>,
        keywords: Vec<String>,
        generic_terms: Vec<String>,
    ) -> Result<Self> {
        let mut normalized_records = Vec::with_capacity(records.len());
        let mut seen = HashSet::with_capacity(records.len());

        for record in records {
            let key = normalize_identifier(&record.key);
            if key.is_empty() {
                anyhow::bail!("food database contains an empty key");
            }
            if !seen.insert(key.clone()) {
                anyhow::bail!("food database contains duplicate key '{}'", key);
            }
            normalized_records.push(FoodRecord { key, ..record });
        }

        Ok(Self::index(normalized_records, keywords, generic_terms))
    }

    fn index(records: Vec<FoodRecord>, keywords: Vec<String>, generic_terms: Vec<String>) -> Self {
        let exact = records
            .iter()
            .enumerate()
            .map(|(i, record)| (record.key.clone(), i))
            .collect();

        let mut partial_order: Vec<usize> = (0..records.len()).collect();
        partial_order.sort_by_key(|&i| Reverse(records[i].key.len()));

        Self {
            records,
            exact,
            partial_order,
            keywords: normalize_terms(keywords),
            generic_terms: normalize_terms(generic_terms),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the label contains any food keyword (case-insensitive).
    pub fn is_food(&self, identifier: &str) -> bool {
        let lowered = identifier.to_lowercase();
        self.keywords.iter().any(|keyword| lowered.contains(keyword.as_str()))
    }

    /// True when the label contains one of the looser fallback terms.
    pub fn is_generic_food(&self, identifier: &str) -> bool {
        let lowered = identifier.to_lowercase();
        self.generic_terms.iter().any(|term| lowered.contains(term.as_str()))
    }

    /// Exact match on the normalized label, then partial match in either direction.
    pub fn lookup(&self, identifier: &str) -> Option<&FoodRecord> {
        let normalized = normalize_identifier(identifier);
        if normalized.is_empty() {
            return None;
        }

        if let Some(&index) = self.exact.get(&normalized) {
            return Some(&self.records[index]);
        }

        self.partial_order
            .iter()
            .map(|&index| &self.records[index])
            .find(|record| {
                normalized.contains(record.key.as_str()) || record.key.contains(normalized.as_str())
            })
    }
}

fn owned_terms(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| t.to_string()).collect()
}

fn normalize_terms(terms: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    terms
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

/// Drops a leading WordNet synset id such as `n07742313` from an ImageNet label.
pub fn strip_synset_id(identifier: &str) -> &str {
    let trimmed = identifier.trim_start();
    let bytes = trimmed.as_bytes();

    let is_synset = bytes.len() >= 9
        && bytes[0].eq_ignore_ascii_case(&b'n')
        && bytes[1..9].iter().all(u8::is_ascii_digit)
        && bytes.get(9).map_or(true, |b| !b.is_ascii_alphanumeric());
    if !is_synset {
        return trimmed;
    }

    let rest = trimmed[9..].trim_start_matches(|c: char| c == ',' || c == ':' || c.is_whitespace());
    if rest.is_empty() {
        trimmed
    } else {
        rest
    }
}

/// Lowercased, underscores to spaces, trimmed.
pub fn normalize_identifier(identifier: &str) -> String {
    strip_synset_id(identifier)
        .to_lowercase()
        .replace('_', " ")
        .trim()
        .to_string()
}

/// Display name for a label: text before the first comma, separators to spaces, title case.
pub fn format_label(identifier: &str) -> String {
    let label = strip_synset_id(identifier);
    let head = label.split(',').next().unwrap_or(label);

    head.replace(['_', '-'], " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
