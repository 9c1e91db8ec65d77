use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;

use calorie_lens::config::AppConfig;
use calorie_lens::error::AnalysisError;
use calorie_lens::handlers::{resolve_pet, FoodAnalyzer, LabelResolver};
use calorie_lens::models::{AnalysisResult, PetPrediction};
use calorie_lens::services::{FoodDatabase, ImageClassifier, OpenRouterClassifier, StaticClassifier};

/// Estimate the calories of the food in a photo.
#[derive(Debug, Parser)]
#[command(name = "calorie-lens", version)]
struct Cli {
    /// Image to analyze (PNG, JPEG, GIF, WebP or HEIC/HEIF)
    image: PathBuf,

    /// Replay classifier observations from a JSON file instead of calling the vision model
    #[arg(long, value_name = "FILE")]
    observations: Option<PathBuf>,

    /// Identify a dog or cat breed instead of food
    #[arg(long)]
    pet: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables (RUST_LOG may come from .env)
    dotenv().ok();

    // Initialize logger
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    log::info!("🚀 Starting calorie-lens...");

    let classifier: Arc<dyn ImageClassifier> = match &cli.observations {
        Some(path) => Arc::new(StaticClassifier::from_json_file(path)?),
        None => {
            let api_key = config
                .openrouter_api_key
                .clone()
                .context("OPENROUTER_API_KEY must be set in .env file (or pass --observations)")?;
            log::info!("✅ OpenRouter classifier initialized with model: {}", config.openrouter_model);
            Arc::new(OpenRouterClassifier::new(api_key, config.openrouter_model.clone()))
        }
    };

    let database = match &config.food_database_path {
        Some(path) => FoodDatabase::load(path)?,
        None => FoodDatabase::default(),
    };
    log::info!("✅ Food database ready ({} foods)", database.len());

    let resolver = LabelResolver::new(Arc::new(database), config.resolver.clone());
    let analyzer = FoodAnalyzer::new(classifier, resolver);

    if cli.pet {
        let observations = analyzer.classify(&cli.image).await?;
        let prediction = resolve_pet(&observations).ok_or(AnalysisError::NoResults)?;
        print_pet(&prediction, cli.json)?;
        return Ok(());
    }

    let result = analyzer.analyze_food(&cli.image).await?;
    print_result(&result, cli.json)?;

    Ok(())
}

fn print_result(result: &AnalysisResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if !result.is_food {
        println!(
            "⚠️ {}",
            result.message.as_deref().unwrap_or("no food detected")
        );
        return Ok(());
    }

    println!("\n🍽️ {}\n", result.items_description());
    for item in &result.items {
        println!(
            "   • {} - {} ({}) [{:.0}%]",
            item.name,
            item.calories_per_serving(),
            item.portion_size,
            item.confidence * 100.0
        );
    }
    println!("\n🔥 Total: {} kcal\n", result.total_calories);

    Ok(())
}

fn print_pet(prediction: &PetPrediction, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(prediction)?);
        return Ok(());
    }

    println!(
        "\n🐾 {} ({}) [{:.0}%]\n",
        prediction.name,
        prediction.kind,
        prediction.confidence * 100.0
    );
    Ok(())
}
