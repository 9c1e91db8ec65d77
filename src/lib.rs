//! Food photo → calorie estimates.
//!
//! An [`services::ImageClassifier`] ranks labels for a photo, the
//! [`handlers::LabelResolver`] maps them onto the reference table in
//! [`services::FoodDatabase`], and [`handlers::FoodAnalyzer`] ties both into a
//! single-request session.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
