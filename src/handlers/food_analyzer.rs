use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::AnalysisError;
use crate::handlers::LabelResolver;
use crate::models::{AnalysisResult, Observation};
use crate::services::{ImageClassifier, ImageInput};

#[derive(Debug, Default)]
struct SessionState {
    analysis_result: Option<AnalysisResult>,
    error_message: Option<String>,
}

/// Clears the in-flight flag however the request ends, including a dropped future.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One analysis session: runs the classifier, resolves labels and keeps the last outcome.
///
/// Only one request may be in flight; a second one is rejected with [`AnalysisError::Busy`].
pub struct FoodAnalyzer {
    classifier: Arc<dyn ImageClassifier>,
    resolver: LabelResolver,
    processing: AtomicBool,
    state: Mutex<SessionState>,
}

impl FoodAnalyzer {
    pub fn new(classifier: Arc<dyn ImageClassifier>, resolver: LabelResolver) -> Self {
        Self {
            classifier,
            resolver,
            processing: AtomicBool::new(false),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub async fn analyze_food(&self, image_path: &Path) -> Result<AnalysisResult, AnalysisError> {
        let Some(_in_flight) = InFlight::acquire(&self.processing) else {
            log::warn!("⏳ Analysis already running, ignoring {}", image_path.display());
            return Err(AnalysisError::Busy);
        };

        {
            let mut state = self.state.lock().await;
            state.error_message = None;
            state.analysis_result = None;
        }

        log::info!("📸 Analyzing {}", image_path.display());
        let outcome = self.run(image_path).await;

        let mut state = self.state.lock().await;
        match &outcome {
            Ok(result) => {
                log::info!(
                    "✅ Analysis done: {} items, {} kcal",
                    result.items.len(),
                    result.total_calories
                );
                state.analysis_result = Some(result.clone());
            }
            Err(e) => {
                log::error!("❌ Analysis failed: {}", e);
                state.error_message = Some(e.to_string());
            }
        }

        outcome
    }

    /// Classifier output for an image, before resolution.
    pub async fn classify(&self, image_path: &Path) -> Result<Vec<Observation>, AnalysisError> {
        let image = load_image(image_path).await?;

        let observations = self
            .classifier
            .classify(&image)
            .await
            .map_err(|e| AnalysisError::Classifier(e.to_string()))?;

        if observations.is_empty() {
            return Err(AnalysisError::NoResults);
        }
        Ok(observations)
    }

    async fn run(&self, image_path: &Path) -> Result<AnalysisResult, AnalysisError> {
        let observations = self.classify(image_path).await?;
        Ok(self.resolver.resolve(&observations))
    }

    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.analysis_result = None;
        state.error_message = None;
    }

    pub async fn analysis_result(&self) -> Option<AnalysisResult> {
        self.state.lock().await.analysis_result.clone()
    }

    pub async fn error_message(&self) -> Option<String> {
        self.state.lock().await.error_message.clone()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }
}

async fn load_image(path: &Path) -> Result<ImageInput, AnalysisError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        log::warn!("⚠️ Cannot read image {}: {}", path.display(), e);
        AnalysisError::CannotProcessImage
    })?;

    ImageInput::from_bytes(bytes).ok_or_else(|| {
        log::warn!("⚠️ {} is not a supported image", path.display());
        AnalysisError::CannotProcessImage
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::services::{FoodDatabase, StaticClassifier};
    use std::io::Write;
    use tokio::sync::Notify;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR";

    fn resolver() -> LabelResolver {
        LabelResolver::new(Arc::new(FoodDatabase::default()), ResolverConfig::default())
    }

    fn analyzer(observations: Vec<Observation>) -> FoodAnalyzer {
        FoodAnalyzer::new(Arc::new(StaticClassifier::new(observations)), resolver())
    }

    fn image_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    struct FailingClassifier;

    #[async_trait::async_trait]
    impl ImageClassifier for FailingClassifier {
        async fn classify(&self, _image: &ImageInput) -> anyhow::Result<Vec<Observation>> {
            anyhow::bail!("model unavailable")
        }
    }

    /// Blocks until released so a second request can arrive mid-flight.
    struct GatedClassifier {
        started: Notify,
        release: Notify,
    }

    #[async_trait::async_trait]
    impl ImageClassifier for GatedClassifier {
        async fn classify(&self, _image: &ImageInput) -> anyhow::Result<Vec<Observation>> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(vec![Observation::new("banana", 0.8)])
        }
    }

    #[tokio::test]
    async fn test_analyze_food_stores_result() {
        let analyzer = analyzer(vec![
            Observation::new("banana", 0.81),
            Observation::new("n07742313, apple", 0.92),
        ]);
        let image = image_file(PNG_HEADER);

        let result = analyzer.analyze_food(image.path()).await.unwrap();

        assert_eq!(result.total_calories, 141);
        assert_eq!(result.items[0].name, "Apple");
        assert_eq!(analyzer.analysis_result().await, Some(result));
        assert!(analyzer.error_message().await.is_none());
        assert!(!analyzer.is_processing());
    }

    #[tokio::test]
    async fn test_no_food_is_not_an_error() {
        let analyzer = analyzer(vec![Observation::new("laptop", 0.4)]);
        let image = image_file(PNG_HEADER);

        let result = analyzer.analyze_food(image.path()).await.unwrap();

        assert!(!result.is_food);
        assert!(analyzer.error_message().await.is_none());
    }

    #[tokio::test]
    async fn test_unreadable_image() {
        let analyzer = analyzer(vec![Observation::new("banana", 0.8)]);

        let err = analyzer
            .analyze_food(Path::new("/nonexistent/meal.jpg"))
            .await
            .unwrap_err();

        assert_eq!(err, AnalysisError::CannotProcessImage);
        assert_eq!(analyzer.error_message().await.as_deref(), Some("cannot process image"));
        assert!(!analyzer.is_processing());
    }

    #[tokio::test]
    async fn test_non_image_file() {
        let analyzer = analyzer(vec![Observation::new("banana", 0.8)]);
        let file = image_file(b"just some text");

        let err = analyzer.analyze_food(file.path()).await.unwrap_err();
        assert_eq!(err, AnalysisError::CannotProcessImage);
    }

    #[tokio::test]
    async fn test_classifier_failure() {
        let analyzer = FoodAnalyzer::new(Arc::new(FailingClassifier), resolver());
        let image = image_file(PNG_HEADER);

        let err = analyzer.analyze_food(image.path()).await.unwrap_err();

        assert_eq!(err, AnalysisError::Classifier("model unavailable".to_string()));
        assert_eq!(
            analyzer.error_message().await.as_deref(),
            Some("analysis error: model unavailable")
        );
        assert!(analyzer.analysis_result().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_classifier_output() {
        let analyzer = analyzer(Vec::new());
        let image = image_file(PNG_HEADER);

        let err = analyzer.analyze_food(image.path()).await.unwrap_err();

        assert_eq!(err, AnalysisError::NoResults);
        assert_eq!(analyzer.error_message().await.as_deref(), Some("no results found"));
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let analyzer = FoodAnalyzer::new(Arc::new(FailingClassifier), resolver());
        let image = image_file(PNG_HEADER);
        let _ = analyzer.analyze_food(image.path()).await;

        analyzer.reset().await;
        assert!(analyzer.error_message().await.is_none());
        assert!(analyzer.analysis_result().await.is_none());

        analyzer.reset().await;
        assert!(analyzer.error_message().await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_request_is_rejected() {
        let classifier = Arc::new(GatedClassifier {
            started: Notify::new(),
            release: Notify::new(),
        });
        let analyzer = Arc::new(FoodAnalyzer::new(classifier.clone(), resolver()));
        let image = image_file(PNG_HEADER);
        let path = image.path().to_path_buf();

        let first = {
            let analyzer = analyzer.clone();
            let path = path.clone();
            tokio::spawn(async move { analyzer.analyze_food(&path).await })
        };

        classifier.started.notified().await;
        assert!(analyzer.is_processing());

        let second = analyzer.analyze_food(&path).await;
        assert_eq!(second.unwrap_err(), AnalysisError::Busy);

        classifier.release.notify_one();
        let result = first.await.unwrap().unwrap();

        assert_eq!(result.items[0].name, "Banana");
        assert!(!analyzer.is_processing());
        assert!(analyzer.error_message().await.is_none());
    }

    #[tokio::test]
    async fn test_abandoned_request_frees_session() {
        let classifier = Arc::new(GatedClassifier {
            started: Notify::new(),
            release: Notify::new(),
        });
        let analyzer = FoodAnalyzer::new(classifier.clone(), resolver());
        let image = image_file(PNG_HEADER);

        let abandoned = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            analyzer.analyze_food(image.path()),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(!analyzer.is_processing());

        classifier.release.notify_one();
        let result = analyzer.analyze_food(image.path()).await.unwrap();

        assert_eq!(result.items[0].name, "Banana");
        assert!(!analyzer.is_processing());
    }
}
