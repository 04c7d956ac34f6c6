//! Simulated team-screenshot analysis.
//!
//! There is no vision model behind this: the default analyzer returns one of
//! three static templates, optionally failing at a configured rate.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::models::ImageRef;
use crate::responses::pick;

/// Shown on the pending bot message while analysis runs.
pub const ANALYZING_PLACEHOLDER: &str = "Analyzing your team...";

/// Replaces the pending message text when analysis fails.
pub const APOLOGY: &str =
    "Sorry, I couldn't analyze that image. Please try again with a clearer screenshot of your team.";

pub const ANALYSIS_TEMPLATES: &[&str] = &[
    "Team analysis complete!\n\n\
     Strengths:\n\
     - Solid premium midfield core\n\
     - Good fixture run for your defence over the next 3 gameweeks\n\n\
     Suggestions:\n\
     - Consider upgrading your third striker\n\
     - Your bench is weak; one injury could cost you points\n\n\
     Captain pick: back your highest-form premium at home.",
    "Here's what I see in your squad:\n\n\
     Balance: 3-4-3 with most of the budget in attack.\n\
     Risks:\n\
     - Two players from the same defence with tough fixtures\n\
     - A rotation-prone forward in your starting XI\n\n\
     Transfer idea: move a defender to a cheaper option with green fixtures \
     and use the funds on your midfield.",
    "Squad review:\n\n\
     - Value: well spread, with money left in the bank\n\
     - Form: several in-form assets, but watch your goalkeeper's minutes\n\
     - Differentials: low-owned picks could help you climb the rankings\n\n\
     Plan: hold your free transfer this week and roll it for a double gameweek.",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Image analysis failed for {uri}")]
    Failed { uri: String },

    #[error("Random source unavailable")]
    RngPoisoned,
}

/// Turns an attached image into a reply text.
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    async fn analyze(&self, image: &ImageRef) -> Result<String, AnalysisError>;

    /// Analyzer name for logging.
    fn name(&self) -> &str;
}

/// Default analyzer: uniform pick from `ANALYSIS_TEMPLATES`.
#[derive(Debug, Clone)]
pub struct TemplateAnalyzer {
    rng: Arc<Mutex<StdRng>>,
    failure_rate: f64,
}

impl TemplateAnalyzer {
    pub fn new(rng: Arc<Mutex<StdRng>>, failure_rate: f64) -> Self {
        Self {
            rng,
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl ImageAnalyzer for TemplateAnalyzer {
    async fn analyze(&self, image: &ImageRef) -> Result<String, AnalysisError> {
        let mut rng = self.rng.lock().map_err(|_| AnalysisError::RngPoisoned)?;
        if self.failure_rate > 0.0 && rng.gen_bool(self.failure_rate) {
            return Err(AnalysisError::Failed {
                uri: image.uri.clone(),
            });
        }
        Ok(pick(ANALYSIS_TEMPLATES, &mut *rng).to_string())
    }

    fn name(&self) -> &str {
        "template"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn shared_rng(seed: u64) -> Arc<Mutex<StdRng>> {
        Arc::new(Mutex::new(StdRng::seed_from_u64(seed)))
    }

    #[tokio::test]
    async fn test_template_analyzer_returns_template() {
        let analyzer = TemplateAnalyzer::new(shared_rng(3), 0.0);
        let image = ImageRef::new("file:///team.png");

        for _ in 0..10 {
            let text = analyzer.analyze(&image).await.unwrap();
            assert!(ANALYSIS_TEMPLATES.contains(&text.as_str()));
        }
        assert_eq!(analyzer.name(), "template");
    }

    #[tokio::test]
    async fn test_template_analyzer_always_fails_at_rate_one() {
        let analyzer = TemplateAnalyzer::new(shared_rng(3), 1.0);
        let image = ImageRef::new("file:///team.png");

        let result = analyzer.analyze(&image).await;
        assert_eq!(
            result,
            Err(AnalysisError::Failed {
                uri: "file:///team.png".to_string()
            })
        );
    }

    #[test]
    fn test_templates_are_multi_line() {
        assert_eq!(ANALYSIS_TEMPLATES.len(), 3);
        for template in ANALYSIS_TEMPLATES {
            assert!(template.lines().count() > 1);
        }
    }
}
