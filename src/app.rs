use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::collector::{self, WidgetState};
use crate::config::DatabaseSettings;
use crate::db;
use crate::models::Label;
use crate::page::{Element, Page};
use crate::predictor::{ModelResult, Predictor};

pub const TITLE: &str = "🎓 Student Performance Predictor";
const INTRO: &str =
    "Predict whether a student will **Pass** or **Fail** based on their academic metrics.";
const PREDICT_BUTTON: &str = "Predict Performance";
const SAVED: &str = "Prediction saved successfully!";

/// Shared by every request. The predictor is loaded once and only read.
#[derive(Debug, Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
    pub database: DatabaseSettings,
}

impl AppState {
    pub fn new(predictor: Predictor, database: DatabaseSettings) -> Self {
        Self {
            predictor: Arc::new(predictor),
            database,
        }
    }
}

/// One request/response cycle: render the form for `widgets` and, when the
/// predict action was triggered, score the record, save it best-effort and
/// render the result. A failed save never prevents the result from showing.
pub async fn handle(state: &AppState, widgets: &WidgetState, triggered: bool) -> ModelResult<Page> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("prediction_cycle", %request_id, triggered);
    run_cycle(state, widgets, triggered).instrument(span).await
}

async fn run_cycle(state: &AppState, widgets: &WidgetState, triggered: bool) -> ModelResult<Page> {
    let mut page = Page::new(TITLE);
    page.push(Element::Text(INTRO.to_string()));

    let record = collector::collect(widgets, &mut page);
    page.push(Element::Subheader("Student Metrics".to_string()));
    page.push(collector::metrics_table(&record));
    page.push(Element::Button(PREDICT_BUTTON.to_string()));

    if !triggered {
        return Ok(page);
    }

    tracing::debug!("making prediction");
    let prediction = state.predictor.predict(&record)?;
    let confidence = prediction.confidence();
    tracing::info!(
        label = %prediction.label,
        confidence,
        "prediction made"
    );

    if db::persist(&state.database, &record, prediction.label, &mut page).await {
        page.success(SAVED);
    }

    page.push(Element::Subheader("Prediction Results".to_string()));
    let banner = format!("Prediction: {}", prediction.label);
    match prediction.label {
        Label::Pass => page.success(banner),
        Label::Fail => page.error(banner),
    }
    page.push(Element::Metric {
        label: "Confidence".to_string(),
        value: format!("{confidence:.1}%"),
    });
    page.push(Element::Progress(progress_percent(confidence)));

    Ok(page)
}

fn progress_percent(confidence: f64) -> u8 {
    confidence.clamp(0.0, 100.0).trunc() as u8
}
