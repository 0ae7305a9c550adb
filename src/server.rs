use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};

use crate::app::{self, AppState};
use crate::collector::WidgetState;
use crate::page::{self, Page};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(show_form).post(submit_form))
        .with_state(state)
}

pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[tracing::instrument(name = "GET /", skip_all)]
async fn show_form(
    State(state): State<AppState>,
    Query(widgets): Query<WidgetState>,
) -> (StatusCode, Html<String>) {
    respond(app::handle(&state, &widgets, false).await)
}

#[tracing::instrument(name = "POST /", skip_all)]
async fn submit_form(
    State(state): State<AppState>,
    Form(widgets): Form<WidgetState>,
) -> (StatusCode, Html<String>) {
    respond(app::handle(&state, &widgets, true).await)
}

fn respond(outcome: crate::predictor::ModelResult<Page>) -> (StatusCode, Html<String>) {
    match outcome {
        Ok(page) => (StatusCode::OK, Html(page::render_html(&page))),
        Err(err) => {
            tracing::error!(error = %err, "prediction failed");
            let mut page = Page::new(app::TITLE);
            page.error(format!("Prediction failed: {err}"));
            (StatusCode::INTERNAL_SERVER_ERROR, Html(page::render_html(&page)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    use crate::db::tests::unreachable_settings;
    use crate::predictor::tests::LOGISTIC_ARTIFACT;
    use crate::predictor::Predictor;

    fn test_router(dir: &tempfile::TempDir) -> Router {
        let predictor = Predictor::from_json(LOGISTIC_ARTIFACT).expect("valid artifact");
        router(AppState::new(predictor, unreachable_settings(dir)))
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    #[tokio::test]
    async fn get_renders_form_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = test_router(&dir)
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("name=\"attendance\""));
        assert!(body.contains("value=\"85\""));
        assert!(body.contains("Predict Performance"));
        assert!(!body.contains("Prediction Results"));
    }

    #[tokio::test]
    async fn get_echoes_query_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = test_router(&dir)
            .oneshot(
                Request::builder()
                    .uri("/?library_visits=42&outstanding_balance=450000")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        let body = body_text(response).await;
        assert!(body.contains("<td>42</td>"));
        assert!(body.contains("<option value=\"450000\" selected>"));
    }

    #[tokio::test]
    async fn post_predicts_even_when_save_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = test_router(&dir)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(
                        "attendance=85&assignment_score=75&midterm_score=65\
                         &final_score=70&outstanding_balance=0&library_visits=20",
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Failed to save prediction"));
        assert!(body.contains("Prediction: Pass"));
        assert!(body.contains("<progress max=\"100\""));
    }
}
