use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, patch, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{ProfileField, UnknownField},
    pdf::{generate_pdf, PdfError},
    pipeline::{Pipeline, PipelineError},
    render::{self, PageError, Renderer},
    session::{GenerationState, Session},
};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub renderer: Arc<Renderer>,
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    UnknownField(#[from] UnknownField),
    #[error("session {0} has no completed portfolio yet")]
    NotComplete(Uuid),
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    Pdf(#[from] PdfError),
}

impl RouteError {
    fn status(&self) -> StatusCode {
        match self {
            RouteError::Pipeline(PipelineError::SessionNotFound(_)) => StatusCode::NOT_FOUND,
            RouteError::Pipeline(PipelineError::CycleInFlight) | RouteError::NotComplete(_) => StatusCode::CONFLICT,
            RouteError::UnknownField(_) => StatusCode::BAD_REQUEST,
            RouteError::Page(_) | RouteError::Pdf(_) => {
                tracing::error!("❌ {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// [`RouteError`] on the browser routes: same status, HTML body.
#[derive(Debug)]
pub struct HtmlError(RouteError);

impl From<RouteError> for HtmlError {
    fn from(e: RouteError) -> Self {
        Self(e)
    }
}

impl From<PipelineError> for HtmlError {
    fn from(e: PipelineError) -> Self {
        Self(e.into())
    }
}

impl From<PageError> for HtmlError {
    fn from(e: PageError) -> Self {
        Self(e.into())
    }
}

impl From<PdfError> for HtmlError {
    fn from(e: PdfError) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for HtmlError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let reason = status.canonical_reason().unwrap_or("Error");
        (status, Html(render::failure_page(status.as_u16(), reason, &self.0.to_string()))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/s/:id", get(show_page))
        .route("/s/:id/generate", post(submit_generate))
        .route("/s/:id/reset", post(submit_reset))
        .route("/s/:id/portfolio.pdf", get(export_pdf))
        .route("/assets/:file", get(asset))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/profile", patch(update_profile))
        .route("/api/sessions/:id/generate", post(trigger_generation))
        .route("/api/sessions/:id/reset", post(reset_session))
        .with_state(state)
}

fn snapshot(state: &AppState, id: Uuid) -> Result<Session, RouteError> {
    state.pipeline.store().snapshot(id).ok_or(RouteError::Pipeline(PipelineError::SessionNotFound(id)))
}

fn page_url(id: Uuid) -> String {
    format!("/s/{}", id)
}

// --- HTML surface ---

pub async fn index(State(state): State<AppState>) -> Redirect {
    let session = state.pipeline.store().create();
    Redirect::to(&page_url(session.id))
}

pub async fn show_page(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Html<String>, HtmlError> {
    let session = snapshot(&state, id)?;
    Ok(Html(state.renderer.page(&session)?))
}

/// Form body of the intake page. Fields left out of the submission are kept as they are.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    interests: Option<String>,
    style_icons: Option<String>,
    fashion: Option<String>,
    movies: Option<String>,
    art: Option<String>,
    photography_style: Option<String>,
}

impl ProfileForm {
    fn into_updates(self) -> Vec<(ProfileField, String)> {
        [
            (ProfileField::Interests, self.interests),
            (ProfileField::StyleIcons, self.style_icons),
            (ProfileField::Fashion, self.fashion),
            (ProfileField::Movies, self.movies),
            (ProfileField::Art, self.art),
            (ProfileField::PhotographyStyle, self.photography_style),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
        .collect()
    }
}

pub async fn submit_generate(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect, HtmlError> {
    let store = state.pipeline.store();
    for (field, value) in form.into_updates() {
        store
            .update_profile_field(id, field, value)
            .ok_or(PipelineError::SessionNotFound(id))?;
    }
    match state.pipeline.trigger(id) {
        // A double submit lands on the page that is already loading.
        Ok(_) | Err(PipelineError::CycleInFlight) => Ok(Redirect::to(&page_url(id))),
        Err(e) => Err(e.into()),
    }
}

pub async fn submit_reset(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Redirect, HtmlError> {
    state.pipeline.reset(id)?;
    Ok(Redirect::to(&page_url(id)))
}

pub async fn export_pdf(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Response, HtmlError> {
    let session = snapshot(&state, id)?;
    let GenerationState::Complete { direction, .. } = &session.state else {
        return Err(RouteError::NotComplete(id).into());
    };
    let pdf_bytes = generate_pdf(direction)?;
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"portfolio_{}.pdf\"", id)),
    ];
    Ok((StatusCode::OK, headers, pdf_bytes).into_response())
}

pub async fn asset(Path(file): Path<String>) -> Response {
    match render::asset(&file) {
        Some((mime, body)) => ([(header::CONTENT_TYPE, mime)], body).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// --- JSON surface ---

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub field: String,
    pub value: String,
}

pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<Session>) {
    (StatusCode::CREATED, Json(state.pipeline.store().create()))
}

pub async fn get_session(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<Session>, RouteError> {
    Ok(Json(snapshot(&state, id)?))
}

pub async fn update_profile(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<Session>, RouteError> {
    let field: ProfileField = body.field.parse()?;
    let session = state
        .pipeline
        .store()
        .update_profile_field(id, field, body.value)
        .ok_or(RouteError::Pipeline(PipelineError::SessionNotFound(id)))?;
    Ok(Json(session))
}

pub async fn trigger_generation(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Session>), RouteError> {
    let session = state.pipeline.trigger(id)?;
    Ok((StatusCode::ACCEPTED, Json(session)))
}

pub async fn reset_session(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<Session>, RouteError> {
    Ok(Json(state.pipeline.reset(id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedModel;
    use crate::session::SessionStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app_state(model: ScriptedModel) -> AppState {
        AppState {
            pipeline: Pipeline::new(SessionStore::new(), Arc::new(model)),
            renderer: Arc::new(Renderer::new().unwrap()),
        }
    }

    async fn send(state: &AppState, req: Request<Body>) -> (StatusCode, Vec<u8>, Option<String>) {
        let resp = router(state.clone()).oneshot(req).await.unwrap();
        let status = resp.status();
        let location = resp
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec();
        (status, body, location)
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::post(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn creates_and_fetches_sessions() {
        let state = app_state(ScriptedModel::succeeding());
        let (status, body, _) = send(&state, post("/api/sessions")).await;
        assert_eq!(status, StatusCode::CREATED);
        let created = json_body(&body);
        assert_eq!(created["state"]["status"], "idle");
        assert_eq!(created["profile"]["styleIcons"], "Tang Wei, Gong Li");

        let id = created["id"].as_str().unwrap();
        let (status, body, _) = send(&state, Request::get(format!("/api/sessions/{id}")).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["id"], created["id"]);
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        let state = app_state(ScriptedModel::succeeding());
        let uri = format!("/api/sessions/{}", Uuid::new_v4());
        let (status, _, _) = send(&state, Request::get(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patches_one_profile_field() {
        let state = app_state(ScriptedModel::succeeding());
        let id = state.pipeline.store().create().id;

        let req = Request::patch(format!("/api/sessions/{id}/profile"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"field":"photographyStyle","value":"grain and flash"}"#))
            .unwrap();
        let (status, body, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["profile"]["photographyStyle"], "grain and flash");

        let req = Request::patch(format!("/api/sessions/{id}/profile"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"field":"shoes","value":"x"}"#))
            .unwrap();
        let (status, _, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn generate_is_accepted_then_conflicts_while_in_flight() {
        let model = ScriptedModel::succeeding().gated_image();
        let gate = model.image_gate();
        let state = app_state(model);
        let id = state.pipeline.store().create().id;

        let (status, body, _) = send(&state, post(&format!("/api/sessions/{id}/generate"))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json_body(&body)["state"]["status"], "analyzing");

        let (status, _, _) = send(&state, post(&format!("/api/sessions/{id}/generate"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        gate.notify_one();
    }

    #[tokio::test]
    async fn generate_without_credential_reports_error_state() {
        let state = app_state(ScriptedModel::succeeding().without_credential());
        let id = state.pipeline.store().create().id;

        let (status, body, _) = send(&state, post(&format!("/api/sessions/{id}/generate"))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let body = json_body(&body);
        assert_eq!(body["state"]["status"], "error");
        assert_eq!(body["state"]["message"], crate::pipeline::FAILURE_MESSAGE);

        let (status, body, _) = send(&state, post(&format!("/api/sessions/{id}/reset"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["state"]["status"], "idle");
    }

    #[tokio::test]
    async fn browser_routes_answer_errors_with_a_page() {
        let state = app_state(ScriptedModel::succeeding());
        let missing = Uuid::new_v4();

        let resp = router(state.clone())
            .oneshot(Request::get(format!("/s/{missing}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(resp.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
        let body = String::from_utf8(to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap();
        assert!(body.contains("404 · Not Found"));
        assert!(body.contains(&format!("session {missing} not found")));
        assert!(body.contains("Start a new session"));
        assert!(!body.contains(r#"{"error""#));

        let (status, body, _) = send(&state, post(&format!("/s/{missing}/reset"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(String::from_utf8(body).unwrap().contains("Start a new session"));

        let (status, body, _) = send(&state, Request::get(format!("/api/sessions/{missing}")).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json_body(&body)["error"], format!("session {missing} not found"));
    }

    #[tokio::test]
    async fn index_redirects_to_a_new_session_page() {
        let state = app_state(ScriptedModel::succeeding());
        let (status, _, location) = send(&state, Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        let location = location.unwrap();
        let id: Uuid = location.trim_start_matches("/s/").parse().unwrap();
        assert!(state.pipeline.store().snapshot(id).is_some());

        let (status, body, _) = send(&state, Request::get(location).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("Define Your Essence"));
    }

    #[tokio::test]
    async fn form_submit_updates_profile_and_triggers() {
        let state = app_state(ScriptedModel::succeeding().gated_image());
        let id = state.pipeline.store().create().id;

        let req = Request::post(format!("/s/{id}/generate"))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("movies=Chungking+Express&art="))
            .unwrap();
        let (status, _, location) = send(&state, req).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.unwrap(), format!("/s/{id}"));

        let session = state.pipeline.store().snapshot(id).unwrap();
        assert_eq!(session.profile.movies, "Chungking Express");
        assert_eq!(session.profile.art, "");
        assert_eq!(session.profile.fashion, "YSL style (sharp, elegant, black)");
        assert!(session.state.is_in_flight());
    }

    #[tokio::test]
    async fn pdf_export_requires_a_complete_portfolio() {
        let state = app_state(ScriptedModel::succeeding());
        let id = state.pipeline.store().create().id;

        let uri = format!("/s/{id}/portfolio.pdf");
        let (status, _, _) = send(&state, Request::get(&uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let ticket = state.pipeline.start(id).unwrap().ticket.unwrap();
        state.pipeline.run(ticket).await;

        let resp = router(state.clone()).oneshot(Request::get(&uri).body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(body.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn serves_embedded_stylesheet() {
        let state = app_state(ScriptedModel::succeeding());
        let resp = router(state).oneshot(Request::get("/assets/style.css").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/css; charset=utf-8");
    }
}
