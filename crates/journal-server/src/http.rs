//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::FormRejection,
        Multipart, Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};

use journal_core::{
    AuthorDashboard, Command, EditorDashboard, Journal, JournalError, ManuscriptId,
    ManuscriptUpload, Operation, Outcome, ReaderDashboard, Registration, ReviewForm,
    ReviewHistory, ReviewerDashboard, Role, SubmissionForm, UserId, UserSummary,
};

use crate::auth::{expired_cookie, session_cookie, Session};
use crate::error::ApiError;
use crate::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// Parse a manuscript id from the path; anything non-numeric is simply absent
fn manuscript_id(raw: &str) -> ApiResult<ManuscriptId> {
    ManuscriptId::parse(raw)
        .ok_or_else(|| JournalError::NotFound(format!("Manuscript {}", raw)).into())
}

/// Body rejections surface only after the session check, as a validation error
fn malformed_form(rejection: FormRejection) -> ApiError {
    JournalError::Validation(format!("malformed form: {}", rejection.body_text())).into()
}

fn malformed_upload(detail: String) -> ApiError {
    JournalError::Validation(format!("malformed upload: {}", detail)).into()
}

// ==================== Session ====================

/// Who is calling and where they belong
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub authenticated: bool,
    pub user_id: Option<UserId>,
    pub role: Role,
    pub dashboard: &'static str,
}

/// Current session, or the anonymous reader
pub async fn index(session: Session) -> Json<SessionInfo> {
    Json(SessionInfo {
        authenticated: session.actor.is_authenticated(),
        user_id: session.actor.user_id,
        role: session.actor.role,
        dashboard: session.actor.role.dashboard_path(),
    })
}

/// Fields the registration endpoint expects
pub async fn register_form() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "fields": ["username", "password", "role", "email"],
        "roles": [Role::Author, Role::Reviewer, Role::Editor],
    }))
}

/// Register a new author, reviewer or editor
pub async fn register(
    State(state): State<Arc<AppState>>,
    Form(registration): Form<Registration>,
) -> ApiResult<(StatusCode, Json<UserSummary>)> {
    let mut journal = state.journal.write().await;
    let user = journal.register_user(registration)?;
    Ok((StatusCode::CREATED, Json(UserSummary::from(&user))))
}

/// Fields the login endpoint expects
pub async fn login_form() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "fields": ["username", "password"] }))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
    pub dashboard: &'static str,
}

/// Check credentials and start a session
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(request): Form<LoginRequest>,
) -> ApiResult<Response> {
    let user = {
        let journal = state.journal.read().await;
        journal.authenticate(&request.username, &request.password)?
    };

    let token = state.sessions.create(Journal::actor_for(&user)).await;
    let cookie = session_cookie(&state.config.session.cookie_name, &token);

    let body = LoginResponse {
        token,
        dashboard: user.role.dashboard_path(),
        user: UserSummary::from(&user),
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// End the session and send the caller back to the login page
pub async fn logout(State(state): State<Arc<AppState>>, session: Session) -> Response {
    if let Some(token) = &session.token {
        state.sessions.remove(token).await;
        tracing::info!(user_id = ?session.actor.user_id, "Logged out");
    }
    let cookie = expired_cookie(&state.config.session.cookie_name);
    ([(header::SET_COOKIE, cookie)], Redirect::to("/login")).into_response()
}

// ==================== Dashboards ====================

pub async fn author_dashboard(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> ApiResult<Json<AuthorDashboard>> {
    let actor = session.require(Operation::ViewAuthorDashboard)?;
    let journal = state.journal.read().await;
    Ok(Json(journal.author_dashboard(&actor)?))
}

pub async fn reviewer_dashboard(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> ApiResult<Json<ReviewerDashboard>> {
    let actor = session.require(Operation::ViewReviewerDashboard)?;
    let journal = state.journal.read().await;
    Ok(Json(journal.reviewer_dashboard(&actor)?))
}

pub async fn editor_dashboard(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> ApiResult<Json<EditorDashboard>> {
    let actor = session.require(Operation::ViewEditorDashboard)?;
    let journal = state.journal.read().await;
    Ok(Json(journal.editor_dashboard(&actor)?))
}

/// Accepted manuscripts, no login needed
pub async fn reader_dashboard(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> ApiResult<Json<ReaderDashboard>> {
    let journal = state.journal.read().await;
    Ok(Json(journal.reader_dashboard(&session.actor)?))
}

pub async fn view_reviews(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<Json<ReviewHistory>> {
    let actor = session.require(Operation::ViewReviews)?;
    let id = manuscript_id(&id)?;
    let journal = state.journal.read().await;
    Ok(Json(journal.review_history(&actor, id)?))
}

// ==================== Workflow ====================

pub async fn submission_form(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> ApiResult<Json<SubmissionForm>> {
    let actor = session.require(Operation::SubmitManuscript)?;
    let journal = state.journal.read().await;
    Ok(Json(journal.submission_form(&actor)?))
}

/// Accept a multipart submission: `title`, `abstract` and the `manuscript` file
pub async fn submit_manuscript(
    State(state): State<Arc<AppState>>,
    session: Session,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Outcome>)> {
    let actor = session.require(Operation::SubmitManuscript)?;
    let mut multipart = multipart.map_err(|e| malformed_upload(e.body_text()))?;

    let mut title = String::new();
    let mut abstract_text = String::new();
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(field_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => title = field.text().await.map_err(field_error)?,
            "abstract" => abstract_text = field.text().await.map_err(field_error)?,
            "manuscript" => {
                let file_name = field.file_name().unwrap_or("manuscript").to_string();
                let bytes = field.bytes().await.map_err(field_error)?;
                file = Some(ManuscriptUpload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            other => tracing::debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    let mut journal = state.journal.write().await;
    let outcome = journal.execute(
        &actor,
        Command::SubmitManuscript {
            title,
            abstract_text,
            file,
        },
    )?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

fn field_error(err: MultipartError) -> ApiError {
    malformed_upload(err.body_text())
}

pub async fn review_form(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<Json<ReviewForm>> {
    let actor = session.require(Operation::RecordDecision)?;
    let id = manuscript_id(&id)?;
    let journal = state.journal.read().await;
    Ok(Json(journal.review_form(&actor, id)?))
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub decision: String,
}

/// Record a reviewer's feedback and decision
pub async fn submit_review(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
    form: Result<Form<ReviewRequest>, FormRejection>,
) -> ApiResult<(StatusCode, Json<Outcome>)> {
    let actor = session.require(Operation::RecordDecision)?;
    let Form(request) = form.map_err(malformed_form)?;
    let manuscript_id = manuscript_id(&id)?;

    let mut journal = state.journal.write().await;
    let outcome = journal.execute(
        &actor,
        Command::RecordDecision {
            manuscript_id,
            feedback: request.feedback,
            decision: request.decision,
        },
    )?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    #[serde(default)]
    pub manuscript_id: String,
    #[serde(default)]
    pub reviewer_id: String,
}

/// Editor takes a manuscript and names its reviewer
pub async fn assign_reviewer(
    State(state): State<Arc<AppState>>,
    session: Session,
    form: Result<Form<AssignRequest>, FormRejection>,
) -> ApiResult<Json<Outcome>> {
    let actor = session.require(Operation::AssignReviewer)?;
    let Form(request) = form.map_err(malformed_form)?;

    let raw = request.manuscript_id.trim();
    if raw.is_empty() {
        return Err(JournalError::Validation("manuscriptId is required".to_string()).into());
    }
    let manuscript_id = manuscript_id(raw)?;

    let reviewer = request.reviewer_id.trim();
    let reviewer_id = if reviewer.is_empty() {
        None
    } else {
        let id = reviewer.parse::<i64>().map_err(|_| {
            JournalError::Validation(format!("reviewerId is not a user id: {}", reviewer))
        })?;
        Some(UserId(id))
    };

    let mut journal = state.journal.write().await;
    let outcome = journal.execute(
        &actor,
        Command::AssignReviewer {
            manuscript_id,
            reviewer_id,
        },
    )?;
    Ok(Json(outcome))
}

// ==================== Files ====================

/// Stream a manuscript's stored file
pub async fn download(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = manuscript_id(&id)?;
    let download = {
        let journal = state.journal.read().await;
        journal.download(&session.actor, id)?
    };

    let disposition = format!("attachment; filename=\"{}\"", download.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.bytes,
    )
        .into_response())
}

/// Manuscript report as a CSV attachment
///
/// Served at `/export-excel`, the path existing clients already call, even
/// though the body is CSV.
pub async fn export_report(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> ApiResult<Response> {
    let actor = session.require(Operation::ExportReport)?;
    let report = {
        let journal = state.journal.read().await;
        journal.export_report(&actor)?
    };
    let csv = report.to_csv()?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"manuscripts.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}
