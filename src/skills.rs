//! Handlers for student skill ratings.
//!
//! Thin create/update glue over the relational store: `GET` splits
//! class skills into rated and not-yet-rated sets, `POST` applies a
//! batch of rating submissions, updating existing ratings and
//! inserting new ones. The requesting user arrives as a
//! [`CurrentUser`] request extension installed by the application's
//! session middleware.

use crate::error::VerifyError;
use axum::{
    Extension, Json, Router,
    extract::State,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use utoipa::{OpenApi, ToSchema};

pub const SKILLS_PATH: &str = "/skills";

/// OpenAPI document for the skill routes; merge into your app's API docs.
#[derive(OpenApi)]
#[openapi(
    paths(skills_get, skills_submit),
    components(schemas(
        RatedSkill,
        ClassSkill,
        SkillsResponse,
        SkillRatingSubmission,
        SkillsSubmitResponse
    ))
)]
pub struct SkillsApi;

/// Identity of the requesting user.
///
/// Session handling is the application's responsibility; its
/// middleware must insert this extension before the skill routes run.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

/// A class skill the student has already rated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RatedSkill {
    /// Class skill being rated.
    pub class_skill_id: i64,
    /// Skill name.
    pub name: String,
    /// Self-rating as a 0.0-1.0 fraction.
    pub rating: f64,
}

/// A class skill available for rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClassSkill {
    /// Class skill identifier.
    pub class_skill_id: i64,
    /// Skill name.
    pub name: String,
}

/// Storage operations the skill routes need.
pub trait SkillBackend: Clone + Send + Sync + 'static {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Resolve a user to their student profile id, if one exists.
    fn student_id_for_user(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send;

    /// Skills the user has already rated.
    fn user_rated_skills(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<RatedSkill>, Self::Error>> + Send;

    /// All skills defined for the user's classes.
    fn class_skills(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<ClassSkill>, Self::Error>> + Send;

    /// Replace an existing rating.
    fn skill_rating_update(
        &self,
        student_id: &str,
        class_skill_id: i64,
        rating: f64,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Record a first-time rating.
    fn skill_rating_insert(
        &self,
        student_id: &str,
        class_skill_id: i64,
        rating: f64,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Returns routes for the skill rating endpoints.
pub fn skill_routes<B: SkillBackend>() -> Router<B> {
    Router::new().route(SKILLS_PATH, get(skills_get::<B>).post(skills_submit::<B>))
}

/// Response for the skill listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct SkillsResponse {
    /// Skills the user has rated.
    pub user_rated_skills: Vec<RatedSkill>,
    /// Class skills not yet rated by the user.
    pub class_skills: Vec<ClassSkill>,
}

/// One rating submitted by the rating widget.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SkillRatingSubmission {
    /// Class skill being rated.
    pub class_skill_id: i64,
    /// Rating percentage (0-100) as submitted; stored as a fraction.
    pub rating_percent: u8,
    /// Whether the student confirmed this rating. Unconfirmed entries
    /// are skipped.
    pub confirmed: bool,
}

/// Response for a batch submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct SkillsSubmitResponse {
    /// Number of ratings applied.
    pub applied: usize,
}

/// List the user's rated skills and the class skills still unrated.
#[utoipa::path(
    get,
    path = "/skills",
    responses(
        (status = OK, body = SkillsResponse),
        (status = INTERNAL_SERVER_ERROR, description = "Storage failure")
    )
)]
async fn skills_get<B: SkillBackend>(
    State(backend): State<B>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<SkillsResponse>, VerifyError> {
    let rated = backend
        .user_rated_skills(&user.0)
        .await
        .map_err(VerifyError::store)?;
    let class = backend
        .class_skills(&user.0)
        .await
        .map_err(VerifyError::store)?;

    // Already-rated skills drop out of the class list.
    let rated_ids: HashSet<i64> = rated.iter().map(|s| s.class_skill_id).collect();
    let unrated = class
        .into_iter()
        .filter(|s| !rated_ids.contains(&s.class_skill_id))
        .collect();

    Ok(Json(SkillsResponse {
        user_rated_skills: rated,
        class_skills: unrated,
    }))
}

/// Apply a batch of skill rating submissions.
#[utoipa::path(
    post,
    path = "/skills",
    request_body = Vec<SkillRatingSubmission>,
    responses(
        (status = OK, body = SkillsSubmitResponse),
        (status = INTERNAL_SERVER_ERROR, description = "Storage failure or missing profile")
    )
)]
async fn skills_submit<B: SkillBackend>(
    State(backend): State<B>,
    Extension(user): Extension<CurrentUser>,
    Json(submissions): Json<Vec<SkillRatingSubmission>>,
) -> Result<Json<SkillsSubmitResponse>, VerifyError> {
    let student_id = backend
        .student_id_for_user(&user.0)
        .await
        .map_err(VerifyError::store)?
        .ok_or_else(|| {
            VerifyError::IdentityResolution(format!("no student profile for user {}", user.0))
        })?;

    let rated_ids: HashSet<i64> = backend
        .user_rated_skills(&user.0)
        .await
        .map_err(VerifyError::store)?
        .iter()
        .map(|s| s.class_skill_id)
        .collect();

    let mut applied = 0;
    for submission in submissions {
        if !submission.confirmed {
            continue;
        }
        let rating = f64::from(submission.rating_percent.min(100)) / 100.0;
        if rated_ids.contains(&submission.class_skill_id) {
            backend
                .skill_rating_update(&student_id, submission.class_skill_id, rating)
                .await
                .map_err(VerifyError::store)?;
        } else {
            backend
                .skill_rating_insert(&student_id, submission.class_skill_id, rating)
                .await
                .map_err(VerifyError::store)?;
        }
        applied += 1;
    }

    Ok(Json(SkillsSubmitResponse { applied }))
}
