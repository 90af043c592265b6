use crate::auth::claims::KeyKind;
use crate::auth::jwt::TokenError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============= Users & Roles =============

/// Role of a registered user. Stored explicitly on the user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "teacher" => Some(Role::Teacher),
            "student" => Some(Role::Student),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub password_hash: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
        }
    }
}

// ============= Authentication Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    /// Basic form validation, performed before any user lookup.
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(AppError::Validation("Email required".to_string()));
        }
        if self.password.is_empty() {
            return Err(AppError::Validation("Password required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Role,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(AppError::Validation("A valid email is required".to_string()));
        }
        if self.password.len() < 8 {
            return Err(AppError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub id: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Token pair returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub role: Role,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

// ============= Assignments =============

/// The three kinds of shareable records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentKind {
    Homework,
    Quiz,
    Attendance,
}

impl AssignmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentKind::Homework => "homework",
            AssignmentKind::Quiz => "quiz",
            AssignmentKind::Attendance => "attendance",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "homework" => Some(AssignmentKind::Homework),
            "quiz" => Some(AssignmentKind::Quiz),
            "attendance" => Some(AssignmentKind::Attendance),
            _ => None,
        }
    }

    /// Attendance records carry a presence PIN.
    pub fn uses_pin(&self) -> bool {
        matches!(self, AssignmentKind::Attendance)
    }
}

/// Whether anonymous link-holders may submit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    All,
    Registered,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::All => "all",
            Mode::Registered => "registered",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Mode::All),
            "registered" => Some(Mode::Registered),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub kind: AssignmentKind,
    pub title: String,
    pub content: String,
    pub course_title: String,
    pub max_grade: f64,
    pub mode: Mode,
    pub owner_id: Option<String>,
    /// Restricts the student link to members of this group
    pub group_id: Option<String>,
    pub student_link: String,
    pub teacher_link: String,
    pub pin: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAssignmentRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub course_title: String,
    #[serde(default)]
    pub max_grade: f64,
    #[serde(default)]
    pub mode: Mode,
    /// Group whose members alone may use the student link
    #[serde(default)]
    pub group_id: Option<String>,
}

impl CreateAssignmentRequest {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::InvalidInput("Title required".to_string()));
        }
        if self.max_grade < 0.0 {
            return Err(AppError::InvalidInput(
                "Max grade cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateAssignmentRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub course_title: Option<String>,
    pub max_grade: Option<f64>,
    pub mode: Option<Mode>,
}

impl UpdateAssignmentRequest {
    pub fn validate(&self) -> Result<()> {
        if matches!(&self.title, Some(t) if t.trim().is_empty()) {
            return Err(AppError::InvalidInput("Title cannot be empty".to_string()));
        }
        if matches!(self.max_grade, Some(g) if g < 0.0) {
            return Err(AppError::InvalidInput(
                "Max grade cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returned once at creation: the only time both links are handed out together.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedAssignment {
    pub id: String,
    pub kind: AssignmentKind,
    pub student_link: String,
    pub teacher_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PinResponse {
    pub pin: String,
}

/// Assignment as rendered to a caller; optional fields are populated according
/// to the access scope the caller was granted.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignmentView {
    pub id: String,
    pub kind: AssignmentKind,
    pub title: String,
    pub content: String,
    pub course_title: String,
    pub max_grade: f64,
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submissions: Option<Vec<Submission>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignmentList {
    pub items: Vec<AssignmentView>,
    pub total: usize,
}

// ============= Groups =============

/// A class of students, owned by a teacher and shareable with co-teachers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    /// Link other teachers accept to join as co-teachers
    pub share_link: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GroupRequest {
    pub name: String,
}

impl GroupRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidInput("Group name required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddMembersRequest {
    pub user_ids: Vec<String>,
}

/// Group as rendered to a caller. Members and the share link are only
/// shown to the group's teachers.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GroupView {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub students: Option<Vec<UserProfile>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teachers: Option<Vec<UserProfile>>,
    pub created_at: i64,
}

impl GroupView {
    /// Name and owner only.
    pub fn summary(group: Group) -> Self {
        Self {
            id: group.id,
            name: group.name,
            owner_id: group.owner_id,
            share_link: None,
            students: None,
            teachers: None,
            created_at: group.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GroupList {
    pub items: Vec<GroupView>,
    pub total: usize,
}

// ============= Submissions =============

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Submission {
    pub id: String,
    pub assignment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    pub student_name: String,
    pub response: String,
    pub present: bool,
    pub grade: Option<f64>,
    pub comments: String,
    pub submitted_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateSubmissionRequest {
    /// Display name, required for anonymous submissions.
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub response: String,
    /// Attendance PIN shown in class.
    #[serde(default)]
    pub pin: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateSubmissionRequest {
    pub response: Option<String>,
    pub grade: Option<f64>,
    pub comments: Option<String>,
    pub present: Option<bool>,
}

impl UpdateSubmissionRequest {
    /// True when the update touches fields only the grader may set.
    pub fn touches_grading(&self) -> bool {
        self.grade.is_some() || self.comments.is_some() || self.present.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmissionList {
    pub items: Vec<Submission>,
    pub total: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct LinkQuery {
    pub link: Option<String>,
}

/// Timestamp helper shared by the store and tests.
pub fn now_ts() -> i64 {
    Utc::now().timestamp()
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("{0}")]
    Token(#[from] TokenError),

    #[error("Wrong token type: expected {expected} token, got {found} token")]
    WrongTokenKind { expected: KeyKind, found: KeyKind },

    #[error("Incorrect password or email")]
    CredentialMismatch,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;

        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Token(TokenError::Malformed(_)) => StatusCode::BAD_REQUEST,
            AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::WrongTokenKind { .. } => StatusCode::BAD_REQUEST,
            AppError::CredentialMismatch | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Message safe to show to clients.
    fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "Internal server error".to_string(),
            AppError::Token(err) => err.to_string(),
            AppError::WrongTokenKind { .. } => "Wrong token type".to_string(),
            AppError::CredentialMismatch => self.to_string(),
            AppError::Unauthorized(msg)
            | AppError::Validation(msg)
            | AppError::InvalidInput(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": self.public_message()
        });

        let mut response = (status, axum::Json(body)).into_response();

        if matches!(
            self,
            AppError::Token(TokenError::Expired | TokenError::SignatureInvalid)
        ) {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer error=\"invalid_token\""),
            );
        }

        response
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
