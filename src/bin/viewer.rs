use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Header set by the authenticating proxy in front of the service.
pub const VIEWER_HEADER: &str = "x-viewer-id";

/// Who is looking at a response. Passed explicitly to every editor and
/// projection call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Viewer {
    #[default]
    Anonymous,
    User(i32),
}

impl Viewer {
    pub fn user_id(&self) -> Option<i32> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(id) => Some(*id),
        }
    }

    pub fn require_user(&self) -> Result<i32, AppError> {
        self.user_id().ok_or(AppError::Unauthorized)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(VIEWER_HEADER) else {
            return Ok(Viewer::Anonymous);
        };

        value
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<i32>().ok())
            .map(Viewer::User)
            .ok_or(AppError::Unauthorized)
    }
}
