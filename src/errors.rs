use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};

use crate::JsonResponse;

pub const LOGIN_URL: &str = "/auth/login/";

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("not found: {0}")]
    NotFound(&'static str),
    /// The route needs a signed in viewer. Carries the path to come back to.
    #[error("login required for {0}")]
    LoginRequired(String),
    #[error("not authorized: {0}")]
    NotAuthorized(&'static str),
    #[error("{0}")]
    RunTimeError(&'static str),
    #[error("internal server error")]
    ServerError,
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct RequestErrorJsonWrapper {
    pub errors: RequestErrorJson,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct RequestErrorJson {
    pub body: Vec<String>,
}

impl RequestErrorJsonWrapper {
    pub fn new(error: &str) -> RequestErrorJsonWrapper {
        RequestErrorJsonWrapper {
            errors: RequestErrorJson {
                body: vec![error.to_string()],
            },
        }
    }
}

impl RequestError {
    pub fn is_unique_violation(&self) -> bool {
        match self {
            RequestError::DatabaseError(sqlx::Error::Database(e)) => {
                e.message().contains("UNIQUE constraint failed")
            }
            _ => false,
        }
    }

    pub fn to_json_response(&self) -> JsonResponse<RequestErrorJsonWrapper> {
        let (status_code, json) = match self {
            RequestError::NotFound(message) => {
                (StatusCode::NOT_FOUND, RequestErrorJsonWrapper::new(message))
            }
            RequestError::LoginRequired(_) => (
                StatusCode::UNAUTHORIZED,
                RequestErrorJsonWrapper::new("Need to be authorized"),
            ),
            RequestError::NotAuthorized(message) => (
                StatusCode::UNAUTHORIZED,
                RequestErrorJsonWrapper::new(message),
            ),
            RequestError::RunTimeError(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                RequestErrorJsonWrapper::new(message),
            ),
            RequestError::ServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                RequestErrorJsonWrapper::new("Internal Server Error"),
            ),
            RequestError::DatabaseError(e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    RequestErrorJsonWrapper::new("Internal Server Error"),
                )
            }
            RequestError::Internal(e) => {
                tracing::error!(error = ?e, "unhandled error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    RequestErrorJsonWrapper::new("Internal Server Error"),
                )
            }
        };
        (status_code, Json(json))
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        match self {
            RequestError::LoginRequired(next) => login_redirect(&next).into_response(),
            error => error.to_json_response().into_response(),
        }
    }
}

pub fn login_redirect(next: &str) -> Redirect {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    Redirect::to(&format!("{}?{}", LOGIN_URL, query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    #[test]
    fn login_required_redirects_with_next() {
        let response = RequestError::LoginRequired("/new/".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/auth/login/?next=%2Fnew%2F"
        );
    }

    #[test]
    fn next_keeps_its_own_query() {
        let response = login_redirect("/follow/?page=2&x=a b");
        assert_eq!(
            response.into_response().headers().get(LOCATION).unwrap(),
            "/auth/login/?next=%2Ffollow%2F%3Fpage%3D2%26x%3Da+b"
        );
    }

    #[test]
    fn not_found_maps_to_404() {
        let (status, Json(body)) = RequestError::NotFound("Group not found").to_json_response();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.errors.body, vec!["Group not found".to_string()]);
    }

    #[test]
    fn database_errors_hide_details() {
        let (status, Json(body)) =
            RequestError::DatabaseError(sqlx::Error::RowNotFound).to_json_response();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.errors.body, vec!["Internal Server Error".to_string()]);
    }
}
