use std::future::{ready, Ready};

use actix_web::{dev::Payload, error::InternalError, FromRequest, HttpRequest, HttpResponse};

use crate::api::validation::ErrorResponse;

/// Header carrying the authenticated caller id, injected by the upstream
/// identity gateway.
pub const CALLER_ID_HEADER: &str = "X-Caller-Id";

/// Authenticated caller, extracted from [`CALLER_ID_HEADER`].
///
/// This service trusts the gateway; a missing or empty header is answered
/// with 401 before any handler runs.
#[derive(Debug, Clone)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl FromRequest for CallerIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let caller = req
            .headers()
            .get(CALLER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty());

        match caller {
            Some(id) => ready(Ok(CallerIdentity(id.to_string()))),
            None => {
                let body = ErrorResponse {
                    error: "Authentication required".to_string(),
                    fields: serde_json::json!({
                        "message": format!("Missing {} header", CALLER_ID_HEADER)
                    }),
                };
                ready(Err(InternalError::from_response(
                    "",
                    HttpResponse::Unauthorized().json(body),
                )
                .into()))
            }
        }
    }
}
