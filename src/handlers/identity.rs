//! Caller identity, as asserted by the upstream auth gateway.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use uuid::Uuid;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";
pub const ADMIN_ROLE: &str = "ADMIN";

/// The user making the request, from the `X-User-Id` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

/// A caller with `X-User-Role: ADMIN`.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub Uuid);

fn user_id(req: &HttpRequest) -> Result<Uuid, AppError> {
    req.headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or(AppError::Unauthorized)
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(user_id(req).map(AuthenticatedUser))
    }
}

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = user_id(req).and_then(|id| {
            let is_admin = req
                .headers()
                .get(USER_ROLE_HEADER)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|role| role.trim().eq_ignore_ascii_case(ADMIN_ROLE));
            if is_admin {
                Ok(AdminUser(id))
            } else {
                Err(AppError::Forbidden)
            }
        });
        ready(result)
    }
}
