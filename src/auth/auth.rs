use crate::config::Config;
use crate::{auth::jwt::verify_token, model::role::Role};
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data,
};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub student_id: String,
    pub name: String,
    pub role: Role,
}

impl AuthUser {
    /// Resolve the caller from a bearer header value.
    pub fn from_bearer(header: Option<&str>, config: &Config) -> Result<Self, &'static str> {
        let token = header
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or("Missing token")?;

        let claims = verify_token(token, &config.jwt_secret).map_err(|_| "Invalid token")?;
        let role = Role::from_id(claims.role).ok_or("Invalid role")?;

        Ok(AuthUser {
            student_id: claims.sub,
            name: claims.name,
            role,
        })
    }

    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin only"))
        }
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        ready(AuthUser::from_bearer(header, config).map_err(ErrorUnauthorized))
    }
}
