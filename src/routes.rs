use crate::{
    api::{admin, attendance, reward},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

/// Mount point of the protected API; the OpenAPI paths assume it.
pub const API_PREFIX: &str = "/api";

// Helper to build per-scope limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(60_000 / u64::from(requests_per_min))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .wrap(build_limiter(config.rate_login_per_min))
            .service(web::resource("/register").route(web::post().to(handlers::register)))
            .service(web::resource("/login").route(web::post().to(handlers::login))),
    );

    // Protected routes
    cfg.service(
        web::scope(API_PREFIX)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(build_limiter(config.rate_protected_per_min)) // rate limiting
            .service(web::resource("/profile").route(web::get().to(handlers::profile)))
            .configure(attendance::configure)
            .configure(reward::configure)
            .configure(admin::configure),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::ApiDoc;
    use utoipa::OpenApi;

    #[test]
    fn documented_paths_live_under_the_mounted_scopes() {
        let doc = ApiDoc::openapi();
        for path in doc.paths.paths.keys() {
            assert!(
                path.starts_with("/auth/") || path.starts_with(&format!("{API_PREFIX}/")),
                "{path}"
            );
        }
    }
}
