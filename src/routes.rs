use crate::{
    api::{self, balance, employee, leave_request},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Per-route limiter, `requests_per_min` spread evenly with the full minute as burst.
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        // finish() only fails on a zero period or burst, both clamped above
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.service(api::health);

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter)
                    .route(web::post().to(handlers::register)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // fixed segments before /{id}
                    .service(web::resource("/mine").route(web::get().to(leave_request::my_leaves)))
                    .service(web::resource("/stats").route(web::get().to(leave_request::leave_stats)))
                    // /leave/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave_request::get_leave))
                            .route(web::delete().to(leave_request::delete_leave)),
                    )
                    // /leave/{id}/status
                    .service(
                        web::resource("/{id}/status")
                            .route(web::put().to(leave_request::update_leave_status)),
                    ),
            )
            .service(
                web::scope("/employee")
                    .service(web::resource("").route(web::get().to(employee::list_employees)))
                    .service(
                        web::resource("/pending").route(web::get().to(employee::pending_employees)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(employee::approve_employee)),
                    ),
            )
            .service(
                web::scope("/balance")
                    .service(web::resource("").route(web::get().to(balance::list_balances)))
                    .service(
                        web::resource("/{employee_id}").route(web::get().to(balance::get_balance)),
                    ),
            ),
    );
}
