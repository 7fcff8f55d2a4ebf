use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use quiz_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    {
        let state = app_state.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(60)).await;
                state.attempt_service.sweep_stale().await;
            }
        });
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let public_api = Router::new()
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/quizzes", get(routes::quiz::list_quizzes))
        .route("/api/quizzes/:id", get(routes::quiz::get_quiz))
        .route(
            "/api/quizzes/:id/questions",
            get(routes::quiz::list_quiz_questions),
        )
        .layer(axum::middleware::from_fn_with_state(
            quiz_backend::middleware::rate_limit::new_rps_state(config.public_rps),
            quiz_backend::middleware::rate_limit::rps_middleware,
        ));

    let session_api = Router::new()
        .route(
            "/api/quizzes/:id/session",
            post(routes::attempt::create_session)
                .get(routes::attempt::session_status)
                .delete(routes::attempt::abandon_session),
        )
        .route(
            "/api/quizzes/:id/session/start",
            post(routes::attempt::start_session),
        )
        .route(
            "/api/quizzes/:id/session/answer",
            axum::routing::put(routes::attempt::save_answer),
        )
        .route(
            "/api/quizzes/:id/session/advance",
            post(routes::attempt::advance_question),
        )
        .route(
            "/api/quizzes/:id/session/retreat",
            post(routes::attempt::retreat_question),
        )
        .route(
            "/api/quizzes/:id/session/submit",
            post(routes::attempt::submit_session),
        )
        .route("/api/results", get(routes::profile::list_my_results))
        .route(
            "/api/profile",
            get(routes::profile::get_profile).put(routes::profile::update_profile),
        )
        .layer(axum::middleware::from_fn(
            quiz_backend::middleware::auth::require_auth,
        ))
        .layer(axum::middleware::from_fn_with_state(
            quiz_backend::middleware::rate_limit::new_rps_state(config.api_rps),
            quiz_backend::middleware::rate_limit::rps_middleware,
        ));

    let admin_api = Router::new()
        .route(
            "/api/admin/quizzes",
            get(routes::admin::list_quizzes).post(routes::admin::create_quiz),
        )
        .route(
            "/api/admin/quizzes/:id",
            axum::routing::put(routes::admin::update_quiz).delete(routes::admin::delete_quiz),
        )
        .route(
            "/api/admin/quizzes/:id/publish",
            axum::routing::put(routes::admin::publish_quiz),
        )
        .route(
            "/api/admin/questions",
            post(routes::admin::create_question),
        )
        .route(
            "/api/admin/questions/:id",
            axum::routing::put(routes::admin::update_question)
                .delete(routes::admin::delete_question),
        )
        .route("/api/admin/users", get(routes::admin::list_users))
        .route(
            "/api/admin/users/:id",
            get(routes::admin::get_user)
                .put(routes::admin::update_user)
                .delete(routes::admin::delete_user),
        )
        .route(
            "/api/admin/users/:id/status",
            axum::routing::put(routes::admin::update_user_status),
        )
        .route("/api/admin/stats", get(routes::admin::dashboard_stats))
        .layer(axum::middleware::from_fn(
            quiz_backend::middleware::auth::require_admin,
        ))
        .layer(axum::middleware::from_fn_with_state(
            quiz_backend::middleware::rate_limit::new_rps_state(config.api_rps),
            quiz_backend::middleware::rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(public_api)
        .merge(session_api)
        .merge(admin_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
