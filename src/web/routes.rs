// src/web/routes.rs
use crate::{
    state::AppState,
    web::{admin_handlers, auth_handlers, mw_auth, mw_role, student_handlers, system_handlers},
};
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

pub fn create_router(app_state: AppState) -> Router {

    // --- Rotas Públicas ---
    let public_routes = Router::new()
        .route("/", get(system_handlers::handle_root))
        .route("/api/health", get(system_handlers::handle_health))
        .route("/api/auth/register", post(auth_handlers::handle_register))
        .route("/api/auth/login", post(auth_handlers::handle_login));

    // --- Rotas de Admin ---
    // Aplica APENAS mw_role aqui (mw_auth será aplicado no router pai)
    let admin_routes = Router::new()
        .route(
            "/rooms",
            get(admin_handlers::handle_list_rooms).post(admin_handlers::handle_create_room),
        )
        .route("/rooms/available", get(admin_handlers::handle_available_rooms))
        .route("/rooms/full", get(admin_handlers::handle_full_rooms))
        .route(
            "/students",
            get(admin_handlers::handle_list_students).post(admin_handlers::handle_create_student),
        )
        .route("/assign-room", post(admin_handlers::handle_assign_room))
        .route("/remove-room/{student_id}", delete(admin_handlers::handle_remove_room))
        .route_layer(middleware::from_fn(mw_role::require_admin));

    // --- Rotas de Estudante ---
    let student_routes = Router::new()
        .route(
            "/profile",
            get(student_handlers::handle_get_profile).put(student_handlers::handle_update_profile),
        )
        .route("/room", get(student_handlers::handle_get_room))
        .route_layer(middleware::from_fn(mw_role::require_student));

    // --- Rotas Autenticadas ---
    // require_auth cobre todas as rotas ACIMA neste router, incluindo as aninhadas
    let authenticated_routes = Router::new()
        .route("/api/auth/me", get(auth_handlers::handle_me))
        .nest("/api/admin", admin_routes)
        .nest("/api/student", student_routes)
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            mw_auth::require_auth,
        ));

    // --- Router Final ---
    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .fallback(system_handlers::handle_not_found)
        .with_state(app_state)
}
