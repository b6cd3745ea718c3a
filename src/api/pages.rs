//! Renders every non-API path: resolves it in the route table, runs the role
//! gate and returns the view model inside the page envelope.

use actix_web::http::StatusCode;
use actix_web::http::header::LOCATION;
use actix_web::{HttpRequest, HttpResponse, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::api::attendance::{HistoryQuery, attendance_view, history_view};
use crate::api::dashboard::user_dashboard;
use crate::api::profile::profile_view;
use crate::api::tasks::{TaskFilter, my_tasks_view, task_manager_view};
use crate::api::admin;
use crate::auth::auth::Session;
use crate::gate::{GateDecision, decide};
use crate::model::identity::Identity;
use crate::session::SessionContext;
use crate::shell::{self, DEFAULT_LANDING, MenuItem, Route, View};
use crate::sync::notify::Notification;

/// Filters understood by the list pages. Each page reads the ones it needs.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

impl PageQuery {
    fn task_filter(&self) -> TaskFilter {
        TaskFilter::parse(self.status.as_deref(), self.priority.as_deref())
    }

    fn history(&self) -> HistoryQuery {
        HistoryQuery {
            search: self.search.clone(),
            status: self.status.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct Page {
    pub path: String,
    pub title: &'static str,
    pub view: View,
    pub identity: Option<Identity>,
    pub menu: Vec<MenuItem>,
    pub data: Value,
    /// Pending notifications; they stay queued until dismissed or drained.
    pub notifications: Vec<Notification>,
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((LOCATION, location))
        .finish()
}

fn page(
    status: StatusCode,
    ctx: &SessionContext,
    path: &str,
    title: &'static str,
    view: View,
    data: Value,
) -> HttpResponse {
    let identity = ctx.identity();
    HttpResponse::build(status).json(Page {
        path: path.to_string(),
        title,
        view,
        menu: identity
            .as_ref()
            .map(|i| shell::menu(i.role))
            .unwrap_or_default(),
        identity,
        data,
        notifications: ctx.notifications.pending(),
    })
}

async fn view_data(
    view: View,
    ctx: &SessionContext,
    identity: &Identity,
    query: &PageQuery,
) -> serde_json::Result<Value> {
    match view {
        View::AdminDashboard => serde_json::to_value(admin::admin_dashboard()),
        View::AdminUsers => serde_json::to_value(admin::users_view(ctx, identity).await),
        View::TaskManager => {
            serde_json::to_value(task_manager_view(ctx, identity, &query.task_filter()).await)
        }
        View::Reports => serde_json::to_value(admin::reports()),
        View::UserDashboard => serde_json::to_value(user_dashboard(ctx, identity).await),
        View::Attendance => serde_json::to_value(attendance_view(ctx, identity).await),
        View::MyTasks => {
            serde_json::to_value(my_tasks_view(ctx, identity, &query.task_filter()).await)
        }
        View::History => serde_json::to_value(history_view(ctx, identity, &query.history()).await),
        View::Profile => serde_json::to_value(profile_view(ctx, identity).await),
        View::Login | View::Landing | View::Pending | View::NotFound => Ok(Value::Null),
    }
}

pub async fn render(
    req: HttpRequest,
    session: Session,
    query: web::Query<PageQuery>,
) -> actix_web::Result<HttpResponse> {
    let path = req.path();
    let Some(route) = shell::resolve(path) else {
        debug!(%path, "No route");
        return Ok(page(
            StatusCode::NOT_FOUND,
            &session,
            path,
            "Page Not Found",
            View::NotFound,
            Value::Null,
        ));
    };

    if route.view == View::Login {
        return Ok(match session.identity() {
            Some(identity) => redirect(identity.role.home_path()),
            None => page(StatusCode::OK, &session, path, route.title, View::Login, Value::Null),
        });
    }

    let state = session.session.snapshot();
    match decide(&state, route.access.required_role()) {
        GateDecision::Pending => Ok(page(
            StatusCode::ACCEPTED,
            &session,
            path,
            route.title,
            View::Pending,
            Value::Null,
        )),
        GateDecision::RedirectToLogin => Ok(redirect(shell::LOGIN_PATH)),
        GateDecision::RedirectToDefault(home) => {
            debug!(%path, %home, "Role mismatch");
            Ok(redirect(home))
        }
        GateDecision::Allow => allowed(&session, route, path, &query).await,
    }
}

async fn allowed(
    ctx: &SessionContext,
    route: &Route,
    path: &str,
    query: &PageQuery,
) -> actix_web::Result<HttpResponse> {
    if route.view == View::Landing {
        return Ok(redirect(DEFAULT_LANDING));
    }
    // the gate only allows with an identity present
    let Some(identity) = ctx.identity() else {
        return Ok(redirect(shell::LOGIN_PATH));
    };

    let data = view_data(route.view, ctx, &identity, query)
        .await
        .map_err(ErrorInternalServerError)?;
    Ok(page(StatusCode::OK, ctx, path, route.title, route.view, data))
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test};
    use serde_json::json;

    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::testing::{sign_up, test_app};

    fn location(resp: &actix_web::dev::ServiceResponse) -> &str {
        resp.headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    #[actix_web::test]
    async fn anonymous_visitors_go_to_login() {
        let backend = MemoryBackend::new();
        let app = test::init_service(App::new().configure(test_app(&backend))).await;

        for path in ["/dashboard", "/admin/reports", "/"] {
            let req = test::TestRequest::get().uri(path).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::FOUND, "{path}");
            assert_eq!(location(&resp), "/login");
        }

        let req = test::TestRequest::get().uri("/login").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["view"], "login");
        assert_eq!(body["menu"], json!([]));
    }

    #[actix_web::test]
    async fn users_are_sent_home_from_admin_pages() {
        let backend = MemoryBackend::new();
        let app = test::init_service(App::new().configure(test_app(&backend))).await;
        let bearer = sign_up(&app, "alice@x.com", "user").await;

        let get = |path: &str| {
            test::TestRequest::get()
                .uri(path)
                .insert_header(("Authorization", bearer.clone()))
                .to_request()
        };

        let resp = test::call_service(&app, get("/admin/users")).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/dashboard");

        let resp = test::call_service(&app, get("/")).await;
        assert_eq!(location(&resp), "/dashboard");

        let resp = test::call_service(&app, get("/login")).await;
        assert_eq!(location(&resp), "/dashboard");

        let body: Value = test::call_and_read_body_json(&app, get("/tasks?status=all")).await;
        assert_eq!(body["view"], "my_tasks");
        assert_eq!(body["menu"][1]["path"], "/attendance");
        assert_eq!(body["identity"]["name"], "alice");
    }

    #[actix_web::test]
    async fn admins_reach_admin_pages() {
        let backend = MemoryBackend::new();
        let app = test::init_service(App::new().configure(test_app(&backend))).await;
        let bearer = sign_up(&app, "root@x.com", "admin").await;

        let req = test::TestRequest::get()
            .uri("/admin/reports")
            .insert_header(("Authorization", bearer.clone()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["view"], "reports");
        assert_eq!(body["data"]["departments"][0]["name"], "Engineering");

        let req = test::TestRequest::get()
            .uri("/admin/users")
            .insert_header(("Authorization", bearer))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["total"], 1);
    }

    #[actix_web::test]
    async fn unknown_paths_render_not_found() {
        let backend = MemoryBackend::new();
        let app = test::init_service(App::new().configure(test_app(&backend))).await;

        let req = test::TestRequest::get().uri("/no/such/page").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["view"], "not_found");
    }
}
