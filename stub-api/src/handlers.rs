use axum::{
    extract::{Host, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use common::{
    ApiErrors, Application, Build, BuildRequest, Droplet, DropletLinks, Link, Page, Pagination,
    Relationship,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::state::StubState;

type ApiResult<T> = Result<Json<T>, ApiFailure>;

/// Non-2xx response in the v3 error envelope.
pub struct ApiFailure {
    status: StatusCode,
    errors: ApiErrors,
}

impl ApiFailure {
    fn not_found(what: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            errors: ApiErrors::single(10010, "CF-ResourceNotFound", &format!("{what} not found")),
        }
    }

    fn unprocessable(detail: &str) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            errors: ApiErrors::single(10008, "CF-UnprocessableEntity", detail),
        }
    }

    fn unavailable(detail: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            errors: ApiErrors::single(10015, "CF-ServiceUnavailable", detail),
        }
    }

    fn unauthenticated() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            errors: ApiErrors::single(10002, "CF-NotAuthenticated", "Authentication error"),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(self.errors)).into_response()
    }
}

pub fn build_router(state: StubState) -> Router {
    Router::new()
        .route("/v3/apps", get(list_apps))
        .route("/v3/apps/:guid", get(get_app))
        .route("/v3/apps/:guid/droplets/current", get(current_droplet))
        .route("/v3/apps/:guid/actions/restart", post(restart_app))
        .route(
            "/v3/apps/:guid/relationships/current_droplet",
            patch(assign_droplet),
        )
        .route("/v3/builds", post(create_build))
        .route("/v3/builds/:guid", get(get_build))
        .layer(middleware::from_fn_with_state(state.clone(), record_and_authenticate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- middleware ---------------- */

async fn record_and_authenticate(
    State(state): State<StubState>,
    req: Request,
    next: Next,
) -> Response {
    state.record(format!("{} {}", req.method(), req.uri().path()));

    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().starts_with("bearer "));
    if !authorized {
        return ApiFailure::unauthenticated().into_response();
    }

    next.run(req).await
}

/* ---------------- handlers ---------------- */

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<usize>,
    per_page: Option<usize>,
    space_guids: Option<String>,
}

async fn list_apps(
    State(state): State<StubState>,
    Host(host): Host,
    Query(query): Query<ListQuery>,
) -> ApiResult<Page<Application>> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = state.effective_page_size(query.per_page);

    let (resources, has_next) = state
        .list_apps(query.space_guids.as_deref(), page, per_page)
        .ok_or_else(|| ApiFailure::unavailable("some horrible error occurred"))?;

    let next = has_next.then(|| {
        let mut href = format!("http://{host}/v3/apps?page={}&per_page={per_page}", page + 1);
        if let Some(spaces) = &query.space_guids {
            href.push_str(&format!("&space_guids={spaces}"));
        }
        Link { href }
    });

    Ok(Json(Page {
        pagination: Pagination {
            total_results: None,
            next,
        },
        resources,
    }))
}

async fn get_app(
    State(state): State<StubState>,
    Path(guid): Path<String>,
) -> ApiResult<Application> {
    state
        .get_app(&guid)
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("App"))
}

async fn current_droplet(
    State(state): State<StubState>,
    Host(host): Host,
    Path(guid): Path<String>,
) -> ApiResult<Droplet> {
    let droplet = state
        .current_droplet(&guid)
        .ok_or_else(|| ApiFailure::not_found("Droplet"))?;

    Ok(Json(Droplet {
        guid: droplet.guid,
        created_at: droplet.created_at,
        links: DropletLinks {
            package: Some(Link {
                href: format!("http://{host}/v3/packages/{}", droplet.package_guid),
            }),
        },
    }))
}

async fn create_build(
    State(state): State<StubState>,
    Json(req): Json<BuildRequest>,
) -> Result<(StatusCode, Json<Build>), ApiFailure> {
    let build = state
        .create_build(&req.package.guid)
        .ok_or_else(|| ApiFailure::unprocessable("Unable to use package. Ensure that the package exists and you have access to it."))?;

    info!("build {} created from package {}", build.guid, req.package.guid);
    Ok((StatusCode::CREATED, Json(build)))
}

async fn get_build(
    State(state): State<StubState>,
    Path(guid): Path<String>,
) -> ApiResult<Build> {
    state
        .poll_build(&guid)
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("Build"))
}

async fn assign_droplet(
    State(state): State<StubState>,
    Path(guid): Path<String>,
    Json(req): Json<Relationship>,
) -> ApiResult<Relationship> {
    let droplet = req
        .guid()
        .ok_or_else(|| ApiFailure::unprocessable("Current droplet cannot be removed"))?;

    match state.assign_droplet(&guid, droplet) {
        None => Err(ApiFailure::not_found("App")),
        Some(None) => Err(ApiFailure::unprocessable(
            "Unable to assign current droplet. Ensure the droplet exists and belongs to this app.",
        )),
        Some(Some(echoed)) => {
            info!("app {} now runs droplet {}", guid, droplet);
            Ok(Json(Relationship::to(&echoed)))
        }
    }
}

async fn restart_app(
    State(state): State<StubState>,
    Path(guid): Path<String>,
) -> ApiResult<Application> {
    state
        .restart(&guid)
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("App"))
}
