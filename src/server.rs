use std::convert::Infallible;
use std::net::SocketAddr;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::access_log::AccessLog;
use crate::enrich::RequestContext;
use crate::error::{ApiError, ApiResult};
use crate::service::{ListQuery, MovieService};

pub struct MovieServer {
    service: MovieService,
    access_log: AccessLog,
    body_limit: u64,
}

impl MovieServer {
    pub fn new(service: MovieService, access_log: AccessLog, body_limit: u64) -> Self {
        Self { service, access_log, body_limit }
    }

    /// Full filter tree: movie routes, JSON error replies, access log.
    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
        let log = self.access_log.clone();

        movie_routes(self.service.clone(), self.body_limit)
        .recover(handle_rejection)
        .with(warp::log::custom(move |info| {
            log.record(info.method(), info.path(), info.request_headers())
        }))
    }

    /// Serves until Ctrl-C.
    pub async fn run(&self, addr: SocketAddr) -> Result<(), warp::Error> {
        let (bound, server) = warp::serve(self.routes())
        .try_bind_with_graceful_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
        })?;

        info!("Movie API listening on {}", bound);
        server.await;
        info!("Shutting down.");
        Ok(())
    }
}

pub fn movie_routes(
    service: MovieService,
    body_limit: u64,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    // GET /api/v1/movies/:id
    let get_one = warp::path!("api" / "v1" / "movies" / u64)
    .and(warp::get())
    .and(with_service(service.clone()))
    .and_then(get_movie);

    // GET /api/v1/movies?filter=&limit=
    let list = warp::path!("api" / "v1" / "movies")
    .and(warp::get())
    .and(warp::query::<ListQuery>())
    .and(with_service(service.clone()))
    .and_then(list_movies);

    // POST /api/v1/movies
    let create = warp::path!("api" / "v1" / "movies")
    .and(warp::post())
    .and(json_body(body_limit))
    .and(warp::addr::remote())
    .and(with_service(service.clone()))
    .and_then(create_movie);

    // PUT /api/v1/movies/update-language
    // Matched before PUT /:id; the literal segment is not a valid id anyway.
    let update_language = warp::path!("api" / "v1" / "movies" / "update-language")
    .and(warp::put())
    .and(json_body(body_limit))
    .and(with_service(service.clone()))
    .and_then(bulk_update_language);

    // PUT /api/v1/movies/:id
    let update = warp::path!("api" / "v1" / "movies" / u64)
    .and(warp::put())
    .and(json_body(body_limit))
    .and(warp::addr::remote())
    .and(with_service(service.clone()))
    .and_then(update_movie);

    // DELETE /api/v1/movies/:id
    let delete = warp::path!("api" / "v1" / "movies" / u64)
    .and(warp::delete())
    .and(with_service(service.clone()))
    .and_then(delete_movie);

    // GET /api/v1/movies/:id/pdf
    let pdf = warp::path!("api" / "v1" / "movies" / u64 / "pdf")
    .and(warp::get())
    .and(with_service(service))
    .and_then(export_movie);

    get_one
    .or(list)
    .or(create)
    .or(update_language)
    .or(update)
    .or(delete)
    .or(pdf)
}

fn with_service(service: MovieService) -> impl Filter<Extract = (MovieService,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

fn json_body(limit: u64) -> impl Filter<Extract = (Value,), Error = Rejection> + Clone {
    warp::body::content_length_limit(limit).and(warp::body::json())
}

fn request_context(service: &MovieService, addr: Option<SocketAddr>) -> RequestContext {
    RequestContext {
        client_addr: addr.map(|a| a.ip()),
        now: service.clock().now(),
    }
}

/// Runs file-touching work off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, Rejection>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result.map_err(warp::reject::custom),
        Err(e) => Err(warp::reject::custom(ApiError::Task(e.to_string()))),
    }
}

// --- HANDLERS ---

async fn get_movie(id: u64, service: MovieService) -> Result<impl Reply, Rejection> {
    let movie = service.get(id).map_err(warp::reject::custom)?;
    Ok(warp::reply::json(&movie))
}

async fn list_movies(query: ListQuery, service: MovieService) -> Result<impl Reply, Rejection> {
    let movies = service.list(&query).map_err(warp::reject::custom)?;
    Ok(warp::reply::json(&movies))
}

async fn create_movie(
    body: Value,
    addr: Option<SocketAddr>,
    service: MovieService,
) -> Result<impl Reply, Rejection> {
    let ctx = request_context(&service, addr);
    let movie = blocking(move || service.create(body, &ctx)).await?;
    Ok(warp::reply::with_status(warp::reply::json(&movie), StatusCode::CREATED))
}

async fn update_movie(
    id: u64,
    body: Value,
    addr: Option<SocketAddr>,
    service: MovieService,
) -> Result<impl Reply, Rejection> {
    let ctx = request_context(&service, addr);
    let movie = blocking(move || service.update(id, body, &ctx)).await?;
    Ok(warp::reply::json(&movie))
}

async fn delete_movie(id: u64, service: MovieService) -> Result<impl Reply, Rejection> {
    let movie = blocking(move || service.delete(id)).await?;
    Ok(warp::reply::json(&movie))
}

async fn bulk_update_language(body: Value, service: MovieService) -> Result<impl Reply, Rejection> {
    let result = blocking(move || service.update_language(&body)).await?;
    Ok(warp::reply::json(&result))
}

async fn export_movie(id: u64, service: MovieService) -> Result<impl Reply, Rejection> {
    let doc = blocking(move || service.export(id)).await?;

    let disposition = format!("attachment; filename={}", doc.file_name);
    let reply = warp::reply::with_header(doc.bytes, "content-type", doc.content_type);
    Ok(warp::reply::with_header(reply, "content-disposition", disposition))
}

// --- REJECTIONS ---

#[derive(Serialize)]
struct ErrorMessage {
    message: String,
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if let Some(e) = err.find::<ApiError>() {
        if e.status().is_server_error() {
            error!("Request failed: {}", e);
        }
        (e.status(), e.public_message())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Route not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length required".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Expected a JSON body".to_string())
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    Ok(warp::reply::with_status(warp::reply::json(&ErrorMessage { message }), status))
}
