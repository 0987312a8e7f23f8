//! HTTP server: JSON API and server-rendered pages

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::content::{ConvertedPost, StoredPost};
use crate::error::Error;
use crate::source::Record;
use crate::Blog;

/// Posts returned by the converted-post list endpoint
const PAGE_SIZE: usize = 10;

type SharedBlog = Arc<Blog>;

/// Start the server
pub async fn start(blog: Blog, ip: &str, port: u16) -> Result<()> {
    let app = router(Arc::new(blog));

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// All routes, traced
pub fn router(blog: SharedBlog) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/posts", get(api_posts).fallback(method_not_allowed))
        .route("/api/mdx-posts", get(api_mdx_posts).fallback(method_not_allowed))
        .route("/posts", get(posts_page))
        .route("/mdx-posts", get(mdx_index_page))
        .route("/mdx-posts/:slug", get(mdx_post_page))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(blog)
}

/// JSON error body of the API routes
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// An [`Error`] surfaced by an API route
#[derive(Debug)]
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    message: "Post not found",
                    error: None,
                },
            ),
            err => {
                tracing::error!("Request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        message: "Server error",
                        error: Some(err.to_string()),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody {
            message: "Method not allowed",
            error: None,
        }),
    )
        .into_response()
}

/// Run blocking repository and conversion work off the async runtime,
/// bounded by the configured conversion timeout
async fn blocking<T, F>(blog: &SharedBlog, work: F) -> crate::error::Result<T>
where
    F: FnOnce(&Blog) -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let timeout = blog.config.server.conversion_timeout();
    let blog = Arc::clone(blog);
    let task = tokio::task::spawn_blocking(move || work(&blog));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => Err(Error::Aborted(e.to_string())),
        Err(_) => Err(Error::Aborted(format!("no result after {:?}", timeout))),
    }
}

/// Convert every post on its own task; one outcome per post, in order
async fn convert_all(
    blog: &SharedBlog,
    posts: &[StoredPost],
) -> Vec<crate::error::Result<ConvertedPost>> {
    let handles: Vec<_> = posts
        .iter()
        .cloned()
        .map(|post| {
            let blog = Arc::clone(blog);
            tokio::spawn(async move {
                blocking(&blog, move |blog| blog.converter.convert_post(&post)).await
            })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        let outcome = handle
            .await
            .unwrap_or_else(|e| Err(Error::Aborted(e.to_string())));
        outcomes.push(outcome);
    }
    outcomes
}

async fn health() -> &'static str {
    "ok"
}

/// All stored posts, newest first
async fn api_posts(State(blog): State<SharedBlog>) -> Result<Json<Vec<Record>>, ApiError> {
    let records = blocking(&blog, |blog| blog.repository.list_records(None)).await?;
    Ok(Json(records))
}

#[derive(Debug, Default, Deserialize)]
struct MdxParams {
    id: Option<String>,
    slug: Option<String>,
}

enum Lookup {
    Id(String),
    Slug(String),
}

/// A stored record together with its conversion
#[derive(Debug, Serialize)]
struct PostWithMdx {
    #[serde(flatten)]
    post: StoredPost,
    mdx: ConvertedPost,
}

/// One converted post by id or slug, or the latest converted posts
async fn api_mdx_posts(
    State(blog): State<SharedBlog>,
    Query(params): Query<MdxParams>,
) -> Result<Response, ApiError> {
    let id = params.id.filter(|v| !v.is_empty());
    let slug = params.slug.filter(|v| !v.is_empty());
    let lookup = match (id, slug) {
        (Some(id), _) => Some(Lookup::Id(id)),
        (None, Some(slug)) => Some(Lookup::Slug(slug)),
        (None, None) => None,
    };

    if let Some(lookup) = lookup {
        let converted = blocking(&blog, move |blog| {
            let post = match &lookup {
                Lookup::Id(id) => blog.repository.find_by_id(id)?,
                Lookup::Slug(slug) => blog.repository.find_by_slug(slug)?,
            };
            blog.converter.convert_post(&post)
        })
        .await?;
        return Ok(Json(converted).into_response());
    }

    let posts = blocking(&blog, |blog| blog.repository.list_published(Some(PAGE_SIZE))).await?;
    if posts.is_empty() {
        return Err(Error::NotFound.into());
    }

    let outcomes = convert_all(&blog, &posts).await;
    let items = posts
        .into_iter()
        .zip(outcomes)
        .map(|(post, outcome)| outcome.map(|mdx| PostWithMdx { post, mdx }))
        .collect::<crate::error::Result<Vec<_>>>()?;

    Ok(Json(items).into_response())
}

/// Map a page outcome to a response; lookups and conversions that fail show
/// the not-found page
fn page_response(blog: &Blog, outcome: crate::error::Result<String>) -> Response {
    match outcome {
        Ok(html) => Html(html).into_response(),
        Err(e) if matches!(e, Error::NotFound) || e.is_conversion() => {
            tracing::debug!("Page not found: {}", e);
            not_found_page(blog)
        }
        Err(e) => {
            tracing::error!("Failed to render page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

fn not_found_page(blog: &Blog) -> Response {
    match blog.renderer.render_not_found() {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render not-found page: {}", e);
            (StatusCode::NOT_FOUND, "Not found").into_response()
        }
    }
}

async fn posts_page(State(blog): State<SharedBlog>) -> Response {
    let outcome = blocking(&blog, |blog| {
        let posts = blog.repository.list_created(blog.config.per_page)?;
        Ok(blog.renderer.render_posts(&posts)?)
    })
    .await;
    page_response(&blog, outcome)
}

async fn mdx_index_page(State(blog): State<SharedBlog>) -> Response {
    let posts = match blocking(&blog, |blog| {
        blog.repository.list_published(Some(blog.config.per_page))
    })
    .await
    {
        Ok(posts) => posts,
        Err(e) => return page_response(&blog, Err(e)),
    };

    let converted: Vec<ConvertedPost> = convert_all(&blog, &posts)
        .await
        .into_iter()
        .zip(&posts)
        .filter_map(|(outcome, post)| match outcome {
            Ok(converted) => Some(converted),
            Err(e) => {
                tracing::warn!("Skipping post {} in index: {}", post.id, e);
                None
            }
        })
        .collect();

    let outcome = blocking(&blog, move |blog| {
        Ok(blog.renderer.render_mdx_index(&converted)?)
    })
    .await;
    page_response(&blog, outcome)
}

async fn mdx_post_page(State(blog): State<SharedBlog>, Path(slug): Path<String>) -> Response {
    let outcome = blocking(&blog, move |blog| {
        let post = blog.repository.find_by_slug(&slug)?;
        let converted = blog.converter.convert_post(&post)?;
        Ok(blog.renderer.render_post_page(&converted)?)
    })
    .await;
    page_response(&blog, outcome)
}

/// Serve generated files from the public directory, otherwise the not-found page
async fn fallback_handler(State(blog): State<SharedBlog>, request: Request<Body>) -> Response {
    let mut service = ServeDir::new(&blog.public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) if response.status() != StatusCode::NOT_FOUND => response.into_response(),
        Ok(_) => not_found_page(&blog),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}
