use std::{net::SocketAddr, path::PathBuf};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::{signal, task};
use tracing_subscriber::EnvFilter;
use vidnest::{
    Error, ErrorKind, comments,
    config::{DEFAULT_CONFIG_PATH, load_settings_from},
    dashboard::{self, ChannelStats},
    identity, likes,
    model::{Comment, Id, Like, MediaRef, NewUser, NewVideo, Playlist, Subscription, Supersede, Tweet, User, Video, VideoUpdate},
    pipeline::{
        ChannelCard, ChannelProfile, CommentCard, ListParams, Page, PageLimits, PageRequest,
        PlaylistCard, PlaylistEntry, Sort, TweetCard, VideoCard, VideoDetail,
    },
    playlists::{self, PlaylistDetail, PlaylistUpdate},
    resolver::ContentRef,
    security::ensure_not_root,
    store::{Collection, Store},
    subscriptions,
    toggle::ToggleResult,
    tweets, users, videos,
};

/// Header through which the upstream auth layer passes the caller id.
const USER_HEADER: &str = "x-user-id";

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve the vidnest content API.")]
struct Cli {
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_PATH, help = "Path to the config file")]
    config: PathBuf,
    #[arg(long = "db", value_name = "PATH", help = "Database file (overrides DB_PATH)")]
    db: Option<PathBuf>,
    #[arg(long = "host", help = "Listen address (overrides VIDNEST_HOST)")]
    host: Option<String>,
    #[arg(long = "port", help = "Listen port (overrides VIDNEST_PORT)")]
    port: Option<u16>,
}

#[derive(Clone)]
struct AppState {
    store: Store,
    limits: PageLimits,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: ErrorKind::StoreFailure.as_str(),
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let kind = err.kind();
        let status = match kind {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::StoreFailure => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        Self {
            status,
            kind: kind.as_str(),
            message: err.message().to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {
                "kind": self.kind,
                "message": self.message,
            },
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Authenticated caller; rejects requests without a valid identity.
struct Caller(Id);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok());
        Ok(Caller(identity::identify(raw)?))
    }
}

/// Optional identity for read routes; anonymous when the header is absent.
struct Viewer(Option<Id>);

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok());
        Ok(Viewer(identity::identify_optional(raw)?))
    }
}

/// Query string shared by list routes. Values stay textual so malformed
/// paging falls back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    page: Option<String>,
    limit: Option<String>,
    query: Option<String>,
    sort_by: Option<String>,
    sort_type: Option<String>,
    is_published: Option<String>,
}

impl ListQuery {
    fn params(&self, limits: &PageLimits, viewer: Option<Id>) -> ApiResult<ListParams> {
        Ok(ListParams {
            page: PageRequest::parse(self.page.as_deref(), self.limit.as_deref(), limits),
            search: self.query.clone(),
            sort: Sort::parse(self.sort_by.as_deref(), self.sort_type.as_deref())?,
            viewer,
        })
    }

    fn published(&self) -> ApiResult<Option<bool>> {
        match self.is_published.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some(other) => {
                Err(Error::invalid(format!("isPublished must be true or false, got {other:?}")).into())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountBody {
    display_name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct ContentBody {
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewPlaylistBody {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Replaced<T> {
    #[serde(flatten)]
    record: T,
    supersede: Option<Supersede>,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,vidnest=debug")),
        )
        .init();

    ensure_not_root("vidnest-backend")?;
    let cli = Cli::parse();

    let mut settings = load_settings_from(&cli.config)?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }
    if let Some(host) = cli.host {
        settings.vidnest_host = host;
    }
    if let Some(port) = cli.port {
        settings.vidnest_port = port;
    }

    let store = Store::open(&settings.db_path)
        .with_context(|| format!("opening store at {}", settings.db_path.display()))?;
    let state = AppState {
        store,
        limits: settings.page_limits,
    };

    let app = router(state);

    let addr = SocketAddr::new(
        settings
            .vidnest_host
            .parse()
            .with_context(|| format!("parsing listen host {}", settings.vidnest_host))?,
        settings.vidnest_port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    tracing::info!(%addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthcheck))
        .route("/api/users", post(register_user))
        .route("/api/users/me", patch(update_account))
        .route("/api/users/me/avatar", patch(update_avatar))
        .route("/api/users/me/cover-image", patch(update_cover_image))
        .route("/api/users/{id}", get(get_user))
        .route("/api/users/{id}/tweets", get(list_user_tweets))
        .route("/api/users/{id}/subscriptions", get(list_subscribed_channels))
        .route("/api/users/{id}/playlists", get(list_user_playlists))
        .route("/api/channels/{username}", get(channel_profile))
        .route("/api/channels/{username}/videos", get(list_user_videos))
        .route("/api/channels/{id}/subscribers", get(list_channel_subscribers))
        .route("/api/channels/{id}/subscription", post(toggle_subscription))
        .route("/api/videos", get(search_videos).post(publish_video))
        .route(
            "/api/videos/{id}",
            get(get_video).patch(update_video).delete(delete_video),
        )
        .route("/api/videos/{id}/publish", patch(toggle_publish_status))
        .route(
            "/api/videos/{id}/comments",
            get(list_video_comments).post(comment_on_video),
        )
        .route("/api/tweets", post(create_tweet))
        .route("/api/tweets/{id}", patch(update_tweet).delete(delete_tweet))
        .route(
            "/api/tweets/{id}/comments",
            get(list_tweet_comments).post(comment_on_tweet),
        )
        .route(
            "/api/comments/{id}",
            patch(update_comment).delete(delete_comment),
        )
        .route(
            "/api/comments/{id}/replies",
            get(list_replies).post(reply_to_comment),
        )
        .route("/api/likes/toggle", post(toggle_like))
        .route("/api/likes/videos", get(list_liked_videos))
        .route("/api/playlists", post(create_playlist))
        .route(
            "/api/playlists/{id}",
            get(get_playlist)
                .patch(update_playlist)
                .delete(delete_playlist),
        )
        .route("/api/playlists/{id}/publish", patch(toggle_playlist_publish))
        .route("/api/playlists/{id}/videos", get(list_playlist_videos))
        .route(
            "/api/playlists/{id}/videos/{video_id}",
            put(add_playlist_video).delete(remove_playlist_video),
        )
        .route("/api/dashboard/stats", get(channel_stats))
        .route("/api/dashboard/videos", get(dashboard_videos))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(%err, "failed to install Ctrl+C handler");
    }
    tracing::info!("shutting down");
}

/// Runs store work on the blocking pool.
async fn blocking<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Store) -> vidnest::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    task::spawn_blocking(move || f(&store))
        .await
        .map_err(|err| ApiError::internal(format!("task join error: {err}")))?
        .map_err(ApiError::from)
}

fn path_id(raw: &str, what: &str) -> ApiResult<Id> {
    Ok(Id::parse_for(raw, what)?)
}

async fn healthcheck(State(state): State<AppState>) -> ApiResult<Json<Health>> {
    blocking(&state, |store| store.exists(Collection::Users, Id::new())).await?;
    Ok(Json(Health { status: "ok" }))
}

async fn register_user(
    State(state): State<AppState>,
    Json(new): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = blocking(&state, move |store| users::register_user(store, new)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let id = path_id(&id, "user")?;
    Ok(Json(blocking(&state, move |store| users::get_user(store, id)).await?))
}

async fn update_account(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<AccountBody>,
) -> ApiResult<Json<User>> {
    let user = blocking(&state, move |store| {
        users::update_account(store, caller, &body.display_name, &body.email)
    })
    .await?;
    Ok(Json(user))
}

async fn update_avatar(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(avatar): Json<MediaRef>,
) -> ApiResult<Json<Replaced<User>>> {
    let (record, supersede) =
        blocking(&state, move |store| users::update_avatar(store, caller, avatar)).await?;
    Ok(Json(Replaced { record, supersede }))
}

async fn update_cover_image(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(cover): Json<MediaRef>,
) -> ApiResult<Json<Replaced<User>>> {
    let (record, supersede) =
        blocking(&state, move |store| users::update_cover_image(store, caller, cover)).await?;
    Ok(Json(Replaced { record, supersede }))
}

async fn channel_profile(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(username): Path<String>,
) -> ApiResult<Json<ChannelProfile>> {
    let profile = blocking(&state, move |store| {
        users::channel_profile(store, &username, viewer)
    })
    .await?;
    Ok(Json(profile))
}

async fn list_user_videos(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(username): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<VideoCard>>> {
    let params = query.params(&state.limits, viewer)?;
    let published = query.published()?;
    let page = blocking(&state, move |store| {
        videos::list_user_videos(store, &username, published, &params)
    })
    .await?;
    Ok(Json(page))
}

async fn search_videos(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<VideoCard>>> {
    let params = query.params(&state.limits, viewer)?;
    let page = blocking(&state, move |store| videos::search_videos(store, &params)).await?;
    Ok(Json(page))
}

async fn publish_video(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(new): Json<NewVideo>,
) -> ApiResult<(StatusCode, Json<Video>)> {
    let video = blocking(&state, move |store| videos::publish_video(store, caller, new)).await?;
    Ok((StatusCode::CREATED, Json(video)))
}

async fn get_video(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
) -> ApiResult<Json<VideoDetail>> {
    let id = path_id(&id, "video")?;
    let detail = blocking(&state, move |store| videos::get_video(store, id, viewer)).await?;
    Ok(Json(detail))
}

async fn update_video(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    Json(update): Json<VideoUpdate>,
) -> ApiResult<Json<Replaced<Video>>> {
    let id = path_id(&id, "video")?;
    let (record, supersede) = blocking(&state, move |store| {
        videos::update_video(store, caller, id, update)
    })
    .await?;
    Ok(Json(Replaced { record, supersede }))
}

async fn delete_video(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Supersede>>> {
    let id = path_id(&id, "video")?;
    let stale = blocking(&state, move |store| videos::delete_video(store, caller, id)).await?;
    Ok(Json(stale))
}

async fn toggle_publish_status(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Video>> {
    let id = path_id(&id, "video")?;
    let video = blocking(&state, move |store| {
        videos::toggle_publish_status(store, caller, id)
    })
    .await?;
    Ok(Json(video))
}

async fn list_comments_under(
    state: AppState,
    parent: ContentRef,
    viewer: Option<Id>,
    query: ListQuery,
) -> ApiResult<Json<Page<CommentCard>>> {
    let params = query.params(&state.limits, viewer)?;
    let page = blocking(&state, move |store| {
        comments::list_comments(store, &parent, &params)
    })
    .await?;
    Ok(Json(page))
}

async fn comment_under(
    state: AppState,
    caller: Id,
    parent: ContentRef,
    body: ContentBody,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let comment = blocking(&state, move |store| {
        comments::create_comment(store, caller, &parent, &body.content)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn list_video_comments(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<CommentCard>>> {
    list_comments_under(state, ContentRef::video(id), viewer, query).await
}

async fn comment_on_video(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    Json(body): Json<ContentBody>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    comment_under(state, caller, ContentRef::video(id), body).await
}

async fn list_tweet_comments(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<CommentCard>>> {
    list_comments_under(state, ContentRef::tweet(id), viewer, query).await
}

async fn comment_on_tweet(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    Json(body): Json<ContentBody>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    comment_under(state, caller, ContentRef::tweet(id), body).await
}

async fn list_replies(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<CommentCard>>> {
    list_comments_under(state, ContentRef::comment(id), viewer, query).await
}

async fn reply_to_comment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    Json(body): Json<ContentBody>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    comment_under(state, caller, ContentRef::comment(id), body).await
}

async fn update_comment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    Json(body): Json<ContentBody>,
) -> ApiResult<Json<Comment>> {
    let id = path_id(&id, "comment")?;
    let comment = blocking(&state, move |store| {
        comments::update_comment(store, caller, id, &body.content)
    })
    .await?;
    Ok(Json(comment))
}

async fn delete_comment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = path_id(&id, "comment")?;
    blocking(&state, move |store| comments::delete_comment(store, caller, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_tweet(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<ContentBody>,
) -> ApiResult<(StatusCode, Json<Tweet>)> {
    let tweet = blocking(&state, move |store| {
        tweets::create_tweet(store, caller, &body.content)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(tweet)))
}

async fn update_tweet(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    Json(body): Json<ContentBody>,
) -> ApiResult<Json<Tweet>> {
    let id = path_id(&id, "tweet")?;
    let tweet = blocking(&state, move |store| {
        tweets::update_tweet(store, caller, id, &body.content)
    })
    .await?;
    Ok(Json(tweet))
}

async fn delete_tweet(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = path_id(&id, "tweet")?;
    blocking(&state, move |store| tweets::delete_tweet(store, caller, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_user_tweets(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<TweetCard>>> {
    let id = path_id(&id, "user")?;
    let params = query.params(&state.limits, viewer)?;
    let page = blocking(&state, move |store| {
        tweets::list_user_tweets(store, id, &params)
    })
    .await?;
    Ok(Json(page))
}

async fn toggle_like(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(target): Json<ContentRef>,
) -> ApiResult<Json<ToggleResult<Like>>> {
    let result = blocking(&state, move |store| likes::toggle_like(store, caller, &target)).await?;
    Ok(Json(result))
}

async fn list_liked_videos(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<VideoCard>>> {
    let params = query.params(&state.limits, Some(caller))?;
    let page = blocking(&state, move |store| {
        likes::list_liked_videos(store, caller, &params)
    })
    .await?;
    Ok(Json(page))
}

async fn toggle_subscription(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<ToggleResult<Subscription>>> {
    let channel = path_id(&id, "channel")?;
    if channel == caller {
        return Err(Error::invalid("cannot subscribe to your own channel").into());
    }
    let result = blocking(&state, move |store| {
        subscriptions::toggle_subscription(store, caller, channel)
    })
    .await?;
    Ok(Json(result))
}

async fn list_channel_subscribers(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<ChannelCard>>> {
    let channel = path_id(&id, "channel")?;
    let params = query.params(&state.limits, viewer)?;
    let page = blocking(&state, move |store| {
        subscriptions::list_channel_subscribers(store, channel, &params)
    })
    .await?;
    Ok(Json(page))
}

async fn list_subscribed_channels(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<ChannelCard>>> {
    let subscriber = path_id(&id, "user")?;
    let params = query.params(&state.limits, viewer)?;
    let page = blocking(&state, move |store| {
        subscriptions::list_subscribed_channels(store, subscriber, &params)
    })
    .await?;
    Ok(Json(page))
}

async fn create_playlist(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<NewPlaylistBody>,
) -> ApiResult<(StatusCode, Json<Playlist>)> {
    let initial = body
        .video_id
        .as_deref()
        .map(|raw| path_id(raw, "video"))
        .transpose()?;
    let playlist = blocking(&state, move |store| {
        playlists::create_playlist(store, caller, &body.name, &body.description, initial)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(playlist)))
}

async fn get_playlist(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
) -> ApiResult<Json<PlaylistDetail>> {
    let id = path_id(&id, "playlist")?;
    let detail = blocking(&state, move |store| playlists::get_playlist(store, id, viewer)).await?;
    Ok(Json(detail))
}

async fn update_playlist(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    Json(update): Json<PlaylistUpdate>,
) -> ApiResult<Json<Playlist>> {
    let id = path_id(&id, "playlist")?;
    let playlist = blocking(&state, move |store| {
        playlists::update_playlist(store, caller, id, update)
    })
    .await?;
    Ok(Json(playlist))
}

async fn delete_playlist(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = path_id(&id, "playlist")?;
    blocking(&state, move |store| playlists::delete_playlist(store, caller, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_playlist_publish(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Playlist>> {
    let id = path_id(&id, "playlist")?;
    let playlist = blocking(&state, move |store| {
        playlists::toggle_playlist_publish(store, caller, id)
    })
    .await?;
    Ok(Json(playlist))
}

async fn add_playlist_video(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path((id, video_id)): Path<(String, String)>,
) -> ApiResult<Json<Playlist>> {
    let id = path_id(&id, "playlist")?;
    let video = path_id(&video_id, "video")?;
    let playlist = blocking(&state, move |store| {
        playlists::add_video(store, caller, id, video)
    })
    .await?;
    Ok(Json(playlist))
}

async fn remove_playlist_video(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path((id, video_id)): Path<(String, String)>,
) -> ApiResult<Json<Playlist>> {
    let id = path_id(&id, "playlist")?;
    let video = path_id(&video_id, "video")?;
    let playlist = blocking(&state, move |store| {
        playlists::remove_video(store, caller, id, video)
    })
    .await?;
    Ok(Json(playlist))
}

async fn list_playlist_videos(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<PlaylistEntry>>> {
    let id = path_id(&id, "playlist")?;
    let params = query.params(&state.limits, viewer)?;
    let page = blocking(&state, move |store| {
        playlists::list_playlist_videos(store, id, &params)
    })
    .await?;
    Ok(Json(page))
}

async fn list_user_playlists(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<PlaylistCard>>> {
    let user = path_id(&id, "user")?;
    let params = query.params(&state.limits, viewer)?;
    let page = blocking(&state, move |store| {
        playlists::list_user_playlists(store, user, &params)
    })
    .await?;
    Ok(Json(page))
}

async fn channel_stats(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> ApiResult<Json<ChannelStats>> {
    let stats = blocking(&state, move |store| dashboard::channel_stats(store, caller)).await?;
    Ok(Json(stats))
}

async fn dashboard_videos(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<VideoCard>>> {
    let params = query.params(&state.limits, Some(caller))?;
    let published = query.published()?;
    let page = blocking(&state, move |store| {
        let owner = users::get_user(store, caller)?;
        dashboard::channel_videos(store, caller, &owner.username, published, &params)
    })
    .await?;
    Ok(Json(page))
}
