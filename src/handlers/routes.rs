use std::convert::Infallible;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::handlers::registration::{self, MyDataRequest, RegisterRequest, RegistrationError};
use crate::handlers::webhook::{WebhookBody, WebhookHandler};
use crate::service::status_store::StatusStore;

const MAX_BODY_BYTES: u64 = 64 * 1024;

#[derive(Debug, Serialize)]
pub struct ErrorMessage {
    pub error: String,
}

#[derive(Clone)]
pub struct AppState {
    pub webhook: Arc<WebhookHandler>,
    pub store: Arc<dyn StatusStore>,
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// `POST /callback`, `POST /register` and `POST /getMyData`.
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let callback = warp::post()
        .and(warp::path("callback"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(handle_callback);

    let register = warp::post()
        .and(warp::path("register"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(handle_register);

    let my_data = warp::post()
        .and(warp::path("getMyData"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_state(state))
        .and_then(handle_my_data);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["POST"])
        .allow_headers(vec!["content-type", "accept"]);

    callback.or(register).or(my_data).with(cors)
}

async fn handle_callback(body: WebhookBody, state: AppState) -> Result<impl Reply, Rejection> {
    let outcomes = state.webhook.handle_events(body).await;
    Ok(warp::reply::json(&outcomes))
}

async fn handle_register(request: RegisterRequest, state: AppState) -> Result<impl Reply, Rejection> {
    Ok(match registration::register(state.store.as_ref(), request).await {
        Ok(response) => warp::reply::with_status(warp::reply::json(&response), StatusCode::OK),
        Err(err) => error_reply(err),
    })
}

async fn handle_my_data(request: MyDataRequest, state: AppState) -> Result<impl Reply, Rejection> {
    Ok(match registration::my_data(state.store.as_ref(), request).await {
        Ok(entries) => warp::reply::with_status(warp::reply::json(&entries), StatusCode::OK),
        Err(err) => error_reply(err),
    })
}

fn error_reply(err: RegistrationError) -> warp::reply::WithStatus<warp::reply::Json> {
    let status = match &err {
        RegistrationError::Input(_) => StatusCode::BAD_REQUEST,
        RegistrationError::Store(_) => {
            warn!(error = %err, "registration request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let body = ErrorMessage {
        error: err.to_string(),
    };
    warp::reply::with_status(warp::reply::json(&body), status)
}
