use std::{convert::Infallible, net::SocketAddr};

use futures::Future;
use warp::{http::StatusCode, Filter, Rejection, Reply};

use crate::{
    api::json::{
        message::{LedRequest, LedResponse},
        ClientConnection, ClientName,
    },
    global::Global,
    models::{ServerConfig, WebConfig},
};

/// Maximum accepted request body size
const MAX_BODY_LENGTH: u64 = 64 * 1024;

fn client_name(remote: Option<SocketAddr>) -> ClientName {
    match remote {
        Some(peer_addr) => ClientName::Http { peer_addr },
        None => ClientName::Local,
    }
}

async fn handle_led_control(
    body: bytes::Bytes,
    remote: Option<SocketAddr>,
    global: Global,
) -> Result<impl Reply, Rejection> {
    let mut client = ClientConnection::new(client_name(remote));

    let (response, status) = match client.handle_payload(&body, &global).await {
        Ok(response) => (response, StatusCode::OK),
        Err((error, response)) => (
            response,
            if error.is_rejection() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        ),
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&response),
        status,
    ))
}

async fn handle_status(remote: Option<SocketAddr>, global: Global) -> Result<impl Reply, Rejection> {
    let mut client = ClientConnection::new(client_name(remote));

    Ok(match client.handle_request(LedRequest::Status, &global).await {
        Ok(response) => warp::reply::with_status(warp::reply::json(&response), StatusCode::OK),
        Err(error) => {
            warn!(error = %error, "status request failed");

            warp::reply::with_status(
                warp::reply::json(&LedResponse::error(&error)),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    })
}

/// Turn rejections from the route filters into JSON error responses
async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_owned())
    } else if let Some(error) = rejection.find::<warp::reject::LengthRequired>() {
        (StatusCode::LENGTH_REQUIRED, error.to_string())
    } else if let Some(error) = rejection.find::<warp::reject::PayloadTooLarge>() {
        (StatusCode::PAYLOAD_TOO_LARGE, error.to_string())
    } else if let Some(error) = rejection.find::<warp::reject::MethodNotAllowed>() {
        (StatusCode::METHOD_NOT_ALLOWED, error.to_string())
    } else {
        warn!(rejection = ?rejection, "unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_owned(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&LedResponse::error(message)),
        status,
    ))
}

/// HTTP routes: `POST /led_control` and `GET /status`
pub fn routes(
    global: Global,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let with_global = warp::any().map(move || global.clone());

    let led_control = warp::path("led_control")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_LENGTH))
        .and(warp::body::bytes())
        .and(warp::filters::addr::remote())
        .and(with_global.clone())
        .and_then(handle_led_control);

    let status = warp::path("status")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::filters::addr::remote())
        .and(with_global)
        .and_then(handle_status);

    led_control.or(status).recover(handle_rejection)
}

pub async fn bind(
    global: Global,
    config: &WebConfig,
) -> Result<impl Future<Output = ()>, std::io::Error> {
    let address = SocketAddr::from(([0, 0, 0, 0], config.port()));
    let listener = tokio::net::TcpListener::bind(address).await?;

    info!(address = %address, "HTTP server listening");

    Ok(warp::serve(routes(global).with(warp::filters::log::log("gridlight::web")))
        .run_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener)))
}
