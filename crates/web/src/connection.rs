//! One connection's lifecycle: parse → route → dispatch → reply → close.
//!
//! The handler owns its socket for exactly one exchange. The parse phase
//! (request line, headers, body) is bounded by the server's
//! `request_timeout`; a client that stalls past it is disconnected without
//! a response. Parse failures are answered locally with an error status
//! and never reach user code; handler failures are normalized to 500 at
//! this boundary. Whatever happens, the response writer reaches `Done` at
//! most once and the socket closes when the handler returns.

use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, trace, warn};

use femto_http::connection::{RequestReader, ResponseWriter, WriteState};
use femto_http::protocol::{HttpError, ParseError, PayloadSize, SendError};

use crate::config::ServerConfig;
use crate::handler::HandlerResult;
use crate::request::Request;
use crate::resource;
use crate::router::{Endpoint, Resolution, Route, Router};
use crate::server::Shared;

/// Entry point for one accepted connection. Cancellation via `shutdown`
/// unwinds at the next suspension point; dropping the halves closes the
/// socket on every path.
pub(crate) async fn serve_connection(stream: TcpStream, shared: Arc<Shared>, shutdown: CancellationToken) {
    let peer = stream.peer_addr().ok();
    let (read_half, write_half) = stream.into_split();
    let mut reader = RequestReader::new(read_half);
    let mut response = ResponseWriter::new(write_half);

    let result = tokio::select! {
        _ = shutdown.cancelled() => {
            trace!(?peer, "connection cancelled by shutdown");
            Ok(())
        }
        result = handle_exchange(&mut reader, &mut response, &shared.router, &shared.config) => result,
    };

    match result {
        Ok(()) => trace!(?peer, "exchange finished, connection shutdown"),
        Err(e) => warn!(?peer, cause = %e, "exchange aborted, connection shutdown"),
    }
}

/// Runs one full request/response exchange.
async fn handle_exchange<R>(
    reader: &mut RequestReader<R>,
    response: &mut ResponseWriter,
    router: &Router,
    config: &ServerConfig,
) -> Result<(), HttpError>
where
    R: AsyncRead + Unpin,
{
    let parsed = match timeout(config.request_timeout, parse_request(reader, router)).await {
        // a stalled parse is torn down with no response at all
        Err(_elapsed) => return Err(HttpError::Timeout),
        Ok(Ok(parsed)) => parsed,
        Ok(Err(e)) => {
            // parse failures are answered locally and never reach a
            // handler; socket-level failures just close
            if let Some(status) = e.status() {
                response.error(status, None).await?;
            }
            return Err(e.into());
        }
    };

    let Some(exchange) = parsed else {
        // peer closed without sending a request
        return Ok(());
    };

    match exchange {
        Exchange::NotFound => response.error(StatusCode::NOT_FOUND, Some("Page Not Found")).await?,
        Exchange::MethodNotAllowed => response.error(StatusCode::METHOD_NOT_ALLOWED, None).await?,
        Exchange::Options(route) => {
            // the engine answers preflight itself, handlers never see it
            response.add_access_control_headers(&route.config().access_control())?;
            response.empty().await?;
        }
        Exchange::Invoke { route, request } => match route.endpoint() {
            Endpoint::Resource(res) => {
                resource::dispatch(res.as_ref(), request, response, route.config(), config.debug).await?;
            }
            Endpoint::Handler(handler) => {
                let result = handler.handle(request, response).await;
                finalize(response, result, config.debug).await?;
            }
        },
    }

    Ok(())
}

/// What the parse phase decided before any user code runs.
enum Exchange<'router> {
    NotFound,
    MethodNotAllowed,
    Options(&'router Route),
    Invoke { route: &'router Route, request: Request },
}

/// Parse phase: head, route resolution, header retention, body.
///
/// `Ok(None)` means the peer closed before sending anything.
async fn parse_request<'router, R>(
    reader: &mut RequestReader<R>,
    router: &'router Router,
) -> Result<Option<Exchange<'router>>, ParseError>
where
    R: AsyncRead + Unpin,
{
    let Some(head) = reader.read_head().await? else {
        return Ok(None);
    };
    trace!(method = %head.method(), path = head.path(), "request head parsed");

    match router.resolve(head.method(), head.path()) {
        Resolution::NotFound => Ok(Some(Exchange::NotFound)),
        Resolution::MethodNotAllowed => Ok(Some(Exchange::MethodNotAllowed)),
        Resolution::Matched { route, params } => {
            if head.method() == Method::OPTIONS {
                return Ok(Some(Exchange::Options(route)));
            }

            let route_config = route.config();
            let body = match head.payload_size() {
                PayloadSize::Length(declared) if declared > route_config.max_body_size as u64 => {
                    // refused before a single body byte is consumed
                    return Err(ParseError::payload_too_large(declared, route_config.max_body_size));
                }
                PayloadSize::Length(declared) => reader.read_body(declared).await?,
                PayloadSize::Unbounded | PayloadSize::Empty => Bytes::new(),
            };

            let headers = head.retain_headers(&route_config.save_headers, route_config.parse_headers);
            let request = Request::new(&head, headers, body, params);
            Ok(Some(Exchange::Invoke { route, request }))
        }
    }
}

/// Guarantees exactly one `Done` transition per request.
async fn finalize(response: &mut ResponseWriter, result: HandlerResult, debug_mode: bool) -> Result<(), SendError> {
    match result {
        Ok(()) => match response.state() {
            // a handler that wrote nothing still owes the client a reply
            WriteState::NotStarted => response.empty().await,
            WriteState::Done => Ok(()),
            WriteState::HeadersSent | WriteState::BodyStreaming => response.finish().await,
        },
        Err(e) => {
            error!(cause = %e, "handler failed");
            match response.state() {
                WriteState::NotStarted => {
                    let detail = debug_mode.then(|| e.to_string());
                    response.error(StatusCode::INTERNAL_SERVER_ERROR, detail.as_deref()).await
                }
                // a body is already underway and must not be resumed
                _ => {
                    response.abort();
                    Ok(())
                }
            }
        }
    }
}
