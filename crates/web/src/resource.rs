//! REST resources: per-method capabilities and their dispatcher.
//!
//! A resource is any type implementing a subset of the four capability
//! methods. The defaults answer "not supported", so dispatch amounts to
//! calling the method for the request's verb: an unimplemented capability
//! yields 405 without ever entering user code.
//!
//! Resource replies are always a single fixed-length JSON body, phrased
//! with HTTP/1.1 framing plus `Connection: close` so clients that wait for
//! a defined length stay compatible with the one-request connection model.

use async_trait::async_trait;
use http::{HeaderValue, Method, StatusCode, Version, header};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error};

use femto_http::connection::ResponseWriter;
use femto_http::protocol::SendError;

use crate::config::RouteConfig;
use crate::handler::HandlerError;
use crate::request::{PathParams, Request};

/// Parsed input handed to a capability method: body and query data merged
/// into one JSON object, plus the bound path parameters.
#[derive(Debug)]
pub struct ApiRequest {
    data: Map<String, Value>,
    params: PathParams,
}

impl ApiRequest {
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// One field of the merged body/query data.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Path parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }
}

/// What a capability method produced.
#[derive(Debug)]
pub enum ApiOutcome {
    /// A value to serialize, answered with 200.
    Json(Value),
    /// A value plus an explicit status code.
    JsonWithStatus(Value, StatusCode),
    /// The resource does not implement this method; answered with 405.
    NotSupported,
    /// The capability failed; answered with 500.
    Failed(HandlerError),
}

impl ApiOutcome {
    /// Serializes `value` as the reply, status 200. A value that cannot
    /// be serialized turns into a 500 at dispatch, never a silent empty
    /// body.
    pub fn ok<T: Serialize>(value: T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self::Json(value),
            Err(e) => Self::Failed(e.into()),
        }
    }

    /// Serializes `value` with an explicit status code.
    pub fn with_status<T: Serialize>(value: T, status: StatusCode) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self::JsonWithStatus(value, status),
            Err(e) => Self::Failed(e.into()),
        }
    }
}

/// A REST resource: implement the methods you answer, leave the rest to
/// the 405 defaults.
///
/// ```no_run
/// # use femto_web::{ApiOutcome, ApiRequest, Resource};
/// # use async_trait::async_trait;
/// struct Sensor;
///
/// #[async_trait]
/// impl Resource for Sensor {
///     async fn get(&self, _request: ApiRequest) -> ApiOutcome {
///         ApiOutcome::ok(serde_json::json!({ "temperature": 21.5 }))
///     }
/// }
/// ```
#[async_trait]
pub trait Resource: Send + Sync {
    async fn get(&self, request: ApiRequest) -> ApiOutcome {
        let _ = request;
        ApiOutcome::NotSupported
    }

    async fn post(&self, request: ApiRequest) -> ApiOutcome {
        let _ = request;
        ApiOutcome::NotSupported
    }

    async fn put(&self, request: ApiRequest) -> ApiOutcome {
        let _ = request;
        ApiOutcome::NotSupported
    }

    async fn delete(&self, request: ApiRequest) -> ApiOutcome {
        let _ = request;
        ApiOutcome::NotSupported
    }
}

/// Dispatches one request to a resource and writes the reply.
pub(crate) async fn dispatch(
    resource: &dyn Resource,
    request: Request,
    response: &mut ResponseWriter,
    config: &RouteConfig,
    debug_mode: bool,
) -> Result<(), SendError> {
    let data = match collect_data(&request) {
        Ok(data) => data,
        Err(reason) => {
            debug!(reason, "malformed resource request data");
            return response.error(StatusCode::BAD_REQUEST, None).await;
        }
    };

    let api_request = ApiRequest { data, params: request.params().clone() };
    let outcome = match request.method() {
        &Method::GET => resource.get(api_request).await,
        &Method::POST => resource.post(api_request).await,
        &Method::PUT => resource.put(api_request).await,
        &Method::DELETE => resource.delete(api_request).await,
        _ => ApiOutcome::NotSupported,
    };

    let (value, status) = match outcome {
        ApiOutcome::Json(value) => (value, StatusCode::OK),
        ApiOutcome::JsonWithStatus(value, status) => (value, status),
        ApiOutcome::NotSupported => return response.error(StatusCode::METHOD_NOT_ALLOWED, None).await,
        ApiOutcome::Failed(e) => {
            error!(cause = %e, "resource capability failed");
            let detail = debug_mode.then(|| e.to_string());
            return response.error(StatusCode::INTERNAL_SERVER_ERROR, detail.as_deref()).await;
        }
    };

    let body = match serde_json::to_vec(&value) {
        Ok(body) => body,
        Err(e) => {
            error!(cause = %e, "resource reply failed to serialize");
            let detail = debug_mode.then(|| e.to_string());
            return response.error(StatusCode::INTERNAL_SERVER_ERROR, detail.as_deref()).await;
        }
    };

    response.set_version(Version::HTTP_11)?;
    response.set_status(status)?;
    response.insert_header(header::CONNECTION, HeaderValue::from_static("close"))?;
    response.insert_header(header::CONTENT_LENGTH, HeaderValue::from(body.len()))?;
    response.add_access_control_headers(&config.access_control())?;
    response.start(mime::APPLICATION_JSON.as_ref()).await?;
    response.send(body).await?;
    response.finish().await
}

/// Builds the merged request data: decoded body first, query-string pairs
/// layered on top; query wins on key collisions.
fn collect_data(request: &Request) -> Result<Map<String, Value>, String> {
    let mut data = Map::new();

    if !request.body().is_empty() {
        // only the type before any ';' parameters matters
        let content_type = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|text| text.split(';').next())
            .map(str::trim)
            .unwrap_or("");

        match content_type {
            "application/json" => match serde_json::from_slice::<Value>(request.body()) {
                Ok(Value::Object(map)) => data = map,
                Ok(_) => return Err("json body is not an object".to_owned()),
                Err(e) => return Err(format!("malformed json body: {e}")),
            },
            "application/x-www-form-urlencoded" => {
                let pairs: Vec<(String, String)> =
                    serde_urlencoded::from_bytes(request.body()).map_err(|e| format!("malformed form body: {e}"))?;
                for (key, value) in pairs {
                    data.insert(key, Value::String(value));
                }
            }
            // unknown or missing content type: body stays unparsed
            _ => {}
        }
    }

    if !request.query_string().is_empty() {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(request.query_string()).map_err(|e| format!("malformed query string: {e}"))?;
        for (key, value) in pairs {
            data.insert(key, Value::String(value));
        }
    }

    Ok(data)
}
