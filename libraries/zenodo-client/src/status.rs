//! HTTP status table of the Zenodo REST API and the mapping from an
//! unexpected status to a [`ZenodoError::Remote`].

use crate::error::{ApiErrorBody, RemoteError, Result, ZenodoError};
use crate::transport::ApiResponse;
use serde_json::Value;
use tracing::warn;

/// Name and meaning of a documented status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusInfo {
    pub name: &'static str,
    pub description: &'static str,
}

const STATUS_TABLE: &[(u16, StatusInfo)] = &[
    (
        200,
        StatusInfo {
            name: "OK",
            description: "Request succeeded. Response included. Usually sent for GET/PUT/PATCH requests.",
        },
    ),
    (
        201,
        StatusInfo {
            name: "Created",
            description: "Request succeeded. Response included. Usually sent for POST requests.",
        },
    ),
    (
        202,
        StatusInfo {
            name: "Accepted",
            description: "Request succeeded. Response included. Usually sent for POST requests, where background processing is needed to fulfill the request.",
        },
    ),
    (
        204,
        StatusInfo {
            name: "No Content",
            description: "Request succeeded. No response included. Usually sent for DELETE requests.",
        },
    ),
    (
        400,
        StatusInfo {
            name: "Bad Request",
            description: "Request failed. Error response included.",
        },
    ),
    (
        401,
        StatusInfo {
            name: "Unauthorized",
            description: "Request failed, due to an invalid access token. Error response included.",
        },
    ),
    (
        403,
        StatusInfo {
            name: "Forbidden",
            description: "Request failed, due to missing authorization (e.g. deleting an already submitted upload or missing scopes for your access token). Error response included.",
        },
    ),
    (
        404,
        StatusInfo {
            name: "Not Found",
            description: "Request failed, due to the resource not being found. Error response included.",
        },
    ),
    (
        405,
        StatusInfo {
            name: "Method Not Allowed",
            description: "Request failed, due to unsupported HTTP method. Error response included.",
        },
    ),
    (
        409,
        StatusInfo {
            name: "Conflict",
            description: "Request failed, due to the current state of the resource (e.g. edit a deposition which is not fully integrated). Error response included.",
        },
    ),
    (
        415,
        StatusInfo {
            name: "Unsupported Media Type",
            description: "Request failed, due to missing or invalid request header Content-Type. Error response included.",
        },
    ),
    (
        429,
        StatusInfo {
            name: "Too Many Requests",
            description: "Request failed, due to rate limiting. Error response included.",
        },
    ),
    (
        500,
        StatusInfo {
            name: "Internal Server Error",
            description: "Request failed, due to an internal server error. Error response NOT included. The Zenodo admins have been notified.",
        },
    ),
];

/// Look up a documented status code.
pub fn describe(status: u16) -> Option<StatusInfo> {
    STATUS_TABLE
        .iter()
        .find(|(code, _)| *code == status)
        .map(|(_, info)| *info)
}

/// Human-readable name for any status code.
pub fn status_name(status: u16) -> &'static str {
    if let Some(info) = describe(status) {
        return info.name;
    }
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown Status")
}

/// Build the failure for an unexpected status, decoding the documented
/// error body when present.
pub fn remote_error(status: u16, body: &Value) -> ZenodoError {
    let decoded = match body {
        Value::Object(_) => serde_json::from_value::<ApiErrorBody>(body.clone()).ok(),
        Value::String(text) if !text.is_empty() => Some(ApiErrorBody {
            message: Some(text.clone()),
            ..ApiErrorBody::default()
        }),
        _ => None,
    };

    ZenodoError::Remote(RemoteError {
        status,
        name: status_name(status),
        description: describe(status).map(|info| info.description),
        body: decoded,
    })
}

/// Pass the response through when its status is accepted.
pub fn expect_status(response: ApiResponse, accepted: &[u16]) -> Result<ApiResponse> {
    if accepted.contains(&response.status) {
        Ok(response)
    } else {
        warn!(status = response.status, accepted = ?accepted, "Unexpected response status");
        Err(remote_error(response.status, &response.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_documented_codes() {
        assert_eq!(status_name(404), "Not Found");
        assert_eq!(status_name(409), "Conflict");
        assert!(describe(429).unwrap().description.contains("rate limiting"));
    }

    #[test]
    fn test_undocumented_code_uses_canonical_reason() {
        assert!(describe(418).is_none());
        assert_eq!(status_name(418), "I'm a teapot");
        assert_eq!(status_name(599), "Unknown Status");
    }

    #[test]
    fn test_error_body_decoded() {
        let body = json!({
            "message": "Validation error.",
            "status": 400,
            "errors": [
                {"field": "metadata.title", "message": "Field is required."},
                {"message": "Something else"}
            ]
        });

        match remote_error(400, &body) {
            ZenodoError::Remote(remote) => {
                assert_eq!(remote.status, 400);
                assert_eq!(remote.name, "Bad Request");
                let decoded = remote.body.expect("body decoded");
                assert_eq!(decoded.message.as_deref(), Some("Validation error."));
                assert_eq!(decoded.errors.len(), 2);
                assert_eq!(decoded.errors[0].field.as_deref(), Some("metadata.title"));
                assert!(decoded.errors[1].field.is_none());
            }
            e => panic!("Expected Remote error, got: {:?}", e),
        }
    }

    #[test]
    fn test_error_display_lists_fields() {
        let body = json!({
            "message": "Validation error.",
            "errors": [{"field": "metadata.creators", "message": "Missing data."}]
        });
        let text = remote_error(400, &body).to_string();
        assert!(text.contains("400 Bad Request"));
        assert!(text.contains("Validation error."));
        assert!(text.contains("metadata.creators: Missing data."));
    }

    #[test]
    fn test_expect_status() {
        let ok = ApiResponse::new(201, json!({"id": 1}));
        assert!(expect_status(ok, &[201]).is_ok());

        let not_found = ApiResponse::new(404, json!({"message": "PID does not exist."}));
        let err = expect_status(not_found, &[200]).unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_null_body_gives_no_decoded_body() {
        match remote_error(500, &Value::Null) {
            ZenodoError::Remote(remote) => assert!(remote.body.is_none()),
            e => panic!("Expected Remote error, got: {:?}", e),
        }
    }
}
