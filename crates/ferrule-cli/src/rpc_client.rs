// crates/ferrule-cli/src/rpc_client.rs
//
// Lightweight JSON-RPC client that POSTs to a Ferrule daemon's dispatch
// endpoint.

use ferrule_core::ErrorCode;
use serde::{Deserialize, Serialize};

/// Path the daemon's dispatch service is mounted under.
pub const DISPATCH_PATH: &str = "ferrule.rpc.Dispatch/Call";

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the caller's role.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Mirrors the server's JsonRpcRequest envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub method: String,
    pub params: serde_json::Value,
}

/// Mirrors the server's error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

/// Mirrors the server's JsonRpcResponse envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub success: bool,
    pub result: Option<serde_json::Value>,
    pub error: Option<RpcErrorBody>,
}

impl JsonRpcResponse {
    /// The result on success, or the error rendered as `CODE: message`.
    pub fn into_result(self) -> Result<serde_json::Value, String> {
        match (self.success, self.error) {
            (true, _) => Ok(self.result.unwrap_or(serde_json::Value::Null)),
            (false, Some(err)) => Err(format!("{}: {}", err.code, err.message)),
            (false, None) => Err("request failed without an error body".to_string()),
        }
    }
}

/// Identity forwarded to the daemon as request headers.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub user_id: Option<String>,
    pub role: Option<String>,
}

/// Full URL of the dispatch service for `endpoint`.
pub fn dispatch_url(endpoint: &str) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), DISPATCH_PATH)
}

/// Send a JSON-RPC call to the daemon and return the parsed response.
pub async fn rpc_call(
    endpoint: &str,
    method: &str,
    params: serde_json::Value,
    identity: &Identity,
) -> Result<JsonRpcResponse, Box<dyn std::error::Error>> {
    let request = JsonRpcRequest {
        method: method.to_string(),
        params,
    };

    let client = reqwest::Client::new();
    let mut builder = client.post(dispatch_url(endpoint)).json(&request);
    if let Some(user_id) = &identity.user_id {
        builder = builder.header(USER_ID_HEADER, user_id);
    }
    if let Some(role) = &identity.role {
        builder = builder.header(USER_ROLE_HEADER, role);
    }

    let rpc_response: JsonRpcResponse = builder.send().await?.json().await?;
    Ok(rpc_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dispatch_url_trims_trailing_slash() {
        assert_eq!(
            dispatch_url("http://localhost:50051/"),
            "http://localhost:50051/ferrule.rpc.Dispatch/Call"
        );
        assert_eq!(
            dispatch_url("http://localhost:50051"),
            "http://localhost:50051/ferrule.rpc.Dispatch/Call"
        );
    }

    #[test]
    fn test_response_into_result() {
        let ok: JsonRpcResponse =
            serde_json::from_value(json!({ "success": true, "result": 4.0, "error": null }))
                .unwrap();
        assert_eq!(ok.into_result().unwrap(), json!(4.0));

        let failed: JsonRpcResponse = serde_json::from_value(json!({
            "success": false,
            "result": null,
            "error": { "code": "TOO_MANY_REQUESTS", "message": "Too many requests" }
        }))
        .unwrap();
        assert_eq!(
            failed.into_result().unwrap_err(),
            "TOO_MANY_REQUESTS: Too many requests"
        );
    }
}
