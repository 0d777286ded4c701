use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use jsonrpc_core::{Id, MethodCall, Params, Version};
use serde_json::Value;

use super::config::{RpcAuth, RpcConfig};
use super::types::RpcReply;
use crate::error::FrontendError;

/// One POST per call, no retries.
pub struct RpcClient {
    url: String,
    auth: RpcAuth,
    http: reqwest::Client,
    next_id: AtomicU64,
}

/// HTTP status plus the decoded reply body
#[derive(Debug)]
pub struct RpcResponse {
    pub status: u16,
    pub reply: RpcReply,
}

impl RpcClient {
    pub fn new(config: &RpcConfig) -> Result<Self, FrontendError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            url: config.url(),
            auth: config.auth.clone(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn method_call(&self, method: &str, params: Vec<Value>) -> MethodCall {
        MethodCall {
            jsonrpc: Some(Version::V2),
            method: method.to_string(),
            params: Params::Array(params),
            id: Id::Num(self.next_id.fetch_add(1, Ordering::Relaxed)),
        }
    }

    /// Send one request and decode whatever the server answered
    pub async fn post(&self, method: &str, params: Vec<Value>) -> Result<RpcResponse, FrontendError> {
        let call = self.method_call(method, params);
        log::debug!("POST {} method={}", self.url, method);

        let mut request = self.http.post(&self.url).json(&call);
        if let Some((user, password)) = self.auth.credentials() {
            request = request.basic_auth(user, Some(password));
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let reply = if body.trim().is_empty() {
            RpcReply::default()
        } else {
            match serde_json::from_str::<RpcReply>(&body) {
                Ok(reply) => reply,
                // Error pages are not always JSON; the status code still tells the story.
                Err(e) if status != 200 => {
                    log::debug!("Non-JSON body with HTTP status {}: {}", status, e);
                    RpcReply::default()
                }
                Err(e) => return Err(e.into()),
            }
        };

        Ok(RpcResponse { status, reply })
    }

    /// Call `method` and return its result
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, FrontendError> {
        self.post(method, params).await?.into_result()
    }
}

impl RpcResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200 && self.reply.error.is_none()
    }

    pub fn into_result(self) -> Result<Value, FrontendError> {
        if let Some(error) = self.reply.error {
            return Err(error.into());
        }
        if self.status != 200 {
            return Err(FrontendError::Generic(format!("HTTP error code: {}", self.status)));
        }
        Ok(self.reply.result.unwrap_or(Value::Null))
    }

    /// Print the reply the way the command-line client shows it; returns the exit code
    pub fn report(&self, out: &mut impl Write) -> io::Result<i32> {
        if self.is_success() {
            let result = self.reply.result.as_ref().unwrap_or(&Value::Null);
            writeln!(out, "{}", serde_json::to_string_pretty(result)?)?;
            return Ok(0);
        }

        if self.status != 200 {
            writeln!(out, "HTTP error code: {}", self.status)?;
        }
        if let Some(error) = &self.reply.error {
            writeln!(out, "JSON RPC Error code: {}", error.code.code())?;
            writeln!(out, "{}", error.message)?;
        }
        Ok(1)
    }
}

/// Command-line argument as a JSON-RPC parameter.
///
/// Numbers, booleans, null, arrays and objects are sent as JSON; anything
/// else is sent as a string.
pub fn parse_param(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(_)) | Err(_) => Value::String(raw.to_string()),
        Ok(value) => value,
    }
}

/// Run one command against the node and print the outcome.
///
/// Returns the process exit code: 0 on success, 1 on any transport or
/// protocol error.
pub async fn run_command(
    config: &RpcConfig,
    method: &str,
    params: &[String],
    out: &mut impl Write,
    err: &mut impl Write,
) -> i32 {
    let client = match RpcClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            let _ = writeln!(err, "Error: {}", e);
            return 1;
        }
    };

    let params = params.iter().map(|raw| parse_param(raw)).collect();
    log::info!("Sending {} to {}", method, client.url());

    match client.post(method, params).await {
        Ok(response) => match response.report(out) {
            Ok(code) => code,
            Err(e) => {
                let _ = writeln!(err, "Error: {}", e);
                1
            }
        },
        Err(e) => {
            log::error!("RPC call {} failed: {}", method, e);
            let _ = writeln!(err, "Error: {}", e);
            1
        }
    }
}
