//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Map, Value};
use tarefas_api::config::AppConfig;
use tarefas_api::event::InvocationResult;
use tarefas_api::http::LocalServer;
use tarefas_api::Adapter;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// The application adapter with default limits and an empty store.
pub fn adapter() -> Adapter {
    Adapter::from_config(&AppConfig::default())
}

/// Builds gateway payloads in either version.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    method: String,
    path: String,
    query: Option<String>,
    headers: Vec<(String, String)>,
    cookies: Vec<String>,
    body: Option<String>,
    base64: bool,
    request_id: String,
}

pub fn event(method: &str, path: &str) -> EventBuilder {
    EventBuilder {
        method: method.to_string(),
        path: path.to_string(),
        query: None,
        headers: Vec::new(),
        cookies: Vec::new(),
        body: None,
        base64: false,
        request_id: "test-request".to_string(),
    }
}

impl EventBuilder {
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Raw query string, e.g. `a=1&b=2`.
    pub fn query(mut self, query: &str) -> Self {
        self.query = Some(query.to_string());
        self
    }

    pub fn cookie(mut self, cookie: &str) -> Self {
        self.cookies.push(cookie.to_string());
        self
    }

    pub fn json(self, body: &str) -> Self {
        self.header("content-type", "application/json").text(body)
    }

    pub fn text(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self.base64 = false;
        self
    }

    pub fn binary(mut self, body: &[u8]) -> Self {
        self.body = Some(STANDARD.encode(body));
        self.base64 = true;
        self
    }

    /// Payload format 1.0.
    pub fn v1(self) -> Value {
        let mut headers = Map::new();
        for (name, value) in &self.headers {
            headers.insert(name.clone(), json!(value));
        }
        if !self.cookies.is_empty() {
            headers.insert("cookie".into(), json!(self.cookies.join("; ")));
        }
        let query: Option<Map<String, Value>> = self.query.as_deref().map(|q| {
            url_pairs(q)
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect()
        });
        json!({
            "resource": "/{proxy+}",
            "httpMethod": self.method,
            "path": self.path,
            "headers": headers,
            "multiValueHeaders": null,
            "queryStringParameters": query,
            "multiValueQueryStringParameters": null,
            "pathParameters": null,
            "body": self.body,
            "isBase64Encoded": self.base64,
            "requestContext": { "requestId": self.request_id }
        })
    }

    /// Payload format 2.0.
    pub fn v2(self) -> Value {
        let mut headers = Map::new();
        for (name, value) in &self.headers {
            headers.insert(name.clone(), json!(value));
        }
        json!({
            "version": "2.0",
            "routeKey": "$default",
            "rawPath": self.path,
            "rawQueryString": self.query.unwrap_or_default(),
            "cookies": self.cookies,
            "headers": headers,
            "body": self.body,
            "isBase64Encoded": self.base64,
            "requestContext": {
                "requestId": self.request_id,
                "http": { "method": self.method, "path": self.path }
            }
        })
    }
}

fn url_pairs(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Parse a result body as JSON.
pub fn json_body(result: &InvocationResult) -> Value {
    serde_json::from_str(&result.body).unwrap()
}

/// Start the local server on an ephemeral port.
pub async fn start_local_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = LocalServer::new(Arc::new(adapter()));
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });
    addr
}

/// Send one raw HTTP/1.1 request and return the full response text.
pub async fn raw_request(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .unwrap()
        .unwrap();
    String::from_utf8_lossy(&response).into_owned()
}
