use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::OAuthError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

enum Reply {
    Response(HttpResponse),
    Unreachable,
    InvalidHeader,
}

/// Transport that replays queued replies in order and records every
/// request it receives.
#[derive(Default)]
pub(crate) struct StubTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply_json(self, status: u16, body: serde_json::Value) -> Self {
        self.reply(status, body.to_string())
    }

    pub(crate) fn reply(self, status: u16, body: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Response(HttpResponse {
            status,
            body: body.into(),
        }));
        self
    }

    pub(crate) fn unreachable(self) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Unreachable);
        self
    }

    pub(crate) fn reject_header(self) -> Self {
        self.replies.lock().unwrap().push_back(Reply::InvalidHeader);
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, OAuthError> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::InvalidHeader) => Err(OAuthError::InvalidHeader {
                name: "authorization".to_string(),
            }),
            Some(Reply::Unreachable) | None => Err(OAuthError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "stub transport has no reply queued",
            ))),
        }
    }
}
