//! In-memory `LokiHttpClient` for unit tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::TransportError;
use super::client::{LokiHttpClient, PushBody, PushResponse};

pub(crate) enum Reply {
    Respond(PushResponse),
    Fail(&'static str),
    Hang(Duration),
}

/// Records every post and answers with a canned reply
pub(crate) struct RecordingClient {
    reply: Reply,
    posts: Mutex<Vec<(String, PushBody)>>,
}

impl RecordingClient {
    pub(crate) fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            posts: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn ok() -> Arc<Self> {
        Self::new(Reply::Respond(PushResponse {
            status: 204,
            reason: Some("No Content".to_string()),
            body: None,
        }))
    }

    pub(crate) fn posts(&self) -> Vec<(String, PushBody)> {
        self.posts.lock().unwrap().clone()
    }

    pub(crate) fn last_body(&self) -> PushBody {
        self.posts().pop().unwrap().1
    }

    pub(crate) fn last_text(&self) -> String {
        String::from_utf8(self.last_body().bytes).unwrap()
    }

    pub(crate) fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }
}

impl LokiHttpClient for RecordingClient {
    fn post(&self, path: &str, body: PushBody) -> Result<PushResponse, TransportError> {
        self.posts.lock().unwrap().push((path.to_string(), body));
        match &self.reply {
            Reply::Respond(response) => Ok(response.clone()),
            Reply::Fail(message) => Err(TransportError::new(*message)),
            Reply::Hang(delay) => {
                std::thread::sleep(*delay);
                Err(TransportError::new("should have been cancelled"))
            }
        }
    }
}
