use huddle_core::Request;
use serde_json::Value;
use tokio::sync::oneshot;

pub type Reply = Result<Value, String>;

/// A request from the server waiting for our answer.
///
/// Dropping it without calling [`respond`](Self::respond) or
/// [`reject`](Self::reject) answers the server with an error.
#[derive(Debug)]
pub struct InboundRequest {
    pub request: Request,
    reply: oneshot::Sender<Reply>,
}

impl InboundRequest {
    pub fn new(request: Request) -> (Self, oneshot::Receiver<Reply>) {
        let (reply, rx) = oneshot::channel();
        (Self { request, reply }, rx)
    }

    pub fn method(&self) -> &str {
        &self.request.method
    }

    pub fn respond(self, data: Value) {
        let _ = self.reply.send(Ok(data));
    }

    pub fn reject(self, reason: impl Into<String>) {
        let _ = self.reply.send(Err(reason.into()));
    }
}
