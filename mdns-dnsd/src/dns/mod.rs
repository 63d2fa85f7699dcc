//! DNS query handling.
//!
//! Handlers form a chain: each one either answers a request or passes it to
//! the next. The server at the end writes whatever comes back.

pub mod forward;
pub mod responder;
pub mod server;

use std::sync::Arc;
use futures::future::BoxFuture;
use futures::FutureExt;
use hickory_proto::op::{Message, MessageType, ResponseCode};

pub use responder::MdnsResponder;

/// Result of handling one request.
///
/// `message: None` means nothing was written; the server replies with an
/// empty message carrying `code`.
#[derive(Debug, Clone)]
pub struct Reply {
    pub code: ResponseCode,
    pub message: Option<Message>,
}

impl Reply {
    pub fn answer(message: Message) -> Self {
        Self {
            code: message.response_code(),
            message: Some(message),
        }
    }

    pub fn failure(code: ResponseCode) -> Self {
        Self { code, message: None }
    }
}

pub trait Handler: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn serve<'a>(&'a self, request: &'a Message) -> BoxFuture<'a, Reply>;
}

/// Hand `request` to `next`, or fail it when this is the end of the chain.
pub fn next_or_failure<'a>(
    next: Option<&'a Arc<dyn Handler>>,
    request: &'a Message,
) -> BoxFuture<'a, Reply> {
    match next {
        Some(next) => next.serve(request),
        None => async { Reply::failure(ResponseCode::ServFail) }.boxed(),
    }
}

/// Empty response to `request`, queries echoed back.
pub fn reply_to(request: &Message) -> Message {
    let mut msg = Message::new();
    msg.set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_recursion_desired(request.recursion_desired());
    msg.add_queries(request.queries().iter().cloned());
    msg
}

pub fn error_response(request: &Message, code: ResponseCode) -> Message {
    let mut msg = reply_to(request);
    msg.set_response_code(code);
    msg
}
