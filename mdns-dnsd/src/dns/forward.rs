use std::net::SocketAddr;
use std::time::Duration;
use futures::future::BoxFuture;
use futures::FutureExt;
use hickory_proto::op::{Message, ResponseCode};
use tokio::net::UdpSocket;
use super::{Handler, Reply};

const MAX_RESPONSE_SIZE: usize = 4096;

/// Relays requests to an upstream resolver over UDP.
pub struct Forwarder {
    upstream: SocketAddr,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(upstream: SocketAddr, timeout: Duration) -> Self {
        Self { upstream, timeout }
    }

    async fn exchange(&self, request: &Message) -> anyhow::Result<Message> {
        let local: SocketAddr = if self.upstream.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(self.upstream).await?;
        socket.send(&request.to_vec()?).await?;

        let mut buf = vec![0u8; MAX_RESPONSE_SIZE];
        loop {
            let len = socket.recv(&mut buf).await?;
            let response = Message::from_vec(&buf[..len])?;
            // Stray datagrams don't end the exchange
            if response.id() == request.id() {
                return Ok(response);
            }
        }
    }

    async fn forward(&self, request: &Message) -> Reply {
        match tokio::time::timeout(self.timeout, self.exchange(request)).await {
            Ok(Ok(response)) => Reply::answer(response),
            Ok(Err(e)) => {
                tracing::warn!("Upstream {} failed: {}", self.upstream, e);
                Reply::failure(ResponseCode::ServFail)
            }
            Err(_) => {
                tracing::warn!("Upstream {} timed out after {:?}", self.upstream, self.timeout);
                Reply::failure(ResponseCode::ServFail)
            }
        }
    }
}

impl Handler for Forwarder {
    fn name(&self) -> &'static str {
        "forward"
    }

    fn serve<'a>(&'a self, request: &'a Message) -> BoxFuture<'a, Reply> {
        self.forward(request).boxed()
    }
}
