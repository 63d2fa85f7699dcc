use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::{Context, Result};
use hickory_proto::op::Message;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use super::{error_response, Handler, Reply};

const MAX_PACKET_SIZE: usize = 4096;

/// UDP front end for a handler chain.
pub struct DnsServer {
    socket: Arc<UdpSocket>,
}

impl DnsServer {
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("Failed to bind DNS socket on {}", addr))?;
        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Serve until cancelled. Every datagram is handled on its own task.
    pub async fn run(self, handler: Arc<dyn Handler>, cancel: CancellationToken) {
        let mut buf = vec![0u8; MAX_PACKET_SIZE];

        loop {
            let (len, src) = tokio::select! {
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok(received) => received,
                    Err(e) => {
                        tracing::error!("DNS socket error: {}", e);
                        continue;
                    }
                },
                _ = cancel.cancelled() => break,
            };

            let request = match Message::from_vec(&buf[..len]) {
                Ok(request) => request,
                Err(e) => {
                    tracing::debug!("Dropping malformed query from {}: {}", src, e);
                    continue;
                }
            };

            let socket = self.socket.clone();
            let handler = handler.clone();
            tokio::spawn(async move {
                let reply = handler.serve(&request).await;
                tracing::debug!("{} answered {} with {}", handler.name(), src, reply.code);
                if let Err(e) = write_reply(&socket, src, &request, reply).await {
                    tracing::debug!("Failed to answer {}: {}", src, e);
                }
            });
        }

        tracing::info!("DNS server shutting down");
    }
}

async fn write_reply(socket: &UdpSocket, src: SocketAddr, request: &Message, reply: Reply) -> Result<()> {
    let msg = match reply.message {
        Some(msg) => msg,
        None => error_response(request, reply.code),
    };
    socket.send_to(&msg.to_vec()?, src).await?;
    Ok(())
}
