use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::{SinkExt, StreamExt};
use prost::Message;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use strata_protos::rpc::{ErrorStatusPb, RequestHeader, ResponseHeader};

use crate::error::{Error, Result};

/// Hard cap on a single call; callers with tighter budgets apply their own
/// timeout on top.
const CALL_TIMEOUT: Duration = Duration::from_secs(10);

struct Call {
    service: &'static str,
    method: &'static str,
    body: Bytes,
    reply: oneshot::Sender<Result<Bytes>>,
}

/// A multiplexed connection to one remote endpoint.
///
/// A single driver task owns the socket: it assigns call ids, writes
/// header-plus-body frames, and completes the matching in-flight call when
/// a response frame arrives. Handles are cheap to clone; when the driver
/// dies every pending and future call fails with a network error.
#[derive(Clone)]
pub struct Connection {
    addr: SocketAddr,
    sender: mpsc::UnboundedSender<Call>,
}

impl Connection {
    pub async fn connect(addr: SocketAddr) -> Result<Connection> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| Error::NetworkError(format!("failed to connect to {addr}: {e}")))?;
        stream.set_nodelay(true)?;
        let framed = Framed::new(stream, LengthDelimitedCodec::new());
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(drive(addr, framed, receiver));
        Ok(Connection { addr, sender })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Issues one RPC and awaits its response message.
    pub async fn call<Req, Resp>(&self, service: &'static str, method: &'static str, req: &Req) -> Result<Resp>
    where
        Req: Message,
        Resp: Message + Default,
    {
        let mut body = BytesMut::with_capacity(req.encoded_len() + 8);
        req.encode_length_delimited(&mut body)
            .map_err(|e| Error::RuntimeError(format!("failed to encode {method} request: {e}")))?;

        let (reply, response) = oneshot::channel();
        self.sender
            .send(Call { service, method, body: body.freeze(), reply })
            .map_err(|_| self.closed())?;

        let mut body = match tokio::time::timeout(CALL_TIMEOUT, response).await {
            Ok(Ok(result)) => result?,
            Ok(Err(_)) => return Err(self.closed()),
            Err(_) => {
                return Err(Error::TimedOut(format!("{method} RPC to {} timed out", self.addr)))
            }
        };
        Ok(Resp::decode_length_delimited(&mut body)?)
    }

    fn closed(&self) -> Error {
        Error::NetworkError(format!("connection to {} closed", self.addr))
    }
}

async fn drive(
    addr: SocketAddr,
    mut framed: Framed<TcpStream, LengthDelimitedCodec>,
    mut calls: mpsc::UnboundedReceiver<Call>,
) {
    let mut next_call_id: i32 = 0;
    let mut in_flight: HashMap<i32, oneshot::Sender<Result<Bytes>>> = HashMap::new();

    let failure = loop {
        tokio::select! {
            call = calls.recv() => {
                let Some(call) = call else { break None };

                let call_id = next_call_id;
                next_call_id += 1;
                let header = RequestHeader {
                    call_id,
                    service: call.service.to_string(),
                    method: call.method.to_string(),
                    timeout_millis: Some(CALL_TIMEOUT.as_millis() as u32),
                };

                let mut frame = BytesMut::with_capacity(header.encoded_len() + call.body.len() + 8);
                if let Err(e) = header.encode_length_delimited(&mut frame) {
                    let _ = call.reply.send(Err(Error::RuntimeError(format!(
                        "failed to encode request header: {e}"
                    ))));
                    continue;
                }
                frame.extend_from_slice(&call.body);
                in_flight.insert(call_id, call.reply);

                if let Err(e) = framed.send(frame.freeze()).await {
                    break Some(Error::NetworkError(format!("write to {addr} failed: {e}")));
                }
            }
            frame = framed.next() => match frame {
                Some(Ok(frame)) => {
                    let mut frame = frame.freeze();
                    let header = match ResponseHeader::decode_length_delimited(&mut frame) {
                        Ok(header) => header,
                        Err(e) => break Some(Error::Corruption(format!(
                            "bad response header from {addr}: {e}"
                        ))),
                    };
                    let Some(reply) = in_flight.remove(&header.call_id) else {
                        // Stale response for a call the client gave up on.
                        tracing::trace!("dropping response for unknown call {} from {addr}", header.call_id);
                        continue;
                    };
                    if header.is_error {
                        let error = match ErrorStatusPb::decode_length_delimited(&mut frame) {
                            Ok(status) => Error::RuntimeError(status.message),
                            Err(e) => Error::Corruption(format!("bad error payload from {addr}: {e}")),
                        };
                        let _ = reply.send(Err(error));
                    } else {
                        let _ = reply.send(Ok(frame));
                    }
                }
                Some(Err(e)) => break Some(Error::NetworkError(format!("read from {addr} failed: {e}"))),
                None => break Some(Error::NetworkError(format!("connection to {addr} closed by peer"))),
            }
        }
    };

    if let Some(error) = failure {
        tracing::warn!("connection to {addr} failed: {error}");
        for (_, reply) in in_flight.drain() {
            let _ = reply.send(Err(error.clone()));
        }
    }
}
