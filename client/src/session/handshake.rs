use futures::{SinkExt, StreamExt};
use log::{debug, warn};
use tokio::{
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    time::timeout,
};
use tokio_util::codec::{FramedRead, FramedWrite};

use mirror_shared::{AuthResponse, BootstrapData, Message, WireCodec};

use crate::{ClientConfig, SessionError};

pub(crate) type FrameReader = FramedRead<OwnedReadHalf, WireCodec>;
pub(crate) type FrameWriter = FramedWrite<OwnedWriteHalf, WireCodec>;

/// Opens the TCP stream within `connect_timeout`
pub(crate) async fn connect(config: &ClientConfig) -> Result<TcpStream, SessionError> {
    let address = config.address();
    let stream = match timeout(config.connect_timeout, TcpStream::connect(&address)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(error)) => {
            return Err(SessionError::Connection {
                reason: format!("could not connect to {}: {}", address, error),
            })
        }
        Err(_) => return Err(SessionError::timeout(format!("connection to {}", address))),
    };
    stream.set_nodelay(true)?;
    debug!("connected to {}", address);
    Ok(stream)
}

/// Sends the credentials and waits, within `auth_timeout`, for the verdict
pub(crate) async fn authenticate(
    reader: &mut FrameReader,
    writer: &mut FrameWriter,
    config: &ClientConfig,
) -> Result<BootstrapData, SessionError> {
    writer
        .send(Message::AuthRequest {
            credentials: config.credentials.clone(),
        })
        .await?;

    match timeout(config.auth_timeout, await_verdict(reader, writer)).await {
        Ok(result) => result,
        Err(_) => Err(SessionError::timeout("authentication response")),
    }
}

async fn await_verdict(
    reader: &mut FrameReader,
    writer: &mut FrameWriter,
) -> Result<BootstrapData, SessionError> {
    loop {
        let message = match reader.next().await {
            Some(result) => result?,
            None => {
                return Err(SessionError::Connection {
                    reason: "server closed the connection during the handshake".to_string(),
                })
            }
        };
        match message {
            Message::AuthResponse(AuthResponse::Success(bootstrap)) => return Ok(bootstrap),
            Message::AuthResponse(AuthResponse::Failure(code)) => {
                return Err(SessionError::Authentication { code })
            }
            Message::Error { message } => return Err(SessionError::Remote { message }),
            Message::Ping { nonce } => writer.send(Message::Pong { nonce }).await?,
            other => warn!("ignoring {:?} received before authentication", other.kind()),
        }
    }
}
