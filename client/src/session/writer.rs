use futures::SinkExt;
use log::{debug, trace, warn};
use tokio::sync::mpsc;

use mirror_shared::{CodecError, Message};

use super::{command::Command, handshake::FrameWriter};

/// Sole writer of outbound frames. Drains `outbound` in order, then shuts the
/// write half down once every sender is gone.
pub(crate) async fn run_writer(
    mut sink: FrameWriter,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    commands: mpsc::UnboundedSender<Command>,
) {
    while let Some(message) = outbound.recv().await {
        let kind = message.kind();
        let request_id = match &message {
            Message::Invoke { request_id, .. } => Some(*request_id),
            _ => None,
        };
        trace!("sending {:?}", kind);

        match sink.send(message).await {
            Ok(()) => {}
            Err(error @ CodecError::OutboundTooLarge { .. }) => {
                warn!("dropping outbound {:?}: {}", kind, error);
                let _ = commands.send(Command::Rejected { request_id, error });
            }
            Err(error) => {
                let _ = commands.send(Command::TransportFailed {
                    error: error.into(),
                });
                return;
            }
        }
    }

    if let Err(error) = sink.close().await {
        debug!("error while shutting down the write half: {}", error);
    }
}
