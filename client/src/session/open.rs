use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use log::{error, info};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::{FramedRead, FramedWrite};

use mirror_shared::{BootstrapData, WireCodec};

use super::{
    command::Command,
    handshake::{authenticate, connect, FrameReader, FrameWriter},
    link::SessionLink,
    owner::SessionOwner,
    session_handle::Session,
    writer::run_writer,
};
use crate::{
    BundleSource, ClientConfig, DefinitionCache, DefinitionSource, NetworkSource, SessionError,
    SessionState,
};

/// Connects, authenticates and returns a `Ready` session.
///
/// Any failure leaves nothing running behind. The session never reconnects;
/// once it reports `Disconnected`, open a new one.
pub async fn open_session(config: ClientConfig) -> Result<Session, SessionError> {
    // a broken bundle fails before any network traffic
    let bundle = match &config.definition_bundle {
        Some(path) => Some(BundleSource::load(path).await?),
        None => None,
    };

    let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
    let (reader, writer, bootstrap) = match establish(&config, &state_tx).await {
        Ok(established) => established,
        Err(error) => {
            error!("could not open session with {}: {}", config.address(), error);
            state_tx.send_replace(SessionState::Disconnected);
            return Err(error);
        }
    };
    info!(
        "authenticated with {} as '{}' (connection {})",
        config.address(),
        config.credentials.username,
        bootstrap.connection_id
    );

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let link = SessionLink::new(command_tx.clone(), config.request_timeout, state_rx);

    let mut sources: Vec<Arc<dyn DefinitionSource>> = Vec::new();
    if let Some(bundle) = bundle {
        sources.push(Arc::new(bundle));
    }
    sources.push(Arc::new(NetworkSource::new(link.clone())));
    let definitions = Arc::new(DefinitionCache::new(config.cache_capacity, sources));

    let snapshots = Arc::new(RwLock::new(HashMap::new()));
    let writer_task = tokio::spawn(run_writer(writer, outbound_rx, command_tx));
    let mut owner = SessionOwner::new(
        &config,
        definitions.clone(),
        outbound_tx,
        snapshots.clone(),
        state_tx,
        writer_task,
    );
    if let Err(error) = owner.install_bootstrap(&bootstrap, &config) {
        error!("could not install bootstrap state: {}", error);
        link.send_unchecked(Command::Close);
        tokio::spawn(owner.run(reader, command_rx));
        return Err(error);
    }
    owner.set_state(SessionState::Ready);
    tokio::spawn(owner.run(reader, command_rx));

    Ok(Session::new(link, snapshots, definitions, bootstrap))
}

async fn establish(
    config: &ClientConfig,
    state: &watch::Sender<SessionState>,
) -> Result<(FrameReader, FrameWriter, BootstrapData), SessionError> {
    state.send_replace(SessionState::Connecting);
    let stream = connect(config).await?;

    let codec = WireCodec::new(config.max_frame_size);
    let (read_half, write_half) = stream.into_split();
    let mut reader = FramedRead::new(read_half, codec);
    let mut writer = FramedWrite::new(write_half, codec);

    state.send_replace(SessionState::Authenticating);
    let bootstrap = authenticate(&mut reader, &mut writer, config).await?;
    Ok((reader, writer, bootstrap))
}
