//! Peer connections.

use crate::channel::DataChannel;
use crate::engine::Operation;
use crate::error::Result;
use crate::media::StatsReport;
use crate::resource::define_wrapper;
use crate::types::{DataChannelInit, SessionDescription};

define_wrapper!(
    /// A native peer connection.
    ///
    /// Created with [`Session::create_peer_connection`](crate::Session::create_peer_connection).
    ///
    /// # Example
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use rtc_bridge::{ContextOptions, LoopbackEngine, Session};
    /// use rtc_bridge::{SdpType, SessionDescription};
    ///
    /// # let engine = Arc::new(LoopbackEngine::new());
    /// # let session = Session::create(engine, &ContextOptions::default())?;
    /// let peer = session.create_peer_connection(None)?;
    /// peer.set_remote_description(&SessionDescription::new(SdpType::Offer, "v=0\r\n"))?;
    /// peer.set_local_description(None)?;
    /// # Ok::<(), rtc_bridge::Error>(())
    /// ```
    PeerConnection,
    [PeerConnection]
);

impl PeerConnection {
    /// Apply a local description, or let the engine generate one.
    pub fn set_local_description(&self, desc: Option<&SessionDescription>) -> Result<()> {
        self.resource
            .invoke(Operation::SetLocalDescription(desc.cloned()))?
            .into_unit()
    }

    /// Apply a remote description.
    pub fn set_remote_description(&self, desc: &SessionDescription) -> Result<()> {
        self.resource
            .invoke(Operation::SetRemoteDescription(desc.clone()))?
            .into_unit()
    }

    /// Close the connection. The handle stays valid until dispose.
    pub fn close(&self) -> Result<()> {
        self.resource.invoke(Operation::ClosePeer)?.into_unit()
    }

    /// Open a data channel on this connection.
    ///
    /// The channel is owned by the same session as the connection.
    pub fn create_data_channel(
        &self,
        label: &str,
        init: Option<DataChannelInit>,
    ) -> Result<DataChannel> {
        let peer = self.resource.checked_handle()?;
        self.resource.session().create_data_channel(peer, label, init)
    }

    /// Collect a statistics report.
    pub fn stats_report(&self) -> Result<StatsReport> {
        let peer = self.resource.checked_handle()?;
        self.resource.session().create_stats_report(peer)
    }
}
