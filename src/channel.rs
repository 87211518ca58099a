//! Data channels.

use crate::engine::Operation;
use crate::error::Result;
use crate::resource::define_wrapper;

define_wrapper!(
    /// A data channel opened with
    /// [`PeerConnection::create_data_channel`](crate::PeerConnection::create_data_channel).
    DataChannel,
    [DataChannel]
);

impl DataChannel {
    /// The label given at creation.
    pub fn label(&self) -> Result<String> {
        self.resource.invoke(Operation::DataChannelLabel)?.into_text()
    }

    /// Send a binary message.
    pub fn send(&self, data: &[u8]) -> Result<()> {
        self.resource
            .invoke(Operation::SendData(data.to_vec()))?
            .into_unit()
    }

    /// Send a text message.
    pub fn send_text(&self, text: &str) -> Result<()> {
        self.send(text.as_bytes())
    }

    /// Close the channel. The handle stays valid until dispose.
    pub fn close(&self) -> Result<()> {
        self.resource.invoke(Operation::CloseDataChannel)?.into_unit()
    }
}
