use std::time::Duration;

use matenet_frame::{Clock, FrameConfig, MonotonicClock, PortChannel};
use matenet_transport::Transport;
use tracing::{debug, trace};

use crate::error::Result;
use crate::packet::{RequestPacket, ResponsePacket};

/// Responding side of the bus.
///
/// Never waits: [`Self::receive_request`] makes one attempt and returns.
/// Callers drive it from their own loop.
pub struct DeviceProtocol<T, C = MonotonicClock> {
    channel: PortChannel<T, C>,
}

impl<T: Transport> DeviceProtocol<T> {
    pub fn new(transport: T) -> Self {
        Self::from_channel(PortChannel::new(transport))
    }

    pub fn with_config(transport: T, config: FrameConfig) -> Self {
        Self::from_channel(PortChannel::with_config(transport, config))
    }
}

impl<T: Transport, C: Clock> DeviceProtocol<T, C> {
    /// Use `clock` for receive deadlines instead of the system clock.
    pub fn with_clock(transport: T, config: FrameConfig, clock: C) -> Self {
        Self::from_channel(PortChannel::with_clock(transport, config, clock))
    }

    pub fn from_channel(channel: PortChannel<T, C>) -> Self {
        Self { channel }
    }

    /// One receive attempt. Returns the addressed port and the request.
    pub fn try_receive_request(&mut self) -> Result<(u8, RequestPacket)> {
        let frame = self.channel.receive()?;
        let request = RequestPacket::decode(&frame.payload)?;
        Ok((frame.port, request))
    }

    /// One receive attempt. `None` when nothing is waiting or what arrived
    /// was not a valid request.
    pub fn receive_request(&mut self) -> Option<(u8, RequestPacket)> {
        match self.try_receive_request() {
            Ok((port, request)) => {
                trace!(
                    port,
                    register = format_args!("{:#06x}", request.register),
                    parameter = request.parameter,
                    "request received"
                );
                Some((port, request))
            }
            Err(err) if err.is_no_data() => None,
            Err(err) => {
                debug!(error = %err, "dropping invalid request");
                None
            }
        }
    }

    /// Answer a request. `command` is echoed in the marked byte.
    pub fn send_response(&mut self, command: u8, response: &ResponsePacket) -> Result<()> {
        self.channel.send(command, &response.to_bytes())?;
        Ok(())
    }

    /// Whether anything is waiting on the bus.
    pub fn available(&mut self) -> Result<bool> {
        Ok(self.channel.available()?)
    }

    /// Bound on how long one receive attempt may collect a frame.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.channel.set_timeout(timeout);
    }

    pub fn channel(&self) -> &PortChannel<T, C> {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut PortChannel<T, C> {
        &mut self.channel
    }

    pub fn into_inner(self) -> PortChannel<T, C> {
        self.channel
    }
}

impl<T, C> std::fmt::Debug for DeviceProtocol<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceProtocol")
            .field("channel", &self.channel)
            .finish()
    }
}
