use std::time::Duration;

use matenet_frame::{
    elapsed_ms, Clock, FrameConfig, FrameError, MonotonicClock, PortChannel, ROOT_PORT,
};
use matenet_transport::Transport;
use tracing::debug;

use crate::device_type::DeviceType;
use crate::error::{ProtocolError, Result};
use crate::packet::{RequestPacket, ResponsePacket, Revision};
use crate::registers::{REG_DEVICE_TYPE, REG_REVISION_A, REG_REVISION_B, REG_REVISION_C};

/// Initiating side of the bus: queries and controls devices, one request
/// at a time.
///
/// Every call is synchronous. "Blocking" means polling the channel until a
/// response arrives or the channel timeout passes. The `try_*` methods
/// report why a request failed; the plain methods collapse failures into
/// `-1`, `false`, [`DeviceType::None`] or `None`, logging the reason.
pub struct ControllerProtocol<T, C = MonotonicClock> {
    channel: PortChannel<T, C>,
}

impl<T: Transport> ControllerProtocol<T> {
    pub fn new(transport: T) -> Self {
        Self::from_channel(PortChannel::new(transport))
    }

    pub fn with_config(transport: T, config: FrameConfig) -> Self {
        Self::from_channel(PortChannel::with_config(transport, config))
    }
}

impl<T: Transport, C: Clock> ControllerProtocol<T, C> {
    /// Use `clock` for response deadlines instead of the system clock.
    pub fn with_clock(transport: T, config: FrameConfig, clock: C) -> Self {
        Self::from_channel(PortChannel::with_clock(transport, config, clock))
    }

    pub fn from_channel(channel: PortChannel<T, C>) -> Self {
        Self { channel }
    }

    /// Deadline for each subsequent blocking call on this controller.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.channel.set_timeout(timeout);
    }

    pub fn timeout(&self) -> Duration {
        self.channel.timeout()
    }

    /// Send a request packet to `port` without waiting for the answer.
    pub fn send_packet(&mut self, port: u8, packet: &RequestPacket) -> Result<()> {
        self.channel.send(port, &packet.to_bytes())?;
        Ok(())
    }

    /// One receive attempt. Returns the answered command byte and the response.
    pub fn recv_response(&mut self) -> Result<(u8, ResponsePacket)> {
        let timeout_ms = self.channel.timeout_ms();
        self.recv_response_within(timeout_ms)
    }

    /// Poll for a response until one arrives or the timeout passes.
    ///
    /// A malformed frame resolves the request just like a valid one; only
    /// "nothing yet" keeps the poll going. Each receive attempt gets what is
    /// left of the deadline, so the whole call never runs past it.
    pub fn recv_response_blocking(&mut self) -> Result<(u8, ResponsePacket)> {
        let timeout_ms = self.channel.timeout_ms();
        let start = self.channel.clock().now_ms();
        loop {
            let elapsed = elapsed_ms(start, self.channel.clock().now_ms());
            if elapsed > timeout_ms {
                return Err(ProtocolError::Timeout(self.channel.timeout()));
            }
            match self.recv_response_within(timeout_ms - elapsed) {
                Err(ProtocolError::Frame(FrameError::Timeout { .. })) => {
                    return Err(ProtocolError::Timeout(self.channel.timeout()));
                }
                Err(err) if err.is_no_data() => {}
                other => return other,
            }
            std::thread::yield_now();
        }
    }

    fn recv_response_within(&mut self, timeout_ms: u32) -> Result<(u8, ResponsePacket)> {
        let frame = self.channel.receive_within(timeout_ms)?;
        let response = ResponsePacket::decode(&frame.payload)?;
        Ok((frame.port, response))
    }

    /// Query a register and return its raw value.
    pub fn try_query(&mut self, register: u16, parameter: u16, port: u8) -> Result<u16> {
        self.send_packet(port, &RequestPacket::new(register, parameter))?;
        let (command, response) = self.recv_response_blocking()?;
        debug!(
            register = format_args!("{register:#06x}"),
            port,
            command,
            value = response.value,
            "query answered"
        );
        Ok(response.value)
    }

    /// Query a register. Returns the value as signed 16-bit, or `-1` if
    /// there was no valid response.
    ///
    /// A register that legitimately holds `0xFFFF` is indistinguishable
    /// from a failure here; use [`Self::try_query`] when that matters.
    pub fn query(&mut self, register: u16, parameter: u16, port: u8) -> i16 {
        match self.try_query(register, parameter, port) {
            Ok(value) => value as i16,
            Err(err) => {
                debug!(
                    register = format_args!("{register:#06x}"),
                    port,
                    error = %err,
                    "query failed"
                );
                -1
            }
        }
    }

    /// Send a control command and wait for it to be acknowledged.
    /// The value in the acknowledgement is not inspected.
    pub fn try_control(&mut self, register: u16, value: u16, port: u8) -> Result<()> {
        self.send_packet(port, &RequestPacket::new(register, value))?;
        self.recv_response_blocking()?;
        Ok(())
    }

    /// Send a control command. `true` if any valid response came back.
    pub fn control(&mut self, register: u16, value: u16, port: u8) -> bool {
        match self.try_control(register, value, port) {
            Ok(()) => true,
            Err(err) => {
                debug!(
                    register = format_args!("{register:#06x}"),
                    port,
                    error = %err,
                    "control failed"
                );
                false
            }
        }
    }

    /// Identify the device attached to `port`.
    pub fn try_scan(&mut self, port: u8) -> Result<DeviceType> {
        let code = self.try_query(REG_DEVICE_TYPE, 0, port)?;
        DeviceType::from_code(code).ok_or(ProtocolError::UnknownDeviceType(code))
    }

    /// Identify the device attached to `port`, or [`DeviceType::None`].
    pub fn scan(&mut self, port: u8) -> DeviceType {
        match self.try_scan(port) {
            Ok(device) => device,
            Err(err) => {
                debug!(port, error = %err, "scan found no device");
                DeviceType::None
            }
        }
    }

    /// Read the three revision registers. Stops at the first failure.
    pub fn try_get_revision(&mut self, port: u8) -> Result<Revision> {
        Ok(Revision {
            a: self.try_query(REG_REVISION_A, 0, port)?,
            b: self.try_query(REG_REVISION_B, 0, port)?,
            c: self.try_query(REG_REVISION_C, 0, port)?,
        })
    }

    /// Read the revision, or `None` if any of the three queries failed.
    /// Partially read revisions are never returned.
    pub fn get_revision(&mut self, port: u8) -> Option<Revision> {
        match self.try_get_revision(port) {
            Ok(revision) => Some(revision),
            Err(err) => {
                debug!(port, error = %err, "revision read failed");
                None
            }
        }
    }

    /// Query the device type on the root port.
    pub fn scan_root(&mut self) -> DeviceType {
        self.scan(ROOT_PORT)
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

impl<T, C> std::fmt::Debug for ControllerProtocol<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerProtocol")
            .field("channel", &self.channel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::thread::JoinHandle;
    use std::time::Instant;

    use matenet_transport::{MemoryTransport, Transport, Unit};

    use super::*;
    use crate::device::DeviceProtocol;

    type Served = (Vec<(u8, RequestPacket)>, DeviceProtocol<MemoryTransport>);

    /// Serve `requests` requests from a register map, then hand back what
    /// was asked. Registers missing from the map get no reply. The device end
    /// stays open until the handle is joined.
    fn spawn_device(
        transport: MemoryTransport,
        registers: &[(u16, u16)],
        requests: usize,
    ) -> JoinHandle<Served> {
        let registers: HashMap<u16, u16> = registers.iter().copied().collect();
        std::thread::spawn(move || {
            let mut device = DeviceProtocol::new(transport);
            let mut seen = Vec::new();
            let started = Instant::now();
            while seen.len() < requests && started.elapsed() < Duration::from_secs(5) {
                let Some((port, request)) = device.receive_request() else {
                    std::thread::yield_now();
                    continue;
                };
                seen.push((port, request));
                if let Some(value) = registers.get(&request.register) {
                    device
                        .send_response(port, &ResponsePacket::new(*value))
                        .unwrap();
                }
            }
            (seen, device)
        })
    }

    fn requests(handle: JoinHandle<Served>) -> Vec<(u8, RequestPacket)> {
        handle.join().unwrap().0
    }

    fn controller_pair() -> (ControllerProtocol<MemoryTransport>, MemoryTransport) {
        let (a, b) = MemoryTransport::pair();
        (ControllerProtocol::new(a), b)
    }

    #[test]
    fn query_returns_device_value() {
        let (mut controller, device_end) = controller_pair();
        let device = spawn_device(device_end, &[(0x0008, 1234)], 1);

        assert_eq!(controller.query(0x0008, 0, 1), 1234);

        let seen = requests(device);
        assert_eq!(seen, vec![(1, RequestPacket::new(0x0008, 0))]);
    }

    #[test]
    fn query_without_response_returns_minus_one() {
        let (mut controller, _device_end) = controller_pair();
        controller.set_timeout(Duration::from_millis(20));

        let started = Instant::now();
        assert_eq!(controller.query(0x0008, 0, 1), -1);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn try_query_reports_timeout() {
        let (mut controller, _device_end) = controller_pair();
        controller.set_timeout(Duration::from_millis(10));

        let err = controller.try_query(0x0001, 0, 0).unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout(d) if d == Duration::from_millis(10)));
    }

    /// Advances 5 ms on every read.
    struct TickClock(Cell<u32>);

    impl Clock for TickClock {
        fn now_ms(&self) -> u32 {
            let now = self.0.get();
            self.0.set(now.wrapping_add(5));
            now
        }
    }

    #[test]
    fn deadline_follows_injected_clock_across_rollover() {
        let (a, _device_end) = MemoryTransport::pair();
        let config = FrameConfig {
            timeout: Duration::from_millis(20),
            ..FrameConfig::default()
        };
        let mut controller =
            ControllerProtocol::with_clock(a, config, TickClock(Cell::new(u32::MAX - 7)));

        let err = controller.try_query(0x0008, 0, 0).unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout(_)));
        // Start read plus five polls of 5 ms each crosses the 20 ms deadline.
        assert_eq!(controller.channel().clock().0.get(), (u32::MAX - 7).wrapping_add(30));
    }

    #[test]
    fn late_noise_does_not_extend_the_deadline() {
        let (mut controller, mut device_end) = controller_pair();
        controller.set_timeout(Duration::from_millis(50));

        let noise = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(40));
            device_end.write_unit(Unit::data(0x55)).unwrap();
            device_end.flush().unwrap();
            // Held open until joined, so the controller sees silence.
            device_end
        });

        let started = Instant::now();
        assert_eq!(controller.query(0x0008, 0, 1), -1);
        let waited = started.elapsed();
        let _device_end = noise.join().unwrap();

        assert!(waited >= Duration::from_millis(50));
        assert!(waited < Duration::from_millis(85), "waited {waited:?}");
        assert_eq!(controller.channel().stats().discarded_units, 1);
    }

    #[test]
    fn receive_attempt_gets_only_the_remaining_budget() {
        let (a, _device_end) = MemoryTransport::pair();
        a.inject(&[Unit::data(0x55); 16]);
        let config = FrameConfig {
            timeout: Duration::from_millis(20),
            ..FrameConfig::default()
        };
        let mut controller = ControllerProtocol::with_clock(a, config, TickClock(Cell::new(0)));

        let err = controller.recv_response_blocking().unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout(d) if d == Duration::from_millis(20)));
        // 5 ms already spent when the attempt starts, so it stops at 15 ms
        // of noise rather than the full 20.
        assert_eq!(controller.channel().stats().discarded_units, 3);
        assert_eq!(controller.channel().clock().0.get(), 35);
    }

    #[test]
    fn query_value_is_signed() {
        let (mut controller, device_end) = controller_pair();
        let device = spawn_device(device_end, &[(0x0010, 0xFFFE)], 1);

        assert_eq!(controller.query(0x0010, 0, 0), -2);
        device.join().unwrap();
    }

    #[test]
    fn query_sends_parameter() {
        let (mut controller, device_end) = controller_pair();
        let device = spawn_device(device_end, &[(0x0020, 7)], 1);

        assert_eq!(controller.query(0x0020, 0x0042, 3), 7);
        let seen = requests(device);
        assert_eq!(seen[0], (3, RequestPacket::new(0x0020, 0x0042)));
    }

    #[test]
    fn corrupted_response_resolves_request_as_failure() {
        let (mut controller, _device_end) = controller_pair();
        // Response with a bad checksum already waiting on the bus.
        controller.channel().get_ref().inject(&[
            Unit::marked(0x02),
            Unit::data(0x04),
            Unit::data(0xD2),
            Unit::data(0x00),
            Unit::data(0x00),
        ]);

        let err = controller.try_query(0x0008, 0, 1).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Frame(FrameError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn short_response_is_unexpected_length() {
        let (mut controller, _device_end) = controller_pair();
        // Valid frame, one-byte payload.
        controller.channel().get_ref().inject(&[
            Unit::marked(0x02),
            Unit::data(0x05),
            Unit::data(0x00),
            Unit::data(0x07),
        ]);

        let err = controller.try_query(0x0008, 0, 1).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedLength {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn control_true_on_any_response() {
        let (mut controller, device_end) = controller_pair();
        let device = spawn_device(device_end, &[(0x0100, 0)], 1);

        assert!(controller.control(0x0100, 1, 2));
        let seen = requests(device);
        assert_eq!(seen[0], (2, RequestPacket::new(0x0100, 1)));
    }

    #[test]
    fn control_false_without_response() {
        let (mut controller, _device_end) = controller_pair();
        controller.set_timeout(Duration::from_millis(10));
        assert!(!controller.control(0x0100, 1, 0));
    }

    #[test]
    fn scan_maps_charge_controller() {
        let (mut controller, device_end) = controller_pair();
        let device = spawn_device(device_end, &[(REG_DEVICE_TYPE, 3)], 1);

        assert_eq!(controller.scan(2), DeviceType::ChargeController);
        let seen = requests(device);
        assert_eq!(seen[0].0, 2);
    }

    #[test]
    fn scan_unmapped_code_is_none() {
        let (mut controller, device_end) = controller_pair();
        let device = spawn_device(device_end, &[(REG_DEVICE_TYPE, 0x0063)], 2);

        assert_eq!(controller.scan(2), DeviceType::None);
        let err = controller.try_scan(2).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownDeviceType(0x0063)));
        device.join().unwrap();
    }

    #[test]
    fn scan_without_device_is_none() {
        let (mut controller, _device_end) = controller_pair();
        controller.set_timeout(Duration::from_millis(10));
        assert_eq!(controller.scan_root(), DeviceType::None);
    }

    #[test]
    fn get_revision_reads_three_registers() {
        let (mut controller, device_end) = controller_pair();
        let device = spawn_device(
            device_end,
            &[(REG_REVISION_A, 1), (REG_REVISION_B, 2), (REG_REVISION_C, 3)],
            3,
        );

        let revision = controller.get_revision(4).unwrap();
        assert_eq!(revision, Revision { a: 1, b: 2, c: 3 });

        let registers: Vec<u16> = requests(device)
            .iter()
            .map(|(_, request)| request.register)
            .collect();
        assert_eq!(registers, vec![REG_REVISION_A, REG_REVISION_B, REG_REVISION_C]);
    }

    #[test]
    fn get_revision_partial_failure_is_total_failure() {
        let (mut controller, device_end) = controller_pair();
        controller.set_timeout(Duration::from_millis(20));
        let device = spawn_device(device_end, &[(REG_REVISION_A, 1), (REG_REVISION_B, 2)], 3);

        assert_eq!(controller.get_revision(0), None);
        assert_eq!(requests(device).len(), 3);
    }

    #[test]
    fn try_get_revision_stops_at_first_failure() {
        let (mut controller, device_end) = controller_pair();
        controller.set_timeout(Duration::from_millis(20));
        let device = spawn_device(device_end, &[(REG_REVISION_B, 2), (REG_REVISION_C, 3)], 1);

        let err = controller.try_get_revision(0).unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout(_)));

        // Only the first sub-query went out.
        let sent = requests(device);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.register, REG_REVISION_A);
    }

    #[test]
    fn sequential_requests_reuse_the_channel() {
        let (mut controller, device_end) = controller_pair();
        let device = spawn_device(device_end, &[(0x0001, 10), (0x0002, 20)], 4);

        assert_eq!(controller.query(0x0001, 0, 0), 10);
        assert_eq!(controller.query(0x0002, 0, 0), 20);
        assert_eq!(controller.query(0x0001, 0, 0), 10);
        assert_eq!(controller.query(0x0002, 0, 0), 20);
        device.join().unwrap();

        assert_eq!(controller.channel().stats().frames, 4);
    }
}
