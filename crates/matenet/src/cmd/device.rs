use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use matenet_protocol::{
    DeviceType, RequestPacket, REG_DEVICE_TYPE, REG_REVISION_A, REG_REVISION_B, REG_REVISION_C,
};

use crate::cmd::DeviceArgs;
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::OutputFormat;

/// Register contents served by the emulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub registers: BTreeMap<u16, u16>,
    /// Registers whose requests carry a value to store.
    pub controls: BTreeSet<u16>,
    /// Sleep between receive attempts when the bus is idle.
    pub idle_poll: Duration,
}

impl Default for DeviceConfig {
    /// A charge controller at revision 1.2.3.
    fn default() -> Self {
        let registers = BTreeMap::from([
            (REG_DEVICE_TYPE, DeviceType::ChargeController.code()),
            (REG_REVISION_A, 1),
            (REG_REVISION_B, 2),
            (REG_REVISION_C, 3),
        ]);
        Self {
            registers,
            controls: BTreeSet::new(),
            idle_poll: Duration::from_millis(1),
        }
    }
}

impl DeviceConfig {
    pub fn from_args(args: &DeviceArgs) -> Self {
        let mut config = if args.empty {
            Self {
                registers: BTreeMap::new(),
                ..Self::default()
            }
        } else {
            Self::default()
        };
        config.registers.extend(args.registers.iter().copied());
        for register in &args.controls {
            config.registers.entry(*register).or_insert(0);
            config.controls.insert(*register);
        }
        config
    }

    /// Answer one request, or `None` to stay silent.
    ///
    /// Control registers store the request parameter and echo it back.
    /// Everything else reads the stored value and ignores the parameter.
    pub fn serve(&mut self, request: &RequestPacket) -> Option<u16> {
        if self.controls.contains(&request.register) {
            self.registers.insert(request.register, request.parameter);
            return Some(request.parameter);
        }
        self.registers.get(&request.register).copied()
    }
}

pub fn run(args: DeviceArgs, format: OutputFormat) -> CliResult<i32> {
    let config = DeviceConfig::from_args(&args);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    emulate(&args, config, &running, format)
}

#[cfg(unix)]
fn emulate(
    args: &DeviceArgs,
    mut config: DeviceConfig,
    running: &AtomicBool,
    format: OutputFormat,
) -> CliResult<i32> {
    use matenet_protocol::{DeviceProtocol, ProtocolError, ResponsePacket};
    use matenet_transport::{BusSocket, TransportError};

    use crate::exit::{protocol_error, transport_error};
    use crate::output::{print_served, ServedOutput};

    let socket = BusSocket::bind(&args.path).map_err(|err| transport_error("bind failed", err))?;
    tracing::info!(
        path = %socket.path().display(),
        registers = config.registers.len(),
        "device emulator ready"
    );

    let mut served = 0usize;

    while running.load(Ordering::SeqCst) {
        let link = socket
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        let mut device = DeviceProtocol::new(link);

        while running.load(Ordering::SeqCst) {
            let (port, request) = match device.try_receive_request() {
                Ok(received) => received,
                Err(err) if err.is_no_data() => {
                    std::thread::sleep(config.idle_poll);
                    continue;
                }
                Err(ProtocolError::Frame(matenet_frame::FrameError::Transport(
                    TransportError::Closed,
                ))) => {
                    tracing::debug!("bus link detached");
                    break;
                }
                Err(err @ ProtocolError::Frame(matenet_frame::FrameError::Transport(_))) => {
                    return Err(protocol_error("receive failed", err));
                }
                Err(err) => {
                    tracing::debug!(error = %err, "dropping invalid request");
                    continue;
                }
            };

            let response = config.serve(&request);
            match response {
                Some(value) => device
                    .send_response(port, &ResponsePacket::new(value))
                    .map_err(|err| protocol_error("send failed", err))?,
                None => tracing::debug!(
                    register = format_args!("{:#06x}", request.register),
                    "unknown register, not answering"
                ),
            }

            print_served(
                &ServedOutput {
                    port,
                    register: request.register,
                    parameter: request.parameter,
                    response,
                },
                format,
            );
            served = served.saturating_add(1);

            if args.count.is_some_and(|count| served >= count) {
                return Ok(SUCCESS);
            }
        }
    }

    Ok(SUCCESS)
}

#[cfg(not(unix))]
fn emulate(
    args: &DeviceArgs,
    _config: DeviceConfig,
    _running: &AtomicBool,
    _format: OutputFormat,
) -> CliResult<i32> {
    Err(CliError::new(
        crate::exit::USAGE,
        format!(
            "{}: bus sockets require a Unix platform",
            args.path.display()
        ),
    ))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
