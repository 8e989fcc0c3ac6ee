use matenet_protocol::{DeviceType, ProtocolError};

use crate::cmd::PortArgs;
use crate::exit::{protocol_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_scan, OutputFormat, ScanOutput};

/// Reports the device on the port. Exits with FAILURE when nothing
/// recognizable answered, after printing the `none` result.
pub fn run(args: PortArgs, format: OutputFormat) -> CliResult<i32> {
    let port = args.bus.port;
    let mut controller = args.bus.controller()?;

    let device = match controller.try_scan(port) {
        Ok(device) => device,
        Err(err @ (ProtocolError::Timeout(_) | ProtocolError::UnknownDeviceType(_))) => {
            tracing::info!(port, error = %err, "no device identified");
            DeviceType::None
        }
        Err(err) => return Err(protocol_error("scan failed", err)),
    };

    print_scan(&ScanOutput::new(port, device), format);
    if device == DeviceType::None {
        return Ok(FAILURE);
    }
    Ok(SUCCESS)
}
