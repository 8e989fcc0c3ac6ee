use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Subcommand};
use matenet_frame::{is_valid_port, FrameConfig, MAX_HUB_PORT};
use matenet_protocol::ControllerProtocol;
use matenet_transport::Transport;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod control;
pub mod device;
pub mod query;
pub mod revision;
pub mod scan;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Emulate a device on a bus socket, answering from a register map.
    Device(DeviceArgs),
    /// Read one register.
    Query(QueryArgs),
    /// Send a control command and wait for the acknowledgement.
    Control(ControlArgs),
    /// Identify the device attached to a port.
    Scan(PortArgs),
    /// Read a device's firmware revision.
    Revision(PortArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Device(args) => device::run(args, format),
        Command::Query(args) => query::run(args, format),
        Command::Control(args) => control::run(args, format),
        Command::Scan(args) => scan::run(args, format),
        Command::Revision(args) => revision::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DeviceArgs {
    /// Bus socket path to bind.
    #[arg(env = "MATENET_BUS")]
    pub path: PathBuf,
    /// Set a register (e.g. 0x0008=1234). Repeatable; overrides defaults.
    #[arg(long = "register", value_name = "REG=VALUE", value_parser = parse_assignment)]
    pub registers: Vec<(u16, u16)>,
    /// Treat a register as a control: requests store their parameter in it.
    #[arg(long = "control", value_name = "REG", value_parser = parse_u16)]
    pub controls: Vec<u16>,
    /// Start from an empty register map instead of the built-in one.
    #[arg(long)]
    pub empty: bool,
    /// Exit after serving N requests.
    #[arg(long)]
    pub count: Option<usize>,
}

/// Bus connection shared by the controller-side commands.
#[derive(Args, Debug)]
pub struct BusArgs {
    /// Bus socket path to connect to.
    #[arg(env = "MATENET_BUS")]
    pub path: PathBuf,
    /// Hub port to address (0 is the root).
    #[arg(long, default_value = "0", value_parser = parse_port)]
    pub port: u8,
    /// Response timeout (e.g. 100ms, 1s).
    #[arg(long, env = "MATENET_TIMEOUT", default_value = "100ms")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    #[command(flatten)]
    pub bus: BusArgs,
    /// Register address (decimal or 0x hex).
    #[arg(value_parser = parse_u16)]
    pub register: u16,
    /// Request parameter.
    #[arg(long = "param", default_value = "0", value_parser = parse_u16)]
    pub parameter: u16,
}

#[derive(Args, Debug)]
pub struct ControlArgs {
    #[command(flatten)]
    pub bus: BusArgs,
    /// Control register address.
    #[arg(value_parser = parse_u16)]
    pub register: u16,
    /// Value to write.
    #[arg(value_parser = parse_u16)]
    pub value: u16,
}

#[derive(Args, Debug)]
pub struct PortArgs {
    #[command(flatten)]
    pub bus: BusArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

impl BusArgs {
    /// Connect and set up a controller with the requested timeout.
    pub fn controller(&self) -> CliResult<ControllerProtocol<Box<dyn Transport + Send>>> {
        let timeout = parse_duration(&self.timeout)?;
        let link = open_link(&self.path)?;
        let config = FrameConfig {
            timeout,
            ..FrameConfig::default()
        };
        Ok(ControllerProtocol::with_config(link, config))
    }
}

#[cfg(unix)]
fn open_link(path: &Path) -> CliResult<Box<dyn Transport + Send>> {
    let link = matenet_transport::BusSocket::connect(path)
        .map_err(|err| crate::exit::transport_error("connect failed", err))?;
    Ok(Box::new(link))
}

#[cfg(not(unix))]
fn open_link(path: &Path) -> CliResult<Box<dyn Transport + Send>> {
    Err(CliError::new(
        USAGE,
        format!("{}: bus sockets require a Unix platform", path.display()),
    ))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Decimal or `0x`-prefixed hex.
pub fn parse_u16(input: &str) -> Result<u16, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("not a 16-bit value: {input}"))
}

fn parse_port(input: &str) -> Result<u8, String> {
    let port: u8 = input
        .trim()
        .parse()
        .map_err(|_| format!("not a port number: {input}"))?;
    if !is_valid_port(port) {
        return Err(format!("port must be 0-{MAX_HUB_PORT}"));
    }
    Ok(port)
}

fn parse_assignment(input: &str) -> Result<(u16, u16), String> {
    let (register, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected REG=VALUE, got {input}"))?;
    Ok((parse_u16(register)?, parse_u16(value)?))
}
