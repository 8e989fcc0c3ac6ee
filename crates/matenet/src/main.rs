mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "matenet", version, about = "MATE bus controller and device emulator")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_subcommand() {
        let cli = Cli::try_parse_from([
            "matenet",
            "query",
            "/tmp/bus.sock",
            "0x0008",
            "--port",
            "1",
            "--timeout",
            "250ms",
        ])
        .expect("query args should parse");

        let Command::Query(args) = cli.command else {
            panic!("expected query");
        };
        assert_eq!(args.register, 0x0008);
        assert_eq!(args.parameter, 0);
        assert_eq!(args.bus.port, 1);
        assert_eq!(args.bus.timeout, "250ms");
    }

    #[test]
    fn rejects_out_of_range_port() {
        let err = Cli::try_parse_from(["matenet", "scan", "/tmp/bus.sock", "--port", "11"])
            .expect_err("port 11 should be rejected");

        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_device_register_map() {
        let cli = Cli::try_parse_from([
            "matenet",
            "device",
            "/tmp/bus.sock",
            "--register",
            "0x0008=1234",
            "--register",
            "0=2",
            "--control",
            "0x0100",
            "--count",
            "3",
        ])
        .expect("device args should parse");

        let Command::Device(args) = cli.command else {
            panic!("expected device");
        };
        assert_eq!(args.registers, vec![(0x0008, 1234), (0, 2)]);
        assert_eq!(args.controls, vec![0x0100]);
        assert_eq!(args.count, Some(3));
    }

    #[test]
    fn parses_control_subcommand() {
        let cli = Cli::try_parse_from(["matenet", "control", "/tmp/bus.sock", "0x0100", "1"])
            .expect("control args should parse");
        assert!(matches!(cli.command, Command::Control(_)));
    }
}
