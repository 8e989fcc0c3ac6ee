use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("matenet {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: matenet");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "build_target: {}",
        option_env!("MATENET_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "frame: rx_buffer={} max_payload={} timeout_ms={}",
        matenet_frame::RX_BUFFER_SIZE,
        matenet_frame::DEFAULT_MAX_PAYLOAD,
        matenet_frame::DEFAULT_TIMEOUT.as_millis()
    );
    println!("bus_socket: {}", cfg!(unix));

    Ok(SUCCESS)
}
