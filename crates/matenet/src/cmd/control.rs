use crate::cmd::ControlArgs;
use crate::exit::{protocol_error, CliResult, SUCCESS};
use crate::output::{print_control, ControlOutput, OutputFormat};

pub fn run(args: ControlArgs, format: OutputFormat) -> CliResult<i32> {
    let mut controller = args.bus.controller()?;
    controller
        .try_control(args.register, args.value, args.bus.port)
        .map_err(|err| protocol_error("control failed", err))?;

    print_control(
        &ControlOutput {
            port: args.bus.port,
            register: args.register,
            value: args.value,
            acknowledged: true,
        },
        format,
    );
    Ok(SUCCESS)
}
