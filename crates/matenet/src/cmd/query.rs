use crate::cmd::QueryArgs;
use crate::exit::{protocol_error, CliResult, SUCCESS};
use crate::output::{print_query, OutputFormat, QueryOutput};

pub fn run(args: QueryArgs, format: OutputFormat) -> CliResult<i32> {
    let mut controller = args.bus.controller()?;
    let value = controller
        .try_query(args.register, args.parameter, args.bus.port)
        .map_err(|err| protocol_error("query failed", err))?;

    print_query(
        &QueryOutput {
            port: args.bus.port,
            register: args.register,
            parameter: args.parameter,
            value,
        },
        format,
    );
    Ok(SUCCESS)
}
