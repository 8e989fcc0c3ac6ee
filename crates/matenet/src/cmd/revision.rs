use crate::cmd::PortArgs;
use crate::exit::{protocol_error, CliResult, SUCCESS};
use crate::output::{print_revision, OutputFormat, RevisionOutput};

pub fn run(args: PortArgs, format: OutputFormat) -> CliResult<i32> {
    let port = args.bus.port;
    let mut controller = args.bus.controller()?;
    let revision = controller
        .try_get_revision(port)
        .map_err(|err| protocol_error("revision read failed", err))?;

    print_revision(&RevisionOutput::new(port, revision), format);
    Ok(SUCCESS)
}
