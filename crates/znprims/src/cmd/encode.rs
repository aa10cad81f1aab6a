use serde::Serialize;
use znprims_registry::{encode_hex, Command, CommandRegistry, FieldMap};

use crate::cmd::{registry, EncodeArgs};
use crate::exit::{frame_error, registry_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_raw, OutputFormat};

#[derive(Serialize)]
struct EncodeOutput<'a> {
    frame: String,
    command: &'a Command,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = registry()?;
    let command = build(&registry, &args)?;
    let bytes = command
        .to_frame()
        .to_bytes()
        .map_err(|err| frame_error("encode failed", err))?;

    match format {
        OutputFormat::Raw => print_raw(&bytes),
        OutputFormat::Json => {
            let out = EncodeOutput {
                frame: encode_hex(&bytes),
                command: &command,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => println!("{}", encode_hex(&bytes)),
    }
    Ok(SUCCESS)
}

fn build(registry: &CommandRegistry, args: &EncodeArgs) -> CliResult<Command> {
    let built = match &args.json {
        Some(json) => {
            let fields = serde_json::from_str::<serde_json::Value>(json)
                .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
            registry.build_json(args.kind, args.subsystem, &args.command, &fields)
        }
        None => registry.build(args.kind, args.subsystem, &args.command, FieldMap::new()),
    };
    built.map_err(|err| registry_error("encode failed", err))
}
