use std::fs;
use std::io::Read;

use tracing::warn;
use znprims_frame::FrameDecoder;
use znprims_registry::decode_hex;

use crate::cmd::{registry, DecodeArgs};
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_command, print_undecodable, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = read_input(&args)?;
    let registry = registry()?;

    let mut decoder = FrameDecoder::with_max_payload(registry.config().max_payload_size);
    decoder.extend(&bytes);

    let mut undecodable = 0usize;
    let mut frames = 0usize;
    while let Some(frame) = decoder.decode_next() {
        frames += 1;
        match registry.parse(&frame) {
            Ok(command) => print_command(&command, format),
            Err(err) => {
                undecodable += 1;
                print_undecodable(&frame, &err, format);
            }
        }
    }

    let stats = decoder.stats();
    if stats.framing_errors > 0 || stats.discarded_bytes > 0 {
        warn!(
            framing_errors = stats.framing_errors,
            discarded_bytes = stats.discarded_bytes,
            "skipped bytes while looking for frames"
        );
    }
    if decoder.buffered() > 0 {
        warn!(trailing = decoder.buffered(), "input ends with an incomplete frame");
    }

    if frames == 0 {
        return Err(CliError::new(DATA_INVALID, "no complete frame in input"));
    }
    if undecodable > 0 {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

fn read_input(args: &DecodeArgs) -> CliResult<Vec<u8>> {
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    if !args.hex.is_empty() {
        return decode_hex(&args.hex.concat())
            .map_err(|err| CliError::new(USAGE, format!("invalid hex: {err}")));
    }

    let mut bytes = Vec::new();
    std::io::stdin()
        .read_to_end(&mut bytes)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok(bytes)
}
