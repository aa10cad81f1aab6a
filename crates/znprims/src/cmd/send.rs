use tracing::{info, warn};
use znprims_engine::{Match, Outcome};
use znprims_registry::{
    status_message, Command, CommandRegistry, CommandType, FieldMap, Layout, Subsystem, Value,
};

use crate::cmd::info::open;
use crate::cmd::{endpoint, registry, runtime, SendArgs};
use crate::exit::{
    engine_error, registry_error, CliError, CliResult, DATA_INVALID, FAILURE, SUCCESS, TIMEOUT,
    USAGE,
};
use crate::output::{parse_duration, print_command, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let endpoint = endpoint(&args.endpoint)?;
    let registry = registry()?;

    let request = build_request(&registry, &args)?;
    let predicate = build_predicate(&registry, &request, &args)?;
    info!(request = %request, waiting_for = %predicate, "sending");

    let outcome = runtime()?.block_on(async {
        let connection = open(&endpoint, registry, wait_timeout).await?;
        let result = connection
            .engine()
            .request(request, predicate, wait_timeout)
            .await;
        connection.close().await;
        result.map_err(|err| engine_error("send failed", err))
    })?;

    match outcome {
        Outcome::Resolved(reply) => {
            print_command(&reply, format);
            match reply.status() {
                Some(code) if code != 0 => {
                    warn!(status = %status_message(code), "radio rejected the request");
                    Ok(FAILURE)
                }
                _ => Ok(SUCCESS),
            }
        }
        Outcome::TimedOut => Err(CliError::new(
            TIMEOUT,
            format!("no reply within {wait_timeout:?}"),
        )),
        Outcome::Failed(err) => Err(CliError::new(
            DATA_INVALID,
            format!("reply could not be decoded: {err}"),
        )),
        Outcome::Cancelled => Err(CliError::new(
            FAILURE,
            "connection closed before a reply arrived",
        )),
    }
}

fn build_request(registry: &CommandRegistry, args: &SendArgs) -> CliResult<Command> {
    let built = match &args.json {
        Some(json) => {
            let fields = serde_json::from_str::<serde_json::Value>(json)
                .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
            registry.build_json(CommandType::Sreq, args.subsystem, &args.command, &fields)
        }
        None => registry.build(CommandType::Sreq, args.subsystem, &args.command, FieldMap::new()),
    };
    built.map_err(|err| registry_error("building request failed", err))
}

/// Work out what reply to wait for.
///
/// `--expect` names an AREQ (or, failing that, an SRSP); a sequenced confirm
/// is bound to the request's transaction number.
fn build_predicate(
    registry: &CommandRegistry,
    request: &Command,
    args: &SendArgs,
) -> CliResult<Match> {
    let (mut predicate, layout) = match &args.expect {
        Some(expect) => {
            let (subsystem, name) = parse_expect(expect)?;
            let layout = [CommandType::Areq, CommandType::Srsp]
                .into_iter()
                .find_map(|kind| registry.lookup_name(kind, subsystem, name))
                .ok_or_else(|| CliError::new(USAGE, format!("unknown reply: {expect}")))?;
            let mut predicate = Match::new(layout.identity.kind, subsystem, name);
            if layout.is_confirm() && request.layout().sequence_field.is_some() {
                if let Some(field) = layout.sequence_field {
                    predicate = predicate.with_sequence(field);
                }
            }
            (predicate, *layout)
        }
        None => {
            let layout = registry
                .lookup_name(CommandType::Srsp, request.subsystem(), request.name())
                .ok_or_else(|| {
                    CliError::new(USAGE, format!("{} has no synchronous reply", request.name()))
                })?;
            (Match::reply_to(request), *layout)
        }
    };

    for constraint in &args.matches {
        let (field, value) = parse_constraint(&layout, constraint)?;
        predicate = predicate.with_field(field, value);
    }
    Ok(predicate)
}

fn parse_expect(input: &str) -> CliResult<(Subsystem, &str)> {
    let (subsystem, name) = input
        .split_once(':')
        .filter(|(_, name)| !name.is_empty())
        .ok_or_else(|| CliError::new(USAGE, format!("--expect wants SUBSYSTEM:NAME, got {input:?}")))?;
    let subsystem = subsystem
        .parse()
        .map_err(|err: String| CliError::new(USAGE, err))?;
    Ok((subsystem, name))
}

fn parse_constraint(layout: &Layout, input: &str) -> CliResult<(String, Value)> {
    let (name, raw) = input
        .split_once('=')
        .ok_or_else(|| CliError::new(USAGE, format!("--match wants FIELD=VALUE, got {input:?}")))?;
    let field = layout.field(name).ok_or_else(|| {
        CliError::new(USAGE, format!("{} has no field named {name}", layout.name))
    })?;
    let value = Value::from_json(field.kind, &serde_json::Value::String(raw.to_string()))
        .map_err(|reason| CliError::new(USAGE, format!("--match {name}: {reason}")))?;
    Ok((name.to_string(), value))
}
