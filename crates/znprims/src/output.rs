use std::io::{IsTerminal, Write};
use std::time::Duration;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use znprims_engine::RadioInfo;
use znprims_registry::{encode_hex, Command, DecodeError, Frame, Layout};

use crate::exit::{CliError, CliResult, USAGE};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_command(command: &Command, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(command),
        OutputFormat::Table => {
            let mut table = new_table();
            table.set_header(vec!["FIELD", "VALUE"]);
            table.add_row(vec!["command".to_string(), describe_identity(command.layout())]);
            if let Some(tsn) = command.sequence() {
                table.add_row(vec!["tsn".to_string(), tsn.to_string()]);
            }
            for (name, value) in command.described_fields() {
                table.add_row(vec![name.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{command}"),
        OutputFormat::Raw => match command.to_frame().to_bytes() {
            Ok(bytes) => print_raw(&bytes),
            Err(err) => eprintln!("error: {err}"),
        },
    }
}

#[derive(Serialize)]
struct UndecodableOutput {
    cmd0: u8,
    cmd1: u8,
    payload: String,
    error: String,
}

pub fn print_undecodable(frame: &Frame, error: &DecodeError, format: OutputFormat) {
    let out = UndecodableOutput {
        cmd0: znprims_frame::subsystem::cmd0(frame.kind, frame.subsystem),
        cmd1: frame.command,
        payload: encode_hex(&frame.payload),
        error: error.to_string(),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "undecodable {} {} cmd1=0x{:02x} payload={}: {}",
                frame.kind, frame.subsystem, out.cmd1, out.payload, out.error
            );
        }
        OutputFormat::Raw => {
            if let Ok(bytes) = frame.to_bytes() {
                print_raw(&bytes);
            }
        }
    }
}

#[derive(Serialize)]
struct CatalogEntry<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    subsystem: &'static str,
    command: &'a str,
    id: u8,
    fields: Vec<String>,
}

pub fn print_catalog(layouts: &[&Layout], format: OutputFormat) {
    let entries: Vec<CatalogEntry<'_>> = layouts
        .iter()
        .map(|layout| CatalogEntry {
            kind: layout.identity.kind.name(),
            subsystem: layout.identity.subsystem.name(),
            command: layout.name,
            id: layout.identity.id,
            fields: layout
                .fields
                .iter()
                .map(|field| format!("{}:{}", field.name, field.kind))
                .collect(),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&entries),
        OutputFormat::Table => {
            let mut table = new_table();
            table.set_header(vec!["TYPE", "SUBSYSTEM", "ID", "COMMAND", "FIELDS"]);
            for entry in &entries {
                table.add_row(vec![
                    entry.kind.to_string(),
                    entry.subsystem.to_string(),
                    format!("0x{:02x}", entry.id),
                    entry.command.to_string(),
                    entry.fields.join(", "),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for entry in &entries {
                println!(
                    "{} {} 0x{:02x} {}",
                    entry.kind, entry.subsystem, entry.id, entry.command
                );
            }
        }
    }
}

#[derive(Serialize)]
struct InfoOutput<'a> {
    endpoint: &'a str,
    version: String,
    subsystems: Vec<&'static str>,
    #[serde(flatten)]
    info: &'a RadioInfo,
}

pub fn print_info(endpoint: &str, info: &RadioInfo, format: OutputFormat) {
    let out = InfoOutput {
        endpoint,
        version: info.version_string(),
        subsystems: info.capability_names(),
        info,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("Radio Info:");
            println!("  Endpoint:      {}", out.endpoint);
            println!("  Firmware:      {} (revision {})", out.version, info.revision);
            println!("  Product:       {}", info.product);
            println!("  Transport rev: {}", info.transport_revision);
            println!("  Subsystems:    {}", out.subsystems.join(", "));
        }
        OutputFormat::Raw => println!("{}", out.version),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn describe_identity(layout: &Layout) -> String {
    format!(
        "{} {} {} (0x{:02x})",
        layout.identity.kind, layout.identity.subsystem, layout.name, layout.identity.id
    )
}

/// Parse `500ms`, `5s` or a bare number of seconds.
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
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}
