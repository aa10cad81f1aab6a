use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Subcommand};
use znprims_engine::EngineConfig;
use znprims_registry::{CommandRegistry, CommandType, Subsystem};
use znprims_transport::Endpoint;

use crate::exit::{io_error, registry_error, transport_error, CliResult};
use crate::output::OutputFormat;

pub mod catalog;
pub mod decode;
pub mod encode;
pub mod info;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode UNPI frames into commands.
    Decode(DecodeArgs),
    /// Encode a command into a UNPI frame.
    Encode(EncodeArgs),
    /// List the built-in command catalog.
    Catalog(CatalogArgs),
    /// Ping a radio and print its firmware version.
    Info(InfoArgs),
    /// Send one request and print the reply.
    Send(SendArgs),
    /// Print commands the radio sends until interrupted.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Catalog(args) => catalog::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

pub(crate) fn registry() -> CliResult<Arc<CommandRegistry>> {
    CommandRegistry::builtin()
        .map(Arc::new)
        .map_err(|err| registry_error("loading command catalog failed", err))
}

pub(crate) fn endpoint(input: &str) -> CliResult<Endpoint> {
    input
        .parse()
        .map_err(|err| transport_error("invalid endpoint", err))
}

pub(crate) fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("starting runtime failed", err))
}

pub(crate) fn engine_config() -> EngineConfig {
    EngineConfig::default()
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex; several arguments are concatenated.
    #[arg(conflicts_with = "file")]
    pub hex: Vec<String>,
    /// Read raw frame bytes from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Subsystem (SYS, AF, ZDO, ...).
    pub subsystem: Subsystem,
    /// Command name as listed by `catalog`.
    pub command: String,
    /// Frame type to encode.
    #[arg(long = "type", default_value = "sreq")]
    pub kind: CommandType,
    /// Field values as a JSON object.
    #[arg(long)]
    pub json: Option<String>,
}

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Only list commands of this subsystem.
    #[arg(long)]
    pub subsystem: Option<Subsystem>,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Radio bridge endpoint (unix:/path, /path or tcp://host:port).
    pub endpoint: String,
    /// Time allowed for each step (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Radio bridge endpoint (unix:/path, /path or tcp://host:port).
    pub endpoint: String,
    /// Subsystem of the request.
    pub subsystem: Subsystem,
    /// Request name as listed by `catalog`.
    pub command: String,
    /// Field values as a JSON object.
    #[arg(long)]
    pub json: Option<String>,
    /// Wait for this reply instead of the SRSP (e.g. ZDO:nodeDescRsp).
    #[arg(long, value_name = "SUBSYSTEM:NAME")]
    pub expect: Option<String>,
    /// Require a reply field to equal a value (repeatable).
    #[arg(long = "match", value_name = "FIELD=VALUE")]
    pub matches: Vec<String>,
    /// Maximum time to wait for the reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "10s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Radio bridge endpoint (unix:/path, /path or tcp://host:port).
    pub endpoint: String,
    /// Exit after receiving N commands.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
