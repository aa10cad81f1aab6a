use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use znprims_engine::{connect, probe, Connection};
use znprims_registry::CommandRegistry;
use znprims_transport::Endpoint;

use crate::cmd::{endpoint, engine_config, registry, runtime, InfoArgs};
use crate::exit::{engine_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{parse_duration, print_info, OutputFormat};

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let endpoint = endpoint(&args.endpoint)?;
    let registry = registry()?;

    let info = runtime()?.block_on(async {
        let connection = open(&endpoint, registry, timeout).await?;
        let result = probe(connection.engine(), timeout).await;
        connection.close().await;
        result.map_err(|err| engine_error("probe failed", err))
    })?;

    print_info(&endpoint.to_string(), &info, format);
    Ok(SUCCESS)
}

pub(crate) async fn open(
    endpoint: &Endpoint,
    registry: Arc<CommandRegistry>,
    timeout: Duration,
) -> CliResult<Connection> {
    debug!(endpoint = %endpoint, "connecting");
    match tokio::time::timeout(timeout, connect(endpoint, registry, engine_config())).await {
        Ok(result) => result.map_err(|err| engine_error("connect failed", err)),
        Err(_) => Err(CliError::new(
            TIMEOUT,
            format!("connect timed out after {timeout:?}"),
        )),
    }
}

