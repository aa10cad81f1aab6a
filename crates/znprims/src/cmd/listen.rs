use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::info;
use znprims_engine::Inbound;

use crate::cmd::info::open;
use crate::cmd::{endpoint, registry, runtime, ListenArgs};
use crate::exit::{CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{print_command, print_undecodable, OutputFormat};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const LINK_CHECK_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint = endpoint(&args.endpoint)?;
    let registry = registry()?;

    let (stop_tx, mut stop_rx) = watch::channel(false);
    install_ctrlc_handler(stop_tx)?;

    runtime()?.block_on(async {
        let connection = open(&endpoint, registry, CONNECT_TIMEOUT).await?;
        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
        connection.engine().set_dispatch(move |inbound| {
            let _ = inbound_tx.send(inbound);
        });
        info!(endpoint = %endpoint, "listening");

        let mut link_check = tokio::time::interval(LINK_CHECK_INTERVAL);
        let mut printed = 0usize;
        let result = loop {
            tokio::select! {
                _ = stop_rx.changed() => break Ok(SUCCESS),
                Some(inbound) = inbound_rx.recv() => {
                    match &inbound {
                        Inbound::Command(command) => print_command(command, format),
                        Inbound::Undecodable { frame, error } => {
                            print_undecodable(frame, error, format)
                        }
                    }
                    printed = printed.saturating_add(1);
                    if args.count.is_some_and(|count| printed >= count) {
                        break Ok(SUCCESS);
                    }
                }
                _ = link_check.tick() => {
                    if connection.is_closed() {
                        break Err(CliError::new(FAILURE, "radio closed the connection"));
                    }
                }
            }
        };

        connection.engine().clear_dispatch();
        connection.close().await;
        result
    })
}

fn install_ctrlc_handler(stop: watch::Sender<bool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        stop.send_replace(true);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
