use leavebook_core::sync::{activity_channel, run_periodic};
use tokio::sync::broadcast::error::RecvError;

use crate::cli::GlobalOptions;
use crate::commands::common::{format_event, open_engine};
use crate::commands::sync::describe_tick;
use crate::error::CliError;

pub async fn run_watch(options: &GlobalOptions) -> Result<(), CliError> {
    let engine = open_engine(options).await?;
    let mut events = engine.subscribe();

    println!("{}", describe_tick(&engine.tick().await));
    println!(
        "Refreshing every {}s, press Ctrl-C to stop",
        engine.settings().refresh_interval.as_secs()
    );

    let (activity, receiver) = activity_channel(true);
    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!("Could not listen for Ctrl-C: {error}");
            std::future::pending::<()>().await;
        }
    };
    let print_events = async {
        loop {
            match events.recv().await {
                Ok(event) => println!("{}", format_event(&event)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Dropped {skipped} sync events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    tokio::select! {
        () = run_periodic(&engine, receiver, shutdown) => {}
        () = print_events => {}
    }
    drop(activity);

    println!("Stopped");
    Ok(())
}
