//! Replays a recorded action script through the channel messages reducer and prints
//! the final snapshot as JSON.

mod config;
mod logging;
mod script;

use std::{fs, process::ExitCode};

use timeline_core::{ChannelMessagesReducer, created_at_comparator, spawn_reducer};
use tracing::{error, info};

use crate::config::{ReplayConfig, SortOrder};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let config = match ReplayConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "replay failed");
            eprintln!("replay failed: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ReplayConfig) -> Result<String, Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(&config.script_path).map_err(|err| {
        format!(
            "failed reading action script {}: {err}",
            config.script_path.display()
        )
    })?;
    let actions = script::parse_script(&raw, config.default_user_id.as_deref())?;
    info!(
        script = %config.script_path.display(),
        actions = actions.len(),
        "replaying action script"
    );

    let reducer = match config.sort {
        SortOrder::CreatedAt => {
            ChannelMessagesReducer::new().with_sort_comparator(created_at_comparator())
        }
        SortOrder::Unsorted => ChannelMessagesReducer::new(),
    };
    let handle = spawn_reducer(reducer, config.runtime);
    for action in actions {
        handle.dispatch(action).await?;
    }
    let snapshot = handle.flush().await?;
    handle.shutdown();

    info!(
        messages = snapshot.messages.len(),
        new_messages = snapshot.new_messages.len(),
        "replay finished"
    );
    Ok(serde_json::to_string_pretty(snapshot.as_ref())?)
}
