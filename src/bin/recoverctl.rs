//! Recovery Control Binary
//!
//! Command-line client for a running `recoverd`.

use clap::Parser;
use recoverd::cli::{
    format_disks, format_failure, format_heartbeat, format_partitions, format_progress_line,
    format_recoveries, format_statistics, format_status, ClientCli, ClientCommands,
};
use recoverd::client::{ClientError, RecoveryClient};
use recoverd::context::RepairAction;
use recoverd::engine::{InitArgs, PartitionInfo};
use recoverd::recovery::RecoveryOptions;
use recoverd::service::StartRecovery;
use serde::Serialize;
use std::process;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = ClientCli::parse();

    let client = match RecoveryClient::new(&cli.address) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", format_failure(&e.to_string()));
            process::exit(1);
        }
    };

    match execute(&client, &cli).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("{}", format_failure(&e.to_string()));
            process::exit(1);
        }
    }
}

fn render<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> String {
    if json {
        serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    } else {
        text(value)
    }
}

async fn execute(client: &RecoveryClient, cli: &ClientCli) -> Result<String, ClientError> {
    let json = cli.json;
    match &cli.command {
        ClientCommands::Heartbeat { context } => {
            let hb = client.heartbeat(context.as_deref()).await?;
            Ok(render(json, &hb, format_heartbeat))
        }
        ClientCommands::Shutdown { force, reason } => {
            let report = client.shutdown(*force, reason.as_deref()).await?;
            Ok(render(json, &report, |r| r.message.clone()))
        }
        ClientCommands::Disks => {
            let context_id = client.create_context(&InitArgs::default()).await?;
            let disks = client.disks(&context_id).await;
            client.cleanup(&context_id).await?;
            let disks = disks?;
            Ok(render(json, &disks, |d| format_disks(d)))
        }
        ClientCommands::Partitions { device } => {
            let context_id = client.create_context(&InitArgs::default()).await?;
            let partitions = client.partitions(&context_id, Some(device)).await;
            client.cleanup(&context_id).await?;
            let partitions = partitions?;
            Ok(render(json, &partitions, |p| format_partitions(p)))
        }
        ClientCommands::Recover {
            device,
            partition,
            output,
            paranoid,
            keep_corrupted,
            enable,
            disable,
            poll_ms,
        } => {
            let context_id = client.create_context(&InitArgs::default()).await?;
            let request = StartRecovery {
                context_id: context_id.clone(),
                device: device.clone(),
                partition_order: partition.unwrap_or(-1),
                output_dir: Some(output.clone()),
                options: RecoveryOptions {
                    paranoid_mode: *paranoid,
                    keep_corrupted_files: *keep_corrupted,
                    enabled_file_types: enable.clone(),
                    disabled_file_types: disable.clone(),
                    ..Default::default()
                },
            };
            let result = recover(client, &request, Duration::from_millis(*poll_ms), json).await;
            client.cleanup(&context_id).await?;
            result
        }
        ClientCommands::Repair {
            device,
            fast,
            write,
            boot_code,
        } => {
            let context_id = client.create_context(&InitArgs::default()).await?;
            let result = repair(client, &context_id, device, *fast, *write, *boot_code).await;
            client.cleanup(&context_id).await?;
            let partitions = result?;
            if !write && !json {
                eprintln!("Simulated write; pass --write to update the partition table");
            }
            Ok(render(json, &partitions, |p| format_partitions(p)))
        }
        ClientCommands::Status { recovery_id } => {
            let snapshot = client.recovery_status(recovery_id).await?;
            Ok(render(json, &snapshot, format_status))
        }
        ClientCommands::Stop { recovery_id } => {
            client.stop_recovery(recovery_id).await?;
            let snapshot = client.recovery_status(recovery_id).await?;
            Ok(render(json, &snapshot, format_status))
        }
        ClientCommands::List => {
            let recoveries = client.list_recoveries().await?;
            Ok(render(json, &recoveries, |r| format_recoveries(r)))
        }
        ClientCommands::LogLevel { level } => {
            let applied = client.set_log_level(level).await?;
            Ok(format!("Log level set to {}", applied))
        }
    }
}

/// Search, settle boot flags, check, then write (or simulate writing) the table.
async fn repair(
    client: &RecoveryClient,
    context_id: &str,
    device: &str,
    fast: bool,
    write: bool,
    boot_code: bool,
) -> Result<Vec<PartitionInfo>, ClientError> {
    client.partitions(context_id, Some(device)).await?;
    let steps = [
        RepairAction::SearchPartitions {
            fast_mode: fast,
            dump: false,
        },
        RepairAction::EnsureSingleBootable,
        RepairAction::TestStructure,
        RepairAction::WriteTable {
            simulate: !write,
            no_confirm: true,
        },
    ];
    for action in steps {
        client.repair(context_id, action).await?;
    }
    if boot_code {
        client.repair(context_id, RepairAction::WriteBootCode).await?;
    }
    client.partitions(context_id, None).await
}

async fn recover(
    client: &RecoveryClient,
    request: &StartRecovery,
    poll: Duration,
    json: bool,
) -> Result<String, ClientError> {
    let recovery_id = client.start_recovery(request).await?;
    if !json {
        eprintln!("Started recovery {}", recovery_id);
    }
    let last = client
        .wait_for_completion(&recovery_id, poll, |snap| {
            if !json {
                eprintln!("{}", format_progress_line(snap));
            }
        })
        .await?;
    let stats = client.statistics(&request.context_id).await?;
    if json {
        let value = serde_json::json!({ "status": last, "statistics": stats });
        return Ok(render(true, &value, |_| String::new()));
    }
    Ok(format!("{}\n\n{}", format_status(&last), format_statistics(&stats)))
}
