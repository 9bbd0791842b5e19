//! CLI parse: clap types for both binaries. No behavior beyond merging flags
//! into configuration.

use crate::config::ServiceConfig;
use crate::logging::LoggingConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Recovery server - remote, cancellable disk recovery sessions
#[derive(Parser, Debug)]
#[command(name = "recoverd")]
#[command(version, about = "Serve disk recovery sessions over JSON RPC")]
pub struct ServerCli {
    /// Listen address (host:port)
    #[arg(short, long)]
    pub address: Option<String>,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (debug, info, warning, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Errors only
    #[arg(short, long)]
    pub quiet: bool,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (when output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl ServerCli {
    /// Apply flags on top of loaded configuration. Flags win.
    pub fn apply(&self, config: &mut ServiceConfig) {
        if let Some(address) = &self.address {
            config.server.address = address.clone();
        }
        self.apply_logging(&mut config.logging);
    }

    fn apply_logging(&self, logging: &mut LoggingConfig) {
        if self.quiet {
            logging.level = "error".to_string();
        }
        if self.verbose {
            logging.level = "debug".to_string();
        }
        if let Some(level) = &self.log_level {
            logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            logging.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            logging.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            logging.file = Some(file.clone());
            if self.log_output.is_none() {
                logging.output = "file".to_string();
            }
        }
    }
}

/// Recovery control client
#[derive(Parser, Debug)]
#[command(name = "recoverctl")]
#[command(version, about = "Talk to a running recoverd server")]
pub struct ClientCli {
    /// Server address (host:port or URL)
    #[arg(short, long, default_value = "127.0.0.1:50051")]
    pub address: String,

    /// Print raw JSON instead of tables
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: ClientCommands,
}

#[derive(Subcommand, Debug)]
pub enum ClientCommands {
    /// Check that the server is alive
    Heartbeat {
        /// Also validate this context ID
        #[arg(long)]
        context: Option<String>,
    },
    /// Ask the server to shut down
    Shutdown {
        /// Stop active recoveries instead of refusing
        #[arg(long)]
        force: bool,
        #[arg(long)]
        reason: Option<String>,
    },
    /// List disks visible to a fresh context
    Disks,
    /// List partitions of a device
    Partitions {
        #[arg(long)]
        device: String,
    },
    /// Run a recovery to completion, printing progress
    Recover {
        /// Device or image path
        #[arg(long)]
        device: String,
        /// Partition order; omit for the whole disk
        #[arg(long)]
        partition: Option<i32>,
        /// Output directory on the server host
        #[arg(long)]
        output: PathBuf,
        /// Paranoia level (0-2)
        #[arg(long, default_value = "1")]
        paranoid: u8,
        #[arg(long)]
        keep_corrupted: bool,
        /// Extensions to enable (repeatable; "everything" for all)
        #[arg(long = "enable")]
        enable: Vec<String>,
        /// Extensions to disable (repeatable)
        #[arg(long = "disable")]
        disable: Vec<String>,
        /// Status poll interval in milliseconds
        #[arg(long, default_value = "500")]
        poll_ms: u64,
    },
    /// Rebuild a device's partition table from a partition search
    Repair {
        #[arg(long)]
        device: String,
        /// Quick search only
        #[arg(long)]
        fast: bool,
        /// Write the rebuilt table; without this the write is simulated
        #[arg(long)]
        write: bool,
        /// Also write boot code (only with --write)
        #[arg(long, requires = "write")]
        boot_code: bool,
    },
    /// Show one recovery's status
    Status { recovery_id: String },
    /// Stop a recovery and wait for it to exit
    Stop { recovery_id: String },
    /// List every recovery the server has run
    List,
    /// Change the server's log level
    LogLevel { level: String },
}
