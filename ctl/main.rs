#![forbid(unsafe_code)]

//! `agent-tether-ctl` — local CLI companion for `agent-tether`.
//!
//! Connects to a running supervisor's RPC socket and sends JSON commands,
//! most importantly `kill` to terminate the session from a second
//! terminal.

use std::io::{BufRead, BufReader, Write};

use clap::{Parser, Subcommand};
use interprocess::local_socket::{traits::Stream as _, GenericNamespaced, Stream, ToNsName};

#[derive(Debug, Parser)]
#[command(
    name = "agent-tether-ctl",
    about = "Local CLI for a running agent-tether supervisor",
    version,
    long_about = None
)]
struct Cli {
    /// RPC socket name (must match the supervisor's `rpc_socket` config).
    #[arg(long, default_value = "agent-tether")]
    rpc_socket: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Terminate the supervised session and its tool process.
    Kill,

    /// Check that the supervisor's RPC surface is reachable.
    Ping,
}

fn main() {
    let args = Cli::parse();

    let request_json = match args.command {
        Command::Kill => serde_json::json!({ "command": "kill" }),
        Command::Ping => serde_json::json!({ "command": "ping" }),
    };

    match send_rpc_command(&args.rpc_socket, &request_json) {
        Ok(response) => {
            let ok = response
                .as_object()
                .and_then(|obj| obj.get("ok"))
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            if ok {
                println!("OK");
            } else {
                let err_msg = response
                    .as_object()
                    .and_then(|obj| obj.get("error"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown error");
                eprintln!("Error: {err_msg}");
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("Failed to connect to supervisor: {err}");
            eprintln!(
                "Is agent-tether running with rpc_socket '{}'?",
                args.rpc_socket
            );
            std::process::exit(1);
        }
    }
}

/// Connect to the RPC socket, send a JSON command, and read the response.
fn send_rpc_command(
    socket_name: &str,
    request: &serde_json::Value,
) -> std::result::Result<serde_json::Value, Box<dyn std::error::Error>> {
    let name = socket_name.to_ns_name::<GenericNamespaced>()?;
    let mut stream = Stream::connect(name)?;

    // Send request as a single JSON line.
    let mut request_line = serde_json::to_string(request)?;
    request_line.push('\n');
    stream.write_all(request_line.as_bytes())?;
    stream.flush()?;

    // Read response line.
    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader.read_line(&mut response_line)?;

    let response: serde_json::Value = serde_json::from_str(response_line.trim())?;
    Ok(response)
}
