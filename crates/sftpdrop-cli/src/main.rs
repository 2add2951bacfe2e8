// sftpdrop CLI
//
// Usage: sftpdrop [--timeout <secs>] <command> [args]
//
// Connection settings come from SFTPDROP_USER, SFTPDROP_PASSWORD and
// SFTPDROP_ADDRESS (host:port).

use std::env;
use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod handler;

use commands::{Command, Invocation};

#[tokio::main]
async fn main() -> ExitCode {
    // RUST_LOG=debug sftpdrop ls
    // RUST_LOG=sftpdrop_core=trace sftpdrop put big.csv  (per-chunk progress)
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();

    let invocation = match Invocation::parse(args.as_slice()) {
        Ok(inv) => inv,
        Err(msg) => {
            println!("{}", msg);
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    if invocation.command == Command::Help {
        print_usage();
        return ExitCode::SUCCESS;
    }

    match handler::run(invocation.command, invocation.timeout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    println!("sftpdrop - SFTP delivery client");
    println!();
    println!("Usage: sftpdrop [--timeout <secs>] <command> [args]");
    println!();
    println!("Commands:");
    println!("  smoke <local-file>    Save/list/read/delete round trip against the server");
    println!("  ls [path]             List remote directory");
    println!("  cat <remote>          Print remote file to stderr");
    println!("  put <local> [remote]  Upload file");
    println!("  rm <remote>           Remove remote file");
    println!();
    println!("Environment:");
    println!("  {}_USER, {}_PASSWORD, {}_ADDRESS (host:port)",
        handler::ENV_PREFIX, handler::ENV_PREFIX, handler::ENV_PREFIX);
}
