// sftpdrop CLI Handler
//
// core calls for each command. Setup failures (config, connect) are
// returned to main and end the process; per-file failures in the smoke run
// are printed and the run moves on to the next file.

use std::time::Duration;

use sftpdrop_core::utils::fmt_size;
use sftpdrop_core::{Client, Config, Context, Error, FileEntry};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::commands::Command;

pub const ENV_PREFIX: &str = "SFTPDROP";

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

pub async fn run(command: Command, timeout: Option<Duration>) -> CliResult {
    let config = Config::from_env(ENV_PREFIX)?;

    // ^C cancels whatever is in flight
    let root = Context::background();
    let token = root.token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    // each operation gets its own budget
    let op_ctx = || match timeout {
        Some(t) => root.child_with_timeout(t),
        None    => root.clone(),
    };

    println!("Connecting to {}...", config.addr);
    let client = Client::connect(&op_ctx(), &config).await?;
    info!("[cli] connected to {}", client.addr());

    let result = execute(&client, command, &op_ctx).await;
    finish(result, client.close().await)
}

/// The command's own error wins over a close error.
fn finish(result: CliResult, closed: Result<(), Error>) -> CliResult {
    match (result, closed) {
        (Err(e), Err(close)) => {
            warn!("[cli] close after failed command: {}", close);
            Err(e)
        }
        (result, closed) => {
            closed?;
            info!("[cli] connection closed");
            result
        }
    }
}

async fn execute<F>(client: &Client, command: Command, op_ctx: &F) -> CliResult
where
    F: Fn() -> Context,
{
    match command {
        Command::Smoke { local } => smoke(client, op_ctx, &local).await?,
        Command::Ls { path } => {
            let entries = client.read_dir(&op_ctx(), &path).await?;
            print_entries(&entries);
        }
        Command::Cat { remote } => cat(client, &op_ctx(), &remote).await?,
        Command::Put { local, remote } => {
            let file = tokio::fs::File::open(&local).await
                .map_err(|e| format!("cannot open {}: {}", local, e))?;
            let n = client.save(&op_ctx(), &remote, file).await?;
            println!("Uploaded: {} → {} ({})", local, remote, fmt_size(n));
        }
        Command::Rm { remote } => {
            client.remove(&op_ctx(), &remote).await?;
            println!("Removed: {}", remote);
        }
        Command::Help => {}
    }
    Ok(())
}

/// save from stream, string and bytes; list; read each; delete each
async fn smoke<F>(client: &Client, op_ctx: &F, local: &str) -> CliResult
where
    F: Fn() -> Context,
{
    println!("Saving file from reader.");
    match tokio::fs::File::open(local).await {
        Ok(file) => {
            if let Err(e) = client.save(&op_ctx(), "test1.txt", file).await {
                warn!("[smoke] reader test: {}", e);
                println!("ERROR: reader test: {}", e);
            }
        }
        Err(e) => {
            warn!("[smoke] reader test: cannot open {}: {}", local, e);
            println!("ERROR: reader test: cannot open {}: {}", local, e);
        }
    }

    println!("Saving file from string.");
    if let Err(e) = client.save_string(&op_ctx(), "test2.txt", "This is a test.").await {
        warn!("[smoke] string test: {}", e);
        println!("ERROR: string test: {}", e);
    }

    println!("Saving file from bytes.");
    if let Err(e) = client.save_bytes(&op_ctx(), "test3.txt", b"This is a test.").await {
        warn!("[smoke] bytes test: {}", e);
        println!("ERROR: bytes test: {}", e);
    }
    println!();

    let files = client.read_dir(&op_ctx(), ".").await?;
    println!("Found files:");
    for fi in &files {
        println!("{}\n{}", fi.name, "-".repeat(fi.name.len()));
        if let Err(e) = cat(client, &op_ctx(), &fi.name).await {
            warn!("[smoke] read {}: {}", fi.name, e);
            println!("{}", e);
            continue;
        }
        println!();
        println!();
    }

    for fi in &files {
        println!("Deleting {}.", fi.name);
        if let Err(e) = client.remove(&op_ctx(), &fi.name).await {
            warn!("[smoke] delete {}: {}", fi.name, e);
            println!("{}", e);
        }
    }
    Ok(())
}

/// remote file contents → stderr
async fn cat(client: &Client, ctx: &Context, remote: &str) -> CliResult {
    let mut file = client.open(ctx, remote).await?;
    let copied = ctx.run(tokio::io::copy(&mut file, &mut tokio::io::stderr())).await;
    let _ = file.shutdown().await;
    match copied {
        Ok(Ok(_))  => Ok(()),
        Ok(Err(e)) => Err(format!("failed to read {}: {}", remote, e).into()),
        Err(done)  => Err(format!("read {} interrupted: {:?}", remote, done).into()),
    }
}

/// ls -la style listing
fn print_entries(entries: &[FileEntry]) {
    for e in entries {
        println!("{:10}  {:>10}  {:>5}  {:>5}  {}  {}",
            e.permission_str(),
            e.size,
            e.uid.map(|u| u.to_string()).unwrap_or_else(|| "?".to_string()),
            e.gid.map(|g| g.to_string()).unwrap_or_else(|| "?".to_string()),
            e.mtime_str(),
            e.name,
        );
    }
    println!("Total: {} entries", entries.len());
}
