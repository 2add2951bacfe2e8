// sftpdrop CLI Commands
//
// Pure parsing only (no IO, easy to test)

use std::time::Duration;

#[derive(Debug, PartialEq)]
pub enum Command {
    /// Upload / list / read / delete sequence against a live server
    Smoke { local: String },
    Ls { path: String },
    Cat { remote: String },
    Put { local: String, remote: String },
    Rm { remote: String },
    Help,
}

/// Parsed command line: optional `--timeout <secs>` followed by a command
#[derive(Debug, PartialEq)]
pub struct Invocation {
    pub timeout: Option<Duration>,
    pub command: Command,
}

impl Invocation {
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self, String> {
        let mut parts: Vec<&str> = args.iter().map(|s| s.as_ref()).collect();
        let mut timeout = None;

        if let Some(pos) = parts.iter().position(|a| *a == "--timeout") {
            let secs = parts.get(pos + 1)
                .ok_or_else(|| "Usage: --timeout <seconds>".to_string())?;
            let secs: u64 = secs.parse()
                .map_err(|_| format!("Invalid timeout: {}", secs))?;
            timeout = Some(Duration::from_secs(secs));
            parts.drain(pos..=pos + 1);
        }

        Ok(Self { timeout, command: Command::parse(&parts)? })
    }
}

impl Command {
    pub fn parse(parts: &[&str]) -> Result<Self, String> {
        let Some((cmd, rest)) = parts.split_first() else {
            return Ok(Command::Help);
        };

        match *cmd {
            "smoke" => match rest {
                [local] => Ok(Command::Smoke { local: local.to_string() }),
                _       => Err("Usage: smoke <local-file>".to_string()),
            },
            "ls" => Ok(Command::Ls {
                path: rest.first().unwrap_or(&".").to_string(),
            }),
            "cat" => match rest {
                [remote] => Ok(Command::Cat { remote: remote.to_string() }),
                _        => Err("Usage: cat <remote>".to_string()),
            },
            "put" => match rest {
                [local]         => Ok(Command::Put { local: local.to_string(), remote: extract_filename(local) }),
                [local, remote] => Ok(Command::Put { local: local.to_string(), remote: remote.to_string() }),
                _               => Err("Usage: put <local> [remote]".to_string()),
            },
            "rm" => match rest {
                [remote] => Ok(Command::Rm { remote: remote.to_string() }),
                _        => Err("Usage: rm <remote>".to_string()),
            },
            "help" | "-h" | "--help" => Ok(Command::Help),
            other => Err(format!("Unknown command: {}", other)),
        }
    }
}

/// File name part of a path ("/local/dir/file.txt" → "file.txt")
fn extract_filename(path: &str) -> String {
    path.rsplit(['/', '\\'])
        .next()
        .unwrap_or(path)
        .to_string()
}
