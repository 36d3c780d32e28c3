//! Magnet-link opening
//!
//! Hands each collected magnet link to the platform's default handler,
//! which is whatever torrent client the user has registered for the
//! `magnet:` scheme.

use crate::episodes::Episode;
use std::io;
use std::process::Command;

/// One magnet link the platform handler failed to open
#[derive(Debug)]
pub struct OpenFailure {
    /// The magnet link that could not be handed off
    pub magnet_url: String,
    /// What went wrong launching the handler
    pub source: io::Error,
}

fn opener_command(magnet_url: &str) -> Command {
    #[cfg(target_os = "windows")]
    let command = {
        // `start` with an empty title so the URI is not mistaken for one
        let mut command = Command::new("cmd");
        command.args(["/C", "start", "", magnet_url]);
        command
    };

    #[cfg(target_os = "macos")]
    let command = {
        let mut command = Command::new("open");
        command.arg(magnet_url);
        command
    };

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let command = {
        let mut command = Command::new("xdg-open");
        command.arg(magnet_url);
        command
    };

    command
}

fn open_magnet(magnet_url: &str) -> io::Result<()> {
    let status = opener_command(magnet_url).status()?;

    if !status.success() {
        return Err(io::Error::other(format!("opener exited with {status}")));
    }

    Ok(())
}

/// Opens every entry's magnet link with the platform default handler
///
/// Entries are processed in collection order. Failures are collected and
/// returned rather than aborting, so one unopenable link does not stop
/// the remaining links from being tried.
pub fn download_all(episodes: &[Episode]) -> Vec<OpenFailure> {
    let mut failures = Vec::new();

    for episode in episodes {
        if let Err(source) = open_magnet(&episode.magnet_url) {
            failures.push(OpenFailure {
                magnet_url: episode.magnet_url.clone(),
                source,
            });
        }
    }

    failures
}
