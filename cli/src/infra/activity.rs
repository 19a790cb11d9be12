//! Game-port activity from the kernel's socket table.

use std::collections::BTreeSet;

use anyhow::{Context, Result, bail};

use crate::application::ports::{ActivitySource, CommandRunner};
use crate::infra::command_runner::{PROBE_TIMEOUT, TokioCommandRunner};

/// Counts clients on the game port using `ss`.
///
/// Each distinct connected peer counts as one client. A UDP game server
/// usually serves everyone from one unconnected socket, so queued bytes on
/// the port with no connected peer count as a single client.
pub struct SocketActivity<R: CommandRunner> {
    runner: R,
    port: u16,
}

impl<R: CommandRunner> SocketActivity<R> {
    pub fn new(runner: R, port: u16) -> Self {
        Self { runner, port }
    }
}

impl SocketActivity<TokioCommandRunner> {
    /// Samples the local host's socket table.
    #[must_use]
    pub fn local(port: u16) -> Self {
        Self::new(TokioCommandRunner::new(PROBE_TIMEOUT), port)
    }
}

impl<R: CommandRunner> ActivitySource for SocketActivity<R> {
    async fn active_players(&self) -> Result<u32> {
        let filter = format!("sport = :{}", self.port);
        let output = self
            .runner
            .run_with_timeout("ss", &["-H", "-a", "-n", "-t", "-u", &filter], PROBE_TIMEOUT)
            .await
            .context("sampling sockets")?;
        if !output.status.success() {
            bail!(
                "ss failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(count_clients(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Counts clients in headerless `ss -n` output.
///
/// Columns are located by the Recv-Q/Send-Q pair, so output with or without
/// the Netid column parses the same way.
#[must_use]
pub fn count_clients(ss_output: &str) -> u32 {
    let mut peers = BTreeSet::new();
    let mut queued = 0u64;
    for line in ss_output.lines() {
        let cols: Vec<&str> = line.split_whitespace().collect();
        let Some(i) = cols
            .windows(2)
            .position(|w| w[0].parse::<u64>().is_ok() && w[1].parse::<u64>().is_ok())
        else {
            continue;
        };
        queued += cols[i].parse::<u64>().unwrap_or(0);
        let Some(peer) = cols.get(i + 3) else {
            continue;
        };
        if peer.ends_with(":*") {
            continue;
        }
        if let Some((host, _port)) = peer.rsplit_once(':') {
            peers.insert(host.to_string());
        }
    }
    match u32::try_from(peers.len()).unwrap_or(u32::MAX) {
        0 if queued > 0 => 1,
        n => n,
    }
}
