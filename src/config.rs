//! Command-line configuration surface.
//!
//! Unlike the wider toolkit this binary borrows its shape from, the
//! router has no file-based configuration: every knob is a flag, one
//! process per listening port, matching the tool it reimplements.
//! Flag names keep clap's double-dash convention rather than the
//! single-dash spelling of that original tool (`--bind-addr`, not
//! `-bind_addr`) — the behavior is what's being preserved here, not
//! the argument-parsing syntax.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use clap::Parser;

const DEFAULT_PORT: u16 = 12001;
const DEFAULT_BACKLOG: i32 = 1000;
const DEFAULT_EXPIRY_MS: u64 = 60_000;
const DEFAULT_SOLINGER_MS: u64 = 2_000;
const DEFAULT_SOTIMEOUT_MS: u64 = 0;

#[derive(Parser, Debug, Clone)]
#[command(name = "gossip-server", version, about = "Rendezvous and relay server for group-communication peers")]
pub struct Config {
    /// Port to listen on.
    #[arg(long = "port", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind the listening socket to.
    #[arg(long = "bind-addr", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind_addr: IpAddr,

    /// Maximum pending-connection backlog passed to `listen()`.
    #[arg(long = "backlog", default_value_t = DEFAULT_BACKLOG)]
    pub backlog: i32,

    /// Idle timeout, in milliseconds, before a session with no traffic
    /// is evicted by the sweeper. Zero disables eviction.
    #[arg(long = "expiry", default_value_t = DEFAULT_EXPIRY_MS)]
    pub expiry_ms: u64,

    /// `SO_LINGER` duration, in milliseconds, applied to accepted
    /// sockets.
    #[arg(long = "solinger", default_value_t = DEFAULT_SOLINGER_MS)]
    pub solinger_ms: u64,

    /// Read timeout, in milliseconds, applied to accepted sockets.
    /// Zero disables the timeout.
    #[arg(long = "sotimeout", default_value_t = DEFAULT_SOTIMEOUT_MS)]
    pub sotimeout_ms: u64,

    /// Accepted for compatibility with the tool this router replaces;
    /// this build exposes no JMX facade and the flag is a no-op.
    #[arg(long = "jmx", default_value_t = false)]
    pub jmx: bool,
}

impl Config {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn expiry(&self) -> Duration {
        Duration::from_millis(self.expiry_ms)
    }

    pub fn solinger(&self) -> Duration {
        Duration::from_millis(self.solinger_ms)
    }

    pub fn sotimeout(&self) -> Option<Duration> {
        if self.sotimeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.sotimeout_ms))
        }
    }
}
