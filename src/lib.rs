//! Rendezvous and relay server: accepts peer connections, tracks
//! group membership, and relays messages between peers that have
//! joined the same group.
//!
//! This binary crate wires together the synchronous routing state in
//! the `service` crate with tokio: the acceptor spawns one task per
//! connection, the sweeper runs as a periodic background task, and
//! `startup` keeps the process alive exactly like the teacher's own
//! entry point (run the server, then block forever since there is no
//! separate management API to drive the process lifetime instead).

pub mod acceptor;
pub mod config;
pub mod outbox;
pub mod session;
pub mod sweeper;

use std::sync::Arc;

use service::Router;

use self::config::Config;

pub async fn startup(config: Arc<Config>) -> anyhow::Result<()> {
    let router = Router::new();

    let sweeper_router = router.clone();
    let expiry = config.expiry();
    tokio::spawn(async move {
        sweeper::run(sweeper_router, expiry).await;
    });

    acceptor::run(config, router).await
}
