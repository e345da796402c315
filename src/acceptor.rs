//! Listening-socket loop: binds once, spawns one [`session::run`] task
//! per accepted connection.
//!
//! Grounded on the teacher's `server::transports::tcp::listener`
//! accept loop, generalized from a fixed interface pair to the single
//! bind address and port this router exposes.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use service::Router;
use socket2::{Domain, Socket, Type};
use tokio::net::TcpListener;

use crate::config::Config;
use crate::session::{self, SessionOptions};

pub async fn run(config: Arc<Config>, router: Router) -> anyhow::Result<()> {
    let bind_addr = SocketAddr::new(config.bind_addr, config.port);
    let listener = bind_listener(bind_addr, config.backlog)?;

    log::info!("listening on {} (backlog={})", listener.local_addr()?, config.backlog);

    serve(listener, router, config.solinger(), config.sotimeout()).await
}

/// Drives the accept loop against an already-bound listener. Split out
/// from [`run`] so tests can bind an ephemeral port (`:0`) and learn
/// the assigned address before connecting.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    solinger: std::time::Duration,
    sotimeout: Option<std::time::Duration>,
) -> anyhow::Result<()> {
    let interface = listener.local_addr()?;
    let next_id = Arc::new(AtomicU64::new(1));

    loop {
        let (socket, source) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("accept failed: {e}");
                continue;
            }
        };

        let id = next_id.fetch_add(1, Ordering::Relaxed);
        let router = router.clone();
        let options = SessionOptions {
            id,
            source,
            interface,
            solinger,
            sotimeout,
        };

        tokio::spawn(async move {
            session::run(socket, router, options).await;
        });
    }
}

pub fn bind_listener(addr: SocketAddr, backlog: i32) -> anyhow::Result<TcpListener> {
    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    Ok(TcpListener::from_std(socket.into())?)
}
