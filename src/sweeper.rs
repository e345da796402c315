//! Idle-session eviction.
//!
//! Grounded on `SessionManager::new`'s background expiry loop in the
//! teacher's `service` crate: periodically scan every tracked session
//! and drop the ones that have gone quiet. The teacher runs that scan
//! on a bare OS thread because its `SessionManager` is synchronous;
//! this router's core is the same synchronous `service` crate wrapped
//! by an async binary, so the scan becomes a `tokio::time::interval`
//! task instead of a spawned thread.

use std::sync::Arc;
use std::time::Duration;

use service::Router;

use crate::session::now_ms;

const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

pub async fn run(router: Router, expiry: Duration) {
    if expiry.is_zero() {
        log::info!("idle eviction disabled (expiry=0)");
        return;
    }

    let expiry_ms = expiry.as_millis() as u64;
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        ticker.tick().await;

        let now = now_ms();
        let mut evicted = 0usize;

        for peer in router.routing.all_sessions() {
            if peer.age_ms(now) >= expiry_ms {
                router.close(&Arc::clone(&peer));
                evicted += 1;
            }
        }

        if evicted > 0 {
            log::info!("sweeper evicted {evicted} idle session(s)");
        }
    }
}
