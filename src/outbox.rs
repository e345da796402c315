//! Glue between the synchronous `service` crate and tokio: a
//! channel-backed [`service::Outbox`] that a session's write half
//! drains, keeping every write to a given socket on the single task
//! that owns it.

use codec::GossipRecord;
use service::Outbox;
use tokio::sync::mpsc::UnboundedSender;

pub enum Mail {
    Record(GossipRecord),
    Shutdown,
}

pub struct ChannelOutbox {
    sender: UnboundedSender<Mail>,
}

impl ChannelOutbox {
    pub fn new(sender: UnboundedSender<Mail>) -> Self {
        Self { sender }
    }
}

impl Outbox for ChannelOutbox {
    fn deliver(&self, record: GossipRecord) {
        // The receiving end is dropped only once the session's task has
        // already exited, in which case there is nothing left to
        // deliver to.
        let _ = self.sender.send(Mail::Record(record));
    }

    fn shutdown(&self) {
        let _ = self.sender.send(Mail::Shutdown);
    }
}
