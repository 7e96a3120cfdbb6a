//! Generic-netlink (nl80211) message dispatch: sequence-keyed one-shot
//! reply handlers, falling back to a broadcast list for unsolicited
//! messages.
//!
//! The sampled source makes this a process-wide singleton
//! (`Config80211::GetInstance`); per this crate's resolution of that
//! redesign note (see [`crate::proxy_factory`] for the identical pattern),
//! it is an object constructed once and passed by reference to every
//! consumer.

use std::collections::HashMap;

/// An nl80211 message. This crate does not parse nl80211's attribute
/// wire format (that belongs to the Wi-Fi capability binding, out of
/// scope here); a message is an opaque payload plus the sequence number
/// the kernel echoes back on a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NlMessage {
    /// The netlink sequence number carried by this message.
    pub sequence: u32,
    /// The raw message payload.
    pub payload: Vec<u8>,
}

type Handler = Box<dyn FnMut(&NlMessage) + Send>;

/// Dispatches received nl80211 messages to the handler that sent the
/// request they reply to, falling back to broadcast handlers for
/// unsolicited messages.
#[derive(Default)]
pub struct Config80211 {
    next_sequence: u32,
    sequence_handlers: HashMap<u32, Handler>,
    broadcast_handlers: Vec<(String, Handler)>,
}

impl Config80211 {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns the next sequence number, registers `handler` as the
    /// one-shot reply handler for it, and returns the sequence number the
    /// caller should stamp onto the outgoing message.
    ///
    /// This crate has no real netlink socket to transmit through (see
    /// [`crate::proxy_factory`] for where that boundary lives); sending
    /// itself is therefore the caller's responsibility once it has the
    /// assigned sequence number.
    pub fn send_message<F>(&mut self, handler: F) -> u32
    where
        F: FnMut(&NlMessage) + Send + 'static,
    {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.sequence_handlers.insert(sequence, Box::new(handler));
        sequence
    }

    /// Removes a registered one-shot reply handler before it fires.
    ///
    /// Returns `true` if a handler was registered under `sequence`.
    pub fn remove_message_handler(&mut self, sequence: u32) -> bool {
        self.sequence_handlers.remove(&sequence).is_some()
    }

    /// Registers `handler` under `name` for every unsolicited message.
    /// Adding a `name` that is already registered is a no-op, not an
    /// error or a replacement.
    pub fn add_broadcast_handler<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: FnMut(&NlMessage) + Send + 'static,
    {
        let name = name.into();
        if self.broadcast_handlers.iter().any(|(n, _)| *n == name) {
            return;
        }
        self.broadcast_handlers.push((name, Box::new(handler)));
    }

    /// Removes every broadcast handler.
    pub fn clear_broadcast_handlers(&mut self) {
        self.broadcast_handlers.clear();
    }

    /// Dispatches a received message: invokes and removes the one-shot
    /// handler registered for its sequence number, if any; otherwise
    /// invokes every broadcast handler.
    pub fn on_message_received(&mut self, message: &NlMessage) {
        if let Some(mut handler) = self.sequence_handlers.remove(&message.sequence) {
            handler(message);
            return;
        }
        for (_, handler) in &mut self.broadcast_handlers {
            handler(message);
        }
    }
}
