//! Events delivered to the app loop
//!
//! Everything that happens outside the loop (channel traffic, player and
//! synthesizer lifecycles) arrives as an `AppEvent` on one unbounded queue
//! and is handled in arrival order.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::net::ChannelEvent;
use crate::speech::SpeechEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Channel(ChannelEvent),
    Speech(SpeechEvent),
}

pub type EventSender = UnboundedSender<AppEvent>;
pub type EventReceiver = UnboundedReceiver<AppEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
