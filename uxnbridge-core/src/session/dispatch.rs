//! Event-driven front of a [`Session`].
//!
//! The environment's event sources (animation clock, pointer, keyboard, gamepad, audio
//! device) run independently. They never call the guest themselves; they send an [`Event`]
//! and one thread drains the queue, so at most one guest call is ever in flight.

use std::sync::mpsc::{Receiver, SyncSender};

use super::Session;
use crate::av::AudioChunk;
use crate::error::Result;
use crate::input::{Bounds, KeyEvent, PointerEvent};

#[derive(Debug)]
pub enum Event {
    /// Animation clock tick.
    Frame,
    Pointer {
        event: PointerEvent,
        bounds: Bounds,
    },
    Wheel {
        delta_y: f64,
    },
    Key(KeyEvent),
    /// Only its default handling matters: it is always suppressed.
    ContextMenu,
    GamepadConnected {
        index: u32,
        standard_mapping: bool,
    },
    GamepadDisconnected {
        index: u32,
    },
    /// The audio device wants its next chunk. It lends `chunk` (typically the one it just
    /// played) and gets it back filled on `reply`.
    AudioPull {
        chunk: AudioChunk,
        reply: SyncSender<AudioChunk>,
    },
    Save,
    Restore,
    Reset,
}

/// Whether the environment should still run its own handling of the event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    Default,
    PreventDefault,
}

impl Session {
    /// Handle one event.
    ///
    /// Input edge cases (unsupported feature, event before boot) are logged and dropped.
    /// Integration errors are returned and the caller should stop.
    pub fn dispatch(&mut self, event: Event) -> Result<Disposition> {
        use Disposition::{Default, PreventDefault};

        let (disposition, outcome) = match event {
            Event::Frame => (Default, self.update()),
            Event::Pointer { event, bounds } => (PreventDefault, self.pointer(&event, &bounds)),
            Event::Wheel { delta_y } => (PreventDefault, self.wheel(delta_y)),
            Event::Key(event) => (PreventDefault, self.keyboard(&event)),
            Event::ContextMenu => (PreventDefault, Ok(())),
            Event::GamepadConnected {
                index,
                standard_mapping,
            } => {
                self.gamepad_connected(index, standard_mapping);
                (Default, Ok(()))
            }
            Event::GamepadDisconnected { index } => {
                self.gamepad_disconnected(index);
                (Default, Ok(()))
            }
            Event::AudioPull { mut chunk, reply } => {
                let outcome = self.pull_audio(&mut chunk).map(|()| {
                    if reply.send(chunk).is_err() {
                        log::debug!("audio device dropped its reply channel");
                    }
                });
                (Default, outcome)
            }
            Event::Save => (Default, self.save()),
            Event::Restore => (Default, self.restore()),
            Event::Reset => (Default, self.reset()),
        };

        match outcome {
            Ok(()) => Ok(disposition),
            Err(err) if !err.is_fatal() => {
                log::debug!("ignored: {err}");
                Ok(disposition)
            }
            Err(err) => Err(err),
        }
    }
}

/// Drain `events` until every sender is gone or a fatal error occurs.
///
/// `Session` is `Send`: every capability in [`super::HostCapabilities`] is a `Send` trait
/// object, so the loop can run on a thread of its own while the event sources hold the
/// senders. Backends tied to one thread should live behind a channel on that thread and
/// hand the session a `Send` proxy.
///
/// Returns the session so the embedder can inspect it after teardown.
pub fn run(mut session: Session, events: Receiver<Event>) -> Result<Session> {
    log::info!("dispatch loop started");
    for event in events {
        log::trace!("event {event:?}");
        session.dispatch(event)?;
    }
    log::info!("event source closed, dispatch loop finished");
    Ok(session)
}
