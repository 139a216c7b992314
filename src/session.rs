//! request ownership of the display surfaces.
//!
//! one gate per app hands out increasing tokens. only the newest token may
//! write; anything an older request sends afterwards is dropped, first by its
//! writer and again by the drain system (a new token can be issued while ops
//! are still queued).

use bevy::prelude::*;
use flume::{Receiver, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::surface::{SurfaceOp, TextSurfaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Recommendation,
    Directions,
}

#[derive(Resource, Clone, Default)]
pub struct RequestGate {
    current: Arc<AtomicU64>,
}

impl RequestGate {
    /// invalidates every previously issued token.
    pub fn issue(&self) -> RequestToken {
        let id = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        RequestToken { id, current: self.current.clone() }
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }
}

#[derive(Clone, Debug)]
pub struct RequestToken {
    id: u64,
    current: Arc<AtomicU64>,
}

impl RequestToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.id
    }
}

/// messages from request tasks back to the main schedule.
#[derive(Debug)]
pub enum InboxMsg {
    Surface { token: u64, op: SurfaceOp },
    Finished { token: u64, kind: RequestKind, error: Option<String> },
}

/// cross-thread inbox; request tasks send, the drain system reads.
/// bounded so a stalled frame can't grow it without limit.
#[derive(Resource, Clone)]
pub struct Inbox {
    pub(crate) tx: Sender<InboxMsg>,
    pub(crate) rx: Receiver<InboxMsg>,
}

impl Default for Inbox {
    fn default() -> Self {
        let (tx, rx) = flume::bounded(2048);
        Self { tx, rx }
    }
}

/// send to inbox (ignore full/disconnected)
pub(crate) fn push_inbox(tx: &Sender<InboxMsg>, msg: InboxMsg) {
    let _ = tx.send(msg);
}

/// surface access for one request.
#[derive(Clone)]
pub struct SurfaceWriter {
    token: RequestToken,
    tx: Sender<InboxMsg>,
}

impl SurfaceWriter {
    pub fn new(token: RequestToken, tx: Sender<InboxMsg>) -> Self {
        Self { token, tx }
    }

    pub fn token(&self) -> &RequestToken {
        &self.token
    }

    pub fn is_current(&self) -> bool {
        self.token.is_current()
    }

    /// returns false when the op was dropped because a newer request owns the page.
    pub fn send(&self, op: SurfaceOp) -> bool {
        if !self.token.is_current() {
            trace!(target: "bevy_travel_llm", "dropping op from stale request {}: {:?}", self.token.id, op);
            return false;
        }
        push_inbox(&self.tx, InboxMsg::Surface { token: self.token.id, op });
        true
    }

    pub fn set_text(&self, id: TextSurfaceId, text: impl Into<String>) -> bool {
        self.send(SurfaceOp::SetText(id, text.into()))
    }

    pub fn show(&self, id: TextSurfaceId) -> bool {
        self.send(SurfaceOp::Show(id))
    }

    pub fn hide(&self, id: TextSurfaceId) -> bool {
        self.send(SurfaceOp::Hide(id))
    }

    pub fn clear(&self, id: TextSurfaceId) -> bool {
        self.send(SurfaceOp::Clear(id))
    }
}
