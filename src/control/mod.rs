//! Address-based control messages and the registry that routes them.
//!
//! Messages arrive from any transport (OSC, tests, a UI) as a
//! [`ControlMessage`] and are handed to a [`ControlRegistry`] on the control
//! thread. Transport threads only ever hold a [`ControlSender`].

pub mod registry;

pub use registry::{ControlKind, ControlRegistry, HandlerError, HandlerResult};

use std::sync::mpsc;

use thiserror::Error;

/// `(address, args)` as received from a controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlMessage {
    pub address: String,
    pub args: Vec<f32>,
}

impl ControlMessage {
    pub fn new(address: impl Into<String>, args: Vec<f32>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("no control registered at {0}")]
    Unregistered(String),

    #[error("{address}: missing argument")]
    MissingArgument { address: String },

    #[error("{address}: argument {value} is outside 0.0..=1.0")]
    OutOfRange { address: String, value: f32 },

    #[error("{address}: selection has no options")]
    NoOptions { address: String },

    #[error("{address}: {source}")]
    Handler {
        address: String,
        #[source]
        source: HandlerError,
    },
}

/// Sender half, cloned into listener threads.
pub type ControlSender = mpsc::Sender<ControlMessage>;

/// Receiver half, held by the control loop.
pub struct ControlReceiver {
    rx: mpsc::Receiver<ControlMessage>,
}

impl ControlReceiver {
    /// Non-blocking poll for the next message.
    pub fn poll(&self) -> Option<ControlMessage> {
        self.rx.try_recv().ok()
    }

    /// Drain all pending messages.
    pub fn drain(&self) -> Vec<ControlMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            messages.push(message);
        }
        messages
    }
}

pub fn control_channel() -> (ControlSender, ControlReceiver) {
    let (tx, rx) = mpsc::channel();
    (tx, ControlReceiver { rx })
}
