//! OSC (Open Sound Control) support — receive control messages over UDP and
//! send control values back.

pub mod config;
pub mod listener;
pub mod mapping;

pub use config::OscConfig;
pub use listener::{OscFeedback, OscListener};
pub use mapping::{feedback_packet, packet_messages, to_control_message};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OscError {
    #[error("OSC socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode OSC packet: {0:?}")]
    Encode(rosc::OscError),

    #[error("{0} does not resolve to a socket address")]
    Address(String),
}
