//! OSC ↔ control message conversion.

use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType};

use crate::control::ControlMessage;

/// Numeric value of one OSC argument. Strings, blobs and the like have none.
fn numeric(arg: &OscType) -> Option<f32> {
    match arg {
        OscType::Float(f) => Some(*f),
        OscType::Double(d) => Some(*d as f32),
        OscType::Int(i) => Some(*i as f32),
        OscType::Long(l) => Some(*l as f32),
        OscType::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Convert one OSC message. Non-numeric arguments are dropped.
pub fn to_control_message(msg: &OscMessage) -> ControlMessage {
    ControlMessage {
        address: msg.addr.clone(),
        args: msg.args.iter().filter_map(numeric).collect(),
    }
}

/// Flatten a packet (bundles nest) into control messages in arrival order.
pub fn packet_messages(packet: &OscPacket) -> Vec<ControlMessage> {
    let mut out = Vec::new();
    collect(packet, &mut out);
    out
}

fn collect(packet: &OscPacket, out: &mut Vec<ControlMessage>) {
    match packet {
        OscPacket::Message(msg) => out.push(to_control_message(msg)),
        OscPacket::Bundle(bundle) => {
            for content in &bundle.content {
                collect(content, out);
            }
        }
    }
}

/// One bundle carrying `address → value` for every fed-back control.
pub fn feedback_packet<'a>(values: impl IntoIterator<Item = (&'a str, f32)>) -> OscPacket {
    let content = values
        .into_iter()
        .map(|(address, value)| {
            OscPacket::Message(OscMessage {
                addr: address.to_string(),
                args: vec![OscType::Float(value)],
            })
        })
        .collect();
    OscPacket::Bundle(OscBundle {
        // "immediately"
        timetag: OscTime {
            seconds: 0,
            fractional: 1,
        },
        content,
    })
}
