//! Integration tests for remote control.
//!
//! Control messages drive a session through its registry, both directly and
//! over a real UDP socket on localhost.

use std::net::UdpSocket;
use std::thread;
use std::time::Duration;

use assert_approx_eq::assert_approx_eq;
use rosc::{encoder, OscMessage, OscPacket, OscType};

use barline::control::{control_channel, ControlError, ControlMessage, ControlRegistry};
use barline::generate::SeededGenerator;
use barline::osc::{OscConfig, OscListener};
use barline::session::{Session, SessionConfig, Track};

fn controlled_session() -> (Session, ControlRegistry<Session>) {
    let session =
        Session::new(&SessionConfig::default(), Box::new(SeededGenerator::new(5))).unwrap();
    let mut registry = ControlRegistry::new();
    session.register_controls(&mut registry);
    (session, registry)
}

#[test]
fn every_track_has_its_controls() {
    let (_, registry) = controlled_session();
    for track in Track::ALL {
        for action in ["add", "remove", "delete", "new", "vary"] {
            assert!(registry.contains(&format!("/{track}/{action}")));
        }
    }
    assert!(registry.contains("/drums/threshold"));
    assert!(registry.contains("/transport/bpm"));
    assert!(registry.contains("/transport/play"));
}

#[test]
fn threshold_message_recompiles_once() {
    let (mut session, mut registry) = controlled_session();
    registry.dispatch(&mut session, "/drums/new", &[]).unwrap();
    registry.dispatch(&mut session, "/drums/add", &[0.0]).unwrap();
    assert!(session.track(Track::Drums).is_live());

    let before = session.arrangement(Track::Drums).generation();
    registry
        .dispatch_message(&mut session, &ControlMessage::new("/drums/threshold", vec![0.3]))
        .unwrap();
    assert_eq!(session.arrangement(Track::Drums).generation(), before + 1);
    assert_approx_eq!(session.threshold(), 0.3);
    assert_approx_eq!(registry.value("/drums/threshold").unwrap(), 0.3);
}

#[test]
fn rejected_value_rolls_back() {
    let (mut session, mut registry) = controlled_session();
    let err = registry
        .dispatch(&mut session, "/drums/threshold", &[1.5])
        .unwrap_err();
    assert!(matches!(err, ControlError::Handler { .. }));
    assert_approx_eq!(registry.value("/drums/threshold").unwrap(), 0.2);
    assert_approx_eq!(session.threshold(), 0.2);

    assert!(registry.dispatch(&mut session, "/transport/bpm", &[0.0]).is_err());
    assert_approx_eq!(session.bpm(), 110.0);
}

#[test]
fn pool_controls_round_trip() {
    let (mut session, mut registry) = controlled_session();
    registry.dispatch(&mut session, "/melody/new", &[]).unwrap();
    let pooled = session.pool(Track::Melody).len();
    registry.dispatch(&mut session, "/melody/vary", &[0.0]).unwrap();
    assert_eq!(session.pool(Track::Melody).len(), pooled + 1);

    registry.dispatch(&mut session, "/melody/add", &[2.0]).unwrap();
    assert_eq!(session.arrangement(Track::Melody).occupied(), 1);
    registry.dispatch(&mut session, "/melody/remove", &[0.0]).unwrap();
    assert_eq!(session.arrangement(Track::Melody).occupied(), 0);
    registry.dispatch(&mut session, "/melody/delete", &[0.0]).unwrap();
    assert_eq!(session.pool(Track::Melody).len(), pooled);

    // index past the pool
    assert!(registry.dispatch(&mut session, "/melody/add", &[99.0]).is_err());
    assert!(registry.dispatch(&mut session, "/melody/add", &[-1.0]).is_err());
}

#[test]
fn unknown_address_is_reported() {
    let (mut session, mut registry) = controlled_session();
    assert!(matches!(
        registry.dispatch(&mut session, "/nowhere", &[1.0]),
        Err(ControlError::Unregistered(_))
    ));
}

#[test]
fn play_toggles_transport() {
    let (mut session, mut registry) = controlled_session();
    registry.dispatch(&mut session, "/transport/play", &[]).unwrap();
    assert!(session.is_playing());
    registry.dispatch(&mut session, "/transport/play", &[1.0]).unwrap();
    assert!(!session.is_playing());
}

#[test]
fn udp_message_reaches_the_session() {
    let (mut session, mut registry) = controlled_session();
    let (tx, rx) = control_channel();
    let config = OscConfig {
        listen_port: 19140,
        feedback: None,
    };
    let mut listener = OscListener::start(&config, tx).unwrap();

    let packet = OscPacket::Message(OscMessage {
        addr: "/transport/bpm".to_string(),
        args: vec![OscType::Int(128)],
    });
    let bytes = encoder::encode(&packet).unwrap();
    UdpSocket::bind("127.0.0.1:0")
        .unwrap()
        .send_to(&bytes, "127.0.0.1:19140")
        .unwrap();

    let mut received = None;
    for _ in 0..50 {
        if let Some(message) = rx.poll() {
            received = Some(message);
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    let message = received.expect("no message arrived");
    registry.dispatch_message(&mut session, &message).unwrap();
    assert_approx_eq!(session.bpm(), 128.0);
    listener.stop();
}
