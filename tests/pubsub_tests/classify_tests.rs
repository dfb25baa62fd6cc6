//! Frame classification tests

use bytes::Bytes;
use redwire::pubsub::classify;
use redwire::{ControlKind, Message, PubSubEvent, RedwireError, ReplyValue};

fn bulk(s: &str) -> ReplyValue {
    ReplyValue::from(s)
}

#[test]
fn test_message_frame() {
    let frame = ReplyValue::Array(vec![bulk("message"), bulk("news"), bulk("hello")]);
    assert_eq!(
        classify(frame).unwrap(),
        PubSubEvent::Message(Message {
            channel: "news".into(),
            payload: Bytes::from_static(b"hello"),
            pattern: None,
        })
    );
}

#[test]
fn test_pmessage_frame() {
    let frame = ReplyValue::Array(vec![
        bulk("pmessage"),
        bulk("news.*"),
        bulk("news.tech"),
        bulk("42"),
    ]);
    match classify(frame).unwrap() {
        PubSubEvent::Message(message) => {
            assert_eq!(message.pattern.as_deref(), Some("news.*"));
            assert_eq!(message.channel, "news.tech");
            assert_eq!(message.payload_as::<i64>().ok(), None);
            assert_eq!(message.payload_as::<String>().unwrap(), "42");
            assert_eq!(message.payload_as::<f64>().unwrap(), 42.0);
        }
        other => panic!("expected message, got {:?}", other),
    }
}

#[test]
fn test_control_frames() {
    let frame = ReplyValue::Array(vec![bulk("subscribe"), bulk("a"), ReplyValue::Integer(1)]);
    assert_eq!(
        classify(frame).unwrap(),
        PubSubEvent::Control {
            kind: ControlKind::Subscribe,
            channel: Some("a".into()),
            count: 1,
        }
    );

    let frame = ReplyValue::Array(vec![
        bulk("punsubscribe"),
        ReplyValue::Nil,
        ReplyValue::Integer(0),
    ]);
    assert_eq!(
        classify(frame).unwrap(),
        PubSubEvent::Control {
            kind: ControlKind::PUnsubscribe,
            channel: None,
            count: 0,
        }
    );
}

#[test]
fn test_unknown_frames_are_surfaced() {
    let pong = ReplyValue::Array(vec![bulk("pong"), bulk("")]);
    assert_eq!(classify(pong.clone()).unwrap(), PubSubEvent::Unknown(pong));

    let scalar = ReplyValue::Integer(3);
    assert_eq!(classify(scalar.clone()).unwrap(), PubSubEvent::Unknown(scalar));
}

#[test]
fn test_malformed_message_is_decode_error() {
    let frame = ReplyValue::Array(vec![bulk("message"), bulk("only-channel")]);
    assert!(matches!(classify(frame), Err(RedwireError::Decode(_))));
}
