//! Subscriber tests

use std::time::Duration;

use redwire::{cmd, encode_command, Connection, PubSubEvent, ReplyValue};

use crate::common::MockSocket;

const ACK_A: &[u8] = b"*3\r\n$9\r\nsubscribe\r\n$1\r\na\r\n:1\r\n";
const MSG_A: &[u8] = b"*3\r\n$7\r\nmessage\r\n$1\r\na\r\n$2\r\nhi\r\n";
const UNSUB_A: &[u8] = b"*3\r\n$11\r\nunsubscribe\r\n$1\r\na\r\n:0\r\n";

#[test]
fn test_subscribe_is_fire_and_forget() {
    let socket = MockSocket::new();
    let mut conn = Connection::new(socket.clone());
    let mut subscriber = conn.subscriber().unwrap();

    subscriber.subscribe(["a", "b"]).unwrap();
    assert!(subscriber.is_subscribed());
    assert_eq!(socket.written(), encode_command(&["SUBSCRIBE", "a", "b"]).to_vec());
    assert_eq!(socket.read_calls(), 0);
}

#[test]
fn test_subscribe_requires_a_channel() {
    let mut conn = Connection::new(MockSocket::new());
    let mut subscriber = conn.subscriber().unwrap();
    let none: [&str; 0] = [];
    assert!(subscriber.subscribe(none).unwrap_err().is_usage());
    assert!(subscriber.psubscribe(none).unwrap_err().is_usage());
}

#[test]
fn test_events_in_arrival_order() {
    let socket = MockSocket::new();
    let mut conn = Connection::new(socket.clone());
    let mut subscriber = conn.subscriber().unwrap();
    subscriber.subscribe(["a"]).unwrap();

    socket.push_input(ACK_A);
    socket.push_input(MSG_A);

    match subscriber.next_event(None).unwrap() {
        Some(PubSubEvent::Control { channel, count, .. }) => {
            assert_eq!(channel.as_deref(), Some("a"));
            assert_eq!(count, 1);
        }
        other => panic!("expected ack, got {:?}", other),
    }
    assert_eq!(subscriber.subscriptions(), 1);

    match subscriber.next_event(None).unwrap() {
        Some(PubSubEvent::Message(message)) => {
            assert_eq!(message.channel, "a");
            assert_eq!(&message.payload[..], b"hi");
        }
        other => panic!("expected message, got {:?}", other),
    }
}

#[test]
fn test_next_message_skips_control_frames() {
    let socket = MockSocket::new();
    let mut conn = Connection::new(socket.clone());
    let mut subscriber = conn.subscriber().unwrap();
    subscriber.subscribe(["a"]).unwrap();

    socket.push_input(ACK_A);
    socket.push_input(b"*2\r\n$4\r\npong\r\n$0\r\n\r\n");
    socket.push_input(MSG_A);

    let message = subscriber.next_message(Some(Duration::from_millis(100))).unwrap().unwrap();
    assert_eq!(message.channel, "a");
    assert_eq!(subscriber.subscriptions(), 1);
}

#[test]
fn test_timeout_without_data_returns_none() {
    let mut conn = Connection::new(MockSocket::new());
    let mut subscriber = conn.subscriber().unwrap();
    assert!(subscriber.next_event(Some(Duration::ZERO)).unwrap().is_none());
    assert!(subscriber.next_message(Some(Duration::ZERO)).unwrap().is_none());
}

#[test]
fn test_subscribe_mode_blocks_commands_until_unsubscribed() {
    let socket = MockSocket::new();
    let mut conn = Connection::new(socket.clone());

    conn.subscriber().unwrap().subscribe(["a"]).unwrap();
    assert!(conn.is_subscribed());
    assert!(conn.execute(&cmd!("PING")).unwrap_err().is_usage());
    assert!(conn.start_pipeline().unwrap_err().is_usage());

    socket.push_input(ACK_A);
    socket.push_input(UNSUB_A);
    {
        let mut subscriber = conn.subscriber().unwrap();
        subscriber.unsubscribe(Vec::<String>::new()).unwrap();
        subscriber.next_event(None).unwrap();
        subscriber.next_event(None).unwrap();
        assert_eq!(subscriber.subscriptions(), 0);
    }
    assert!(!conn.is_subscribed());

    socket.push_input(b"+PONG\r\n");
    assert_eq!(
        conn.execute(&cmd!("PING")).unwrap(),
        ReplyValue::SimpleString("PONG".into())
    );
}

#[test]
fn test_server_error_in_subscribe_mode() {
    let socket = MockSocket::new();
    let mut conn = Connection::new(socket.clone());
    let mut subscriber = conn.subscriber().unwrap();
    subscriber.subscribe(["a"]).unwrap();

    socket.push_input(b"-ERR only (P)SUBSCRIBE allowed\r\n");
    let err = subscriber.next_event(None).unwrap_err();
    assert!(err.is_server());
    assert!(!err.is_fatal());
}

#[test]
fn test_unsubscribe_while_idle_waits_for_its_ack() {
    let socket = MockSocket::new();
    let mut conn = Connection::new(socket.clone());

    conn.subscriber().unwrap().unsubscribe(Vec::<String>::new()).unwrap();
    socket.push_input(b"*3\r\n$11\r\nunsubscribe\r\n$-1\r\n:0\r\n");
    socket.push_input(b"+PONG\r\n");

    // The ack is still on the wire, so a command must not read it as its reply.
    assert!(conn.is_subscribed());
    assert!(conn.execute(&cmd!("PING")).unwrap_err().is_usage());

    match conn.subscriber().unwrap().next_event(None).unwrap() {
        Some(PubSubEvent::Control { kind, channel, count }) => {
            assert!(kind.is_unsubscribe());
            assert_eq!(channel, None);
            assert_eq!(count, 0);
        }
        other => panic!("expected unsubscribe ack, got {:?}", other),
    }
    assert!(!conn.is_subscribed());
    assert_eq!(
        conn.execute(&cmd!("PING")).unwrap(),
        ReplyValue::SimpleString("PONG".into())
    );
}

#[test]
fn test_stale_unsubscribe_ack_does_not_end_new_subscription() {
    let socket = MockSocket::new();
    let mut conn = Connection::new(socket.clone());

    {
        let mut subscriber = conn.subscriber().unwrap();
        subscriber.subscribe(["a"]).unwrap();
        socket.push_input(ACK_A);
        subscriber.next_event(None).unwrap();

        subscriber.unsubscribe(["a"]).unwrap();
        subscriber.subscribe(["b"]).unwrap();

        socket.push_input(UNSUB_A);
        subscriber.next_event(None).unwrap();
        assert_eq!(subscriber.subscriptions(), 0);
    }

    // SUBSCRIBE b is still unacknowledged: the server is in subscribe mode.
    assert!(conn.is_subscribed());
    assert!(conn.execute(&cmd!("PING")).unwrap_err().is_usage());

    let mut subscriber = conn.subscriber().unwrap();
    socket.push_input(b"*3\r\n$9\r\nsubscribe\r\n$1\r\nb\r\n:1\r\n");
    socket.push_input(b"*3\r\n$7\r\nmessage\r\n$1\r\nb\r\n$3\r\nbye\r\n");
    let message = subscriber.next_message(None).unwrap().unwrap();
    assert_eq!(message.channel, "b");
    assert_eq!(subscriber.subscriptions(), 1);
    assert!(subscriber.is_subscribed());
}

#[test]
fn test_new_subscriber_keeps_subscription_count() {
    let socket = MockSocket::new();
    let mut conn = Connection::new(socket.clone());

    {
        let mut subscriber = conn.subscriber().unwrap();
        subscriber.subscribe(["a", "b"]).unwrap();
        socket.push_input(ACK_A);
        socket.push_input(b"*3\r\n$9\r\nsubscribe\r\n$1\r\nb\r\n:2\r\n");
        subscriber.next_event(None).unwrap();
        subscriber.next_event(None).unwrap();
    }

    assert_eq!(conn.subscriptions(), 2);
    assert_eq!(conn.subscriber().unwrap().subscriptions(), 2);
}
