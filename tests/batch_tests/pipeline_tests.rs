//! Pipeline tests

use redwire::protocol::decode;
use redwire::{cmd, encode_command, BatchKind, Connection, RedwireError, ReplyValue, Result};

use crate::common::MockSocket;

fn connection(input: &[u8]) -> (Connection<MockSocket>, MockSocket) {
    let socket = MockSocket::with_input(input);
    (Connection::new(socket.clone()), socket)
}

// =============================================================================
// Resolution
// =============================================================================

#[test]
fn test_pipeline_results_in_append_order() {
    let (mut conn, socket) = connection(b":1\r\n:2\r\n$1\r\n2\r\n");

    let mut pipe = conn.start_pipeline().unwrap();
    assert_eq!(pipe.kind(), BatchKind::Pipeline);
    assert_eq!(pipe.append(&cmd!("INCR", "a")).unwrap(), 0);
    assert_eq!(pipe.append(&cmd!("INCR", "a")).unwrap(), 1);
    assert_eq!(pipe.append(&cmd!("GET", "a")).unwrap(), 2);
    assert_eq!(pipe.len(), 3);

    // Nothing leaves until the first reply is needed.
    assert_eq!(socket.write_calls(), 0);

    let results = pipe.resolve().unwrap();
    assert_eq!(
        results,
        vec![
            ReplyValue::Integer(1),
            ReplyValue::Integer(2),
            ReplyValue::from("2"),
        ]
    );
    drop(pipe);

    assert_eq!(socket.write_calls(), 1);
    let mut expected = encode_command(&["INCR", "a"]).to_vec();
    expected.extend_from_slice(&encode_command(&["INCR", "a"]));
    expected.extend_from_slice(&encode_command(&["GET", "a"]));
    assert_eq!(socket.written(), expected);
    assert_eq!(conn.in_flight(), 0);
    assert!(conn.is_idle());
}

#[test]
fn test_typed_pipeline() {
    let (mut conn, _socket) = connection(b":1\r\n:2\r\n");
    let mut pipe = conn.pipeline::<i64>().unwrap();
    pipe.append_cmd(&cmd!("INCR", "a")).unwrap();
    pipe.append_cmd(&cmd!("INCR", "a")).unwrap();
    assert_eq!(pipe.resolve().unwrap(), vec![1, 2]);
}

#[test]
fn test_empty_pipeline_does_no_io() {
    let (mut conn, socket) = connection(b"");
    let mut pipe = conn.start_pipeline().unwrap();
    assert!(pipe.is_empty());
    assert!(pipe.resolve().unwrap().is_empty());
    drop(pipe);
    assert_eq!(socket.io_calls(), 0);
}

#[test]
fn test_append_with_custom_decoder() {
    let (mut conn, _socket) = connection(b"$5\r\nhello\r\n:3\r\n");
    let mut pipe = conn.pipeline::<String>().unwrap();
    pipe.append_with(&cmd!("GET", "greeting"), |reply| {
        Ok(String::from_utf8_lossy(reply.as_bytes().unwrap_or_default()).to_uppercase())
    })
    .unwrap();
    pipe.append_with(&cmd!("STRLEN", "greeting"), |reply| {
        Ok(format!("len={}", reply.as_integer().unwrap_or(-1)))
    })
    .unwrap();
    assert_eq!(pipe.resolve().unwrap(), vec!["HELLO", "len=3"]);
}

#[test]
fn test_pipeline_partial_writes() {
    let (mut conn, socket) = connection(b"+OK\r\n+OK\r\n");
    socket.set_write_chunk(5);

    let mut pipe = conn.pipeline::<()>().unwrap();
    pipe.append_cmd(&cmd!("SET", "a", "1")).unwrap();
    pipe.append_cmd(&cmd!("SET", "b", "2")).unwrap();
    pipe.resolve().unwrap();
    drop(pipe);

    let mut expected = encode_command(&["SET", "a", "1"]).to_vec();
    expected.extend_from_slice(&encode_command(&["SET", "b", "2"]));
    assert_eq!(socket.written(), expected);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_server_error_in_pipeline_consumes_all_replies() {
    let (mut conn, socket) = connection(b":1\r\n-ERR wrong type\r\n:3\r\n");

    let mut pipe = conn.start_pipeline().unwrap();
    for key in ["a", "b", "c"] {
        pipe.append(&cmd!("INCR", key)).unwrap();
    }
    let err = pipe.resolve().unwrap_err();
    assert!(matches!(err, RedwireError::Server(ref m) if m == "ERR wrong type"));
    drop(pipe);

    assert_eq!(socket.remaining_input(), 0);
    assert_eq!(conn.in_flight(), 0);
    assert!(!conn.is_broken());
}

#[test]
fn test_per_item_results() {
    let (mut conn, _socket) = connection(b":1\r\n-ERR wrong type\r\n:3\r\n");

    let mut pipe = conn.pipeline::<Result<i64>>().unwrap();
    for key in ["a", "b", "c"] {
        pipe.append_cmd(&cmd!("INCR", key)).unwrap();
    }
    let results = pipe.resolve().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(*results[0].as_ref().unwrap(), 1);
    assert!(matches!(results[1], Err(RedwireError::Server(_))));
    assert_eq!(*results[2].as_ref().unwrap(), 3);
}

#[test]
fn test_decode_error_leaves_connection_idle() {
    let (mut conn, _socket) = connection(b"+OK\r\n:2\r\n+PONG\r\n");

    let mut pipe = conn.pipeline::<i64>().unwrap();
    pipe.append_cmd(&cmd!("SET", "a", "1")).unwrap();
    pipe.append_cmd(&cmd!("INCR", "b")).unwrap();
    assert!(matches!(pipe.resolve(), Err(RedwireError::Decode(_))));
    drop(pipe);

    assert!(conn.is_idle());
    assert_eq!(
        conn.execute(&cmd!("PING")).unwrap(),
        ReplyValue::SimpleString("PONG".into())
    );
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_double_resolve_is_usage_error() {
    let (mut conn, socket) = connection(b":1\r\n");
    let mut pipe = conn.start_pipeline().unwrap();
    pipe.append(&cmd!("INCR", "a")).unwrap();
    pipe.resolve().unwrap();
    assert!(pipe.is_resolved());

    let calls = socket.io_calls();
    assert!(pipe.resolve().unwrap_err().is_usage());
    assert!(pipe.discard().unwrap_err().is_usage());
    assert!(pipe.append(&cmd!("INCR", "a")).unwrap_err().is_usage());
    assert_eq!(socket.io_calls(), calls);
}

#[test]
fn test_discard_drains_replies() {
    let (mut conn, socket) = connection(b":1\r\n:2\r\n+PONG\r\n");

    let mut pipe = conn.start_pipeline().unwrap();
    pipe.append(&cmd!("INCR", "a")).unwrap();
    pipe.append(&cmd!("INCR", "a")).unwrap();
    pipe.discard().unwrap();
    drop(pipe);

    assert!(conn.is_idle());
    assert_eq!(
        conn.execute(&cmd!("PING")).unwrap(),
        ReplyValue::SimpleString("PONG".into())
    );
    assert_eq!(socket.remaining_input(), 0);
}

#[test]
fn test_drop_drains_replies() {
    let (mut conn, socket) = connection(b":1\r\n:2\r\n+PONG\r\n");

    {
        let mut pipe = conn.start_pipeline().unwrap();
        pipe.append(&cmd!("INCR", "a")).unwrap();
        pipe.append(&cmd!("INCR", "a")).unwrap();
    }

    assert_eq!(conn.in_flight(), 0);
    assert_eq!(
        conn.execute(&cmd!("PING")).unwrap(),
        ReplyValue::SimpleString("PONG".into())
    );
    assert_eq!(socket.remaining_input(), 0);
}

#[test]
fn test_early_return_drains_replies() {
    fn fails_midway(conn: &mut Connection<MockSocket>) -> Result<Vec<ReplyValue>> {
        let mut pipe = conn.start_pipeline()?;
        pipe.append(&cmd!("INCR", "a"))?;
        // Fails before the pipeline is resolved.
        let _: i64 = decode(ReplyValue::SimpleString("not a number".into()))?;
        pipe.resolve()
    }

    let (mut conn, _socket) = connection(b":1\r\n+PONG\r\n");
    assert!(fails_midway(&mut conn).is_err());
    assert!(conn.is_idle());
    assert!(conn.execute(&cmd!("PING")).unwrap().as_bytes() == Some(&b"PONG"[..]));
}
