//! MULTI/EXEC resolution
//!
//! The server answers a transaction with one acknowledgement per queued
//! command (`+OK` for MULTI, then `+QUEUED` or an error), followed by a
//! single array from EXEC carrying the real results.

use bytes::Bytes;

use crate::error::{RedwireError, Result};
use crate::network::Socket;
use crate::protocol::{ReplyValue, EXEC};

use super::queue::CommandQueue;
use super::Resolver;

pub(super) fn collect<'a, T, S: Socket>(
    queue: &mut CommandQueue<'a, S>,
    resolvers: Vec<Resolver<'a, T>>,
) -> Result<Vec<T>> {
    let n = resolvers.len();
    queue.append(Bytes::from_static(EXEC));

    // MULTI plus every queued command
    queue.discard(n + 1)?;

    let results = match queue.get_reply()? {
        ReplyValue::Array(results) => results,
        ReplyValue::Nil => {
            return Err(RedwireError::Server(
                "transaction aborted: a watched key was modified".to_string(),
            ))
        }
        ReplyValue::Error(message) => return Err(RedwireError::Server(message)),
        other => {
            return Err(queue.desync(format!(
                "EXEC returned {} instead of an array",
                other.kind()
            )))
        }
    };

    if results.len() != n {
        return Err(queue.desync(format!(
            "transaction desync: expected {} results, got {}",
            n,
            results.len()
        )));
    }

    resolvers
        .into_iter()
        .zip(results)
        .map(|(resolve, reply)| resolve(reply))
        .collect()
}
