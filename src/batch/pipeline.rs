use crate::error::Result;
use crate::network::Socket;

use super::queue::CommandQueue;
use super::Resolver;

/// Read one reply per resolver, then decode them in order
pub(super) fn collect<'a, T, S: Socket>(
    queue: &mut CommandQueue<'a, S>,
    resolvers: Vec<Resolver<'a, T>>,
) -> Result<Vec<T>> {
    let mut replies = Vec::with_capacity(resolvers.len());
    for _ in 0..resolvers.len() {
        replies.push(queue.get_reply()?);
    }

    resolvers
        .into_iter()
        .zip(replies)
        .map(|(resolve, reply)| resolve(reply))
        .collect()
}
