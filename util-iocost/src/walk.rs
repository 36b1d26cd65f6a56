//! Depth-first traversal of the accounting hierarchy.

use crate::{QueueId, SnapshotProvider};

/// Accounting node found during a [`walk`], with the path of its member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedNode<N> {
    /// Slash-separated names of the member and its ancestors, without the root.
    /// The root itself is `/`.
    pub path: String,
    pub node: N,
}

/// Walks the hierarchy below `root` and returns the accounting nodes of `queue`, in pre-order.
///
/// Children are visited in the order given by the provider.
/// A member is left out of the result, but its children are still visited, when:
/// - it is dying and `include_dying` is false,
/// - it has no accounting node for `queue`,
/// - its liveness or its node cannot be read.
///
/// A member whose name cannot be read is skipped with its whole subtree, since the
/// paths of its descendants cannot be built.
pub fn walk<P: SnapshotProvider + ?Sized>(
    provider: &P,
    root: &P::Member,
    queue: QueueId,
    include_dying: bool,
) -> Vec<WalkedNode<P::Node>> {
    let mut res = Vec::new();
    // (member, path of the parent)
    let mut stack = vec![(root.clone(), String::new())];

    while let Some((member, parent_path)) = stack.pop() {
        let name = match provider.member_name(&member) {
            Ok(name) => name,
            Err(e) => {
                log::debug!("skipping {member:?} and its children: {e}");
                continue;
            }
        };
        let path = if parent_path.is_empty() {
            name
        } else {
            format!("{parent_path}/{name}")
        };

        let visible = include_dying
            || provider.is_online(&member).unwrap_or_else(|e| {
                log::debug!("skipping {member:?}: {e}");
                false
            });
        if visible {
            match provider.lookup_node(&member, queue) {
                Ok(Some(node)) => {
                    let path = if path.is_empty() { String::from("/") } else { path.clone() };
                    res.push(WalkedNode { path, node });
                }
                Ok(None) => (),
                Err(e) => log::debug!("skipping {member:?}: {e}"),
            }
        }

        match provider.children(&member) {
            Ok(children) => {
                // reversed, to pop the first child first
                for child in children.into_iter().rev() {
                    stack.push((child, path.clone()));
                }
            }
            Err(e) => log::debug!("cannot list the children of {member:?}: {e}"),
        }
    }
    res
}
