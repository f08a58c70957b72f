//! Node handles and traversal sequences.

use std::collections::VecDeque;
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::tree::{Link, Node, NodePtr};

/// A shared handle to a node of an [`AvlTree`](crate::AvlTree).
///
/// The handle borrows the tree, so the tree cannot be modified while a handle
/// is alive. Content seen through a handle is therefore never stale.
pub struct NodeRef<'a, K, V> {
    node_ptr: NodePtr<K, V>,
    _marker: PhantomData<&'a Node<K, V>>,
}

impl<'a, K, V> NodeRef<'a, K, V> {
    pub(crate) fn new(node_ptr: NodePtr<K, V>) -> Self {
        Self {
            node_ptr,
            _marker: PhantomData,
        }
    }

    fn node(&self) -> &'a Node<K, V> {
        unsafe { &*self.node_ptr.as_ptr() }
    }

    /// The key stored in this node.
    pub fn key(&self) -> &'a K {
        &self.node().key
    }

    /// The value stored in this node.
    pub fn value(&self) -> &'a V {
        &self.node().value
    }

    /// Height of the subtree rooted here. A leaf has height 1.
    pub fn height(&self) -> usize {
        self.node().height
    }

    /// Height of the left subtree minus height of the right subtree.
    pub fn balance_factor(&self) -> isize {
        let height_of = |link: Link<K, V>| link.map_or(0, |ptr| unsafe { ptr.as_ref().height });
        height_of(self.node().left) as isize - height_of(self.node().right) as isize
    }

    pub fn parent(&self) -> Option<NodeRef<'a, K, V>> {
        self.node().parent.map(NodeRef::new)
    }

    pub fn left(&self) -> Option<NodeRef<'a, K, V>> {
        self.node().left.map(NodeRef::new)
    }

    pub fn right(&self) -> Option<NodeRef<'a, K, V>> {
        self.node().right.map(NodeRef::new)
    }

    /// Returns true if both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.node_ptr == other.node_ptr
    }
}

impl<K, V> Clone for NodeRef<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for NodeRef<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for NodeRef<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("key", self.key())
            .field("value", self.value())
            .field("height", &self.height())
            .finish()
    }
}

/// Nodes in ascending key order: left subtree, node, right subtree.
///
/// Walks the parent links, so no stack proportional to the tree height is kept.
/// A clone continues from the current position; call
/// [`AvlTree::iter_inorder`](crate::AvlTree::iter_inorder) again to start over.
pub struct InOrder<'a, K, V> {
    next: Link<K, V>,
    remaining: usize,
    _marker: PhantomData<&'a Node<K, V>>,
}

impl<'a, K, V> InOrder<'a, K, V> {
    pub(crate) fn new(root: Link<K, V>, len: usize) -> Self {
        let mut next = root;
        if let Some(mut node_ptr) = root {
            while let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
                node_ptr = left_ptr;
            }
            next = Some(node_ptr);
        }
        Self {
            next,
            remaining: len,
            _marker: PhantomData,
        }
    }

    fn successor(node_ptr: NodePtr<K, V>) -> Link<K, V> {
        unsafe {
            if let Some(mut succ_ptr) = node_ptr.as_ref().right {
                while let Some(left_ptr) = succ_ptr.as_ref().left {
                    succ_ptr = left_ptr;
                }
                return Some(succ_ptr);
            }
            // Climb until we leave a left subtree
            let mut child_ptr = node_ptr;
            while let Some(parent_ptr) = child_ptr.as_ref().parent {
                if parent_ptr.as_ref().left == Some(child_ptr) {
                    return Some(parent_ptr);
                }
                child_ptr = parent_ptr;
            }
            None
        }
    }
}

impl<'a, K, V> Iterator for InOrder<'a, K, V> {
    type Item = NodeRef<'a, K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.next?;
        self.next = Self::successor(node_ptr);
        self.remaining -= 1;
        Some(NodeRef::new(node_ptr))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for InOrder<'_, K, V> {}

impl<K, V> FusedIterator for InOrder<'_, K, V> {}

impl<K, V> Clone for InOrder<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            next: self.next,
            remaining: self.remaining,
            _marker: PhantomData,
        }
    }
}

/// Nodes breadth first: a FIFO frontier seeded with the root, children
/// enqueued left then right.
pub struct LevelOrder<'a, K, V> {
    queue: VecDeque<NodePtr<K, V>>,
    remaining: usize,
    _marker: PhantomData<&'a Node<K, V>>,
}

impl<'a, K, V> LevelOrder<'a, K, V> {
    pub(crate) fn new(root: Link<K, V>, len: usize) -> Self {
        let mut queue = VecDeque::new();
        queue.extend(root);
        Self {
            queue,
            remaining: len,
            _marker: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for LevelOrder<'a, K, V> {
    type Item = NodeRef<'a, K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.queue.pop_front()?;
        unsafe {
            self.queue.extend(node_ptr.as_ref().left);
            self.queue.extend(node_ptr.as_ref().right);
        }
        self.remaining -= 1;
        Some(NodeRef::new(node_ptr))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for LevelOrder<'_, K, V> {}

impl<K, V> FusedIterator for LevelOrder<'_, K, V> {}

impl<K, V> Clone for LevelOrder<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            remaining: self.remaining,
            _marker: PhantomData,
        }
    }
}

/// An iterator over the entries of a tree, sorted by key.
pub struct Iter<'a, K, V> {
    nodes: InOrder<'a, K, V>,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(nodes: InOrder<'a, K, V>) -> Self {
        Self { nodes }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.nodes.next().map(|node| (node.key(), node.value()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.nodes.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
        }
    }
}
