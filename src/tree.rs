use std::cmp::{self, Ordering};
use std::fmt;
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use log::{debug, trace};

use crate::error::TreeError;
use crate::iter::{InOrder, Iter, LevelOrder, NodeRef};

/// An ordered, uniquely keyed collection stored in an AVL tree.
///
/// Every node owns its two children. The parent link of a node is a plain
/// back-pointer used for upward walks only and never frees anything.
pub struct AvlTree<K, V> {
    root: Link<K, V>,
    num_nodes: usize,
    _marker: PhantomData<Box<Node<K, V>>>,
}

pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) left: Link<K, V>,
    pub(crate) right: Link<K, V>,
    pub(crate) parent: Link<K, V>,
    pub(crate) height: usize,
}

pub(crate) type NodePtr<K, V> = NonNull<Node<K, V>>;
pub(crate) type Link<K, V> = Option<NodePtr<K, V>>;
type LinkPtr<K, V> = NonNull<Link<K, V>>;

enum Direction {
    FromParent,
    FromLeft,
    FromRight,
}

impl<K: Ord, V> AvlTree<K, V> {
    /// Creates an empty tree.
    /// No memory is allocated until the first item is inserted.
    pub fn new() -> Self {
        Self {
            root: None,
            num_nodes: 0,
            _marker: PhantomData,
        }
    }

    /// Inserts a key-value pair.
    ///
    /// Fails with [`TreeError::DuplicateKey`] if the key is already present,
    /// in which case the tree is left exactly as it was.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), TreeError> {
        let (parent, mut link_ptr) = self
            .find_insert_pos(&key)
            .ok_or(TreeError::DuplicateKey)?;
        unsafe {
            *link_ptr.as_mut() = Some(Node::create(parent, key, value));
        }
        self.num_nodes += 1;
        self.rebalance_once(parent);
        debug!("inserted node, tree holds {} nodes", self.num_nodes);
        Ok(())
    }

    /// Returns a handle to the node holding the key.
    ///
    /// Searching an empty tree yields [`TreeError::EmptyTree`],
    /// an absent key yields [`TreeError::NotFound`].
    pub fn search(&self, key: &K) -> Result<NodeRef<'_, K, V>, TreeError> {
        self.find(key).map(NodeRef::new)
    }

    /// Returns a reference to the value corresponding to the key.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.search(key).ok().map(|node| node.value())
    }

    /// Returns true if the tree contains the key.
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_ok()
    }

    /// Removes a key from the tree and returns the removed key-value pair.
    ///
    /// A node with two children is not unlinked itself. It takes over the key
    /// and value of its in-order successor, and the successor's node is
    /// unlinked instead. So the node that held `key` keeps its place in the
    /// tree but carries different content afterwards.
    pub fn remove(&mut self, key: &K) -> Result<(K, V), TreeError> {
        let mut node_ptr = self.find(key)?;
        debug_assert!(self.num_nodes >= 1);
        unsafe {
            if let (Some(_), Some(right_ptr)) = (node_ptr.as_ref().left, node_ptr.as_ref().right) {
                let mut successor_ptr = Self::min_node(right_ptr);
                mem::swap(&mut node_ptr.as_mut().key, &mut successor_ptr.as_mut().key);
                mem::swap(&mut node_ptr.as_mut().value, &mut successor_ptr.as_mut().value);
                trace!("two children, removing in-order successor node instead");
                node_ptr = successor_ptr;
            }

            // At most one child left at this point
            let parent = self.splice_out(node_ptr);
            self.rebalance(parent);
            self.num_nodes -= 1;
            debug!("removed node, tree holds {} nodes", self.num_nodes);
            Ok(Node::destroy(node_ptr))
        }
    }

    /// Inserts every pair in sequence order and returns the tree together with
    /// the keys that were rejected as duplicates.
    /// The first pair inserted for a key wins.
    pub fn bulk_load<I>(items: I) -> (Self, Vec<K>)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut tree = Self::new();
        let mut duplicates = Vec::new();
        for (key, value) in items {
            if let Some((parent, mut link_ptr)) = tree.find_insert_pos(&key) {
                unsafe {
                    *link_ptr.as_mut() = Some(Node::create(parent, key, value));
                }
                tree.num_nodes += 1;
                tree.rebalance_once(parent);
            } else {
                duplicates.push(key);
            }
        }
        debug!(
            "bulk load finished with {} nodes, {} duplicates skipped",
            tree.num_nodes,
            duplicates.len()
        );
        (tree, duplicates)
    }

    /// Asserts that the internal tree structure is consistent.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        unsafe {
            // Check root link
            if let Some(root_node_ptr) = self.root {
                assert!(root_node_ptr.as_ref().parent.is_none());
            }

            // Check tree nodes
            let mut num_nodes = 0;
            self.traverse(
                |node_ptr| {
                    let mut left_height = 0;
                    let mut right_height = 0;

                    // Check link for left child node
                    if let Some(left_ptr) = node_ptr.as_ref().left {
                        assert!(left_ptr.as_ref().parent == Some(node_ptr));
                        assert!(left_ptr.as_ref().key < node_ptr.as_ref().key);
                        left_height = left_ptr.as_ref().height;
                    }

                    // Check link for right child node
                    if let Some(right_ptr) = node_ptr.as_ref().right {
                        assert!(right_ptr.as_ref().parent == Some(node_ptr));
                        assert!(right_ptr.as_ref().key > node_ptr.as_ref().key);
                        right_height = right_ptr.as_ref().height;
                    }

                    // Check height
                    assert_eq!(
                        node_ptr.as_ref().height,
                        cmp::max(left_height, right_height) + 1
                    );

                    // Check AVL condition (nearly balance)
                    assert!(left_height <= right_height + 1);
                    assert!(right_height <= left_height + 1);

                    num_nodes += 1;
                },
                |_| {},
            );

            // Check number of nodes
            assert_eq!(num_nodes, self.num_nodes);

            // Check order across subtrees
            let mut prev: Option<&K> = None;
            for node in self.iter_inorder() {
                if let Some(prev_key) = prev {
                    assert!(prev_key < node.key());
                }
                prev = Some(node.key());
            }
        }
    }

    fn find(&self, key: &K) -> Result<NodePtr<K, V>, TreeError> {
        let mut current = self.root.ok_or(TreeError::EmptyTree)?;
        loop {
            let next = unsafe {
                match key.cmp(&current.as_ref().key) {
                    Ordering::Equal => return Ok(current),
                    Ordering::Less => current.as_ref().left,
                    Ordering::Greater => current.as_ref().right,
                }
            };
            current = next.ok_or(TreeError::NotFound)?;
        }
    }

    fn find_insert_pos(&mut self, key: &K) -> Option<(Link<K, V>, LinkPtr<K, V>)> {
        let mut parent: Link<K, V> = None;
        let mut link_ptr: LinkPtr<K, V> = unsafe { LinkPtr::new_unchecked(&mut self.root) };
        unsafe {
            while let Some(mut node_ptr) = *link_ptr.as_ref() {
                parent = Some(node_ptr);
                link_ptr = match key.cmp(&node_ptr.as_ref().key) {
                    Ordering::Equal => return None,
                    Ordering::Less => LinkPtr::new_unchecked(&mut node_ptr.as_mut().left),
                    Ordering::Greater => LinkPtr::new_unchecked(&mut node_ptr.as_mut().right),
                };
            }
        }
        Some((parent, link_ptr))
    }
}

impl<K, V> AvlTree<K, V> {
    /// Returns true if the tree contains no elements.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of elements in the tree.
    pub fn len(&self) -> usize {
        self.num_nodes
    }

    /// Returns the height of the tree.
    /// An empty tree has height 0, a single node has height 1.
    pub fn height(&self) -> usize {
        match self.root {
            None => 0,
            Some(root_ptr) => unsafe { root_ptr.as_ref().height },
        }
    }

    /// Returns a handle to the root node, if any.
    pub fn root(&self) -> Option<NodeRef<'_, K, V>> {
        self.root.map(NodeRef::new)
    }

    /// Clears the tree, deallocating all memory.
    pub fn clear(&mut self) {
        self.traverse(|_| {}, |node_ptr| unsafe {
            Node::destroy(node_ptr);
        });
        self.root = None;
        self.num_nodes = 0;
    }

    /// Gets a sequence over the nodes in ascending key order.
    pub fn iter_inorder(&self) -> InOrder<'_, K, V> {
        InOrder::new(self.root, self.num_nodes)
    }

    /// Gets a sequence over the nodes in level order,
    /// left to right within each level.
    pub fn iter_level_order(&self) -> LevelOrder<'_, K, V> {
        LevelOrder::new(self.root, self.num_nodes)
    }

    /// Gets an iterator over the entries of the tree, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.iter_inorder())
    }

    // Leftmost node of the subtree rooted at `node_ptr`.
    fn min_node(mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        while let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
            node_ptr = left_ptr;
        }
        node_ptr
    }

    // Replaces a node that has at most one child by that child.
    // Returns the former parent, where the rebalance walk has to start.
    unsafe fn splice_out(&mut self, node_ptr: NodePtr<K, V>) -> Link<K, V> {
        debug_assert!(node_ptr.as_ref().left.is_none() || node_ptr.as_ref().right.is_none());
        let child = node_ptr.as_ref().left.or(node_ptr.as_ref().right);
        let parent = node_ptr.as_ref().parent;
        if let Some(mut child_ptr) = child {
            child_ptr.as_mut().parent = parent;
        }
        match parent {
            None => self.root = child,
            Some(mut parent_ptr) => {
                if parent_ptr.as_ref().left == Some(node_ptr) {
                    parent_ptr.as_mut().left = child;
                } else {
                    parent_ptr.as_mut().right = child;
                }
            }
        }
        parent
    }

    fn left_height(node_ptr: NodePtr<K, V>) -> usize {
        unsafe {
            match node_ptr.as_ref().left {
                None => 0,
                Some(left_ptr) => left_ptr.as_ref().height,
            }
        }
    }

    fn right_height(node_ptr: NodePtr<K, V>) -> usize {
        unsafe {
            match node_ptr.as_ref().right {
                None => 0,
                Some(right_ptr) => right_ptr.as_ref().height,
            }
        }
    }

    fn adjust_height(mut node_ptr: NodePtr<K, V>) {
        let height = cmp::max(Self::left_height(node_ptr), Self::right_height(node_ptr)) + 1;
        unsafe {
            node_ptr.as_mut().height = height;
        }
    }

    //   parent            parent
    //     |                 |
    //     x                 y
    //    / \               / \
    //   a   y     =>      x   c
    //      / \           / \
    //     z   c         a   z
    fn rotate_left(&mut self, mut node_ptr: NodePtr<K, V>) {
        unsafe {
            if let Some(mut right_ptr) = node_ptr.as_ref().right {
                trace!("rotate left, pivot height {}", node_ptr.as_ref().height);
                node_ptr.as_mut().right = right_ptr.as_ref().left;
                if let Some(mut right_left_ptr) = right_ptr.as_ref().left {
                    right_left_ptr.as_mut().parent = Some(node_ptr);
                }

                right_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(right_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(right_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(right_ptr);
                        }
                    }
                }

                right_ptr.as_mut().left = Some(node_ptr);
                node_ptr.as_mut().parent = Some(right_ptr);

                Self::adjust_height(node_ptr);
                Self::adjust_height(right_ptr);
            }
        }
    }

    //      parent         parent
    //        |              |
    //        x              y
    //       / \            / \
    //      y   c   =>     a   x
    //     / \                / \
    //    a   z              z   c
    fn rotate_right(&mut self, mut node_ptr: NodePtr<K, V>) {
        unsafe {
            if let Some(mut left_ptr) = node_ptr.as_ref().left {
                trace!("rotate right, pivot height {}", node_ptr.as_ref().height);
                node_ptr.as_mut().left = left_ptr.as_ref().right;
                if let Some(mut left_right_ptr) = left_ptr.as_ref().right {
                    left_right_ptr.as_mut().parent = Some(node_ptr);
                }

                left_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(left_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(left_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(left_ptr);
                        }
                    }
                }

                left_ptr.as_mut().right = Some(node_ptr);
                node_ptr.as_mut().parent = Some(left_ptr);

                Self::adjust_height(node_ptr);
                Self::adjust_height(left_ptr);
            }
        }
    }

    /// Rebalances nodes starting from given position up to the root node.
    /// After a removal every level may need a rotation, so the walk never stops early.
    fn rebalance(&mut self, start_from: Link<K, V>) {
        let mut current = start_from;
        while let Some(node_ptr) = current {
            let parent = unsafe { node_ptr.as_ref().parent };
            self.rebalance_node(node_ptr);
            current = parent;
        }
    }

    /// Rebalances nodes starting from given position up to the root node.
    /// Stops after first rebalance operation.
    /// This is enough to restore balance after a single insert operation.
    fn rebalance_once(&mut self, start_from: Link<K, V>) {
        let mut current = start_from;
        while let Some(node_ptr) = current {
            let parent = unsafe { node_ptr.as_ref().parent };
            let did_rebalance = self.rebalance_node(node_ptr);
            if did_rebalance {
                break;
            }
            current = parent;
        }
    }

    /// Restores AVL condition (balance) at given node if necessary and adjusts height.
    /// Resulting balance will be +1, 0 or -1 height difference between left and right subtree.
    /// Initial balance must not exceed +2 or -2, which always holds after a single update.
    /// Returns whether rebalancing had been necessary.
    ///
    /// The choice between single and double rotation compares the heights of the
    /// heavy child's subtrees. A heavy child with equal subtree heights, which only
    /// happens after a removal, takes the single rotation.
    fn rebalance_node(&mut self, node_ptr: NodePtr<K, V>) -> bool {
        let left_height = Self::left_height(node_ptr);
        let right_height = Self::right_height(node_ptr);
        debug_assert!(left_height <= right_height + 2);
        debug_assert!(right_height <= left_height + 2);
        if left_height > right_height + 1 {
            // Rebalance right
            if let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
                if Self::right_height(left_ptr) > Self::left_height(left_ptr) {
                    trace!("left child is right heavy, double rotation");
                    self.rotate_left(left_ptr);
                }
            }
            self.rotate_right(node_ptr);
            true
        } else if right_height > left_height + 1 {
            // Rebalance left
            if let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
                if Self::left_height(right_ptr) > Self::right_height(right_ptr) {
                    trace!("right child is left heavy, double rotation");
                    self.rotate_right(right_ptr);
                }
            }
            self.rotate_left(node_ptr);
            true
        } else {
            Self::adjust_height(node_ptr);
            false
        }
    }

    fn traverse<Pre, Post>(&self, mut preorder: Pre, mut postorder: Post)
    where
        Pre: FnMut(NodePtr<K, V>),
        Post: FnMut(NodePtr<K, V>),
    {
        if let Some(mut node_ptr) = self.root {
            let mut dir = Direction::FromParent;
            loop {
                match dir {
                    Direction::FromParent => {
                        preorder(node_ptr);
                        if let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
                            node_ptr = left_ptr;
                        } else {
                            dir = Direction::FromLeft;
                        }
                    }
                    Direction::FromLeft => {
                        if let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
                            node_ptr = right_ptr;
                            dir = Direction::FromParent;
                        } else {
                            dir = Direction::FromRight;
                        }
                    }
                    Direction::FromRight => {
                        // Post order traversal is used for node deletion,
                        // so make sure not to use node pointer after postorder call.
                        if let Some(parent_ptr) = unsafe { node_ptr.as_ref().parent } {
                            if Some(node_ptr) == unsafe { parent_ptr.as_ref().left } {
                                dir = Direction::FromLeft;
                            } else {
                                dir = Direction::FromRight;
                            }
                            postorder(node_ptr);
                            node_ptr = parent_ptr;
                        } else {
                            postorder(node_ptr);
                            break;
                        }
                    }
                }
            }
        }
    }
}

impl<K, V> Drop for AvlTree<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K: Ord, V> Default for AvlTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone> Clone for AvlTree<K, V> {
    /// Copies the tree node by node, keeping its exact shape.
    fn clone(&self) -> Self {
        let mut cloned = Self {
            root: None,
            num_nodes: self.num_nodes,
            _marker: PhantomData,
        };
        if let Some(root_ptr) = self.root {
            let new_root_ptr = Node::copy_of(None, root_ptr);
            cloned.root = Some(new_root_ptr);
            let mut pending = vec![(root_ptr, new_root_ptr)];
            while let Some((src_ptr, mut dst_ptr)) = pending.pop() {
                unsafe {
                    if let Some(left_ptr) = src_ptr.as_ref().left {
                        let new_left_ptr = Node::copy_of(Some(dst_ptr), left_ptr);
                        dst_ptr.as_mut().left = Some(new_left_ptr);
                        pending.push((left_ptr, new_left_ptr));
                    }
                    if let Some(right_ptr) = src_ptr.as_ref().right {
                        let new_right_ptr = Node::copy_of(Some(dst_ptr), right_ptr);
                        dst_ptr.as_mut().right = Some(new_right_ptr);
                        pending.push((right_ptr, new_right_ptr));
                    }
                }
            }
        }
        cloned
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for AvlTree<K, V> {
    /// Builds a tree from pairs; later pairs with an already present key are dropped.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::bulk_load(iter).0
    }
}

impl<K: Ord, V> Extend<(K, V)> for AvlTree<K, V> {
    /// Inserts pairs in order; pairs with an already present key are dropped.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            let _ = self.insert(key, value);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a AvlTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

unsafe impl<K: Send, V: Send> Send for AvlTree<K, V> {}

unsafe impl<K: Sync, V: Sync> Sync for AvlTree<K, V> {}

impl<K, V> Node<K, V> {
    fn create(parent: Link<K, V>, key: K, value: V) -> NodePtr<K, V> {
        let boxed = Box::new(Node {
            key,
            value,
            parent,
            left: None,
            right: None,
            height: 1,
        });
        unsafe { NodePtr::new_unchecked(Box::into_raw(boxed)) }
    }

    fn copy_of(parent: Link<K, V>, src_ptr: NodePtr<K, V>) -> NodePtr<K, V>
    where
        K: Clone,
        V: Clone,
    {
        let src = unsafe { src_ptr.as_ref() };
        let mut node_ptr = Self::create(parent, src.key.clone(), src.value.clone());
        unsafe {
            node_ptr.as_mut().height = src.height;
        }
        node_ptr
    }

    unsafe fn destroy(node_ptr: NodePtr<K, V>) -> (K, V) {
        let boxed = Box::from_raw(node_ptr.as_ptr());
        (boxed.key, boxed.value)
    }
}
