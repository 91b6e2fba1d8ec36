use std::sync::Arc;

use imbl_sized_chunks::Chunk;

use crate::{
    config::{BITS, MASK, WIDTH},
    metrics::increment,
    token::{owns, Token},
};

pub(crate) type Children<T> = Chunk<Arc<Node<T>>, WIDTH>;

/// A node of the vector trie.
///
/// Leaves hold 32 elements (fewer only when the leaf is a vector's tail).
/// Branches hold up to 32 children, packed to the left: a vector trie is
/// always filled in index order, so the children of a branch are exactly the
/// slots `0..children.len()`.
///
/// Both variants remember the transient session that allocated them, if any.
#[derive(Clone, Debug)]
pub(crate) enum Node<T> {
    Leaf {
        stamp: Option<Token>,
        elems: Chunk<T, WIDTH>,
    },
    Branch {
        stamp: Option<Token>,
        children: Children<T>,
    },
}

/// Which child of a node at `level` holds `index`?
fn child_index(index: usize, level: u32) -> usize {
    (index >> level) & MASK
}

impl<T> Node<T> {
    pub(crate) fn leaf(stamp: Option<&Token>, elems: Chunk<T, WIDTH>) -> Self {
        Node::Leaf {
            stamp: stamp.cloned(),
            elems,
        }
    }

    pub(crate) fn branch(stamp: Option<&Token>, children: Children<T>) -> Self {
        Node::Branch {
            stamp: stamp.cloned(),
            children,
        }
    }

    fn stamp(&self) -> Option<&Token> {
        match self {
            Node::Leaf { stamp, .. } | Node::Branch { stamp, .. } => stamp.as_ref(),
        }
    }

    pub(crate) fn elems(&self) -> &Chunk<T, WIDTH> {
        let Node::Leaf { elems, .. } = self else {
            unreachable!("expected a leaf");
        };
        elems
    }

    pub(crate) fn elems_mut(&mut self) -> &mut Chunk<T, WIDTH> {
        let Node::Leaf { elems, .. } = self else {
            unreachable!("expected a leaf");
        };
        elems
    }

    pub(crate) fn children(&self) -> &Children<T> {
        let Node::Branch { children, .. } = self else {
            unreachable!("expected a branch");
        };
        children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Children<T> {
        let Node::Branch { children, .. } = self else {
            unreachable!("expected a branch");
        };
        children
    }

    /// Wraps `node` in single-child branches until it sits `level` bits above
    /// the leaves.
    pub(crate) fn new_path(edit: Option<&Token>, level: u32, node: Arc<Self>) -> Arc<Self> {
        let mut node = node;
        let mut level = level;
        while level > 0 {
            node = Arc::new(Node::branch(edit, Chunk::unit(node)));
            level -= BITS;
        }
        node
    }
}

impl<T: Clone> Node<T> {
    /// Gives write access to `node`, which the session `edit` may modify in
    /// place only if it stamped the node and nobody else holds it. Otherwise
    /// `node` is replaced by a copy stamped with `edit`.
    pub(crate) fn editable<'a>(node: &'a mut Arc<Self>, edit: Option<&Token>) -> &'a mut Self {
        if owns(edit, node.stamp()) && Arc::get_mut(node).is_some() {
            increment!("vector.node_edited_in_place");
        } else {
            increment!("vector.node_copied");
            let mut copy = Node::clone(&**node);
            match &mut copy {
                Node::Leaf { stamp, .. } | Node::Branch { stamp, .. } => *stamp = edit.cloned(),
            }
            *node = Arc::new(copy);
        }
        Arc::get_mut(node).expect("node was just made unique")
    }

    /// Appends the full leaf `leaf` below `node`, which sits at `level` in a
    /// trie currently holding `count` elements (tail included).
    pub(crate) fn push_tail(
        node: &mut Arc<Self>,
        edit: Option<&Token>,
        level: u32,
        count: usize,
        leaf: Arc<Self>,
    ) {
        let sub = child_index(count - 1, level);
        let children = Node::editable(node, edit).children_mut();
        if level == BITS {
            debug_assert_eq!(sub, children.len());
            children.push_back(leaf);
        } else if sub < children.len() {
            Node::push_tail(&mut children[sub], edit, level - BITS, count, leaf);
        } else {
            children.push_back(Node::new_path(edit, level - BITS, leaf));
        }
    }

    /// Detaches the last leaf below `node`, for a trie currently holding
    /// `count` elements.
    ///
    /// Returns true if `node` has no children left, in which case the caller
    /// should drop it.
    pub(crate) fn pop_tail(
        node: &mut Arc<Self>,
        edit: Option<&Token>,
        level: u32,
        count: usize,
    ) -> bool {
        let sub = child_index(count - 2, level);
        let children = Node::editable(node, edit).children_mut();
        debug_assert_eq!(sub + 1, children.len());
        if level > BITS {
            if Node::pop_tail(&mut children[sub], edit, level - BITS, count) {
                children.pop_back();
            }
        } else {
            children.pop_back();
        }
        children.is_empty()
    }

    /// Replaces the element at `index` below `node`, copying the path from
    /// `node` down to the leaf as needed.
    pub(crate) fn assoc(
        node: &mut Arc<Self>,
        edit: Option<&Token>,
        level: u32,
        index: usize,
        value: T,
    ) {
        let node = Node::editable(node, edit);
        if level == 0 {
            node.elems_mut()[index & MASK] = value;
        } else {
            let child = &mut node.children_mut()[child_index(index, level)];
            Node::assoc(child, edit, level - BITS, index, value);
        }
    }
}
