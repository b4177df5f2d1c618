//! Reference rewriting over resource graphs.
//!
//! A resource is either a typed model or a raw markup tree; both can embed
//! resource identifiers that must be repointed when a resource moves. The
//! two representations are walked by disjoint algorithms behind a single
//! entry point:
//!
//! - markup trees are traversed breadth-first and only `ResourceId`
//!   elements and attributes are touched;
//! - typed models declare their reference-bearing fields by implementing
//!   [`VisitReferences`], so the set of rewritable fields is a compile-time
//!   contract rather than a runtime scan.
//!
//! Shared nodes (`Rc<RefCell<_>>`) are entered at most once per pass, keyed
//! by cell identity, which keeps the walk finite on cyclic graphs.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use crate::markup::{MarkupDocument, MarkupElement, RESOURCE_ID_NODE};
use crate::model::TypedResource;

/// How a candidate reference is matched against the old path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Only a reference equal to the old path is rewritten.
    Exact,
    /// Any reference under the old folder prefix is rewritten; both paths
    /// are normalized to end with a trailing slash before matching.
    Folder,
}

/// A deserialized resource, ready for rewriting.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceGraphNode {
    Typed(TypedResource),
    Markup(MarkupDocument),
}

/// Implemented by every typed resource model.
///
/// An implementation calls back into the pass with exactly its
/// reference-bearing string fields and its child objects:
///
/// - `pass.resource_id(&mut self.resource_id)` for a reference field,
/// - `pass.descend(&mut child)` for an owned child (or per collection
///   element),
/// - `pass.descend_shared(&cell)` for an `Rc<RefCell<_>>` child that may be
///   aliased elsewhere in the graph.
pub trait VisitReferences {
    fn visit_references(&mut self, pass: &mut RewritePass);
}

/// One in-place rewrite over a resource graph.
///
/// Holds the normalized old/new prefixes, the match mode and the set of
/// shared-cell identities already entered. Create one per top-level rewrite
/// and discard it afterwards.
pub struct RewritePass {
    old_prefix: String,
    new_prefix: String,
    mode: UpdateMode,
    visited: HashSet<usize>,
    rewritten: usize,
}

impl RewritePass {
    pub fn new(old_prefix: &str, new_prefix: &str, mode: UpdateMode) -> Self {
        let (old_prefix, new_prefix) = match mode {
            UpdateMode::Folder => (
                ensure_trailing_slash(old_prefix),
                ensure_trailing_slash(new_prefix),
            ),
            UpdateMode::Exact => (old_prefix.to_string(), new_prefix.to_string()),
        };
        Self {
            old_prefix,
            new_prefix,
            mode,
            visited: HashSet::new(),
            rewritten: 0,
        }
    }

    /// Number of references rewritten so far.
    pub fn rewritten(&self) -> usize {
        self.rewritten
    }

    /// Apply the substitution rule to one reference field.
    pub fn resource_id(&mut self, value: &mut String) {
        if value.is_empty() {
            return;
        }
        if self.mode == UpdateMode::Folder && value.starts_with(&self.old_prefix) {
            let tail = value[self.old_prefix.len()..].to_string();
            *value = format!("{}{}", self.new_prefix, tail);
            self.rewritten += 1;
        } else if *value == self.old_prefix {
            *value = self.new_prefix.clone();
            self.rewritten += 1;
        }
    }

    /// Recurse into an exclusively-owned child.
    pub fn descend<T: VisitReferences + ?Sized>(&mut self, child: &mut T) {
        child.visit_references(self);
    }

    /// Recurse into a shared child, at most once per pass.
    ///
    /// A cell that is already mutably borrowed is being visited higher up
    /// the active traversal; it is skipped rather than treated as fatal.
    pub fn descend_shared<T: VisitReferences>(&mut self, cell: &Rc<RefCell<T>>) {
        let identity = Rc::as_ptr(cell) as usize;
        if !self.visited.insert(identity) {
            return;
        }
        match cell.try_borrow_mut() {
            Ok(mut node) => node.visit_references(self),
            Err(_) => {
                tracing::debug!("skipping shared node borrowed elsewhere in the traversal")
            }
        }
    }

    /// Breadth-first walk over a markup tree. Only `ResourceId` elements and
    /// attributes are altered; everything else is left untouched.
    fn walk_markup(&mut self, document: &mut MarkupDocument) {
        let mut queue: VecDeque<&mut MarkupElement> = VecDeque::new();
        queue.push_back(&mut document.root);

        while let Some(element) = queue.pop_front() {
            let MarkupElement {
                name,
                attributes,
                text,
                children,
            } = element;
            if *name == RESOURCE_ID_NODE {
                self.resource_id(text);
            }
            for (attribute, value) in attributes.iter_mut() {
                if *attribute == RESOURCE_ID_NODE {
                    self.resource_id(value);
                }
            }
            for child in children.iter_mut() {
                queue.push_back(child);
            }
        }
    }
}

/// Rewrite every reference in `root` from `old_prefix` to `new_prefix`,
/// in place. Returns the number of references rewritten.
///
/// The representation is dispatched exactly once here; a markup tree never
/// contains typed models and vice versa.
pub fn rewrite(
    root: &mut ResourceGraphNode,
    old_prefix: &str,
    new_prefix: &str,
    mode: UpdateMode,
) -> usize {
    let mut pass = RewritePass::new(old_prefix, new_prefix, mode);
    match root {
        ResourceGraphNode::Typed(resource) => resource.visit_references(&mut pass),
        ResourceGraphNode::Markup(document) => pass.walk_markup(document),
    }
    pass.rewritten
}

fn ensure_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
