//! Circular doubly linked lists threaded through mesh elements.
//!
//! Every adjacency structure of the kernel is one of these: the disk cycle of
//! edges around a vertex, the radial cycle of loops around an edge, the loop
//! cycle bounding a face and the mesh's own element lists. A [`Cycle`] names
//! where inside an element a particular cycle keeps its links; the functions
//! in this module do the rest.

use crate::*;

/// Walks longer than this are treated as a corrupted cycle.
pub const CYCLE_LIMIT: usize = 1 << 24;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CycleError {
    #[error("cycle does not return to its head within {0} steps")]
    Unterminated(usize),
    #[error("cycle node has a dangling link")]
    Dangling,
}

/// Forward and backward link of one node.
#[derive(Debug)]
pub struct Link<P> {
    pub next: Option<P>,
    pub prev: Option<P>,
}

impl<P: Copy> Clone for Link<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: Copy> Copy for Link<P> {}

impl<P> Default for Link<P> {
    fn default() -> Self {
        Self {
            next: None,
            prev: None,
        }
    }
}

/// Where a cycle over elements of type `T` stores its links.
pub trait Cycle<'brand, 'arena, T> {
    fn next(&self, node: ptr_t!(T), token: &impl ReflAsRef<GhostToken<'brand>>)
        -> Option<ptr_t!(T)>;
    fn prev(&self, node: ptr_t!(T), token: &impl ReflAsRef<GhostToken<'brand>>)
        -> Option<ptr_t!(T)>;
    fn set_next(
        &self,
        node: ptr_t!(T),
        x: Option<ptr_t!(T)>,
        token: &mut impl ReflAsMut<GhostToken<'brand>>,
    );
    fn set_prev(
        &self,
        node: ptr_t!(T),
        x: Option<ptr_t!(T)>,
        token: &mut impl ReflAsMut<GhostToken<'brand>>,
    );
}

/// The sibling links every entity carries.
#[derive(Debug, Clone, Copy, Default)]
pub struct Siblings;

impl<'brand, 'arena, T: Entity<'brand, 'arena>> Cycle<'brand, 'arena, T> for Siblings {
    fn next(
        &self,
        node: ptr_t!(T),
        token: &impl ReflAsRef<GhostToken<'brand>>,
    ) -> Option<ptr_t!(T)> {
        node.maybe_next(token)
    }

    fn prev(
        &self,
        node: ptr_t!(T),
        token: &impl ReflAsRef<GhostToken<'brand>>,
    ) -> Option<ptr_t!(T)> {
        node.maybe_prev(token)
    }

    fn set_next(
        &self,
        node: ptr_t!(T),
        x: Option<ptr_t!(T)>,
        token: &mut impl ReflAsMut<GhostToken<'brand>>,
    ) {
        node.set_next_opt(x, token)
    }

    fn set_prev(
        &self,
        node: ptr_t!(T),
        x: Option<ptr_t!(T)>,
        token: &mut impl ReflAsMut<GhostToken<'brand>>,
    ) {
        node.set_prev_opt(x, token)
    }
}

/// Insert `node` into the cycle starting at `head`, just before `head`.
///
/// An empty cycle (`head == None`) becomes the one-element cycle `node`.
/// Returns the head of the resulting cycle.
pub fn append<'brand, 'arena, T, C: Cycle<'brand, 'arena, T>>(
    kind: &C,
    head: Option<ptr_t!(T)>,
    node: ptr_t!(T),
    token: &mut impl ReflAsMut<GhostToken<'brand>>,
) -> ptr_t!(T) {
    let Some(head) = head else {
        kind.set_next(node, Some(node), token);
        kind.set_prev(node, Some(node), token);
        return node;
    };

    let tail = kind.prev(head, token).unwrap_or(head);

    kind.set_next(node, Some(head), token);
    kind.set_prev(node, Some(tail), token);
    kind.set_next(tail, Some(node), token);
    kind.set_prev(head, Some(node), token);

    head
}

/// Unlink `node` from its cycle.
///
/// Returns the node that followed it, or `None` if `node` was the only
/// member. Callers own the back-reference to the cycle (e.g. a vertex's first
/// edge) and must rebase or clear it themselves.
pub fn remove<'brand, 'arena, T, C: Cycle<'brand, 'arena, T>>(
    kind: &C,
    node: ptr_t!(T),
    token: &mut impl ReflAsMut<GhostToken<'brand>>,
) -> Option<ptr_t!(T)> {
    let next = kind.next(node, token);
    let prev = kind.prev(node, token);

    kind.set_next(node, None, token);
    kind.set_prev(node, None, token);

    let (Some(next), Some(prev)) = (next, prev) else {
        return None;
    };
    if next == node {
        return None;
    }

    kind.set_next(prev, Some(next), token);
    kind.set_prev(next, Some(prev), token);

    Some(next)
}

/// Put `new` into the cycle at the position of `old`, which leaves the cycle.
///
/// As with [`remove`], rebasing a back-reference to `old` is up to the caller.
pub fn replace<'brand, 'arena, T, C: Cycle<'brand, 'arena, T>>(
    kind: &C,
    old: ptr_t!(T),
    new: ptr_t!(T),
    token: &mut impl ReflAsMut<GhostToken<'brand>>,
) {
    let next = kind.next(old, token);
    let prev = kind.prev(old, token);

    kind.set_next(old, None, token);
    kind.set_prev(old, None, token);

    let (Some(next), Some(prev)) = (next, prev) else {
        return;
    };
    if next == old {
        kind.set_next(new, Some(new), token);
        kind.set_prev(new, Some(new), token);
        return;
    }

    kind.set_next(new, Some(next), token);
    kind.set_prev(new, Some(prev), token);
    kind.set_next(prev, Some(new), token);
    kind.set_prev(next, Some(new), token);
}

/// Number of nodes in the cycle starting at `head`.
pub fn length<'brand, 'arena, T, C: Cycle<'brand, 'arena, T>>(
    kind: &C,
    head: Option<ptr_t!(T)>,
    token: &impl ReflAsRef<GhostToken<'brand>>,
) -> Result<usize, CycleError> {
    let Some(head) = head else {
        return Ok(0);
    };

    let mut len = 0;
    let mut cur = head;
    loop {
        len += 1;
        if len > CYCLE_LIMIT {
            return Err(CycleError::Unterminated(CYCLE_LIMIT));
        }
        cur = kind.next(cur, token).ok_or(CycleError::Dangling)?;
        if cur == head {
            return Ok(len);
        }
    }
}

/// Whether walking `expected` steps forward, and `expected` steps backward,
/// both return to `head` for the first time on the last step.
pub fn validate<'brand, 'arena, T, C: Cycle<'brand, 'arena, T>>(
    kind: &C,
    expected: usize,
    head: Option<ptr_t!(T)>,
    token: &impl ReflAsRef<GhostToken<'brand>>,
) -> bool {
    let Some(head) = head else {
        return expected == 0;
    };
    if expected == 0 || expected > CYCLE_LIMIT {
        return false;
    }

    let walk = |step: &dyn Fn(ptr_t!(T)) -> Option<ptr_t!(T)>| {
        let mut cur = head;
        for i in 1..=expected {
            let Some(next) = step(cur) else {
                return false;
            };
            if (next == head) != (i == expected) {
                return false;
            }
            cur = next;
        }
        true
    };

    walk(&|x| kind.next(x, token)) && walk(&|x| kind.prev(x, token))
}

/// An iterator over the nodes of one cycle, yielding each node once.
///
/// Stops early instead of spinning if the cycle turns out longer than
/// [`CYCLE_LIMIT`].
pub struct CycleIterator<'tok, 'brand, 'arena, C, T> {
    kind: C,
    token: &'tok GhostToken<'brand>,
    range: Option<(ptr_t!(T), ptr_t!(T))>,
    steps: usize,
}

/// Iterator over sibling lists: the mesh's element lists and face loop cycles.
pub type EntityIterator<'tok, 'brand, 'arena, T> = CycleIterator<'tok, 'brand, 'arena, Siblings, T>;

impl<'tok, 'brand, 'arena, C: Clone, T> Clone for CycleIterator<'tok, 'brand, 'arena, C, T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            token: self.token,
            range: self.range,
            steps: self.steps,
        }
    }
}

impl<'tok, 'brand, 'arena, C, T> CycleIterator<'tok, 'brand, 'arena, C, T>
where
    C: Cycle<'brand, 'arena, T>,
{
    pub fn new(
        kind: C,
        start: Option<ptr_t!(T)>,
        token: &'tok impl ReflAsRef<GhostToken<'brand>>,
    ) -> Self {
        let token = token.as_ref();
        let range = start.map(|s| (s, kind.prev(s, token).unwrap_or(s)));
        Self {
            kind,
            token,
            range,
            steps: 0,
        }
    }

    fn step(&mut self) -> bool {
        self.steps += 1;
        if self.steps > CYCLE_LIMIT {
            self.range = None;
            return false;
        }
        true
    }
}

impl<'tok, 'brand, 'arena, C, T> Iterator for CycleIterator<'tok, 'brand, 'arena, C, T>
where
    C: Cycle<'brand, 'arena, T>,
{
    type Item = lens_t!(T);

    fn next(&mut self) -> Option<Self::Item> {
        let (first, last) = self.range?;
        if !self.step() {
            return None;
        }

        if first == last {
            self.range = None;
        } else {
            match self.kind.next(first, self.token) {
                Some(next) => self.range = Some((next, last)),
                None => self.range = None,
            }
        }

        Some(first.lens(self.token))
    }
}

impl<'tok, 'brand, 'arena, C, T> DoubleEndedIterator for CycleIterator<'tok, 'brand, 'arena, C, T>
where
    C: Cycle<'brand, 'arena, T>,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        let (first, last) = self.range?;
        if !self.step() {
            return None;
        }

        if first == last {
            self.range = None;
        } else {
            match self.kind.prev(last, self.token) {
                Some(prev) => self.range = Some((first, prev)),
                None => self.range = None,
            }
        }

        Some(last.lens(self.token))
    }
}
