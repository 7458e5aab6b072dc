#![allow(private_bounds)]

use core::ops::Deref;
pub use ghost_cell::{GhostBorrow, GhostCell, GhostToken};
pub use glam::Vec3;
use paste::paste;
use std::fmt::{self, Debug, Display, Formatter};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use thiserror::Error;
pub use typed_arena::Arena;

macro_rules! try_check {
    ($this:ident, $mesh:ident) => {
        match $this.check($mesh) {
            Ok(x) => x,
            Err(e) => return Err(OperatorErr::new($this, e)),
        }
    };
}

#[macro_use]
mod entity;
use entity::*;

pub mod cycle;
pub use cycle::{Cycle, CycleError, CycleIterator, EntityIterator, Link, Siblings, CYCLE_LIMIT};

mod flags;
pub use flags::*;

mod custom_data;
pub use custom_data::*;

mod mesh;
pub use mesh::*;

mod disk;
pub use disk::*;

mod radial;
pub use radial::*;

mod sfme;
pub use sfme::*;

mod semv;
pub use semv::*;

pub mod bevel;

mod obj_export;
pub use obj_export::*;

#[cfg(feature = "obj_import")]
mod obj_import;

#[cfg(feature = "obj_import")]
pub use obj_import::*;


pub trait ReflAsRef<T> {
    fn as_ref(&self) -> &T;
}

impl<T> ReflAsRef<T> for T {
    fn as_ref(&self) -> &T {
        self
    }
}

pub trait ReflAsMut<T>: ReflAsRef<T> {
    fn as_mut(&mut self) -> &mut T;
}

impl<T> ReflAsMut<T> for T {
    fn as_mut(&mut self) -> &mut T {
        self
    }
}

struct DisplayFn<F: Fn(&mut Formatter) -> fmt::Result>(F);
impl<F: Fn(&mut Formatter) -> fmt::Result> Display for DisplayFn<F> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.0(f)
    }
}
impl<F: Fn(&mut Formatter) -> fmt::Result> Debug for DisplayFn<F> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.0(f)
    }
}

#[macro_export]
macro_rules! ptr_t {
	($T:ty) => {
		Ptr<'brand, 'arena, $T>
	}
}

#[macro_export]
macro_rules! ptr {
	($T:ident) => {
		Ptr<'brand, 'arena, $T<'brand, 'arena>>
	};
}

#[macro_export]
macro_rules! own_t {
	($T:ty) => {
		Own<'brand, 'arena, $T>
	}
}

#[macro_export]
macro_rules! own {
	($T:ident) => {
		Own<'brand, 'arena, $T<'brand, 'arena>>
	};
}

#[macro_export]
macro_rules! lens_t {
	($T:ty) => {
		Lens<'tok, 'brand, 'arena, $T>
	}
}

#[macro_export]
macro_rules! lens {
	($T:ident) => {
		Lens<'tok, 'brand, 'arena, $T<'brand, 'arena>>
	};
}

fn short_debug_(ty: &'static str, id: Option<usize>, f: &mut Formatter) -> fmt::Result {
    match id {
        Some(id) => f.debug_tuple(ty).field(&id).finish(),
        None => f.debug_tuple(ty).field(&"dead").finish(),
    }
}

fn short_debug_fn<'tok, 'brand, 'arena, T: Entity<'brand, 'arena>>(
    x: Option<lens_t!(T)>,
) -> impl Debug {
    let id = x.and_then(|x| x.maybe_id());
    DisplayFn(move |f| short_debug_(T::type_name(), id, f))
}

fn or_err<T>(cond: bool, err: T) -> Result<(), T> {
    if cond {
        Ok(())
    } else {
        Err(err)
    }
}

/// A copyable handle to an element living in the mesh arena.
///
/// Two handles are equal iff they refer to the same arena slot.
pub struct Ptr<'brand, 'arena, T>(pub &'arena GhostCell<'brand, T>);

impl<'brand, 'arena, T> Clone for ptr_t!(T) {
    fn clone(&self) -> Self {
        *self
    }
}
impl<'brand, 'arena, T> Copy for ptr_t!(T) {}

impl<'brand, 'arena, T> PartialEq for ptr_t!(T) {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}
impl<'brand, 'arena, T> Eq for ptr_t!(T) {}

impl<'brand, 'arena, T> ptr_t!(T) {
    pub fn borrow<'tok, 'out>(self, token: &'tok impl ReflAsRef<GhostToken<'brand>>) -> &'out T
    where
        'arena: 'out,
        'tok: 'out,
    {
        self.0.borrow(token.as_ref())
    }

    pub fn borrow_mut<'tok, 'out>(
        self,
        token: &'tok mut impl ReflAsMut<GhostToken<'brand>>,
    ) -> &'out mut T
    where
        'arena: 'out,
        'tok: 'out,
    {
        self.0.borrow_mut(token.as_mut())
    }

    pub fn lens<'tok>(self, token: &'tok impl ReflAsRef<GhostToken<'brand>>) -> lens_t!(T) {
        Lens::new(self, token)
    }
}

#[allow(unused)]
impl<'brand, 'arena, T: Entity<'brand, 'arena>> ptr_t!(T) {
    fn clear(self, token: &mut impl ReflAsMut<GhostToken<'brand>>) {
        self.borrow_mut(token).clear()
    }

    pub fn id(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> usize {
        self.borrow(token).id()
    }
    pub fn maybe_id(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> Option<usize> {
        self.borrow(token).maybe_id()
    }
    pub fn alive(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> bool {
        self.borrow(token).alive()
    }

    pub fn next(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> Self {
        self.borrow(token).next()
    }
    pub fn maybe_next(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> Option<Self> {
        self.borrow(token).maybe_next()
    }
    fn set_next(self, x: Self, token: &mut impl ReflAsMut<GhostToken<'brand>>) {
        self.borrow_mut(token).set_next(x)
    }
    fn set_next_opt(self, x: Option<Self>, token: &mut impl ReflAsMut<GhostToken<'brand>>) {
        self.borrow_mut(token).set_next_opt(x)
    }

    pub fn prev(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> Self {
        self.borrow(token).prev()
    }
    pub fn maybe_prev(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> Option<Self> {
        self.borrow(token).maybe_prev()
    }
    fn set_prev(self, x: Self, token: &mut impl ReflAsMut<GhostToken<'brand>>) {
        self.borrow_mut(token).set_prev(x)
    }
    fn set_prev_opt(self, x: Option<Self>, token: &mut impl ReflAsMut<GhostToken<'brand>>) {
        self.borrow_mut(token).set_prev_opt(x)
    }
}

pub struct Own<'brand, 'arena, T>(ptr_t!(T));

impl<'brand, 'arena, T> Own<'brand, 'arena, T> {
    // avoid this
    pub fn unsafe_make_owned(this: ptr_t!(T)) -> Self {
        Self(this)
    }
}

impl<'brand, 'arena, T> Deref for own_t!(T) {
    type Target = ptr_t!(T);

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub struct Lens<'tok, 'brand, 'arena, T> {
    pub item: ptr_t!(T),
    pub token: &'tok GhostToken<'brand>,
}

impl<'tok, 'brand, 'arena, T> Clone for lens_t!(T) {
    fn clone(&self) -> Self {
        *self
    }
}
impl<'tok, 'brand, 'arena, T> Copy for lens_t!(T) {}

impl<'tok, 'brand, 'arena, T> PartialEq for lens_t!(T) {
    fn eq(&self, other: &Self) -> bool {
        self.item == other.item
    }
}
impl<'tok, 'brand, 'arena, T> Eq for lens_t!(T) {}

impl<'tok, 'brand, 'arena, T: Hash> Hash for lens_t!(T) {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.item.borrow(self.token).hash(state);
    }
}

impl<'tok, 'brand, 'arena, T> ReflAsRef<GhostToken<'brand>> for lens_t!(T) {
    fn as_ref(&self) -> &GhostToken<'brand> {
        self.token
    }
}

impl<'tok, 'brand, 'arena, T> From<lens_t!(T)> for ptr_t!(T) {
    fn from(x: lens_t!(T)) -> Self {
        x.item
    }
}

impl<'tok, 'brand, 'arena, T> lens_t!(T) {
    pub fn new(item: ptr_t!(T), token: &'tok impl ReflAsRef<GhostToken<'brand>>) -> Self {
        Self {
            item,
            token: token.as_ref(),
        }
    }
}

#[allow(unused)]
impl<'tok, 'brand, 'arena, T: Entity<'brand, 'arena>> lens_t!(T) {
    pub fn id(self) -> usize {
        self.item.id(&self)
    }
    pub fn maybe_id(self) -> Option<usize> {
        self.item.maybe_id(&self)
    }
    pub fn alive(self) -> bool {
        self.item.alive(&self)
    }

    pub fn next(self) -> Self {
        self.item.next(&self).lens(self.token)
    }
    pub fn maybe_next(self) -> Option<Self> {
        self.item.maybe_next(&self).map(|x| x.lens(self.token))
    }

    pub fn prev(self) -> Self {
        self.item.prev(&self).lens(self.token)
    }
    pub fn maybe_prev(self) -> Option<Self> {
        self.item.maybe_prev(&self).map(|x| x.lens(self.token))
    }
}

// The sibling links of vertices, edges and faces thread the mesh's element
// lists; the sibling links of a loop are its face's loop cycle.

entity!(vertex: Vertex,
    co: Vec3 = Vec3::ZERO,
    no: Vec3 = Vec3::ZERO,
    flags: ElemFlags = ElemFlags::empty(),
    data: Option<Block> = None;
    pub edge: Edge
);

// disk[0] belongs to v1's disk cycle, disk[1] to v2's
entity!(edge: Edge,
    disk: [Link<ptr!(Edge)>; 2] = [Link::default(); 2],
    crease: f32 = 0.0,
    bweight: f32 = 0.0,
    flags: ElemFlags = ElemFlags::empty(),
    data: Option<Block> = None;
    pub v1: Vertex,
    pub v2: Vertex,
    pub loop_: Loop
);

entity!(loop_: Loop,
    radial: Link<ptr!(Loop)> = Link::default(),
    data: Option<Block> = None;
    pub vert: Vertex,
    pub edge: Edge,
    pub face: Face
);

entity!(face: Face,
    len: usize = 0,
    mat_nr: u16 = 0,
    no: Vec3 = Vec3::ZERO,
    flags: ElemFlags = ElemFlags::empty(),
    data: Option<Block> = None;
    pub loops[loop_: loop_ back]: Loop
);

struct Allocator<'brand, 'arena, T: Entity<'brand, 'arena>> {
    next_id: usize,
    arena: &'arena Arena<T>,
    freelist: Vec<own_t!(T)>,
}

impl<'brand, 'arena, T: Entity<'brand, 'arena>> Allocator<'brand, 'arena, T> {
    fn new(arena: &'arena Arena<T>) -> Self {
        Self {
            next_id: 0,
            arena,
            freelist: Vec::new(),
        }
    }

    fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn alloc(&mut self, x: T, token: &mut impl ReflAsMut<GhostToken<'brand>>) -> own_t!(T) {
        if let Some(ptr) = self.freelist.pop() {
            *ptr.borrow_mut(token) = x;
            ptr
        } else {
            Own::unsafe_make_owned(Ptr(GhostCell::from_mut(self.arena.alloc(x))))
        }
    }

    fn free(&mut self, token: &mut impl ReflAsMut<GhostToken<'brand>>, ptr: own_t!(T)) {
        debug_assert!(ptr.alive(token), "double free");
        ptr.clear(token);
        self.freelist.push(ptr);
    }
}

/// A rejected operator together with the reason it was rejected.
///
/// The mesh is untouched when this is returned.
pub struct OperatorErr<T, E> {
    pub op: T,
    pub err: E,
}

impl<T, E> OperatorErr<T, E> {
    pub fn new(op: T, err: E) -> Self {
        Self { op, err }
    }
}

impl<T, E: std::error::Error> std::error::Error for OperatorErr<T, E> {}
impl<T, E: Debug> Debug for OperatorErr<T, E> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.err.fmt(f)
    }
}
impl<T, E: Display> Display for OperatorErr<T, E> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.err.fmt(f)
    }
}

/// An Euler operator.
///
/// `check` validates every precondition without touching the mesh; `apply`
/// runs `check` first, so a rejected operator never mutates a cycle.
pub trait Operator<'brand, 'arena>: Sized {
    type Inverse: Operator<'brand, 'arena>;
    type Error: std::error::Error;
    type Check;

    fn check(&self, mesh: &Mesh<'brand, 'arena>) -> Result<Self::Check, Self::Error>;

    fn apply(
        self,
        mesh: &mut Mesh<'brand, 'arena>,
    ) -> Result<Self::Inverse, OperatorErr<Self, Self::Error>>;
}

pub struct MeshArena<'brand, 'arena> {
    pub vertex: Arena<Vertex<'brand, 'arena>>,
    pub edge: Arena<Edge<'brand, 'arena>>,
    pub loop_: Arena<Loop<'brand, 'arena>>,
    pub face: Arena<Face<'brand, 'arena>>,
}

impl<'brand, 'arena> Default for MeshArena<'brand, 'arena> {
    fn default() -> Self {
        Self {
            vertex: Default::default(),
            edge: Default::default(),
            loop_: Default::default(),
            face: Default::default(),
        }
    }
}

pub struct Mesh<'brand, 'arena> {
    pub token: GhostToken<'brand>,
    vertex: Allocator<'brand, 'arena, Vertex<'brand, 'arena>>,
    edge: Allocator<'brand, 'arena, Edge<'brand, 'arena>>,
    loop_: Allocator<'brand, 'arena, Loop<'brand, 'arena>>,
    face: Allocator<'brand, 'arena, Face<'brand, 'arena>>,
    verts: Option<ptr!(Vertex)>,
    edges: Option<ptr!(Edge)>,
    faces: Option<ptr!(Face)>,
    totvert: usize,
    totedge: usize,
    totloop: usize,
    totface: usize,
    custom: Box<dyn CustomData>,
}

impl<'brand, 'arena> ReflAsRef<GhostToken<'brand>> for Mesh<'brand, 'arena> {
    fn as_ref(&self) -> &GhostToken<'brand> {
        &self.token
    }
}

impl<'brand, 'arena> ReflAsMut<GhostToken<'brand>> for Mesh<'brand, 'arena> {
    fn as_mut(&mut self) -> &mut GhostToken<'brand> {
        &mut self.token
    }
}

impl<'brand, 'arena> Mesh<'brand, 'arena> {
    pub fn from_token(token: GhostToken<'brand>, ar: &'arena MeshArena<'brand, 'arena>) -> Self {
        Self::from_token_with(token, ar, Box::new(NoCustomData))
    }

    pub fn from_token_with(
        token: GhostToken<'brand>,
        ar: &'arena MeshArena<'brand, 'arena>,
        custom: Box<dyn CustomData>,
    ) -> Self {
        Self {
            token,
            vertex: Allocator::new(&ar.vertex),
            edge: Allocator::new(&ar.edge),
            loop_: Allocator::new(&ar.loop_),
            face: Allocator::new(&ar.face),
            verts: None,
            edges: None,
            faces: None,
            totvert: 0,
            totedge: 0,
            totloop: 0,
            totface: 0,
            custom,
        }
    }

    /// Runs `fun` on a fresh, empty mesh without custom data.
    pub fn new<R, F>(fun: F) -> R
    where
        for<'new_brand, 'new_arena> F: FnOnce(Mesh<'new_brand, 'new_arena>) -> R,
    {
        Self::with_custom_data(Box::new(NoCustomData), fun)
    }

    /// Runs `fun` on a fresh, empty mesh whose attribute blocks are managed by
    /// `custom`.
    pub fn with_custom_data<R, F>(custom: Box<dyn CustomData>, fun: F) -> R
    where
        for<'new_brand, 'new_arena> F: FnOnce(Mesh<'new_brand, 'new_arena>) -> R,
    {
        GhostToken::new(|token| {
            let arena = MeshArena::default();
            let mesh = Mesh::from_token_with(token, &arena, custom);

            fun(mesh)
        })
    }

    fn follow(&mut self, prev: ptr!(Loop), next: ptr!(Loop)) {
        next.set_prev(prev, self);
        prev.set_next(next, self);
    }

    /// Split `face` by a new edge between `v1` and `v2`.
    ///
    /// See [`Sfme`] for details.
    pub fn split_face(
        &mut self,
        face: ptr!(Face),
        v1: ptr!(Vertex),
        v2: ptr!(Vertex),
    ) -> Result<Jfke<'brand, 'arena>, OperatorErr<Sfme<'brand, 'arena>, SfmeError>> {
        Sfme::new(face, v1, v2).apply(self)
    }

    /// Merge two faces across `edge`, removing the edge.
    ///
    /// See [`Jfke`] for details.
    pub fn join_faces(
        &mut self,
        face_a: ptr!(Face),
        face_b: ptr!(Face),
        edge: ptr!(Edge),
    ) -> Result<Sfme<'brand, 'arena>, OperatorErr<Jfke<'brand, 'arena>, JfkeError>> {
        Jfke::new(face_a, face_b, edge).apply(self)
    }

    /// Insert a new vertex on `edge`, next to `vertex`.
    ///
    /// See [`Semv`] for details.
    pub fn split_edge(
        &mut self,
        vertex: ptr!(Vertex),
        edge: ptr!(Edge),
    ) -> Result<Jekv<'brand, 'arena>, OperatorErr<Semv<'brand, 'arena>, SemvError>> {
        Semv::new(vertex, edge).apply(self)
    }

    /// Remove the two-valent `vertex` together with `edge`.
    ///
    /// See [`Jekv`] for details.
    pub fn join_edge_kill_vert(
        &mut self,
        edge: ptr!(Edge),
        vertex: ptr!(Vertex),
    ) -> Result<Semv<'brand, 'arena>, OperatorErr<Jekv<'brand, 'arena>, JekvError>> {
        Jekv::new(edge, vertex).apply(self)
    }
}
