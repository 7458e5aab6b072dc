use crate::*;
use std::any::Any;

/// Which element kind an attribute block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElemKind {
    Vertex,
    Edge,
    Loop,
    Face,
}

impl ElemKind {
    pub const ALL: [ElemKind; 4] = [Self::Vertex, Self::Edge, Self::Loop, Self::Face];

    fn index(self) -> usize {
        match self {
            Self::Vertex => 0,
            Self::Edge => 1,
            Self::Loop => 2,
            Self::Face => 3,
        }
    }
}

/// Opaque handle to an attribute block. The kernel only stores and hands
/// these back to the [`CustomData`] provider that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block(pub usize);

/// Storage for per-element attributes (UVs, colors, ...) that the kernel
/// carries along without interpreting.
///
/// Every element the kernel creates gets either a default block or a copy of
/// an example element's block; every element it destroys gives its block
/// back through `free`.
pub trait CustomData: Any {
    fn alloc_default(&mut self, kind: ElemKind) -> Option<Block>;
    fn copy_from(&mut self, kind: ElemKind, example: Block) -> Option<Block>;
    fn free(&mut self, kind: ElemKind, block: Block);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Provider for meshes without attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCustomData;

impl CustomData for NoCustomData {
    fn alloc_default(&mut self, _kind: ElemKind) -> Option<Block> {
        None
    }

    fn copy_from(&mut self, _kind: ElemKind, _example: Block) -> Option<Block> {
        None
    }

    fn free(&mut self, _kind: ElemKind, _block: Block) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct Slots<T> {
    slots: Vec<Option<T>>,
    freelist: Vec<usize>,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            freelist: Vec::new(),
        }
    }
}

impl<T> Slots<T> {
    fn insert(&mut self, x: T) -> Block {
        if let Some(i) = self.freelist.pop() {
            self.slots[i] = Some(x);
            Block(i)
        } else {
            self.slots.push(Some(x));
            Block(self.slots.len() - 1)
        }
    }

    fn remove(&mut self, block: Block) -> Option<T> {
        let x = self.slots.get_mut(block.0)?.take()?;
        self.freelist.push(block.0);
        Some(x)
    }
}

/// A typed block store: one value of `T` per element, kept in a slot vector
/// per element kind.
pub struct BlockPool<T> {
    kinds: [Slots<T>; 4],
}

impl<T> Default for BlockPool<T> {
    fn default() -> Self {
        Self {
            kinds: Default::default(),
        }
    }
}

impl<T> BlockPool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ElemKind, block: Block) -> Option<&T> {
        self.kinds[kind.index()].slots.get(block.0)?.as_ref()
    }

    pub fn get_mut(&mut self, kind: ElemKind, block: Block) -> Option<&mut T> {
        self.kinds[kind.index()].slots.get_mut(block.0)?.as_mut()
    }

    /// Number of blocks of `kind` currently allocated.
    pub fn live(&self, kind: ElemKind) -> usize {
        let slots = &self.kinds[kind.index()];
        slots.slots.len() - slots.freelist.len()
    }
}

impl<T: Clone + Default + 'static> CustomData for BlockPool<T> {
    fn alloc_default(&mut self, kind: ElemKind) -> Option<Block> {
        Some(self.kinds[kind.index()].insert(T::default()))
    }

    fn copy_from(&mut self, kind: ElemKind, example: Block) -> Option<Block> {
        let x = self.get(kind, example).cloned().unwrap_or_default();
        Some(self.kinds[kind.index()].insert(x))
    }

    fn free(&mut self, kind: ElemKind, block: Block) {
        self.kinds[kind.index()].remove(block);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<'brand, 'arena> Mesh<'brand, 'arena> {
    /// The attribute provider, if it is a `P`.
    pub fn custom_data<P: CustomData>(&self) -> Option<&P> {
        self.custom.as_any().downcast_ref()
    }

    pub fn custom_data_mut<P: CustomData>(&mut self) -> Option<&mut P> {
        self.custom.as_any_mut().downcast_mut()
    }

    pub(crate) fn alloc_block(&mut self, kind: ElemKind, example: Option<Block>) -> Option<Block> {
        match example {
            Some(example) => self.custom.copy_from(kind, example),
            None => self.custom.alloc_default(kind),
        }
    }

    pub(crate) fn free_block(&mut self, kind: ElemKind, block: Option<Block>) {
        if let Some(block) = block {
            self.custom.free(kind, block);
        }
    }
}

macro_rules! data_accessors {
    ($($T:ident),*) => { $(
        impl<'brand, 'arena> ptr!($T) {
            /// Attribute block of this element.
            pub fn data(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> Option<Block> {
                self.borrow(token).data
            }

            pub(crate) fn set_data(self, data: Option<Block>, token: &mut impl ReflAsMut<GhostToken<'brand>>) {
                self.borrow_mut(token).data = data;
            }
        }
    )* };
}

data_accessors!(Vertex, Edge, Loop, Face);
