use crate::*;
use bitflags::bitflags;

bitflags! {
    /// Per-element state bits.
    ///
    /// `TEMP1`/`TEMP2` are free for callers; nothing in this crate reads or
    /// clears them, so do not expect them to be reset between operations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ElemFlags: u8 {
        const SELECT = 1 << 0;
        const HIDDEN = 1 << 1;
        const SEAM = 1 << 2;
        const SHARP = 1 << 3;
        const TEMP1 = 1 << 4;
        const TEMP2 = 1 << 5;
    }
}

macro_rules! flag_accessors {
    ($($T:ident),*) => { $(
        impl<'brand, 'arena> ptr!($T) {
            pub fn flags(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> ElemFlags {
                self.borrow(token).flags
            }

            pub fn set_flags(self, flags: ElemFlags, token: &mut impl ReflAsMut<GhostToken<'brand>>) {
                self.borrow_mut(token).flags = flags;
            }

            pub fn enable(self, flags: ElemFlags, token: &mut impl ReflAsMut<GhostToken<'brand>>) {
                self.borrow_mut(token).flags.insert(flags);
            }

            pub fn disable(self, flags: ElemFlags, token: &mut impl ReflAsMut<GhostToken<'brand>>) {
                self.borrow_mut(token).flags.remove(flags);
            }

            pub fn is_selected(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> bool {
                self.flags(token).contains(ElemFlags::SELECT)
            }
        }
    )* };
}

flag_accessors!(Vertex, Edge, Face);
