use crate::cycle;
use crate::*;

// trait for a kind of topological element (i.e. Vertex, Edge, Loop, Face)
pub(crate) trait Entity<'brand, 'arena>: Eq + Sized {
    fn clear(&mut self);

    fn type_name() -> &'static str;

    fn maybe_id(&self) -> Option<usize>;
    fn id(&self) -> usize {
        self.maybe_id().expect("element is dead")
    }
    fn alive(&self) -> bool {
        self.maybe_id().is_some()
    }

    fn maybe_next(&self) -> Option<ptr_t!(Self)>;
    fn next(&self) -> ptr_t!(Self) {
        self.maybe_next().expect("element is not linked")
    }
    fn set_next(&mut self, x: ptr_t!(Self)) {
        self.set_next_opt(Some(x));
    }
    fn set_next_opt(&mut self, x: Option<ptr_t!(Self)>);

    fn maybe_prev(&self) -> Option<ptr_t!(Self)>;
    fn prev(&self) -> ptr_t!(Self) {
        self.maybe_prev().expect("element is not linked")
    }
    fn set_prev(&mut self, x: ptr_t!(Self)) {
        self.set_prev_opt(Some(x));
    }
    fn set_prev_opt(&mut self, x: Option<ptr_t!(Self)>);

    fn list_add(
        this: ptr_t!(Self),
        list: Option<ptr_t!(Self)>,
        token: &mut impl ReflAsMut<GhostToken<'brand>>,
    ) -> ptr_t!(Self) {
        cycle::append(&Siblings, list, this, token)
    }

    fn list_remove(
        this: ptr_t!(Self),
        token: &mut impl ReflAsMut<GhostToken<'brand>>,
    ) -> Option<ptr_t!(Self)> {
        cycle::remove(&Siblings, this, token)
    }
}

macro_rules! entity {
	($name:ident : $T:ident
		$(, $($custom_field:ident : $custom_ty:ty = $custom_expr:expr),* )?
		$(;
			$( $field_vis:vis $field:ident
				$([ $list_singular:ident : $list_name:ident $($list_back:ident)? ])?
			 : $field_ty:ident ),*
		)?
	) => { paste! {
		pub struct $T<'brand, 'arena> {
			id: Option<usize>,
			next: Option<ptr!($T)>,
			prev: Option<ptr!($T)>,
			$($($custom_field: $custom_ty,)*)?
			$($($field: Option<ptr!($field_ty)>,)*)?
		}

		impl<'brand, 'arena> $T<'brand, 'arena> {
			fn new(mesh: &mut Mesh<'brand, 'arena>) -> own_t!(Self) {
				let id = Some(mesh.$name.next_id());
				mesh.$name.alloc(Self {
					id,
					prev: None,
					next: None,
					$($($custom_field: $custom_expr,)*)?
					$($($field: None,)*)?
				}, &mut mesh.token)
			}
		}

		impl<'brand, 'arena> Entity<'brand, 'arena> for $T<'brand, 'arena> {
			fn clear(&mut self) {
				self.id = None;
				#[cfg(debug_assertions)]
				{
					self.prev = None;
					self.next = None;
					$($(self.$field = None;)*)?
				}
			}

			fn type_name() -> &'static str {
				stringify!($T)
			}

			fn maybe_id(&self) -> Option<usize> {
				self.id
			}

			fn maybe_next(&self) -> Option<ptr_t!(Self)> {
				self.next
			}

			fn set_next_opt(&mut self, x: Option<ptr_t!(Self)>) {
				self.next = x;
			}

			fn maybe_prev(&self) -> Option<ptr_t!(Self)> {
				self.prev
			}

			fn set_prev_opt(&mut self, x: Option<ptr_t!(Self)>) {
				self.prev = x;
			}
		}

		#[allow(unused)]
		impl<'brand, 'arena> ptr!($T) {
			$($(
				$field_vis fn $field(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> ptr!($field_ty) {
					self.[<maybe_ $field>](token).expect(concat!(stringify!($T), "::", stringify!($field), " is unset"))
				}

				$field_vis fn [<maybe_ $field>](self, token: &impl ReflAsRef<GhostToken<'brand>>) -> Option<ptr!($field_ty)> {
					self.borrow(token).$field
				}

				fn [<set_ $field>](self, x: ptr!($field_ty), token: &mut impl ReflAsMut<GhostToken<'brand>>) {
					self.[<set_opt_ $field>](Some(x), token);
				}

				fn [<set_opt_ $field>](self, x: Option<ptr!($field_ty)>, token: &mut impl ReflAsMut<GhostToken<'brand>>,) {
					self.borrow_mut(token).$field = x;
				}

				$(
					pub fn [<iter_ $field>]<'tok>(
						self,
						token: &'tok impl ReflAsRef<GhostToken<'brand>>,
					) -> EntityIterator<'tok, 'brand, 'arena, $field_ty<'brand, 'arena>>
					{
						CycleIterator::new(Siblings, self.[<maybe_ $field>](token), token)
					}

					fn [<add_ $list_singular>](
						self,
						x: ptr!($field_ty),
						token: &mut impl ReflAsMut<GhostToken<'brand>>,
					) {
						let list = Entity::list_add(x, self.[<maybe_ $field>](token), token);
						self.[<set_ $field>](list, token);

						$(
							let [<_ $list_back>] = ();
							x.[<set_ $name>](self, token);
						)?
					}
				)?
			)*)?
		}

		#[allow(unused)]
		impl<'tok, 'brand, 'arena> lens!($T) {
			$($(
				$field_vis fn $field(self) -> lens!($field_ty) {
					self.item.$field(&self).lens(self.token)
				}

				$field_vis fn [<maybe_ $field>](self) -> Option<lens!($field_ty)> {
					self.item.[<maybe_ $field>](&self).map(|x| x.lens(self.token))
				}

				$(
					pub fn [<iter_ $field>](self) -> EntityIterator<'tok, 'brand, 'arena, $field_ty<'brand, 'arena>> {
						let [<_ $list_singular>] = ();
						self.item.[<iter_ $field>](self.token)
					}
				)?

				fn [<debug_ $field>](self, f: &mut Formatter) -> fmt::Result {
					$({
						let [<_ $list_singular>] = ();
						if true {
							return f.debug_list().entries(self.[<iter_ $field>]().map(|x| short_debug_fn(Some(x)))).finish();
						}
					})?
					short_debug_fn(self.[<maybe_ $field>]()).fmt(f)
				}
			)*)?
		}

		impl<'tok, 'brand, 'arena> Debug for lens!($T) {
			fn fmt(&self, f: &mut Formatter) -> fmt::Result {
				f.debug_struct(stringify!($T))
					.field("id", &self.maybe_id())
					.field("prev", &short_debug_fn(self.maybe_prev()))
					.field("next", &short_debug_fn(self.maybe_next()))
					$($(
						.field(stringify!($field), &DisplayFn(|f| self.[<debug_ $field>](f)))
					)*)?
					.finish()
			}
		}

		#[allow(unused)]
		impl<'brand, 'arena> Own<'brand, 'arena, $T<'brand, 'arena>> {
			fn free(self, mesh: &mut Mesh<'brand, 'arena>) {
				mesh.$name.free(&mut mesh.token, self)
			}
		}

		impl<'brand, 'arena> Hash for $T<'brand, 'arena> {
			fn hash<H: Hasher>(&self, state: &mut H) {
				self.id.hash(state);
			}
		}

		impl<'brand, 'arena> PartialEq for $T<'brand, 'arena> {
			fn eq(&self, other: &Self) -> bool {
				self.id == other.id
			}
		}
		impl<'brand, 'arena> Eq for $T<'brand, 'arena> {}
	}};
}
