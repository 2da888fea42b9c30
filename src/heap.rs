//! Reference-counted object storage.
//!
//! Every object lives in a slot of the [`Heap`] together with its count. The
//! ownership convention used throughout the crate is:
//!
//! * a function returning an `ObjRef` as a value hands one credit to its caller;
//! * arguments are borrowed, except for the list builders which consume the
//!   credits of the items they are given;
//! * constructors take their own credit on every child through
//!   [`Heap::fresh_assign`], so the caller keeps whatever credit it had.
//!
//! Counting has no cycle detection: a closure reachable from its own captured
//! environment is never reclaimed.

use crate::types::{Field, Frame, Int, ObjRef, Object, Pair, PrimitiveFn, Procedure, Sentinel, TypeMismatch};

struct Slot {
    generation: u32,
    count: u32,
    object: Option<Object>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    pub allocations: usize,
    pub frees: usize,
}

impl HeapStats {
    pub fn live(&self) -> usize {
        self.allocations - self.frees
    }
}

pub struct Heap {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    stats: HeapStats,
    nil: ObjRef,
    t: ObjRef,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    /// Creates a heap holding only the Nil and True sentinels. The heap keeps
    /// one credit on each for its whole lifetime.
    pub fn new() -> Self {
        let placeholder = ObjRef {
            index: 0,
            generation: 0,
        };
        let mut heap = Heap {
            slots: Vec::with_capacity(1024),
            free_list: Vec::new(),
            stats: HeapStats::default(),
            nil: placeholder,
            t: placeholder,
        };
        heap.nil = heap.alloc(Object::Special(Sentinel::Nil));
        heap.t = heap.alloc(Object::Special(Sentinel::True));
        heap
    }

    /// Stores `object` with a count of one; that credit belongs to the caller.
    pub fn alloc(&mut self, object: Object) -> ObjRef {
        self.stats.allocations += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.count = 1;
            log::trace!("alloc {} in reused slot {}", object.kind(), index);
            slot.object = Some(object);
            return ObjRef {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        log::trace!("alloc {} in new slot {}", object.kind(), index);
        self.slots.push(Slot {
            generation: 0,
            count: 1,
            object: Some(object),
        });
        ObjRef {
            index,
            generation: 0,
        }
    }

    fn slot(&self, r: ObjRef) -> &Slot {
        let slot = &self.slots[r.index as usize];
        debug_assert_eq!(slot.generation, r.generation, "stale reference {:?}", r);
        slot
    }

    fn slot_mut(&mut self, r: ObjRef) -> &mut Slot {
        let slot = &mut self.slots[r.index as usize];
        debug_assert_eq!(slot.generation, r.generation, "stale reference {:?}", r);
        slot
    }

    pub fn get(&self, r: ObjRef) -> &Object {
        match &self.slot(r).object {
            Some(object) => object,
            None => panic!("use of reclaimed object {:?}", r),
        }
    }

    pub fn count(&self, r: ObjRef) -> u32 {
        self.slot(r).count
    }

    pub fn stats(&self) -> HeapStats {
        self.stats
    }

    pub fn retain(&mut self, r: ObjRef) -> ObjRef {
        self.slot_mut(r).count += 1;
        r
    }

    /// Drops one credit. An object whose count reaches zero is reclaimed at
    /// once and each of its children loses the credit it held.
    pub fn release(&mut self, r: ObjRef) {
        let mut pending = vec![r];
        while let Some(r) = pending.pop() {
            let slot = self.slot_mut(r);
            debug_assert!(slot.count >= 1, "release of dead object {:?}", r);
            slot.count -= 1;
            if slot.count > 0 {
                continue;
            }
            let object = slot.object.take();
            slot.generation = slot.generation.wrapping_add(1);
            self.free_list.push(r.index);
            self.stats.frees += 1;
            if let Some(object) = object {
                log::trace!("free {} in slot {}", object.kind(), r.index);
                object.for_each_child(|child| pending.push(child));
            }
        }
    }

    /// Takes a credit on `value` for a slot of a container that is being built
    /// right now and therefore has no previous occupant.
    pub fn fresh_assign(&mut self, value: ObjRef) -> ObjRef {
        self.retain(value)
    }

    /// Overwrites a live slot of `owner`, releasing its previous occupant.
    pub fn reassign(&mut self, owner: ObjRef, field: Field, value: ObjRef) -> Result<(), TypeMismatch> {
        // value may be the current occupant, so it is retained first.
        self.retain(value);
        let replaced = match self.slot_mut(owner).object.as_mut() {
            Some(object) => object
                .field_mut(field)
                .map(|slot| std::mem::replace(slot, value)),
            None => panic!("use of reclaimed object {:?}", owner),
        };
        match replaced {
            Ok(occupant) => {
                self.release(occupant);
                Ok(())
            }
            Err(e) => {
                self.release(value);
                Err(e)
            }
        }
    }

    pub fn nil(&self) -> ObjRef {
        self.nil
    }

    pub fn t(&self) -> ObjRef {
        self.t
    }

    pub fn owned_nil(&mut self) -> ObjRef {
        let nil = self.nil;
        self.retain(nil)
    }

    pub fn boolean(&mut self, b: bool) -> ObjRef {
        let r = if b { self.t } else { self.nil };
        self.retain(r)
    }

    pub fn integer(&mut self, value: Int) -> ObjRef {
        self.alloc(Object::Integer(value))
    }

    pub(crate) fn symbol(&mut self, name: &str) -> ObjRef {
        self.alloc(Object::Symbol(name.into()))
    }

    pub fn primitive(&mut self, func: &'static PrimitiveFn) -> ObjRef {
        self.alloc(Object::Primitive(func))
    }

    pub fn cons(&mut self, head: ObjRef, tail: ObjRef) -> ObjRef {
        let head = self.fresh_assign(head);
        let tail = self.fresh_assign(tail);
        self.alloc(Object::Pair(Pair { head, tail }))
    }

    /// Returns `((key . value) . rest)`.
    pub fn acons(&mut self, key: ObjRef, value: ObjRef, rest: ObjRef) -> ObjRef {
        let binding = self.cons(key, value);
        let cell = self.cons(binding, rest);
        self.release(binding);
        cell
    }

    pub fn procedure(&mut self, is_macro: bool, params: ObjRef, body: ObjRef, env: ObjRef) -> ObjRef {
        let procedure = Procedure {
            params: self.fresh_assign(params),
            body: self.fresh_assign(body),
            env: self.fresh_assign(env),
        };
        match is_macro {
            true => self.alloc(Object::Macro(procedure)),
            false => self.alloc(Object::Closure(procedure)),
        }
    }

    pub fn environment(&mut self, bindings: ObjRef, parent: ObjRef) -> ObjRef {
        let bindings = self.fresh_assign(bindings);
        let parent = self.fresh_assign(parent);
        self.alloc(Object::Environment(Frame { bindings, parent }))
    }

    /// Builds `(items... . tail)`, consuming the credits of every item and of `tail`.
    pub fn list_with_tail(&mut self, items: Vec<ObjRef>, tail: ObjRef) -> ObjRef {
        let mut list = tail;
        for item in items.into_iter().rev() {
            let cell = self.cons(item, list);
            self.release(item);
            self.release(list);
            list = cell;
        }
        list
    }

    /// Builds a proper list, consuming the credits of every item.
    pub fn list(&mut self, items: Vec<ObjRef>) -> ObjRef {
        let nil = self.owned_nil();
        self.list_with_tail(items, nil)
    }

    pub fn is_nil(&self, r: ObjRef) -> bool {
        r == self.nil
    }

    pub fn is_pair(&self, r: ObjRef) -> bool {
        matches!(self.get(r), Object::Pair(_))
    }

    pub fn is_list(&self, r: ObjRef) -> bool {
        self.is_nil(r) || self.is_pair(r)
    }

    pub fn as_pair(&self, r: ObjRef) -> Result<Pair, TypeMismatch> {
        match self.get(r) {
            Object::Pair(pair) => Ok(*pair),
            _ => Err(TypeMismatch::NotAPair),
        }
    }

    pub fn head(&self, r: ObjRef) -> Result<ObjRef, TypeMismatch> {
        self.as_pair(r).map(|pair| pair.head)
    }

    pub fn tail(&self, r: ObjRef) -> Result<ObjRef, TypeMismatch> {
        self.as_pair(r).map(|pair| pair.tail)
    }

    pub fn as_int(&self, r: ObjRef) -> Result<Int, TypeMismatch> {
        match self.get(r) {
            Object::Integer(value) => Ok(*value),
            _ => Err(TypeMismatch::NotAnInt),
        }
    }

    pub fn symbol_name(&self, r: ObjRef) -> Result<&str, TypeMismatch> {
        match self.get(r) {
            Object::Symbol(name) => Ok(name),
            _ => Err(TypeMismatch::NotASymbol),
        }
    }

    pub fn as_frame(&self, r: ObjRef) -> Result<Frame, TypeMismatch> {
        match self.get(r) {
            Object::Environment(frame) => Ok(*frame),
            _ => Err(TypeMismatch::NotAnEnvironment),
        }
    }

    /// Splits a possibly improper list into borrowed elements and its final tail.
    pub fn list_parts(&self, list: ObjRef) -> (Vec<ObjRef>, ObjRef) {
        let mut items = Vec::new();
        let mut current = list;
        while let Object::Pair(Pair { head, tail }) = self.get(current) {
            items.push(*head);
            current = *tail;
        }
        (items, current)
    }

    pub fn list_to_vec(&self, list: ObjRef) -> Result<Vec<ObjRef>, TypeMismatch> {
        match self.list_parts(list) {
            (items, tail) if self.is_nil(tail) => Ok(items),
            _ => Err(TypeMismatch::NotAList),
        }
    }

    pub fn list_length(&self, list: ObjRef) -> Result<usize, TypeMismatch> {
        let mut len = 0;
        let mut current = list;
        loop {
            if self.is_nil(current) {
                return Ok(len);
            }
            current = self.tail(current).map_err(|_| TypeMismatch::NotAList)?;
            len += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_allocated_once() {
        let heap = Heap::new();
        assert_eq!(heap.stats().live(), 2);
        assert_ne!(heap.nil(), heap.t());
        assert!(heap.is_nil(heap.nil()));
        assert!(!heap.is_nil(heap.t()));
    }

    #[test]
    fn release_reclaims_children_recursively() {
        let mut heap = Heap::new();
        let before = heap.stats().live();
        let one = heap.integer(1);
        let two = heap.integer(2);
        let list = heap.list(vec![one, two]);
        assert_eq!(heap.stats().live(), before + 4);
        assert_eq!(heap.count(list), 1);
        assert_eq!(heap.count(one), 1);

        heap.release(list);
        assert_eq!(heap.stats().live(), before);
    }

    #[test]
    fn shared_child_survives_first_owner() {
        let mut heap = Heap::new();
        let nil = heap.nil();
        let shared = heap.integer(7);
        let a = heap.cons(shared, nil);
        let b = heap.cons(shared, nil);
        heap.release(shared);
        assert_eq!(heap.count(shared), 2);

        heap.release(a);
        assert_eq!(heap.count(shared), 1);
        assert_eq!(heap.as_int(shared), Ok(7));

        heap.release(b);
        assert_eq!(heap.stats().live(), 2);
    }

    #[test]
    fn fresh_assign_takes_a_credit() {
        let mut heap = Heap::new();
        let x = heap.integer(3);
        let stored = heap.fresh_assign(x);
        assert_eq!(stored, x);
        assert_eq!(heap.count(x), 2);
    }

    #[test]
    fn reassign_releases_previous_occupant() {
        let mut heap = Heap::new();
        let nil = heap.nil();
        let old = heap.integer(10);
        let new = heap.integer(11);
        let cell = heap.cons(old, nil);
        heap.release(old);
        let live = heap.stats().live();

        heap.reassign(cell, Field::Head, new).unwrap();
        assert_eq!(heap.stats().live(), live - 1);
        assert_eq!(heap.count(new), 2);
        assert_eq!(heap.head(cell), Ok(new));
    }

    #[test]
    fn reassign_to_current_occupant_keeps_it_alive() {
        let mut heap = Heap::new();
        let nil = heap.nil();
        let x = heap.integer(5);
        let cell = heap.cons(x, nil);
        heap.release(x);
        heap.reassign(cell, Field::Head, x).unwrap();
        assert_eq!(heap.count(x), 1);
        assert_eq!(heap.as_int(x), Ok(5));
    }

    #[test]
    fn reassign_rejects_wrong_field() {
        let mut heap = Heap::new();
        let x = heap.integer(5);
        let y = heap.integer(6);
        assert_eq!(heap.reassign(x, Field::Head, y), Err(TypeMismatch::NotAPair));
        assert_eq!(heap.count(y), 1);
    }

    #[test]
    fn freed_slots_are_reused_with_new_generation() {
        let mut heap = Heap::new();
        let a = heap.integer(1);
        heap.release(a);
        let b = heap.integer(2);
        assert_eq!(a.index, b.index);
        assert_ne!(a.generation, b.generation);
    }

    #[test]
    fn improper_list_parts() {
        let mut heap = Heap::new();
        let one = heap.integer(1);
        let two = heap.integer(2);
        let dotted = heap.list_with_tail(vec![one], two);
        let (items, tail) = heap.list_parts(dotted);
        assert_eq!(items, vec![one]);
        assert_eq!(tail, two);
        assert_eq!(heap.list_length(dotted), Err(TypeMismatch::NotAList));
        assert_eq!(heap.list_to_vec(dotted), Err(TypeMismatch::NotAList));
    }

    #[test]
    fn long_list_release_does_not_recurse() {
        let mut heap = Heap::new();
        let items = (0..100_000).map(|i| heap.integer(i)).collect();
        let list = heap.list(items);
        heap.release(list);
        assert_eq!(heap.stats().live(), 2);
    }
}
