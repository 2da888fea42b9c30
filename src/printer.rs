use crate::heap::Heap;
use crate::types::{ObjRef, Object, Sentinel};
use itertools::Itertools;

pub fn pr_str(heap: &Heap, object: ObjRef) -> String {
    match heap.get(object) {
        Object::Integer(value) => value.to_string(),
        Object::Pair(_) => {
            let (items, tail) = heap.list_parts(object);
            let elements = items.into_iter().map(|item| pr_str(heap, item)).join(" ");
            match heap.is_nil(tail) {
                true => format!("({})", elements),
                false => format!("({} . {})", elements, pr_str(heap, tail)),
            }
        }
        Object::Symbol(name) => name.clone(),
        Object::Primitive(_) => String::from("<primitive>"),
        Object::Closure(_) => String::from("<function>"),
        Object::Macro(_) => String::from("<macro>"),
        Object::Special(Sentinel::Nil) => String::from("()"),
        Object::Special(Sentinel::True) => String::from("t"),
        Object::Environment(_) => String::from("<environment>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CORE;

    #[test]
    fn atoms_and_sentinels() {
        let mut heap = Heap::new();
        let n = heap.integer(-15);
        assert_eq!(pr_str(&heap, n), "-15");
        assert_eq!(pr_str(&heap, heap.nil()), "()");
        assert_eq!(pr_str(&heap, heap.t()), "t");
    }

    #[test]
    fn lists() {
        let mut heap = Heap::new();
        let items = (1..=3).map(|i| heap.integer(i)).collect();
        let proper = heap.list(items);
        assert_eq!(pr_str(&heap, proper), "(1 2 3)");

        let a = heap.integer(1);
        let b = heap.integer(2);
        let dotted = heap.list_with_tail(vec![a], b);
        assert_eq!(pr_str(&heap, dotted), "(1 . 2)");

        let nil = heap.owned_nil();
        let nested = heap.list(vec![proper, nil, dotted]);
        assert_eq!(pr_str(&heap, nested), "((1 2 3) () (1 . 2))");
    }

    #[test]
    fn procedures_are_opaque() {
        let mut heap = Heap::new();
        let nil = heap.nil();
        let prim = heap.primitive(CORE["list"]);
        let closure = heap.procedure(false, nil, nil, nil);
        let mac = heap.procedure(true, nil, nil, nil);
        assert_eq!(pr_str(&heap, prim), "<primitive>");
        assert_eq!(pr_str(&heap, closure), "<function>");
        assert_eq!(pr_str(&heap, mac), "<macro>");
    }
}
