use crate::{CharSet, Interner, Symbol};

#[test]
fn intern_deduplicates() {
    let mut interner = Interner::new();

    let a = interner.intern_str("foo");
    let b = interner.intern_str("foo");
    let c = interner.intern("bar".to_string());

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(interner.len(), 2);
}

#[test]
fn symbols_follow_insertion_order() {
    let mut interner = Interner::new();

    let z = interner.intern_str("z");
    let a = interner.intern_str("a");

    assert_eq!(z, Symbol::from_raw(0));
    assert_eq!(a, Symbol::from_raw(1));
    assert_eq!(interner.into_vec(), vec!["z".to_string(), "a".to_string()]);
}

#[test]
fn interns_any_hashable_table_entry() {
    let mut sets: Interner<CharSet> = Interner::new();

    let first = sets.intern(CharSet::from("ab"));
    let again = sets.intern(CharSet::from("ba"));

    assert_eq!(first, again);
    assert_eq!(sets.resolve(first), Some(&CharSet::from("ab")));
    assert_eq!(sets.resolve(Symbol::from_raw(7)), None);
}
