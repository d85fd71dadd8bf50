pub use std::collections::{BTreeMap, BTreeSet, btree_map};

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type HashSet<T> = rustc_hash::FxHashSet<T>;

pub use std::collections::hash_map;
