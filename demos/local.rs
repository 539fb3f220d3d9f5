use std::{collections::HashSet, hash::Hash, sync::LazyLock};
use tierpool::{FastPool, PoolConfig};

// dedup an unsorted vec. this will only allocate memory on,
// - the first call on a given thread
// - deduping a vec bigger than any previously seen on that thread
fn unsorted_dedup_stable<T: Hash + Eq>(v: &mut Vec<T>) {
    static SETS: LazyLock<FastPool<HashSet<usize>>> =
        LazyLock::new(|| FastPool::new_default(PoolConfig::default()).unwrap());
    static RETAIN: LazyLock<FastPool<Vec<bool>>> =
        LazyLock::new(|| FastPool::new_default(PoolConfig::default()).unwrap());

    let mut seen = SETS.rent();
    let mut retain = RETAIN.rent();
    // unlike a reset-on-return pool, a rented container here may still hold
    // a previous call's entries and has to be cleared before reuse.
    seen.clear();
    retain.clear();
    for t in v.iter() {
        let addr = t as *const T as usize;
        retain.push(seen.insert(addr));
    }
    drop(seen); // cleared and returned to the pool via its Drop impl
    let mut i = 0;
    v.retain(|_| {
        let res = retain[i];
        i += 1;
        res
    })
    // retain is cleared (its contents drop) and returned to the pool here
}

fn main() {
    let mut v = vec!["one", "two", "one", "five", "three sir", "three", "four", "five"];
    println!("with dupes: {:?}", v);
    unsorted_dedup_stable(&mut v);
    println!("deduped: {:?}", v)
}
