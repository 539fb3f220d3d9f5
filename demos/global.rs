use std::sync::{mpsc, LazyLock};
use std::thread;
use tierpool::{Lease, Pool, PoolConfig};

// a batch is a vec of pooled strings
type Batch = Vec<Lease<String>>;

// strings come from this pool, synthesized with String::new on a miss.
static STRINGS: LazyLock<Pool<String>> =
    LazyLock::new(|| Pool::new(PoolConfig::default(), String::new).unwrap());

// batches come from this pool, same deal.
static BATCHES: LazyLock<Pool<Batch>> =
    LazyLock::new(|| Pool::new(PoolConfig::default(), Vec::new).unwrap());

fn producer(tx: mpsc::Sender<Lease<Batch>>) {
    use std::fmt::Write;
    loop {
        // rent a batch, synthesizing a new one if the pool is empty.
        let mut batch = BATCHES.rent();
        batch.clear();
        for _ in 0..100 {
            let mut s = STRINGS.rent();
            s.clear();
            write!(s, "very important data").unwrap();
            batch.push(s)
        }
        if tx.send(batch).is_err() {
            break; // stop if the channel closes
        }
    }
}

fn main() {
    let (tx, rx) = mpsc::channel();
    let producer_handle = thread::spawn(move || producer(tx));
    let mut received = 0;
    for mut batch in rx {
        for s in batch.drain(..) {
            println!("a message from our sponsor {s}")
            // s is dropped here and returned to the STRINGS pool, regardless
            // of which thread rented it originally.
        }
        received += 1;
        if received >= 3 {
            break; // batch dropped here, returned to the BATCHES pool
        }
    }
    drop(producer_handle); // detach; this demo doesn't wait for it to finish
}

// Once an initial working set is rented this program allocates far less
// than one that repeatedly builds and frees Strings and Vecs from scratch.
