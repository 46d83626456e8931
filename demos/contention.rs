//! Side-by-side contention run: mutex baseline vs ring cell.
//!
//! Spawns a handful of writer threads that keep republishing their identity
//! and reader threads that hammer `load`, then prints how often each reader
//! observed each writer (0 is the initial value).

use ring_arc::{MutexCell, RingCell};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const READERS: usize = 4;
const WRITERS: usize = 2;
const ITERATIONS: usize = 1_000_000;
const RUNS: usize = 3;

fn main() {
    println!("mutex impl");
    for _ in 0..RUNS {
        run_mutex();
    }

    println!("ring impl");
    for _ in 0..RUNS {
        run_ring();
    }
}

fn run_mutex() {
    let cell = Arc::new(MutexCell::from_value(0usize));
    let run_writers = Arc::new(AtomicBool::new(true));
    let mut writers = vec![];

    for w in 0..WRITERS {
        let cell = cell.clone();
        let run = run_writers.clone();
        writers.push(thread::spawn(move || {
            let identity = Arc::new(w + 1);
            while run.load(Ordering::Relaxed) {
                thread::yield_now();
                cell.store(identity.clone());
            }
        }));
    }

    let start = Instant::now();

    let mut readers = vec![];
    for _ in 0..READERS {
        let cell = cell.clone();
        readers.push(thread::spawn(move || {
            let mut sums = [0usize; WRITERS + 1];
            for _ in 0..ITERATIONS {
                sums[*cell.load()] += 1;
            }
            sums
        }));
    }

    let sums: Vec<_> = readers.into_iter().map(|r| r.join().unwrap()).collect();
    let elapsed = start.elapsed();

    run_writers.store(false, Ordering::Relaxed);
    for w in writers {
        w.join().unwrap();
    }

    report(elapsed.as_millis(), &sums);
}

fn run_ring() {
    let cell = Arc::new(RingCell::<usize, 4>::from_value(0));
    let run_writers = Arc::new(AtomicBool::new(true));
    let mut writers = vec![];

    for w in 0..WRITERS {
        let cell = cell.clone();
        let run = run_writers.clone();
        writers.push(thread::spawn(move || {
            let identity = Arc::new(w + 1);
            while run.load(Ordering::Relaxed) {
                thread::yield_now();
                cell.store(identity.clone());
            }
        }));
    }

    let start = Instant::now();

    let mut readers = vec![];
    for _ in 0..READERS {
        let cell = cell.clone();
        readers.push(thread::spawn(move || {
            let mut sums = [0usize; WRITERS + 1];
            for _ in 0..ITERATIONS {
                sums[*cell.load()] += 1;
            }
            sums
        }));
    }

    let sums: Vec<_> = readers.into_iter().map(|r| r.join().unwrap()).collect();
    let elapsed = start.elapsed();

    run_writers.store(false, Ordering::Relaxed);
    for w in writers {
        w.join().unwrap();
    }

    report(elapsed.as_millis(), &sums);
}

fn report(millis: u128, sums: &[[usize; WRITERS + 1]]) {
    println!("{} done in {} ms", ITERATIONS, millis);
    for (reader, sums) in sums.iter().enumerate() {
        print!("Reader {} :", reader);
        for count in sums {
            print!(" {:.1}% ({})", 100.0 * *count as f64 / ITERATIONS as f64, count);
        }
        println!();
    }
}
