//! sync.rs — fair readers/writer lock for the shared network state.
//!
//! `TargetPoint` and the controller's node registry are read by many RPC
//! handlers while a single loop writes them. `std::sync::RwLock` makes no
//! fairness promise, so the discipline is built explicitly from a mutex,
//! two condvars and blocked/running counters per class:
//!
//! - a writer arriving while readers or another writer are running queues;
//!   a reader arriving while a writer is running *or queued* queues behind
//!   that writer;
//! - a finishing writer releases every queued reader as one batch, otherwise
//!   exactly one queued writer;
//! - the last finishing reader releases exactly one queued writer.
//!
//! Invariant: at most one writer is active, and readers and writers are
//! never active at the same time. Critical sections are memory-only; guards
//! must not be held across `.await`.

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard};

#[derive(Default)]
struct LockState {
    running_readers: usize,
    running_writers: usize,
    blocked_readers: usize,
    blocked_writers: usize,
    /// Bumped on every batch release; a blocked reader waits for the
    /// generation it queued in to pass.
    read_generation: u64,
    /// Outstanding wakeups for blocked writers, one per released writer.
    write_tickets: usize,
}

pub struct FairRwLock<T> {
    state: Mutex<LockState>,
    readers: Condvar,
    writers: Condvar,
    data: UnsafeCell<T>,
}

// Readers and writers are mutually excluded by the counter protocol, so the
// usual RwLock bounds apply.
unsafe impl<T: Send> Send for FairRwLock<T> {}
unsafe impl<T: Send + Sync> Sync for FairRwLock<T> {}

impl<T> FairRwLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            readers: Condvar::new(),
            writers: Condvar::new(),
            data: UnsafeCell::new(value),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LockState> {
        // The counters stay consistent across a panicking reader/writer only
        // because critical sections never touch them; recover the guard.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Acquire shared access. Queues behind any running or queued writer.
    pub fn read(&self) -> FairReadGuard<'_, T> {
        let mut s = self.lock_state();
        if s.running_writers > 0 || s.blocked_writers > 0 {
            s.blocked_readers += 1;
            let generation = s.read_generation;
            while s.read_generation == generation {
                s = self.readers.wait(s).unwrap_or_else(|e| e.into_inner());
            }
            // The releasing writer already moved this reader to running.
        } else {
            s.running_readers += 1;
        }
        drop(s);
        FairReadGuard { lock: self }
    }

    /// Acquire exclusive access. Queues behind running readers or a writer.
    pub fn write(&self) -> FairWriteGuard<'_, T> {
        let mut s = self.lock_state();
        if s.running_readers > 0 || s.running_writers > 0 {
            s.blocked_writers += 1;
            while s.write_tickets == 0 {
                s = self.writers.wait(s).unwrap_or_else(|e| e.into_inner());
            }
            s.write_tickets -= 1;
            // The releasing thread already moved one writer to running.
        } else {
            s.running_writers += 1;
        }
        drop(s);
        FairWriteGuard { lock: self }
    }

    fn read_unlock(&self) {
        let mut s = self.lock_state();
        s.running_readers -= 1;
        if s.running_readers == 0 && s.blocked_writers > 0 {
            s.blocked_writers -= 1;
            s.running_writers += 1;
            s.write_tickets += 1;
            self.writers.notify_one();
        }
    }

    fn write_unlock(&self) {
        let mut s = self.lock_state();
        s.running_writers -= 1;
        if s.blocked_readers > 0 {
            // Batch release: every reader queued while this writer ran (or
            // waited) proceeds together, ahead of any queued writer.
            s.running_readers += s.blocked_readers;
            s.blocked_readers = 0;
            s.read_generation += 1;
            self.readers.notify_all();
        } else if s.blocked_writers > 0 {
            s.blocked_writers -= 1;
            s.running_writers += 1;
            s.write_tickets += 1;
            self.writers.notify_one();
        }
    }
}

pub struct FairReadGuard<'a, T> {
    lock: &'a FairRwLock<T>,
}

impl<T> Deref for FairReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: the counter protocol guarantees no writer is active.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for FairReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.read_unlock();
    }
}

pub struct FairWriteGuard<'a, T> {
    lock: &'a FairRwLock<T>,
}

impl<T> Deref for FairWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: this writer holds exclusive access.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for FairWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: this writer holds exclusive access.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for FairWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.write_unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn uncontended_read_write() {
        let lock = FairRwLock::new(5_i32);
        assert_eq!(*lock.read(), 5);
        *lock.write() = 7;
        assert_eq!(*lock.read(), 7);
    }

    #[test]
    fn readers_never_observe_torn_writes() {
        // The writer keeps both halves of the pair equal; any reader seeing
        // them differ has observed a partially-written value.
        let lock = Arc::new(FairRwLock::new((0_u64, 0_u64)));
        let stop = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let lock = lock.clone();
                let stop = stop.clone();
                thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        let pair = lock.read();
                        assert_eq!(pair.0, pair.1);
                    }
                })
            })
            .collect();

        let writer = {
            let lock = lock.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                for i in 1..=2000_u64 {
                    let mut pair = lock.write();
                    pair.0 = i;
                    pair.1 = i;
                }
                stop.store(true, Ordering::Relaxed);
            })
        };

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(*lock.read(), (2000, 2000));
    }

    #[test]
    fn writers_progress_under_reader_contention() {
        // 8 spinning readers, 2 writers; every writer must finish all of its
        // updates well before the deadline.
        let lock = Arc::new(FairRwLock::new(0_u64));
        let stop = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let lock = lock.clone();
                let stop = stop.clone();
                thread::spawn(move || {
                    let mut last = 0;
                    while !stop.load(Ordering::Relaxed) {
                        let v = *lock.read();
                        assert!(v >= last, "reader observed the counter go backwards");
                        last = v;
                    }
                })
            })
            .collect();

        let start = Instant::now();
        let writers: Vec<_> = (0..2)
            .map(|_| {
                let lock = lock.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        *lock.write() += 1;
                        thread::sleep(Duration::from_micros(50));
                    }
                })
            })
            .collect();

        for w in writers {
            w.join().unwrap();
        }
        assert!(
            start.elapsed() < Duration::from_secs(10),
            "writers starved by readers"
        );
        stop.store(true, Ordering::Relaxed);
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(*lock.read(), 1000);
    }

    #[test]
    fn readers_progress_while_writers_churn() {
        let lock = Arc::new(FairRwLock::new(0_u64));
        let stop = Arc::new(AtomicBool::new(false));

        let writers: Vec<_> = (0..2)
            .map(|_| {
                let lock = lock.clone();
                let stop = stop.clone();
                thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        *lock.write() += 1;
                    }
                })
            })
            .collect();

        // Each read must complete despite back-to-back writers.
        for _ in 0..200 {
            let _ = *lock.read();
        }

        stop.store(true, Ordering::Relaxed);
        for w in writers {
            w.join().unwrap();
        }
    }
}
