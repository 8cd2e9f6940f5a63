use crate::error::{Error, Result};
use std::sync::mpsc;
use std::thread;

/// Capacity of each worker's input channel; feeding blocks once a
/// worker falls this far behind.
const CHANNEL_DEPTH: usize = 4;

/// One writer worker: consumes elements one at a time, handing back
/// its accounting when the input runs dry. Each sink is owned by its
/// worker thread, so no shared-state bounds beyond `Send`.
pub trait ElementSink: Send + 'static {
    type Elem;
    type Output;
    fn handle(&mut self, elem: Self::Elem);
    fn done(&mut self) -> Result<Self::Output>;
}

/// A fixed set of worker threads behind bounded channels. Elements are
/// dealt round-robin; `join` closes the channels, lets every worker
/// drain, and gathers the outputs.
pub struct WorkerPool<T, O> {
    senders: Vec<mpsc::SyncSender<T>>,
    workers: Vec<thread::JoinHandle<Result<O>>>,
    next: usize,
}

impl<T, O> WorkerPool<T, O>
where
    T: Send + 'static,
    O: Send + 'static,
{
    /// Spawns `count` workers (at least one), each running the sink
    /// produced for its index.
    pub fn spawn<S, F>(count: usize, mut make_sink: F) -> WorkerPool<T, O>
    where
        S: ElementSink<Elem = T, Output = O>,
        F: FnMut(usize) -> S,
    {
        let count = usize::max(count, 1);
        let mut senders = Vec::with_capacity(count);
        let mut workers = Vec::with_capacity(count);
        for i in 0..count {
            let (send, recv) = mpsc::sync_channel(CHANNEL_DEPTH);
            let mut sink = make_sink(i);
            workers.push(thread::spawn(move || {
                for elem in recv.iter() {
                    sink.handle(elem);
                }
                sink.done()
            }));
            senders.push(send);
        }
        WorkerPool {
            senders: senders,
            workers: workers,
            next: 0,
        }
    }

    /// Hands one element to the next worker, blocking while that
    /// worker's channel is full.
    pub fn feed(&mut self, elem: T) {
        let i = self.next % self.senders.len();
        self.next += 1;
        if self.senders[i].send(elem).is_err() {
            panic!("worker {} hung up", i);
        }
    }

    /// Shuts the pool down. Every worker is joined before the first
    /// failure is reported, so none is left running on error.
    pub fn join(self) -> Result<Vec<O>> {
        drop(self.senders);

        let mut outputs = Vec::with_capacity(self.workers.len());
        let mut failed: Option<Error> = None;
        for w in self.workers {
            match w.join() {
                Ok(Ok(o)) => {
                    outputs.push(o);
                }
                Ok(Err(e)) => {
                    failed = Some(e);
                }
                Err(_) => {
                    failed = Some(Error::InvalidInput(String::from("worker panicked")));
                }
            }
        }
        match failed {
            Some(e) => Err(e),
            None => Ok(outputs),
        }
    }
}
