//! Cell-wise traversals that can be split into bounded, resumable chunks.
//!
//! Every writing pass in this crate (convolution, integral image, box filters,
//! Hessian response) is expressed as a [`CellOp`] evaluated over an output grid
//! in row-major order. The same op can be run in three ways:
//!
//! - [`traverse`] – one uninterrupted pass.
//! - [`ChunkedTraversal`] – an explicit state object (cursor + remaining
//!   budget). Each [`ChunkedTraversal::step`] computes at most
//!   `ChunkConfig::iterations` cells and then yields.
//! - [`Scheduler`] – a task queue that interleaves several traversals
//!   round-robin, honoring each task's inter-chunk delay.
//!
//! Chunk boundaries never split a cell and never reorder cells, so the final
//! output is bit-identical to [`traverse`] for any chunk size.

use crate::grid::Grid;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "tracing")]
use tracing::trace;

/// Computes the value of one output cell.
///
/// Read-only inputs (source grids, kernels, sizes) are fields of the
/// implementor. `output` holds every cell already written by the current pass,
/// i.e. all cells before `(row, column)` in row-major order.
pub trait CellOp {
    fn eval(&self, output: &Grid, row: usize, column: usize) -> f32;
}

impl<F> CellOp for F
where
    F: Fn(&Grid, usize, usize) -> f32,
{
    #[inline]
    fn eval(&self, output: &Grid, row: usize, column: usize) -> f32 {
        self(output, row, column)
    }
}

/// Evaluate `op` for every cell of `output` in a single pass.
pub fn traverse<Op: CellOp>(op: &Op, output: &mut Grid) {
    for row in 0..output.rows() {
        for column in 0..output.columns() {
            let value = op.eval(output, row, column);
            output.put(row, column, value);
        }
    }
}

/// Chunking parameters. The default (`iterations == 0`) is a single pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ChunkConfig {
    /// Cells computed per chunk; `0` disables chunking.
    pub iterations: usize,
    /// Pause before the next chunk resumes, in milliseconds.
    pub delay_ms: u64,
}

impl ChunkConfig {
    /// Chunks of `iterations` cells with no delay.
    pub fn new(iterations: usize) -> Self {
        Self {
            iterations,
            delay_ms: 0,
        }
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        self.iterations > 0
    }

    #[inline]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Progress cursor of a suspended traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkState {
    /// Row of the next cell to compute.
    pub row: usize,
    /// Column of the next cell to compute.
    pub column: usize,
    /// Cells left in the current chunk's budget.
    pub remaining: usize,
}

/// Result of advancing a traversal by one chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Budget exhausted; resume no earlier than `resume_after` from now.
    Suspended { resume_after: Duration },
    /// Every cell has been computed.
    Complete,
}

/// A [`CellOp`] pass over `output` that can stop and resume at cell
/// boundaries.
pub struct ChunkedTraversal<'a, Op> {
    op: Op,
    output: &'a mut Grid,
    config: ChunkConfig,
    state: ChunkState,
    chunks: usize,
    done: bool,
}

impl<'a, Op: CellOp> ChunkedTraversal<'a, Op> {
    pub fn new(op: Op, output: &'a mut Grid, config: ChunkConfig) -> Self {
        Self {
            op,
            output,
            config,
            state: ChunkState::default(),
            chunks: 0,
            done: false,
        }
    }

    /// Current cursor.
    pub fn state(&self) -> ChunkState {
        self.state
    }

    pub fn config(&self) -> ChunkConfig {
        self.config
    }

    /// Number of chunks processed so far.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn is_complete(&self) -> bool {
        self.done
    }

    /// Compute up to one chunk of cells starting at the cursor.
    pub fn step(&mut self) -> Step {
        if self.done {
            return Step::Complete;
        }
        let rows = self.output.rows();
        let columns = self.output.columns();
        self.state.remaining = if self.config.is_chunked() {
            self.config.iterations
        } else {
            usize::MAX
        };
        self.chunks += 1;

        while self.state.row < rows {
            while self.state.column < columns {
                if self.state.remaining == 0 {
                    #[cfg(feature = "tracing")]
                    trace!(
                        row = self.state.row,
                        column = self.state.column,
                        chunk = self.chunks,
                        "chunk suspended"
                    );
                    return Step::Suspended {
                        resume_after: self.config.delay(),
                    };
                }
                let (row, column) = (self.state.row, self.state.column);
                let value = self.op.eval(self.output, row, column);
                self.output.put(row, column, value);
                self.state.column += 1;
                self.state.remaining -= 1;
            }
            self.state.column = 0;
            self.state.row += 1;
        }

        self.done = true;
        Step::Complete
    }

    /// Drive the traversal to completion, sleeping between chunks.
    ///
    /// Returns the number of chunks processed.
    pub fn run(mut self) -> usize {
        loop {
            match self.step() {
                Step::Suspended { resume_after } => {
                    if !resume_after.is_zero() {
                        std::thread::sleep(resume_after);
                    }
                }
                Step::Complete => return self.chunks,
            }
        }
    }

    /// Stop at the current chunk boundary.
    ///
    /// Cells before the returned cursor are written; the rest of `output` is
    /// left untouched.
    pub fn cancel(self) -> ChunkState {
        self.state
    }
}

/// Anything the [`Scheduler`] can advance one chunk at a time.
pub trait Resumable {
    fn step(&mut self) -> Step;
}

impl<Op: CellOp> Resumable for ChunkedTraversal<'_, Op> {
    fn step(&mut self) -> Step {
        ChunkedTraversal::step(self)
    }
}

/// Handle returned by [`Scheduler::spawn`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(usize);

struct Pending<'a> {
    id: TaskId,
    task: Box<dyn Resumable + 'a>,
    ready_at: Instant,
}

/// Cooperative round-robin queue of resumable traversals.
///
/// Tasks run one chunk at a time on the calling thread. A suspended task goes
/// to the back of the queue and becomes eligible again once its delay has
/// elapsed; the scheduler only sleeps when no task is ready.
#[derive(Default)]
pub struct Scheduler<'a> {
    queue: VecDeque<Pending<'a>>,
    next_id: usize,
}

impl<'a> Scheduler<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a task; it becomes ready immediately.
    pub fn spawn(&mut self, task: impl Resumable + 'a) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.queue.push_back(Pending {
            id,
            task: Box::new(task),
            ready_at: Instant::now(),
        });
        id
    }

    /// Number of unfinished tasks.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop a pending task at its current chunk boundary.
    ///
    /// Returns `false` if the task already finished or was never spawned here.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        match self.queue.iter().position(|p| p.id == id) {
            Some(pos) => {
                self.queue.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Advance the first ready task by one chunk.
    ///
    /// Sleeps until the earliest task is ready if none is. Returns `None` once
    /// the queue is empty.
    pub fn run_once(&mut self) -> Option<(TaskId, Step)> {
        let now = Instant::now();
        let pos = match self.queue.iter().position(|p| p.ready_at <= now) {
            Some(pos) => pos,
            None => {
                let (pos, earliest) = self
                    .queue
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, p)| p.ready_at)
                    .map(|(i, p)| (i, p.ready_at))?;
                std::thread::sleep(earliest.saturating_duration_since(now));
                pos
            }
        };

        let mut pending = self.queue.remove(pos)?;
        let id = pending.id;
        let step = pending.task.step();
        if let Step::Suspended { resume_after } = step {
            pending.ready_at = Instant::now() + resume_after;
            self.queue.push_back(pending);
        }
        Some((id, step))
    }

    /// Run every task to completion; returns the number of chunks executed.
    pub fn run(&mut self) -> usize {
        let mut steps = 0;
        while self.run_once().is_some() {
            steps += 1;
        }
        steps
    }
}
