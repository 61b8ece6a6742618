//! Frame ranges assigned to extraction workers.
//!
//! [`partition`] splits `[0, frame_count)` into one contiguous [`FrameTask`]
//! per worker. Contiguous ranges let each worker seek once and then decode
//! forward, which is far cheaper than seeking per frame.

use std::{fmt, ops::Range};

/// A half-open interval `[start, end)` of frame indices owned by one worker.
///
/// Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameTask {
    start: u64,
    end: u64,
}

impl FrameTask {
    /// Create a task covering `[start, end)`.
    ///
    /// An `end` below `start` is clamped so the task is empty.
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// First frame index of the task.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// One past the last frame index of the task.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of frames in the task.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Returns `true` if the task covers no frames.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` if `frame_number` falls inside the task.
    pub fn contains(&self, frame_number: u64) -> bool {
        (self.start..self.end).contains(&frame_number)
    }

    /// The task as a standard range, for iteration.
    pub fn range(&self) -> Range<u64> {
        self.start..self.end
    }
}

impl fmt::Display for FrameTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Split `[0, frame_count)` into exactly `workers` contiguous tasks.
///
/// Every task gets `frame_count / workers` frames and the last one absorbs
/// the remainder. When there are fewer frames than workers, the first
/// `frame_count` workers get one frame each and the others get empty tasks.
/// Returns an empty list when `workers` is zero.
///
/// # Example
///
/// ```
/// use framesnap::{FrameTask, partition};
///
/// let tasks = partition(10, 3);
/// assert_eq!(
///     tasks,
///     vec![FrameTask::new(0, 3), FrameTask::new(3, 6), FrameTask::new(6, 10)],
/// );
/// ```
pub fn partition(frame_count: u64, workers: usize) -> Vec<FrameTask> {
    if workers == 0 {
        return Vec::new();
    }

    let workers_u64 = workers as u64;
    let chunk = frame_count / workers_u64;

    if chunk == 0 {
        return (0..workers_u64)
            .map(|index| {
                if index < frame_count {
                    FrameTask::new(index, index + 1)
                } else {
                    FrameTask::new(frame_count, frame_count)
                }
            })
            .collect();
    }

    (0..workers_u64)
        .map(|index| {
            let start = index * chunk;
            let end = if index + 1 == workers_u64 {
                frame_count
            } else {
                start + chunk
            };
            FrameTask::new(start, end)
        })
        .collect()
}
