//! Per-frame task plans.
//!
//! A [`Plan`] is an ordered list of named tasks built once at setup. Every tick the worker runs
//! each task in order, entering the context the task kind requires before calling user code and
//! leaving it afterwards:
//!
//! | kind   | context on entry                                              |
//! |--------|---------------------------------------------------------------|
//! | `gl`   | raster context current, frame buffer bound                    |
//! | `cl`   | raster device's compute context current                       |
//! | `clgl` | frame buffer acquired for compute (released on exit)          |
//! | `cpu`  | none                                                          |
//! | `nvg`  | vector canvas frame (attribute stack saved/restored)          |

use crate::buffer::{PixelBuffer, PixelFormat};
use crate::canvas::VectorCanvasBridge;
use crate::context::ExecutionContext;
use crate::device::RasterDevice;
use crate::foundation::core::Size;
use crate::foundation::error::{BridgeError, BridgeResult};
use crate::raster::RasterContext;
use std::any::Any;
use std::collections::HashMap;

/// Task kinds, one per context requirement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Raster drawing.
    Gl,
    /// Compute work without frame buffer access.
    Cl,
    /// Compute work on the acquired frame buffer.
    ClGl,
    /// Host work without any context.
    Cpu,
    /// Vector canvas drawing.
    Nvg,
}

impl TaskKind {
    /// Name prefix of tasks of this kind.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Gl => "gl:",
            Self::Cl => "cl:",
            Self::ClGl => "clgl:",
            Self::Cpu => "cpu:",
            Self::Nvg => "nvg:",
        }
    }

    /// Whether the task needs the raster context bound.
    pub fn needs_gl(self) -> bool {
        matches!(self, Self::Gl | Self::ClGl | Self::Nvg)
    }
}

type GlFn = Box<dyn FnMut(&mut dyn RasterDevice, &mut Storage<'_>) -> BridgeResult<()>>;
type ClFn = Box<dyn FnMut(&ExecutionContext, &mut Storage<'_>) -> BridgeResult<()>>;
type ClGlFn = Box<dyn FnMut(&mut PixelBuffer, &mut Storage<'_>) -> BridgeResult<()>>;
type CpuFn = Box<dyn FnMut(&mut Storage<'_>) -> BridgeResult<()>>;
type NvgFn = Box<dyn FnMut(&mut vello_cpu::RenderContext, Size, &mut Storage<'_>)>;

enum TaskOp {
    Gl(GlFn),
    Cl(ClFn),
    ClGl(ClGlFn),
    Cpu(CpuFn),
    Nvg(NvgFn),
}

/// One named operation of a [`Plan`].
pub struct Task {
    name: String,
    kind: TaskKind,
    op: TaskOp,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Task {
    /// Prefixed task name, e.g. `gl:background`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Task kind.
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Whether the task runs with the raster context bound.
    pub fn needs_gl(&self) -> bool {
        self.kind.needs_gl()
    }

    pub(crate) fn run(&mut self, env: &mut TaskEnv<'_>) -> BridgeResult<()> {
        tracing::trace!(task = %self.name, frame = env.frame, "run task");
        let mut storage = Storage {
            table: &mut *env.storage,
            task: &self.name,
            frame: env.frame,
        };
        match &mut self.op {
            TaskOp::Gl(f) => env.raster.render(|d| f(d, &mut storage)),
            TaskOp::Cl(f) => {
                let ctx = env.raster.context().clone();
                let _exec = ctx.scope();
                f(&ctx, &mut storage)
            }
            TaskOp::ClGl(f) => env.raster.compute(|buf| f(buf, &mut storage)),
            TaskOp::Cpu(f) => f(&mut storage),
            TaskOp::Nvg(f) => env
                .canvas
                .render(env.raster, |canvas, size| f(canvas, size, &mut storage)),
        }
    }
}

pub(crate) struct TaskEnv<'a> {
    pub(crate) raster: &'a mut RasterContext,
    pub(crate) canvas: &'a mut VectorCanvasBridge,
    pub(crate) storage: &'a mut StorageTable,
    pub(crate) frame: u64,
}

/// Ordered task list built once at setup.
#[derive(Debug, Default)]
pub struct Plan {
    tasks: Vec<Task>,
}

impl Plan {
    /// Empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: TaskKind, name: &str, op: TaskOp) -> &mut Self {
        self.tasks.push(Task {
            name: format!("{}{name}", kind.prefix()),
            kind,
            op,
        });
        self
    }

    /// Raster task.
    pub fn gl(
        &mut self,
        name: &str,
        f: impl FnMut(&mut dyn RasterDevice, &mut Storage<'_>) -> BridgeResult<()> + 'static,
    ) -> &mut Self {
        self.push(TaskKind::Gl, name, TaskOp::Gl(Box::new(f)))
    }

    /// Compute task.
    pub fn cl(
        &mut self,
        name: &str,
        f: impl FnMut(&ExecutionContext, &mut Storage<'_>) -> BridgeResult<()> + 'static,
    ) -> &mut Self {
        self.push(TaskKind::Cl, name, TaskOp::Cl(Box::new(f)))
    }

    /// Compute task on the frame buffer (top-left origin, BGRA8).
    pub fn clgl(
        &mut self,
        name: &str,
        f: impl FnMut(&mut PixelBuffer, &mut Storage<'_>) -> BridgeResult<()> + 'static,
    ) -> &mut Self {
        self.push(TaskKind::ClGl, name, TaskOp::ClGl(Box::new(f)))
    }

    /// Host task.
    pub fn cpu(
        &mut self,
        name: &str,
        f: impl FnMut(&mut Storage<'_>) -> BridgeResult<()> + 'static,
    ) -> &mut Self {
        self.push(TaskKind::Cpu, name, TaskOp::Cpu(Box::new(f)))
    }

    /// Vector canvas task.
    pub fn nvg(
        &mut self,
        name: &str,
        f: impl FnMut(&mut vello_cpu::RenderContext, Size, &mut Storage<'_>) + 'static,
    ) -> &mut Self {
        self.push(TaskKind::Nvg, name, TaskOp::Nvg(Box::new(f)))
    }

    /// Tasks in execution order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Return `true` when the plan has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub(crate) fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }
}

type SlotKey = (String, String);

/// Process-lifetime scratch storage, namespaced per task.
#[derive(Default)]
pub struct StorageTable {
    buffers: HashMap<SlotKey, PixelBuffer>,
    values: HashMap<SlotKey, Box<dyn Any>>,
}

impl std::fmt::Debug for StorageTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageTable")
            .field("buffers", &self.buffers.len())
            .field("values", &self.values.len())
            .finish()
    }
}

impl StorageTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer stored by `task` under `key`.
    pub fn buffer(&self, task: &str, key: &str) -> Option<&PixelBuffer> {
        self.buffers.get(&(task.to_owned(), key.to_owned()))
    }

    /// Number of stored buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// View of the table scoped to `task`.
    pub fn view<'a>(&'a mut self, task: &'a str, frame: u64) -> Storage<'a> {
        Storage {
            table: self,
            task,
            frame,
        }
    }
}

/// A task's view of the [`StorageTable`].
pub struct Storage<'a> {
    table: &'a mut StorageTable,
    task: &'a str,
    frame: u64,
}

impl Storage<'_> {
    /// Frame counter at the time the task runs.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Name of the owning task.
    pub fn task(&self) -> &str {
        self.task
    }

    /// Scratch buffer `key`, shaped to `size`/`format`. Contents persist across ticks and the
    /// allocation is reused while the byte length stays the same.
    pub fn buffer(&mut self, key: &str, size: Size, format: PixelFormat) -> &mut PixelBuffer {
        let buf = self
            .table
            .buffers
            .entry((self.task.to_owned(), key.to_owned()))
            .or_insert_with(|| PixelBuffer::new(size, format));
        buf.ensure(size, format);
        buf
    }

    /// Previously stored buffer `key`.
    pub fn get_buffer(&self, key: &str) -> Option<&PixelBuffer> {
        self.table.buffer(self.task, key)
    }

    /// Typed scratch value `key`, default-initialized on first use.
    pub fn value<T: Default + 'static>(&mut self, key: &str) -> BridgeResult<&mut T> {
        let slot = self
            .table
            .values
            .entry((self.task.to_owned(), key.to_owned()))
            .or_insert_with(|| Box::new(T::default()));
        slot.downcast_mut::<T>().ok_or_else(|| {
            BridgeError::validation(format!(
                "storage value '{key}' of task '{}' is not a {}",
                self.task,
                std::any::type_name::<T>()
            ))
        })
    }
}

#[cfg(test)]
#[path = "../tests/unit/scheduler.rs"]
mod tests;
