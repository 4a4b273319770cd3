use super::Executor;
use crate::error::Result;

type UnitFn<T> = Box<dyn FnOnce(Vec<T>) -> Result<Vec<T>> + Send>;
type BuilderFn<T> = Box<dyn FnOnce(Vec<T>) -> Result<Vec<Task<T>>> + Send>;

enum TaskKind<T> {
    Unit(UnitFn<T>),
    Group(Vec<Task<T>>),
    FanOut(BuilderFn<T>),
    Sequence(Vec<Task<T>>),
}

/// A unit of work over payloads of type `T`, or a combination of such units
pub struct Task<T> {
    label: String,
    kind: TaskKind<T>,
}

impl<T: Send + 'static> Task<T> {
    /// Leaf task mapping its input to an output
    pub fn new<F>(label: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(Vec<T>) -> Result<Vec<T>> + Send + 'static,
    {
        Self {
            label: label.into(),
            kind: TaskKind::Unit(Box::new(f)),
        }
    }

    /// Run every task concurrently and concatenate their outputs in task
    /// order. Members start from an empty input and carry their own data.
    /// A failing member is recorded on the executor and contributes nothing.
    pub fn group(label: impl Into<String>, tasks: Vec<Task<T>>) -> Self {
        Self {
            label: label.into(),
            kind: TaskKind::Group(tasks),
        }
    }

    /// Build a group from the previous stage's output, then run it
    pub fn fan_out<F>(label: impl Into<String>, builder: F) -> Self
    where
        F: FnOnce(Vec<T>) -> Result<Vec<Task<T>>> + Send + 'static,
    {
        Self {
            label: label.into(),
            kind: TaskKind::FanOut(Box::new(builder)),
        }
    }

    /// Run tasks one after another, each fed the previous output.
    /// The first failure ends the sequence.
    pub fn sequence(label: impl Into<String>, tasks: Vec<Task<T>>) -> Self {
        Self {
            label: label.into(),
            kind: TaskKind::Sequence(tasks),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn execute(self, input: Vec<T>, executor: &Executor) -> Result<Vec<T>> {
        match self.kind {
            TaskKind::Unit(f) => {
                let _permit = executor.gate().acquire();
                f(input)
            }
            TaskKind::Group(tasks) => Ok(executor.run_group(tasks)),
            TaskKind::FanOut(builder) => {
                let tasks = builder(input)?;
                Ok(executor.run_group(tasks))
            }
            TaskKind::Sequence(tasks) => {
                let mut data = input;
                for task in tasks {
                    data = task.execute(data, executor)?;
                }
                Ok(data)
            }
        }
    }
}
