use anyhow::Result;

/// A named unary function applied to every input of a run.
///
/// The name shows up in the run banner, and in process mode it is the only
/// thing sent to the worker program, which looks the function up in its own
/// [`TaskRegistry`](super::worker::TaskRegistry).
#[derive(Clone)]
pub struct Task<F> {
    name: String,
    func: F,
}

impl<F> Task<F> {
    /// Wrap `func`, naming it after the last segment of its type path.
    ///
    /// For a plain `fn` item such as `tasks::square` this is `square`;
    /// closures come out as `{{closure}}` and should use [`Task::named`].
    pub fn new(func: F) -> Self {
        Self {
            name: short_type_name::<F>(),
            func,
        }
    }

    pub fn named(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call<T, R>(&self, input: T) -> Result<R>
    where
        F: Fn(T) -> Result<R>,
    {
        (self.func)(input)
    }
}

impl<F> std::fmt::Debug for Task<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("name", &self.name).finish()
    }
}

fn short_type_name<F>() -> String {
    let full = std::any::type_name::<F>();
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::").next().unwrap_or(path).to_string()
}
