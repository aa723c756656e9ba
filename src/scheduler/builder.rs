use std::env;

use once_cell::sync::Lazy;

use super::Scheduler;

/// Environment variable overriding the default number of worker threads.
const THREAD_COUNT_ENV: &str = "COOP_RT_THREAD_COUNT";

/// The default number of worker threads, read once per process.
static DEFAULT_THREADS: Lazy<usize> = Lazy::new(|| {
    env::var(THREAD_COUNT_ENV)
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or_else(num_cpus::get)
        .max(1)
});

/// Scheduler builder that configures the settings of a new scheduler.
///
/// # Examples
///
/// ```
/// use coop_rt::scheduler::Scheduler;
///
/// let scheduler = Scheduler::builder()
///     .num_threads(1)
///     .name("io".to_string())
///     .build();
///
/// assert_eq!(scheduler.num_threads(), 1);
/// assert!(!scheduler.is_running());
/// ```
#[derive(Debug, Default)]
pub struct Builder {
    pub(crate) num_threads: Option<usize>,
    pub(crate) name: Option<String>,
}

impl Builder {
    /// Creates a new builder.
    #[inline]
    pub fn new() -> Builder {
        Builder {
            num_threads: None,
            name: None,
        }
    }

    /// Configures the number of worker threads.
    ///
    /// Defaults to the value of the `COOP_RT_THREAD_COUNT` environment variable, or the number
    /// of logical CPUs if it is unset or invalid.
    #[inline]
    pub fn num_threads(mut self, num_threads: usize) -> Builder {
        self.num_threads = Some(num_threads);
        self
    }

    /// Configures the name prefix of the worker threads.
    ///
    /// Each worker is named after the prefix and its index, as in `coop-rt/worker-0`.
    #[inline]
    pub fn name(mut self, name: String) -> Builder {
        self.name = Some(name);
        self
    }

    /// Creates a stopped scheduler with the configured settings.
    pub fn build(self) -> Scheduler {
        Scheduler::from_builder(
            self.num_threads.unwrap_or(*DEFAULT_THREADS),
            self.name.unwrap_or_else(|| "coop-rt/worker".to_string()),
        )
    }
}
