//! Runtime configuration.

use std::rc::Rc;

use crate::scheduler::{DefaultScheduler, Scheduler};

use super::Runtime;

/// What [`Runtime::unsafe_execute`] does with a rejection nobody handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum UnhandledRejection {
    /// Emit a `warn!` event carrying the error.
    #[default]
    Log,
    /// Drop it silently.
    Ignore,
}

/// Settings shared by every fork of a [`Runtime`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RuntimeConfig {
    /// Recorded on every log event the runtime emits.
    pub name: String,
    /// Policy for rejections reaching `unsafe_execute`.
    pub unhandled: UnhandledRejection,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            name: "undertow".to_string(),
            unhandled: UnhandledRejection::default(),
        }
    }
}

/// Assembles a [`Runtime`].
///
/// # Example
///
/// ```rust
/// use undertow::runtime::{Runtime, UnhandledRejection};
/// use undertow::TestScheduler;
///
/// let runtime = Runtime::builder()
///     .name("ingest")
///     .unhandled(UnhandledRejection::Ignore)
///     .scheduler(TestScheduler::new())
///     .build();
///
/// assert_eq!(runtime.config().name, "ingest");
/// ```
#[derive(Default)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    scheduler: Option<Rc<dyn Scheduler>>,
}

impl std::fmt::Debug for RuntimeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeBuilder")
            .field("config", &self.config)
            .field("custom_scheduler", &self.scheduler.is_some())
            .finish()
    }
}

impl RuntimeBuilder {
    /// Set the runtime name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the unhandled rejection policy.
    pub fn unhandled(mut self, policy: UnhandledRejection) -> Self {
        self.config.unhandled = policy;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `scheduler` instead of a fresh [`DefaultScheduler`].
    pub fn scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    /// Finish building.
    pub fn build(self) -> Runtime {
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Rc::new(DefaultScheduler::new()));
        Runtime::from_parts(scheduler, self.config)
    }
}
