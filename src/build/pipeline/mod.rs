//! Build pipeline.
//!
//! A build is an ordered list of steps. Each step reads the outputs of the
//! steps before it from the shared [`PipelineState`] and writes its own.
//! Some positions in the list hold a parallel group: steps that touch
//! disjoint outputs and run concurrently on the rayon pool.
//!
//! The default pipeline:
//!
//! 1. reset-directories
//! 2. discover-entries + scan-components (parallel)
//! 3. compile-content
//! 4. generate-styles + copy-static + prerender (parallel)
//! 5. write-shells
//! 6. inject-head
//!
//! The first failing step halts the run. Nothing after it executes.

mod context;
mod error;
mod state;
pub mod steps;

pub use context::{ASSETS_DIR, BuildContext, ProjectPaths};
pub use error::{PipelineError, StepError};
pub use state::{BuildOptions, OutputError, OutputKey, Outputs, PipelineState, keys};

use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, error};

use steps::{
    CompileContent, CopyStatic, DiscoverEntries, GenerateStyles, InjectHead, Prerender,
    ResetDirectories, ScanComponents, WriteShells,
};

/// A unit of work in the pipeline.
pub trait Step: Send + Sync {
    /// Stable name, used for logging and error reporting only.
    fn name(&self) -> &'static str;

    /// Whether the step applies to this run. Must not have side effects.
    fn should_run(&self, _ctx: &BuildContext, _state: &PipelineState) -> bool {
        true
    }

    /// Run the step, storing every output it produces in `state.outputs`.
    fn execute(&self, ctx: &BuildContext, state: &PipelineState) -> Result<(), StepError>;
}

/// One position in the step list.
pub enum StepNode {
    Single(Box<dyn Step>),
    /// Steps run concurrently. Members must write disjoint outputs.
    Parallel(Vec<Box<dyn Step>>),
}

/// A failed run: the state as it stood when the pipeline halted, plus the
/// error.
#[derive(thiserror::Error, Debug)]
#[error("{error}")]
pub struct PipelineFailure {
    pub state: PipelineState,
    #[source]
    pub error: PipelineError,
}

/// The build pipeline.
pub struct Pipeline {
    nodes: Vec<StepNode>,
}

impl Pipeline {
    /// Create an empty pipeline with no steps.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Create the default pipeline.
    pub fn default_pipeline() -> Self {
        let mut pipeline = Self::new();
        pipeline
            .add_step(ResetDirectories)
            .add_parallel(vec![Box::new(DiscoverEntries), Box::new(ScanComponents)])
            .add_step(CompileContent)
            .add_parallel(vec![
                Box::new(GenerateStyles),
                Box::new(CopyStatic),
                Box::new(Prerender),
            ])
            .add_step(WriteShells)
            .add_step(InjectHead);
        pipeline
    }

    /// Add a step to the end of the pipeline.
    pub fn add_step<S: Step + 'static>(&mut self, step: S) -> &mut Self {
        self.nodes.push(StepNode::Single(Box::new(step)));
        self
    }

    /// Add a parallel group to the end of the pipeline.
    pub fn add_parallel(&mut self, steps: Vec<Box<dyn Step>>) -> &mut Self {
        self.nodes.push(StepNode::Parallel(steps));
        self
    }

    /// Step names in order, one inner list per position.
    pub fn step_names(&self) -> Vec<Vec<&'static str>> {
        self.nodes
            .iter()
            .map(|node| match node {
                StepNode::Single(step) => vec![step.name()],
                StepNode::Parallel(steps) => steps.iter().map(|s| s.name()).collect(),
            })
            .collect()
    }

    /// Run every step against a fresh state.
    pub fn run(
        &self,
        ctx: &BuildContext,
        options: BuildOptions,
    ) -> Result<PipelineState, PipelineFailure> {
        let mut state = PipelineState::new(options);

        for node in &self.nodes {
            let (elapsed, result) = timed(|| match node {
                StepNode::Single(step) => run_single(step.as_ref(), ctx, &mut state),
                StepNode::Parallel(steps) => run_group(steps, ctx, &mut state),
            });
            state.record_position(elapsed);

            if let Err(error) = result {
                error!(step = error.step_name(), error = %error.step_error(), "pipeline halted");
                state.mark_failed(error.step_name());
                return Err(PipelineFailure { state, error });
            }
        }

        debug!(total_ms = state.total_time().as_millis() as u64, "pipeline finished");
        Ok(state)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::default_pipeline()
    }
}

fn run_single(
    step: &dyn Step,
    ctx: &BuildContext,
    state: &mut PipelineState,
) -> Result<(), PipelineError> {
    if !step.should_run(ctx, state) {
        debug!(step = step.name(), "skipped");
        return Ok(());
    }

    let (elapsed, result) = timed(|| step.execute(ctx, state));
    state.record_timing(step.name(), elapsed);
    debug!(step = step.name(), ms = elapsed.as_millis() as u64, "step finished");
    result.map_err(|e| PipelineError::step(step.name(), e))
}

/// Run the members of a group whose predicate holds, concurrently.
///
/// Every member that ran gets its own timing. If several fail, the first in
/// declared order is reported.
fn run_group(
    steps: &[Box<dyn Step>],
    ctx: &BuildContext,
    state: &mut PipelineState,
) -> Result<(), PipelineError> {
    let runnable: Vec<&dyn Step> = steps
        .iter()
        .map(|step| step.as_ref())
        .filter(|step| {
            let run = step.should_run(ctx, state);
            if !run {
                debug!(step = step.name(), "skipped");
            }
            run
        })
        .collect();
    if runnable.is_empty() {
        return Ok(());
    }

    let shared: &PipelineState = state;
    let results: Vec<(&'static str, Duration, Result<(), StepError>)> = runnable
        .par_iter()
        .map(|step| {
            let (elapsed, result) = timed(|| step.execute(ctx, shared));
            (step.name(), elapsed, result)
        })
        .collect();

    let mut first_error = None;
    for (name, elapsed, result) in results {
        state.record_timing(name, elapsed);
        debug!(step = name, ms = elapsed.as_millis() as u64, "step finished");
        if let Err(e) = result
            && first_error.is_none()
        {
            first_error = Some(PipelineError::step(name, e));
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn timed<T>(f: impl FnOnce() -> T) -> (Duration, T) {
    let start = Instant::now();
    let value = f();
    (start.elapsed(), value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::render::SiteContext;
    use std::sync::{Arc, Mutex};

    const VALUE: OutputKey<u32> = OutputKey::new("value");

    type Log = Arc<Mutex<Vec<&'static str>>>;

    struct Probe {
        name: &'static str,
        run: bool,
        fail: bool,
        log: Log,
    }

    impl Probe {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                run: true,
                fail: false,
                log: Arc::clone(log),
            }
        }

        fn skipped(mut self) -> Self {
            self.run = false;
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    impl Step for Probe {
        fn name(&self) -> &'static str {
            self.name
        }

        fn should_run(&self, _ctx: &BuildContext, _state: &PipelineState) -> bool {
            self.run
        }

        fn execute(&self, _ctx: &BuildContext, _state: &PipelineState) -> Result<(), StepError> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                return Err(StepError::Failed(format!("{} failed", self.name)));
            }
            Ok(())
        }
    }

    struct Sleep(&'static str, u64);

    impl Step for Sleep {
        fn name(&self) -> &'static str {
            self.0
        }

        fn execute(&self, _ctx: &BuildContext, _state: &PipelineState) -> Result<(), StepError> {
            std::thread::sleep(Duration::from_millis(self.1));
            Ok(())
        }
    }

    struct Produce;

    impl Step for Produce {
        fn name(&self) -> &'static str {
            "produce"
        }

        fn execute(&self, _ctx: &BuildContext, state: &PipelineState) -> Result<(), StepError> {
            state.outputs.put(VALUE, 41)?;
            Ok(())
        }
    }

    struct Consume;

    impl Step for Consume {
        fn name(&self) -> &'static str {
            "consume"
        }

        fn execute(&self, _ctx: &BuildContext, state: &PipelineState) -> Result<(), StepError> {
            let value = state.outputs.get(VALUE)?;
            if *value != 41 {
                return Err(StepError::Failed("wrong value".into()));
            }
            Ok(())
        }
    }

    fn context(dir: &std::path::Path) -> BuildContext {
        let paths = ProjectPaths {
            root: dir.to_path_buf(),
            content: dir.join("content"),
            components: dir.join("components"),
            public: dir.join("public"),
            styles: dir.join("styles"),
            output: dir.join("dist"),
            shell: None,
        };
        let site = SiteContext {
            name: "Test".into(),
            url: None,
            lang: "en".into(),
            description: None,
        };
        BuildContext::new(paths, site, None, None).unwrap()
    }

    fn log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn test_failure_halts_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let log = log();

        let mut pipeline = Pipeline::new();
        pipeline
            .add_step(Probe::new("first", &log))
            .add_step(Probe::new("second", &log).failing())
            .add_step(Probe::new("third", &log))
            .add_parallel(vec![Box::new(Probe::new("fourth", &log))]);

        let failure = pipeline.run(&ctx, BuildOptions::default()).unwrap_err();

        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(failure.error.step_name(), "second");
        assert_eq!(failure.state.failed_step(), Some("second"));
        assert!(failure.state.timing("first").is_some());
        assert!(failure.state.timing("second").is_some());
        assert!(failure.state.timing("third").is_none());
        assert!(failure.state.timing("fourth").is_none());
        assert_eq!(failure.to_string(), "step 'second' failed: second failed");
    }

    #[test]
    fn test_skipped_step_has_no_timing() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let log = log();

        let mut pipeline = Pipeline::new();
        pipeline
            .add_step(Probe::new("skipped", &log).skipped())
            .add_step(Probe::new("ran", &log));

        let state = pipeline.run(&ctx, BuildOptions::default()).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["ran"]);
        assert!(state.timing("skipped").is_none());
        assert_eq!(state.timings().len(), 1);
    }

    #[test]
    fn test_group_runs_only_applicable_members() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let log = log();

        let mut pipeline = Pipeline::new();
        pipeline.add_parallel(vec![
            Box::new(Probe::new("on", &log)),
            Box::new(Probe::new("off", &log).skipped()),
        ]);

        let state = pipeline.run(&ctx, BuildOptions::default()).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["on"]);
        assert!(state.timing("on").is_some());
        assert!(state.timing("off").is_none());
    }

    #[test]
    fn test_group_counts_once_in_total_time() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let mut pipeline = Pipeline::new();
        pipeline
            .add_parallel(vec![Box::new(Sleep("slow", 40)), Box::new(Sleep("fast", 5))])
            .add_step(Sleep("after", 5));

        let state = pipeline.run(&ctx, BuildOptions::default()).unwrap();
        let slow = state.timing("slow").unwrap();
        let after = state.timing("after").unwrap();
        assert!(state.total_time() >= slow + after);

        let summed: Duration = state.timings().iter().map(|(_, d)| *d).sum();
        assert!(state.total_time() <= summed + Duration::from_millis(40));
    }

    #[test]
    fn test_fully_skipped_group_contributes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let log = log();

        let mut pipeline = Pipeline::new();
        pipeline
            .add_parallel(vec![
                Box::new(Probe::new("a", &log).skipped()),
                Box::new(Probe::new("b", &log).skipped()),
            ])
            .add_step(Probe::new("after", &log));

        let state = pipeline.run(&ctx, BuildOptions::default()).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
        assert_eq!(
            state.timings().iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            vec!["after"]
        );
    }

    #[test]
    fn test_group_failure_reports_first_declared_member() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let log = log();

        let mut pipeline = Pipeline::new();
        pipeline
            .add_parallel(vec![
                Box::new(Probe::new("ok", &log)),
                Box::new(Probe::new("bad-1", &log).failing()),
                Box::new(Probe::new("bad-2", &log).failing()),
            ])
            .add_step(Probe::new("never", &log));

        let failure = pipeline.run(&ctx, BuildOptions::default()).unwrap_err();
        assert_eq!(failure.error.step_name(), "bad-1");
        assert_eq!(failure.state.timings().len(), 3);
        assert!(!log.lock().unwrap().contains(&"never"));
    }

    #[test]
    fn test_outputs_flow_between_steps() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let mut pipeline = Pipeline::new();
        pipeline.add_step(Produce).add_step(Consume);
        let state = pipeline.run(&ctx, BuildOptions::default()).unwrap();
        assert_eq!(*state.outputs.get(VALUE).unwrap(), 41);
    }

    #[test]
    fn test_reading_unproduced_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let mut pipeline = Pipeline::new();
        pipeline.add_step(Consume).add_step(Produce);
        let failure = pipeline.run(&ctx, BuildOptions::default()).unwrap_err();
        assert_eq!(failure.error.step_name(), "consume");
        assert!(matches!(
            failure.error.step_error(),
            StepError::Output(OutputError::Missing { key: "value" })
        ));
    }

    #[test]
    fn test_default_pipeline_layout() {
        assert_eq!(
            Pipeline::default_pipeline().step_names(),
            vec![
                vec!["reset-directories"],
                vec!["discover-entries", "scan-components"],
                vec!["compile-content"],
                vec!["generate-styles", "copy-static", "prerender"],
                vec!["write-shells"],
                vec!["inject-head"],
            ]
        );
    }
}
