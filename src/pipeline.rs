//! Stage-chaining pipeline framework.
//!
//! A *conduit* is the payload one stage hands to the next; a [`Pipe`] is the
//! type-erased, move-only carrier for exactly one conduit. Modules declare
//! which conduit type they expect and which they produce, and the
//! [`PipelineBuilder`] validates the whole chain once, at construction time,
//! before anything runs. Narrowing a pipe back to a concrete conduit is a
//! runtime capability test that returns a `Result`, never an unchecked cast.

use std::any::{type_name, Any, TypeId};
use std::time::Instant;

use anyhow::{bail, Result};

use crate::context::Context;

/// The sentinel conduit fed to the first module of a pipeline.
pub struct Empty;

/// Type-erased carrier moving one conduit between two adjacent modules.
pub struct Pipe {
    conduit: Box<dyn Any + Send>,
    label: &'static str,
}

impl Pipe {
    /// The sentinel pipe handed to the first module.
    pub fn empty() -> Self {
        Pipe::new(Empty)
    }

    /// Wraps a concrete conduit for the next module.
    pub fn new<T: Any + Send>(conduit: T) -> Self {
        Pipe {
            conduit: Box::new(conduit),
            label: type_name::<T>(),
        }
    }

    /// The type of the conduit currently carried.
    pub fn conduit_type(&self) -> TypeId {
        self.conduit.as_ref().type_id()
    }

    /// Narrows the pipe to the expected conduit type, consuming it. Fails
    /// when the predecessor sent something else.
    pub fn open<T: Any + Send>(self) -> Result<T> {
        match self.conduit.downcast::<T>() {
            Ok(conduit) => Ok(*conduit),
            Err(_) => bail!(
                "conduit mismatch: expected {}, received {}",
                type_name::<T>(),
                self.label
            ),
        }
    }
}

/// A pipeline stage.
///
/// `check` validates the module against the current configuration without
/// side effects; `run` consumes the predecessor's conduit and produces the
/// next one, and may perform network collectives. `expects` and `produces`
/// declare the conduit types used for chain validation.
pub trait Module: Send + Sync {
    fn name(&self) -> &'static str;

    /// Conduit type required from the immediate predecessor.
    fn expects(&self) -> TypeId;

    /// Conduit type handed to the successor.
    fn produces(&self) -> TypeId;

    /// Validates the configuration. Must not have side effects.
    fn check(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context, pipe: Pipe) -> Result<Pipe>;
}

/// A decorator around a module's `run`.
///
/// The middleware decides whether to call through to the wrapped module; not
/// doing so skips the module (and any middleware nested inside it) entirely
/// for that run, which is the mechanism for conditional stage bypass.
pub trait Middleware: Send + Sync {
    fn run(&self, module: &dyn Module, ctx: &Context, pipe: Pipe) -> Result<Pipe>;
}

/// A module wrapped by a middleware. Chain metadata delegates to the wrapped
/// module, so wrapping never changes the pipeline's shape.
pub struct Wrap {
    module: Box<dyn Module>,
    middleware: Box<dyn Middleware>,
}

impl Wrap {
    pub fn around(module: Box<dyn Module>, middleware: Box<dyn Middleware>) -> Box<Self> {
        Box::new(Wrap { module, middleware })
    }
}

impl Module for Wrap {
    fn name(&self) -> &'static str {
        self.module.name()
    }

    fn expects(&self) -> TypeId {
        self.module.expects()
    }

    fn produces(&self) -> TypeId {
        self.module.produces()
    }

    fn check(&self, ctx: &Context) -> bool {
        self.module.check(ctx)
    }

    fn run(&self, ctx: &Context, pipe: Pipe) -> Result<Pipe> {
        self.middleware.run(self.module.as_ref(), ctx, pipe)
    }
}

/// Middleware reporting each module's wall-clock duration on the coordinator.
pub struct Timed;

impl Middleware for Timed {
    fn run(&self, module: &dyn Module, ctx: &Context, pipe: Pipe) -> Result<Pipe> {
        let start = Instant::now();
        let result = module.run(ctx, pipe)?;
        if ctx.is_coordinator() {
            log::info!(
                "[{}] finished in {:.3}s",
                module.name(),
                start.elapsed().as_secs_f64()
            );
        }
        Ok(result)
    }
}

/// Collects modules in execution order and validates the chain once.
#[derive(Default)]
pub struct PipelineBuilder {
    modules: Vec<Box<dyn Module>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        PipelineBuilder::default()
    }

    pub fn append(mut self, module: Box<dyn Module>) -> Self {
        self.modules.push(module);
        self
    }

    /// Validates adjacency for the whole ordered list: every module must
    /// expect exactly the conduit its predecessor produces, and the first
    /// module must accept the empty sentinel. Failure is a configuration
    /// error; no stage has run.
    pub fn build(self) -> Result<Pipeline> {
        let mut previous = TypeId::of::<Empty>();
        let mut previous_name = "start of pipeline";

        for module in &self.modules {
            if module.expects() != previous {
                bail!(
                    "pipeline verification failed: module '{}' cannot follow {}",
                    module.name(),
                    previous_name
                );
            }
            previous = module.produces();
            previous_name = module.name();
        }

        Ok(Pipeline {
            modules: self.modules,
        })
    }
}

/// A validated, ordered list of modules.
pub struct Pipeline {
    modules: Vec<Box<dyn Module>>,
}

impl Pipeline {
    /// Runs every module's `check` first (all-or-nothing startup), then the
    /// modules strictly in declared order, forwarding each pipe to the next.
    pub fn run(&self, ctx: &Context) -> Result<Pipe> {
        for module in &self.modules {
            if !module.check(ctx) {
                bail!(
                    "pipeline verification failed: module '{}' reported an invalid configuration",
                    module.name()
                );
            }
        }

        let mut pipe = Pipe::empty();
        for module in &self.modules {
            pipe = module.run(ctx, pipe)?;
        }

        Ok(pipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Settings;
    use crate::database::SequenceDb;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct NumberConduit(i64);
    #[derive(Debug)]
    struct TextConduit(String);

    struct Producer {
        ran: Arc<AtomicUsize>,
    }

    impl Module for Producer {
        fn name(&self) -> &'static str {
            "producer"
        }
        fn expects(&self) -> TypeId {
            TypeId::of::<Empty>()
        }
        fn produces(&self) -> TypeId {
            TypeId::of::<NumberConduit>()
        }
        fn run(&self, _ctx: &Context, pipe: Pipe) -> Result<Pipe> {
            pipe.open::<Empty>()?;
            self.ran.fetch_add(1, Ordering::SeqCst);
            Ok(Pipe::new(NumberConduit(42)))
        }
    }

    struct Doubler {
        ran: Arc<AtomicUsize>,
    }

    impl Module for Doubler {
        fn name(&self) -> &'static str {
            "doubler"
        }
        fn expects(&self) -> TypeId {
            TypeId::of::<NumberConduit>()
        }
        fn produces(&self) -> TypeId {
            TypeId::of::<NumberConduit>()
        }
        fn run(&self, _ctx: &Context, pipe: Pipe) -> Result<Pipe> {
            let NumberConduit(value) = pipe.open()?;
            self.ran.fetch_add(1, Ordering::SeqCst);
            Ok(Pipe::new(NumberConduit(value * 2)))
        }
    }

    struct WantsText {
        ran: Arc<AtomicUsize>,
    }

    impl Module for WantsText {
        fn name(&self) -> &'static str {
            "wants-text"
        }
        fn expects(&self) -> TypeId {
            TypeId::of::<TextConduit>()
        }
        fn produces(&self) -> TypeId {
            TypeId::of::<TextConduit>()
        }
        fn run(&self, _ctx: &Context, pipe: Pipe) -> Result<Pipe> {
            let TextConduit(text) = pipe.open()?;
            self.ran.fetch_add(1, Ordering::SeqCst);
            Ok(Pipe::new(TextConduit(text)))
        }
    }

    struct NeverValid;

    impl Module for NeverValid {
        fn name(&self) -> &'static str {
            "never-valid"
        }
        fn expects(&self) -> TypeId {
            TypeId::of::<NumberConduit>()
        }
        fn produces(&self) -> TypeId {
            TypeId::of::<NumberConduit>()
        }
        fn check(&self, _ctx: &Context) -> bool {
            false
        }
        fn run(&self, _ctx: &Context, pipe: Pipe) -> Result<Pipe> {
            Ok(pipe)
        }
    }

    /// Middleware that never calls through: the wrapped module is skipped.
    struct Bypass;

    impl Middleware for Bypass {
        fn run(&self, _module: &dyn Module, _ctx: &Context, pipe: Pipe) -> Result<Pipe> {
            Ok(pipe)
        }
    }

    fn test_context() -> Context {
        Context::single(Arc::new(SequenceDb::new()), Settings::default())
    }

    #[test]
    fn valid_chain_runs_in_order() {
        let ran = Arc::new(AtomicUsize::new(0));
        let pipeline = PipelineBuilder::new()
            .append(Box::new(Producer { ran: ran.clone() }))
            .append(Box::new(Doubler { ran: ran.clone() }))
            .build()
            .unwrap();

        let pipe = pipeline.run(&test_context()).unwrap();
        let NumberConduit(value) = pipe.open().unwrap();
        assert_eq!(value, 84);
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn mismatched_chain_fails_before_running_anything() {
        let ran = Arc::new(AtomicUsize::new(0));
        let result = PipelineBuilder::new()
            .append(Box::new(Producer { ran: ran.clone() }))
            .append(Box::new(WantsText { ran: ran.clone() }))
            .build();

        assert!(result.is_err());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failed_check_aborts_the_whole_run() {
        let ran = Arc::new(AtomicUsize::new(0));
        let pipeline = PipelineBuilder::new()
            .append(Box::new(Producer { ran: ran.clone() }))
            .append(Box::new(NeverValid))
            .build()
            .unwrap();

        assert!(pipeline.run(&test_context()).is_err());
        // All-or-nothing startup: the valid first module never ran either.
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn middleware_can_skip_the_wrapped_module() {
        let ran = Arc::new(AtomicUsize::new(0));
        let pipeline = PipelineBuilder::new()
            .append(Box::new(Producer { ran: ran.clone() }))
            .append(Wrap::around(
                Box::new(Doubler { ran: ran.clone() }),
                Box::new(Bypass),
            ))
            .build()
            .unwrap();

        let pipe = pipeline.run(&test_context()).unwrap();
        let NumberConduit(value) = pipe.open().unwrap();
        assert_eq!(value, 42, "bypassed module must not transform the conduit");
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn narrowing_to_the_wrong_conduit_fails() {
        let pipe = Pipe::new(NumberConduit(7));
        let err = pipe.open::<TextConduit>().unwrap_err().to_string();
        assert!(err.contains("conduit mismatch"));
    }
}
