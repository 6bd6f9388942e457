use crate::data::Data;
use crate::error::Error;
use crate::nodes::NodeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Allow index rewrites when the data exposes a value index.
    pub use_index: bool,
    /// Relative paths only use an index when its estimate does not exceed this value.
    pub selectivity_ceiling: u64,
    /// Memoize the result of absolute paths until the data version changes.
    pub cache_absolute: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            use_index: true,
            selectivity_ceiling: 100,
            cache_absolute: true,
        }
    }
}

impl CompileOptions {
    pub fn builder() -> CompileOptionsBuilder {
        CompileOptionsBuilder::new()
    }
}

pub struct CompileOptionsBuilder {
    opts: CompileOptions,
}

impl Default for CompileOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CompileOptionsBuilder {
    pub fn new() -> Self {
        Self {
            opts: CompileOptions::default(),
        }
    }

    pub fn with_index(mut self, enabled: bool) -> Self {
        self.opts.use_index = enabled;
        self
    }

    pub fn with_selectivity_ceiling(mut self, ceiling: u64) -> Self {
        self.opts.selectivity_ceiling = ceiling;
        self
    }

    pub fn with_result_cache(mut self, enabled: bool) -> Self {
        self.opts.cache_absolute = enabled;
        self
    }

    pub fn build(self) -> CompileOptions {
        self.opts
    }
}

/// Static context of a compilation.
///
/// The data binding is optional so that callers can compile without a document; any
/// location path then fails with `XPDY0002`.
#[derive(Clone, Copy)]
pub struct CompileContext<'a> {
    pub data: Option<&'a dyn Data>,
    pub options: CompileOptions,
    /// Set while compiling a comparison operand opposite a literal inside a predicate of
    /// a step whose element test names a leaf element.
    pub(crate) leaf: bool,
}

impl<'a> CompileContext<'a> {
    pub fn new(data: &'a dyn Data) -> Self {
        Self {
            data: Some(data),
            options: CompileOptions::default(),
            leaf: false,
        }
    }

    pub fn without_data() -> Self {
        Self {
            data: None,
            options: CompileOptions::default(),
            leaf: false,
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub(crate) fn data(&self) -> Result<&'a dyn Data, Error> {
        self.data.ok_or_else(Error::no_data_context)
    }

    pub(crate) fn with_leaf(&self, leaf: bool) -> Self {
        Self { leaf, ..*self }
    }
}

/// Shared flag for cooperative cancellation. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Dynamic context of an evaluation: the bound document, the context node set and an
/// optional stop signal.
#[derive(Clone)]
pub struct EvalContext<'a> {
    data: &'a dyn Data,
    context: NodeSet,
    stop: Option<StopSignal>,
}

impl<'a> EvalContext<'a> {
    pub fn builder(data: &'a dyn Data) -> EvalContextBuilder<'a> {
        EvalContextBuilder::new(data)
    }

    pub fn new(data: &'a dyn Data) -> Self {
        Self::builder(data).build()
    }

    pub fn data(&self) -> &'a dyn Data {
        self.data
    }

    pub fn context(&self) -> &NodeSet {
        &self.context
    }

    pub fn check_stop(&self) -> Result<(), Error> {
        match &self.stop {
            Some(s) if s.is_requested() => Err(Error::stopped()),
            _ => Ok(()),
        }
    }
}

pub struct EvalContextBuilder<'a> {
    ctx: EvalContext<'a>,
}

impl<'a> EvalContextBuilder<'a> {
    pub fn new(data: &'a dyn Data) -> Self {
        let context = if data.is_empty() {
            NodeSet::empty()
        } else {
            NodeSet::single(0)
        };
        Self {
            ctx: EvalContext {
                data,
                context,
                stop: None,
            },
        }
    }

    pub fn with_context(mut self, context: NodeSet) -> Self {
        self.ctx.context = context;
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.ctx.stop = Some(stop);
        self
    }

    pub fn build(self) -> EvalContext<'a> {
        self.ctx
    }
}
