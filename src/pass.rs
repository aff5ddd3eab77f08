//! The pass interface and the state threaded through a compilation run.

use crate::config::Options;
use crate::error::Result;
use crate::ir::Module;

/// State for one compilation run.
///
/// Holds the options and the assertion counter. The counter starts at zero
/// when the context is created and advances once per inserted assertion,
/// whether or not identifiers are enabled. With identifiers enabled, its value
/// before an insertion is that assertion's identifier, so identifiers are
/// never reused, even if their assertion is later pruned.
#[derive(Clone, Debug, Default)]
pub struct Context {
    options: Options,
    next_id: u32,
}

impl Context {
    /// Start a new run.
    pub fn new(options: Options) -> Self {
        Context {
            options,
            next_id: 0,
        }
    }

    /// This run's options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The number of assertions inserted so far.
    pub fn assertions_issued(&self) -> u32 {
        self.next_id
    }

    pub(crate) fn next_assert_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// A transformation over a whole module.
pub trait ModulePass {
    /// Name of the pass for logging.
    fn name(&self) -> &str;

    /// Run the pass.
    ///
    /// Returns whether the module was modified.
    fn run(&mut self, cx: &mut Context, module: &mut Module) -> Result<bool>;
}

/// Run `passes` over `module` in order, stopping at the first error.
///
/// Returns whether any pass modified the module.
pub fn run_passes(
    cx: &mut Context,
    module: &mut Module,
    passes: &mut [&mut dyn ModulePass],
) -> Result<bool> {
    let mut changed = false;
    for pass in passes.iter_mut() {
        let modified = pass.run(cx, module)?;
        log::debug!("pass `{}`: modified = {}", pass.name(), modified);
        changed |= modified;
    }
    Ok(changed)
}
