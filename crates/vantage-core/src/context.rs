//! # Engine Context
//!
//! Owner of every cache the dashboard keeps between stops.
//!
//! - The register catalog and snapshot belong to a thread and architecture.
//!   Moving between frames of one thread keeps them, so a register changed
//!   by a callee still shows as changed after it returns.
//! - The instruction window belongs to a full [`FrameIdentity`]
//!   (frame address, thread and architecture).
//!
//! Rebuilds construct the replacement completely before swapping it in; a
//! failed rebuild leaves no half-built cache behind.
//!
//! [`FrameIdentity`]: crate::types::FrameIdentity

use tracing::debug;

use crate::branch;
use crate::disasm::{InstructionWindow, WindowView};
use crate::error::{Result, VantageError};
use crate::host::HostDebugger;
use crate::registers::{ConditionFlags, RegisterCatalog, RegisterReading, RegisterSnapshot};
use crate::types::{Architecture, ExecutionContext, ThreadId};

#[derive(Debug, Clone)]
struct CatalogSlot
{
    key: (ThreadId, Architecture),
    catalog: RegisterCatalog,
}

/// Caches shared by the display modules of one dashboard.
#[derive(Debug, Clone, Default)]
pub struct EngineContext
{
    catalog: Option<CatalogSlot>,
    snapshot: RegisterSnapshot,
    window: InstructionWindow,
}

impl EngineContext
{
    /// Empty context; caches fill on first use.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// The host's current execution context.
    ///
    /// ## Errors
    ///
    /// `NoExecutionContext` if nothing is stopped, host errors otherwise.
    pub fn execution_context(host: &dyn HostDebugger) -> Result<ExecutionContext>
    {
        host.execution_context()?.ok_or(VantageError::NoExecutionContext)
    }

    /// Register catalog for `context`'s thread, rebuilt if the thread or
    /// architecture changed. A rebuild also resets the snapshot.
    ///
    /// ## Errors
    ///
    /// Host errors while listing register sets.
    pub fn catalog(&mut self, host: &dyn HostDebugger, context: &ExecutionContext) -> Result<&RegisterCatalog>
    {
        let key = (context.thread(), context.architecture());
        let slot = match self.catalog.take() {
            Some(slot) if slot.key == key => slot,
            _ => {
                let sets = host.register_sets(context)?;
                let catalog = RegisterCatalog::build(context.architecture(), &sets);
                debug!(thread = context.thread().raw(), architecture = %context.architecture(), "register catalog replaced");
                self.snapshot = RegisterSnapshot::new();
                CatalogSlot { key, catalog }
            }
        };
        Ok(&self.catalog.insert(slot).catalog)
    }

    /// Read a register (any view) and diff it against its baseline.
    ///
    /// ## Errors
    ///
    /// Host errors.
    pub fn read_register(
        &mut self,
        host: &dyn HostDebugger,
        context: &ExecutionContext,
        name: &str,
    ) -> Result<Option<RegisterReading>>
    {
        self.catalog(host, context)?;
        let Some(slot) = &self.catalog else {
            return Ok(None);
        };
        self.snapshot.read(&slot.catalog, host, context, name)
    }

    /// Read a register view as an integer without touching the snapshot.
    ///
    /// `None` when the register is unknown, unavailable or wider than 64 bits.
    ///
    /// ## Errors
    ///
    /// Host errors.
    pub fn read_raw(&mut self, host: &dyn HostDebugger, context: &ExecutionContext, name: &str) -> Result<Option<u64>>
    {
        let catalog = self.catalog(host, context)?;
        let Some(group) = catalog.resolve(name) else {
            return Ok(None);
        };
        let Some(view) = group.view(name) else {
            return Ok(None);
        };
        Ok(host
            .read_register(context, group.canonical())?
            .and_then(|raw| view.extract(&raw).as_u64()))
    }

    /// Decoded condition flags of the frame, if it has a flags register.
    ///
    /// ## Errors
    ///
    /// Host errors.
    pub fn condition_flags(
        &mut self,
        host: &dyn HostDebugger,
        context: &ExecutionContext,
    ) -> Result<Option<ConditionFlags>>
    {
        let catalog = self.catalog(host, context)?;
        let Some(flags) = catalog.flags() else {
            return Ok(None);
        };
        let raw = host.read_register(context, flags.canonical())?;
        Ok(raw
            .and_then(|raw| raw.as_u64())
            .and_then(|raw| ConditionFlags::decode(context.architecture(), raw)))
    }

    /// Instruction window around `context`'s pc.
    ///
    /// ## Errors
    ///
    /// As [`InstructionWindow::around`].
    pub fn window(
        &mut self,
        host: &dyn HostDebugger,
        context: &ExecutionContext,
        before: usize,
        after: usize,
    ) -> Result<WindowView>
    {
        self.window.around(host, context.frame, context.pc, before, after)
    }

    /// Predict the outcome of `mnemonic` at the current stop.
    ///
    /// Prediction is best effort: register reads that fail count as
    /// unavailable and yield `Ok(None)`.
    ///
    /// ## Errors
    ///
    /// Host errors while reading the flags register.
    pub fn predict(&mut self, host: &dyn HostDebugger, context: &ExecutionContext, mnemonic: &str) -> Result<Option<bool>>
    {
        if branch::classify(mnemonic).is_none() {
            return Ok(None);
        }
        let flags = self.condition_flags(host, context)?;
        let mut reader = |name: &str| match self.read_raw(host, context, name) {
            Ok(value) => value,
            Err(err) => {
                debug!(register = name, error = %err, "register unavailable for prediction");
                None
            }
        };
        Ok(branch::predict(mnemonic, flags, &mut reader))
    }

    /// The register snapshot.
    pub fn snapshot(&self) -> &RegisterSnapshot
    {
        &self.snapshot
    }

    /// The instruction window cache.
    pub fn instruction_window(&self) -> &InstructionWindow
    {
        &self.window
    }

    /// Drop every cache.
    pub fn invalidate(&mut self)
    {
        debug!("engine caches invalidated");
        self.catalog = None;
        self.snapshot = RegisterSnapshot::new();
        self.window.clear();
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::host::{ScriptedHost, ScriptedStop};
    use crate::types::{RegisterDescriptor, RegisterSet};

    fn host() -> ScriptedHost
    {
        let set = RegisterSet {
            name: "General Purpose Registers".into(),
            registers: vec![
                RegisterDescriptor::new("rax", 64),
                RegisterDescriptor::new("ecx", 32),
                RegisterDescriptor::new("eflags", 32),
            ],
        };
        let mut host = ScriptedHost::new(Architecture::X86_64, vec![set]);
        host.push_stop(ScriptedStop::at(0x10).thread(1).register("rax", 5_u64).register("eflags", 0x246_u64));
        host.push_stop(ScriptedStop::at(0x14).thread(2).register("rax", 6_u64));
        host
    }

    #[test]
    fn test_thread_switch_resets_snapshot()
    {
        let mut host = host();
        let mut engine = EngineContext::new();

        let context = EngineContext::execution_context(&host).unwrap();
        engine.read_register(&host, &context, "rax").unwrap().unwrap();
        assert_eq!(engine.snapshot().len(), 1);

        assert!(host.advance());
        let context = EngineContext::execution_context(&host).unwrap();
        let reading = engine.read_register(&host, &context, "rax").unwrap().unwrap();
        assert!(!reading.changed);
        assert_eq!(reading.value.as_u64(), Some(6));
    }

    #[test]
    fn test_condition_flags_and_prediction()
    {
        let host = host();
        let mut engine = EngineContext::new();
        let context = EngineContext::execution_context(&host).unwrap();

        let flags = engine.condition_flags(&host, &context).unwrap().unwrap();
        assert!(flags.zero);
        assert_eq!(engine.predict(&host, &context, "je").unwrap(), Some(true));
        assert_eq!(engine.predict(&host, &context, "jecxz").unwrap(), Some(true));
        assert_eq!(engine.predict(&host, &context, "jrcxz").unwrap(), None);
        assert_eq!(engine.predict(&host, &context, "nop").unwrap(), None);
        assert!(engine.snapshot().is_empty());
    }

    #[test]
    fn test_no_stop_is_an_error()
    {
        let host = ScriptedHost::new(Architecture::X86_64, Vec::new());
        assert!(matches!(
            EngineContext::execution_context(&host),
            Err(VantageError::NoExecutionContext)
        ));
    }
}
