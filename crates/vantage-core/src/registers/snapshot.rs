//! # Register Snapshot
//!
//! Tracks, per canonical register, the value seen at the most recent read and
//! the baseline it is compared against.
//!
//! The baseline only moves when the program counter moves. Re-rendering at the
//! same stop (a second module, an explicit redraw, a register edited by the
//! user) compares against the same baseline, so a value that changed on the
//! last step stays highlighted until execution advances again:
//!
//! | read | pc | value | baseline after | changed |
//! |------|----|-------|----------------|---------|
//! | 1    | p0 | a     | a              | no      |
//! | 2    | p0 | a     | a              | no      |
//! | 3    | p1 | b     | a              | yes     |
//! | 4    | p1 | b     | a              | yes     |
//! | 5    | p2 | b     | b              | no      |

use std::collections::HashMap;

use tracing::trace;

use super::catalog::{AliasGroup, RegisterCatalog, RegisterView};
use crate::error::Result;
use crate::host::HostDebugger;
use crate::types::{Address, ExecutionContext, RegisterClass, RegisterValue};

/// Baseline commit state of a register entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitState
{
    /// Never read; the first read becomes the baseline.
    Fresh,
    /// Baseline established; it moves whenever the pc does.
    Tracking,
}

/// Diff state of one physical register.
#[derive(Debug, Clone)]
pub struct RegisterEntry
{
    canonical: String,
    group: AliasGroup,
    last: RegisterValue,
    baseline: RegisterValue,
    last_pc: Address,
    state: CommitState,
}

impl RegisterEntry
{
    fn new(group: &AliasGroup) -> Self
    {
        Self {
            canonical: group.canonical().to_string(),
            group: group.clone(),
            last: RegisterValue::default(),
            baseline: RegisterValue::default(),
            last_pc: Address::ZERO,
            state: CommitState::Fresh,
        }
    }

    /// Canonical (widest) register name.
    pub fn canonical(&self) -> &str
    {
        &self.canonical
    }

    /// The alias group the entry tracks.
    pub fn group(&self) -> &AliasGroup
    {
        &self.group
    }

    /// Raw value of the most recent read.
    pub fn last(&self) -> &RegisterValue
    {
        &self.last
    }

    /// Committed baseline.
    pub fn baseline(&self) -> &RegisterValue
    {
        &self.baseline
    }

    /// Program counter of the most recent read.
    pub fn last_pc(&self) -> Address
    {
        self.last_pc
    }

    /// Commit state.
    pub fn state(&self) -> CommitState
    {
        self.state
    }

    fn observe(&mut self, raw: RegisterValue, pc: Address) -> Observation
    {
        match self.state {
            CommitState::Fresh => {
                self.baseline = raw.clone();
                self.state = CommitState::Tracking;
            }
            CommitState::Tracking if pc != self.last_pc => {
                self.baseline = std::mem::replace(&mut self.last, RegisterValue::default());
            }
            CommitState::Tracking => {}
        }
        self.last_pc = pc;
        self.last = raw;

        let changed = self.last != self.baseline;
        if changed {
            trace!(register = %self.canonical, from = %self.baseline, to = %self.last, %pc, "register changed");
        }
        Observation {
            current: self.last.clone(),
            baseline: self.baseline.clone(),
            changed,
        }
    }
}

/// Raw result of observing the widest view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation
{
    /// Value just read
    pub current: RegisterValue,
    /// Baseline it was compared against
    pub baseline: RegisterValue,
    /// `current != baseline`
    pub changed: bool,
}

/// A register read through its alias group, narrowed to the requested view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterReading
{
    /// Canonical name of the group
    pub canonical: String,
    /// The view that was asked for
    pub view: RegisterView,
    /// Class of the group
    pub class: RegisterClass,
    /// Current value of the view
    pub value: RegisterValue,
    /// Baseline value of the view
    pub baseline: RegisterValue,
    /// Whether the view differs from its baseline
    pub changed: bool,
    /// The widest view's observation
    pub raw: Observation,
}

/// Per-register change tracking for one thread.
#[derive(Debug, Clone, Default)]
pub struct RegisterSnapshot
{
    entries: HashMap<String, RegisterEntry>,
}

impl RegisterSnapshot
{
    /// Empty snapshot; every register starts `Fresh`.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Record `raw` as the value of `group`'s widest view at `pc`.
    pub fn observe(&mut self, group: &AliasGroup, raw: RegisterValue, pc: Address) -> Observation
    {
        self.entries
            .entry(group.canonical().to_string())
            .or_insert_with(|| RegisterEntry::new(group))
            .observe(raw, pc)
    }

    /// Read the register called `name` (any view) from the host and diff it.
    ///
    /// Returns `Ok(None)` when the catalog has no such register or the host
    /// reports it unavailable.
    ///
    /// ## Errors
    ///
    /// Propagates host failures.
    pub fn read(
        &mut self,
        catalog: &RegisterCatalog,
        host: &dyn HostDebugger,
        context: &ExecutionContext,
        name: &str,
    ) -> Result<Option<RegisterReading>>
    {
        let Some(group) = catalog.resolve(name) else {
            return Ok(None);
        };
        let Some(view) = group.view(name) else {
            return Ok(None);
        };
        let Some(raw) = host.read_register(context, group.canonical())? else {
            return Ok(None);
        };

        let observation = self.observe(group, raw, context.pc);
        let value = view.extract(&observation.current);
        let baseline = view.extract(&observation.baseline);
        Ok(Some(RegisterReading {
            canonical: group.canonical().to_string(),
            view: view.clone(),
            class: group.class(),
            changed: value != baseline,
            value,
            baseline,
            raw: observation,
        }))
    }

    /// Entry for a canonical register name, if it has been read.
    pub fn entry(&self, canonical: &str) -> Option<&RegisterEntry>
    {
        self.entries.get(canonical)
    }

    /// Number of registers read so far.
    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    /// Whether no register has been read yet.
    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::types::{Architecture, RegisterDescriptor, RegisterSet};

    fn catalog() -> RegisterCatalog
    {
        let set = RegisterSet {
            name: "General Purpose Registers".into(),
            registers: vec![RegisterDescriptor::new("rax", 64), RegisterDescriptor::new("ah", 8)],
        };
        RegisterCatalog::build(Architecture::X86_64, &[set])
    }

    fn value(raw: u64) -> RegisterValue
    {
        RegisterValue::from_u64(raw, 64)
    }

    #[test]
    fn test_fresh_read_sets_baseline()
    {
        let catalog = catalog();
        let rax = catalog.resolve("rax").unwrap();
        let mut snapshot = RegisterSnapshot::new();

        let first = snapshot.observe(rax, value(7), Address::new(0x10));
        assert!(!first.changed);
        assert_eq!(first.baseline, value(7));
        assert_eq!(snapshot.entry("rax").unwrap().state(), CommitState::Tracking);
    }

    #[test]
    fn test_same_pc_keeps_baseline()
    {
        let catalog = catalog();
        let rax = catalog.resolve("rax").unwrap();
        let mut snapshot = RegisterSnapshot::new();
        let pc = Address::new(0x10);

        snapshot.observe(rax, value(1), pc);
        let edited = snapshot.observe(rax, value(2), pc);
        assert!(edited.changed);
        assert_eq!(edited.baseline, value(1));

        let again = snapshot.observe(rax, value(2), pc);
        assert!(again.changed);
        assert_eq!(snapshot.entry("rax").unwrap().last(), &value(2));
    }

    #[test]
    fn test_pc_move_commits_most_recent_value()
    {
        let catalog = catalog();
        let rax = catalog.resolve("rax").unwrap();
        let mut snapshot = RegisterSnapshot::new();

        snapshot.observe(rax, value(1), Address::new(0x10));
        snapshot.observe(rax, value(2), Address::new(0x10));
        let moved = snapshot.observe(rax, value(2), Address::new(0x14));
        assert!(!moved.changed);
        assert_eq!(moved.baseline, value(2));
    }

    #[test]
    fn test_views_share_one_entry()
    {
        let catalog = catalog();
        let ah = catalog.resolve("ah").unwrap();
        let mut snapshot = RegisterSnapshot::new();

        snapshot.observe(ah, value(0x1100), Address::new(0));
        snapshot.observe(catalog.resolve("rax").unwrap(), value(0x2200), Address::new(4));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.entry("rax").unwrap().baseline(), &value(0x1100));
    }
}
