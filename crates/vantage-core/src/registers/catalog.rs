//! # Register Catalog
//!
//! Maps every register name a frame declares to the alias group it belongs
//! to: the widest view plus the narrower views that share its low bytes
//! (`rax`, `eax`, `ax`, `al`, `ah`). Built once per frame identity from the
//! host's register sets; resolving a name afterwards is a hash lookup.

use std::collections::HashMap;

use tracing::debug;

use crate::types::{Architecture, RegisterClass, RegisterSet, RegisterValue};

/// One named view of a physical register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterView
{
    /// View name (e.g. `ah`)
    pub name: String,
    /// Width in bits
    pub bits: u16,
    /// Bit offset of the view inside the widest register
    pub shift: u16,
}

impl RegisterView
{
    fn new(name: impl Into<String>, bits: u16, shift: u16) -> Self
    {
        Self {
            name: name.into(),
            bits,
            shift,
        }
    }

    /// This view's slice of the widest register's raw value.
    pub fn extract(&self, widest: &RegisterValue) -> RegisterValue
    {
        widest.extract(self.shift, self.bits)
    }
}

/// Views sharing one physical register, widest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasGroup
{
    views: Vec<RegisterView>,
    class: RegisterClass,
}

impl AliasGroup
{
    /// Canonical name: the widest view's name.
    pub fn canonical(&self) -> &str
    {
        &self.views[0].name
    }

    /// The widest view, the one the host is asked to read.
    pub fn widest(&self) -> &RegisterView
    {
        &self.views[0]
    }

    /// All views, widest to narrowest.
    pub fn views(&self) -> &[RegisterView]
    {
        &self.views
    }

    /// Look up a view of this group by name.
    pub fn view(&self, name: &str) -> Option<&RegisterView>
    {
        self.views.iter().find(|view| view.name == name)
    }

    /// Register class.
    pub fn class(&self) -> RegisterClass
    {
        self.class
    }
}

/// Alias graph for one frame.
#[derive(Debug, Clone)]
pub struct RegisterCatalog
{
    architecture: Architecture,
    groups: Vec<AliasGroup>,
    index: HashMap<String, usize>,
}

impl RegisterCatalog
{
    /// Scan the frame's register sets and build the alias graph.
    ///
    /// Groups are kept in the declaration order of their first declared
    /// member. Each declared register joins the family its architecture's
    /// alias table puts it in, and the widest declared member of the family
    /// becomes the canonical register; views the frame does not declare are
    /// left out. When a name appears in several sets the first declaration wins.
    pub fn build(architecture: Architecture, sets: &[RegisterSet]) -> Self
    {
        let mut declared: HashMap<&str, u16> = HashMap::new();
        for register in sets.iter().flat_map(|set| set.registers.iter()) {
            declared.entry(register.name.as_str()).or_insert(register.bits);
        }

        let mut groups = Vec::new();
        let mut index = HashMap::new();

        for set in sets {
            for register in &set.registers {
                if index.contains_key(&register.name) {
                    continue;
                }

                let mut views: Vec<RegisterView> = family(architecture, &register.name, register.bits)
                    .into_iter()
                    .filter(|view| declared.contains_key(view.name.as_str()) && !index.contains_key(&view.name))
                    .collect();
                // Stable sort keeps `al` ahead of `ah`.
                views.sort_by(|a, b| b.bits.cmp(&a.bits));
                let base = views[0].shift;
                for view in &mut views {
                    view.shift = view.shift.saturating_sub(base);
                }

                let class = classify(views[0].name.as_str(), set.is_general());
                let slot = groups.len();
                for view in &views {
                    index.insert(view.name.clone(), slot);
                }
                groups.push(AliasGroup { views, class });
            }
        }

        debug!(%architecture, groups = groups.len(), names = index.len(), "built register catalog");
        Self {
            architecture,
            groups,
            index,
        }
    }

    /// Resolve any view name to its alias group.
    pub fn resolve(&self, name: &str) -> Option<&AliasGroup>
    {
        self.index.get(name).map(|slot| &self.groups[*slot])
    }

    /// Every alias group, in declaration order.
    pub fn groups(&self) -> &[AliasGroup]
    {
        &self.groups
    }

    /// Groups of one class, in declaration order.
    pub fn groups_of(&self, class: RegisterClass) -> impl Iterator<Item = &AliasGroup>
    {
        self.groups.iter().filter(move |group| group.class == class)
    }

    /// The frame's condition flags register, if it declares one.
    pub fn flags(&self) -> Option<&AliasGroup>
    {
        self.groups_of(RegisterClass::Flags).next()
    }

    /// Architecture the catalog was built for.
    pub fn architecture(&self) -> Architecture
    {
        self.architecture
    }

    /// Number of alias groups.
    pub fn len(&self) -> usize
    {
        self.groups.len()
    }

    /// Whether the frame declared no registers at all.
    pub fn is_empty(&self) -> bool
    {
        self.groups.is_empty()
    }
}

const FLAGS_NAMES: &[&str] = &["eflags", "rflags", "flags", "cpsr", "pstate", "nzcv", "psr", "sr"];

fn classify(name: &str, in_general_set: bool) -> RegisterClass
{
    let lower = name.to_lowercase();
    if FLAGS_NAMES.contains(&lower.as_str()) {
        RegisterClass::Flags
    } else if !in_general_set {
        RegisterClass::Vector
    } else if is_segment(&lower) {
        RegisterClass::Segment
    } else {
        RegisterClass::GeneralPurpose
    }
}

/// Segment selectors are the two-letter `?s` registers; their hidden bases
/// follow the `<selector>_base` convention.
fn is_segment(name: &str) -> bool
{
    let selector = name.strip_suffix("_base").unwrap_or(name);
    selector.len() == 2 && selector.ends_with('s') && selector.starts_with(['c', 'd', 'e', 'f', 'g', 's'])
}

/// The full alias family of `name`: its root register first, then every
/// narrower view the architecture defines over that root.
fn family(architecture: Architecture, name: &str, bits: u16) -> Vec<RegisterView>
{
    let root = family_root(architecture, name);
    let (root_name, root_bits) = match root {
        Some(root) if root != name => (root, 64),
        _ => (name.to_string(), bits),
    };
    let mut views = vec![RegisterView::new(root_name.clone(), root_bits, 0)];
    views.extend(match architecture {
        Architecture::X86_64 => x86_64_views(&root_name),
        Architecture::Arm64 => arm64_views(&root_name),
        Architecture::Unknown => Vec::new(),
    });
    views
}

/// The widest register of the family `name` belongs to.
fn family_root(architecture: Architecture, name: &str) -> Option<String>
{
    match architecture {
        Architecture::X86_64 => x86_64_root(name),
        Architecture::Arm64 => arm64_root(name),
        Architecture::Unknown => None,
    }
}

fn x86_64_root(name: &str) -> Option<String>
{
    const LEGACY: &[&str] = &["si", "di", "bp", "sp"];

    if let Some(rest) = name.strip_prefix('r') {
        if let Some(digits) = rest.strip_suffix(['d', 'w', 'b', 'l']) {
            if matches!(digits.parse::<u8>(), Ok(8..=15)) {
                return Some(format!("r{digits}"));
            }
        }
        return matches!(rest.parse::<u8>(), Ok(8..=15)).then(|| name.to_string());
    }
    match name {
        "eip" | "ip" => return Some("rip".to_string()),
        "eflags" => return Some("rflags".to_string()),
        _ => {}
    }

    let bare = name.strip_prefix('e').filter(|rest| rest.len() == 2).unwrap_or(name);
    if let [letter @ (b'a' | b'b' | b'c' | b'd'), b'x' | b'l' | b'h'] = bare.as_bytes() {
        return Some(format!("r{}x", char::from(*letter)));
    }
    let legacy = bare.strip_suffix('l').filter(|rest| rest.len() == 2).unwrap_or(bare);
    LEGACY.contains(&legacy).then(|| format!("r{legacy}"))
}

fn arm64_root(name: &str) -> Option<String>
{
    match name {
        "fp" => Some("x29".to_string()),
        "lr" => Some("x30".to_string()),
        "wsp" => Some("sp".to_string()),
        _ => name
            .strip_prefix('w')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| *n <= 30)
            .map(|n| format!("x{n}")),
    }
}

fn x86_64_views(name: &str) -> Vec<RegisterView>
{
    match name {
        "rax" | "rbx" | "rcx" | "rdx" => {
            let letter = &name[1..2];
            vec![
                RegisterView::new(format!("e{letter}x"), 32, 0),
                RegisterView::new(format!("{letter}x"), 16, 0),
                RegisterView::new(format!("{letter}l"), 8, 0),
                RegisterView::new(format!("{letter}h"), 8, 8),
            ]
        }
        "rsi" | "rdi" | "rbp" | "rsp" => {
            let base = &name[1..];
            vec![
                RegisterView::new(format!("e{base}"), 32, 0),
                RegisterView::new(base, 16, 0),
                RegisterView::new(format!("{base}l"), 8, 0),
            ]
        }
        "rip" => vec![RegisterView::new("eip", 32, 0), RegisterView::new("ip", 16, 0)],
        "rflags" => vec![RegisterView::new("eflags", 32, 0)],
        _ => match name.strip_prefix('r').and_then(|n| n.parse::<u8>().ok()) {
            Some(8..=15) => vec![
                RegisterView::new(format!("{name}d"), 32, 0),
                RegisterView::new(format!("{name}w"), 16, 0),
                RegisterView::new(format!("{name}b"), 8, 0),
                RegisterView::new(format!("{name}l"), 8, 0),
            ],
            _ => Vec::new(),
        },
    }
}

fn arm64_views(name: &str) -> Vec<RegisterView>
{
    match name {
        "sp" => vec![RegisterView::new("wsp", 32, 0)],
        "x29" => vec![RegisterView::new("fp", 64, 0), RegisterView::new("w29", 32, 0)],
        "x30" => vec![RegisterView::new("lr", 64, 0), RegisterView::new("w30", 32, 0)],
        _ => match name.strip_prefix('x').and_then(|n| n.parse::<u8>().ok()) {
            Some(n @ 0..=28) => vec![RegisterView::new(format!("w{n}"), 32, 0)],
            _ => Vec::new(),
        },
    }
}
