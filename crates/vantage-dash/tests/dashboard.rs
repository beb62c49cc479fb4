//! Rendering, failure isolation and output routing of the dashboard

use std::fs;
use std::io::Write;

use tempfile::tempdir;
use vantage_core::host::{ScriptedHost, ScriptedInstruction, ScriptedStop, ScriptedSymbol};
use vantage_core::output::{DestinationKey, FileOpener, OutputMultiplexer, SharedBuffer};
use vantage_core::types::{Architecture, RegisterDescriptor, RegisterSet};
use vantage_core::{TerminalSize, VantageError};
use vantage_dash::{DashError, Dashboard, DashboardConfig, DisplayModule, Settings, StopContext};

fn host() -> ScriptedHost
{
    let set = RegisterSet {
        name: "General Purpose Registers".to_string(),
        registers: vec![RegisterDescriptor::new("rax", 64), RegisterDescriptor::new("eflags", 32)],
    };
    let mut host = ScriptedHost::new(Architecture::X86_64, vec![set])
        .with_symbol(ScriptedSymbol::new(
            "main",
            0x401000,
            vec![
                ScriptedInstruction::new(1, "push").operands("rbp"),
                ScriptedInstruction::new(2, "jne").operands("0x401000"),
                ScriptedInstruction::new(1, "ret"),
            ],
        ))
        .unwrap();
    host.set_terminal_size(TerminalSize::new(60, 20));
    host.push_stop(ScriptedStop::at(0x401001).register("rax", 1_u64).register("eflags", 0x202_u64));
    host.push_stop(ScriptedStop::at(0x401003).register("rax", 2_u64));
    host
}

fn setup() -> (Dashboard, SharedBuffer)
{
    let console = SharedBuffer::new();
    let mut dashboard = Dashboard::new(OutputMultiplexer::with_parts(Box::new(console.clone()), Box::new(FileOpener)));
    dashboard.set_setting("style", "off").unwrap();
    (dashboard, console)
}

struct Broken;

impl DisplayModule for Broken
{
    fn name(&self) -> &'static str
    {
        "broken"
    }

    fn title(&self) -> &'static str
    {
        "Broken"
    }

    fn settings(&self) -> Settings
    {
        Settings::new(self.name())
    }

    fn render(
        &mut self,
        _size: TerminalSize,
        _stop: &mut StopContext<'_>,
        _settings: &Settings,
        out: &mut dyn Write,
    ) -> vantage_dash::Result<()>
    {
        writeln!(out, "half a line")?;
        Err(VantageError::host("read memory", "target vanished").into())
    }
}

#[test]
fn test_renders_every_module_in_layout_order()
{
    let host = host();
    let (mut dashboard, console) = setup();

    let report = dashboard.render(&host).unwrap();
    assert_eq!(report.rendered, vec!["registers", "assembly"]);
    assert!(report.failed.is_empty());

    let text = console.contents();
    let registers = text.find("─── Registers").unwrap();
    let assembly = text.find("─── Assembly").unwrap();
    assert!(registers < assembly);
    assert!(text.contains("=> 0x0000000000401001 main+1 jne  0x401000 [taken]"));
    assert!(text.lines().all(|line| line.chars().count() <= 60 || !line.starts_with('─')));
}

#[test]
fn test_failing_module_does_not_suppress_others()
{
    let host = host();
    let console = SharedBuffer::new();
    let modules: Vec<Box<dyn DisplayModule>> = vec![Box::new(Broken), Box::new(vantage_dash::modules::RegistersModule)];
    let mut dashboard = Dashboard::with_modules(
        OutputMultiplexer::with_parts(Box::new(console.clone()), Box::new(FileOpener)),
        modules,
    );
    dashboard.set_setting("style", "off").unwrap();

    let report = dashboard.render(&host).unwrap();
    assert_eq!(report.rendered, vec!["registers"]);
    assert_eq!(report.failed.len(), 1);

    let text = console.contents();
    assert!(text.starts_with("broken: error: Host call failed: read memory: target vanished\n"));
    assert!(!text.contains("half a line"));
    assert!(text.contains("rax 0x0000000000000001"));
}

struct ClosedPipe;

impl Write for ClosedPipe
{
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize>
    {
        Err(std::io::ErrorKind::BrokenPipe.into())
    }

    fn flush(&mut self) -> std::io::Result<()>
    {
        Ok(())
    }
}

#[test]
fn test_failure_reported_once_when_diagnostic_cannot_be_written()
{
    let host = host();
    let modules: Vec<Box<dyn DisplayModule>> = vec![Box::new(Broken), Box::new(vantage_dash::modules::RegistersModule)];
    let mut dashboard = Dashboard::with_modules(
        OutputMultiplexer::with_parts(Box::new(ClosedPipe), Box::new(FileOpener)),
        modules,
    );

    let report = dashboard.render(&host).unwrap();
    assert!(report.rendered.is_empty());
    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.failed[0].0, "broken");
    assert!(report.failed[0].1.contains("target vanished"));
    assert_eq!(report.failed[1].0, "registers");
}

#[test]
fn test_pc_outside_symbols_fails_only_assembly()
{
    let mut host = host();
    host.push_stop(ScriptedStop::at(0x9000));
    assert!(host.advance());
    assert!(host.advance());
    let (mut dashboard, console) = setup();

    let report = dashboard.render(&host).unwrap();
    assert_eq!(report.rendered, vec!["registers"]);
    assert_eq!(report.failed[0].0, "assembly");
    assert!(console.contents().contains("assembly: error: Program counter 0x0000000000009000"));
}

#[test]
fn test_disabled_dashboard_and_modules()
{
    let host = host();
    let (mut dashboard, console) = setup();

    dashboard.set_enabled(false);
    assert_eq!(dashboard.render(&host).unwrap(), vantage_dash::RenderReport::default());
    assert!(console.contents().is_empty());

    dashboard.set_enabled(true);
    dashboard.set_module_enabled("registers", false).unwrap();
    let report = dashboard.render(&host).unwrap();
    assert_eq!(report.rendered, vec!["assembly"]);
    assert!(matches!(
        dashboard.set_module_enabled("memory", true),
        Err(DashError::UnknownModule(_))
    ));
}

#[test]
fn test_modules_inherit_dashboard_output()
{
    let dir = tempdir().unwrap();
    let shared_path = dir.path().join("dashboard.txt");
    let shared = DestinationKey::File(shared_path.clone());
    let own = DestinationKey::File(dir.path().join("assembly.txt"));
    let host = host();
    let (mut dashboard, console) = setup();

    dashboard.set_output(shared.clone()).unwrap();
    assert_eq!(dashboard.output().writer_count(&shared), 2);

    dashboard.set_module_output("assembly", Some(own.clone())).unwrap();
    assert_eq!(dashboard.output().writer_count(&shared), 1);
    assert_eq!(dashboard.output().writer_count(&own), 1);

    dashboard.render(&host).unwrap();
    dashboard.set_output(DestinationKey::Console).unwrap();
    assert!(!dashboard.output().is_open(&shared));
    assert!(dashboard.output().is_open(&own));
    assert_eq!(dashboard.module("registers").unwrap().destination(), &DestinationKey::Console);

    dashboard.render(&host).unwrap();
    assert!(fs::read_to_string(&shared_path).unwrap().contains("─── Registers"));
    assert!(console.contents().contains("─── Registers"));
    assert!(!console.contents().contains("─── Assembly"));

    dashboard.set_module_output("assembly", None).unwrap();
    assert!(!dashboard.output().is_open(&own));
    assert_eq!(dashboard.module("assembly").unwrap().settings().str("output"), "");
}

#[test]
fn test_layout_reorders_modules()
{
    let (mut dashboard, _console) = setup();

    dashboard.set_layout(&["assembly"]).unwrap();
    assert_eq!(dashboard.layout(), vec!["assembly", "registers"]);
    assert_eq!(dashboard.settings().str("layout"), "assembly registers");

    assert!(dashboard.set_layout(&["registers", "memory"]).is_err());
    assert_eq!(dashboard.layout(), vec!["assembly", "registers"]);
}

#[test]
fn test_config_round_trip()
{
    let (mut dashboard, _console) = setup();
    dashboard.set_module_setting("assembly", "instructions-before", "3").unwrap();
    dashboard.set_module_enabled("registers", false).unwrap();
    dashboard.set_layout(&["assembly", "registers"]).unwrap();

    let json = dashboard.config().to_json().unwrap();
    let (mut restored, _console) = setup();
    restored.apply_config(&DashboardConfig::from_json(&json).unwrap()).unwrap();

    assert_eq!(restored.config(), dashboard.config());
    assert_eq!(restored.module("assembly").unwrap().settings().int("instructions-before"), 3);
    assert!(!restored.module("registers").unwrap().enabled());
}

#[test]
fn test_invalid_config_changes_nothing()
{
    let (mut dashboard, _console) = setup();
    let before = dashboard.config();

    let wrong_type = DashboardConfig::from_json(
        r#"{ "enabled": false, "modules": { "assembly": { "settings": { "instructions-before": "wide" } } } }"#,
    )
    .unwrap();
    assert!(matches!(
        dashboard.apply_config(&wrong_type),
        Err(DashError::InvalidValue { .. })
    ));

    let unknown = DashboardConfig::from_json(r#"{ "modules": { "memory": { "enabled": true } } }"#).unwrap();
    assert!(matches!(dashboard.apply_config(&unknown), Err(DashError::UnknownModule(_))));

    assert_eq!(dashboard.config(), before);
}
