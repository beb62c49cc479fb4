//! Instruction window growth across symbols

use vantage_core::host::{ScriptedHost, ScriptedSymbol};
use vantage_core::types::{Address, Architecture, FrameIdentity, ThreadId};
use vantage_core::disasm::InstructionWindow;
use vantage_core::VantageError;

fn frame(address: u64) -> FrameIdentity
{
    FrameIdentity {
        address: Address::new(address),
        thread: ThreadId(1),
        architecture: Architecture::X86_64,
    }
}

/// Five adjacent symbols of four 4-byte instructions each, starting at 0x1000.
fn chain() -> ScriptedHost
{
    let mut host = ScriptedHost::new(Architecture::X86_64, Vec::new());
    for index in 0..5u64 {
        host.add_symbol(ScriptedSymbol::uniform(format!("f{index}"), 0x1000 + index * 0x10, 4, 4))
            .unwrap();
    }
    host
}

#[test]
fn test_chain_grows_to_every_symbol_and_terminates()
{
    let host = chain();
    let mut window = InstructionWindow::new();

    let view = window.around(&host, frame(1), Address::new(0x1024), 100, 100).unwrap();

    assert_eq!(view.instructions.len(), 20);
    assert_eq!(view.pc_index, 9);
    assert_eq!(view.leading_padding, 91);
    assert_eq!(view.trailing_padding, 90);
    assert_eq!(view.leading_padding + view.instructions.len() + view.trailing_padding, 201);
    for (index, instruction) in view.instructions.iter().enumerate() {
        assert_eq!(instruction.address, Address::new(0x1000 + 4 * index as u64));
    }
    assert_eq!(view.instructions[0].location(), "f0+0");
    assert_eq!(view.instructions[19].location(), "f4+12");
}

#[test]
fn test_small_window_stays_centered()
{
    let host = chain();
    let mut window = InstructionWindow::new();

    let view = window.around(&host, frame(1), Address::new(0x1020), 2, 3).unwrap();

    assert_eq!(view.instructions.len(), 6);
    assert_eq!(view.pc_index, 2);
    assert_eq!(view.leading_padding, 0);
    assert_eq!(view.trailing_padding, 0);
    assert_eq!(view.instructions[0].symbol, "f1");
    assert_eq!(view.current().unwrap().location(), "f2+0");
}

#[test]
fn test_gap_becomes_padding()
{
    let mut host = ScriptedHost::new(Architecture::X86_64, Vec::new());
    host.add_symbol(ScriptedSymbol::uniform("low", 0x1000, 4, 4)).unwrap();
    host.add_symbol(ScriptedSymbol::uniform("high", 0x2000, 2, 4)).unwrap();
    let mut window = InstructionWindow::new();

    let view = window.around(&host, frame(1), Address::new(0x2000), 3, 3).unwrap();

    assert_eq!(view.instructions.len(), 2);
    assert_eq!(view.leading_padding, 3);
    assert_eq!(view.trailing_padding, 2);
}

#[test]
fn test_failed_neighbour_disassembly_becomes_padding()
{
    let mut host = chain();
    host.fail_disassembly("f1");
    let mut window = InstructionWindow::new();

    let view = window.around(&host, frame(1), Address::new(0x1020), 8, 0).unwrap();

    assert_eq!(view.instructions.len(), 1);
    assert_eq!(view.leading_padding, 8);
}

#[test]
fn test_empty_neighbour_stops_growth()
{
    let mut host = ScriptedHost::new(Architecture::X86_64, Vec::new());
    host.add_symbol(ScriptedSymbol::new("blob", 0x1000, Vec::new()).with_size(0x10)).unwrap();
    host.add_symbol(ScriptedSymbol::uniform("code", 0x1010, 2, 4)).unwrap();
    let mut window = InstructionWindow::new();

    let view = window.around(&host, frame(1), Address::new(0x1010), 4, 0).unwrap();

    assert_eq!(view.leading_padding, 4);
    assert_eq!(window.cached().len(), 2);
}

#[test]
fn test_stale_cache_is_rebuilt_for_distant_pc()
{
    let mut host = ScriptedHost::new(Architecture::X86_64, Vec::new());
    host.add_symbol(ScriptedSymbol::uniform("near", 0x1000, 4, 4)).unwrap();
    host.add_symbol(ScriptedSymbol::uniform("far", 0x8000, 4, 4)).unwrap();
    let mut window = InstructionWindow::new();

    window.around(&host, frame(1), Address::new(0x1000), 0, 0).unwrap();
    let view = window.around(&host, frame(1), Address::new(0x8004), 0, 0).unwrap();

    assert_eq!(view.current().unwrap().symbol, "far");
    assert!(window.cached().iter().all(|instruction| instruction.symbol == "far"));
}

#[test]
fn test_identity_change_discards_grown_cache()
{
    let host = chain();
    let mut window = InstructionWindow::new();

    window.around(&host, frame(1), Address::new(0x1020), 100, 100).unwrap();
    assert_eq!(window.cached().len(), 20);

    window.around(&host, frame(2), Address::new(0x1020), 0, 0).unwrap();
    assert_eq!(window.identity(), Some(frame(2)));
    assert_eq!(window.cached().len(), 4);
}

#[test]
fn test_pc_between_instructions_is_fatal()
{
    let host = chain();
    let mut window = InstructionWindow::new();

    let err = window.around(&host, frame(1), Address::new(0x1022), 1, 1).unwrap_err();
    assert!(matches!(err, VantageError::PcNotInSymbol { .. }));
}
