//! # Assembly Module
//!
//! Disassembly around the program counter. Conditional instructions in the
//! window carry the outcome predicted from the current flags and counters.
//!
//! The number of instructions on each side of the pc is capped at
//! [`MAX_SIDE`], whatever the settings ask for.

use std::io::Write;

use vantage_core::disasm::{ColumnWidths, WindowView};
use vantage_core::types::DecodedInstruction;
use vantage_core::TerminalSize;

use crate::error::Result;
use crate::module::{DisplayModule, StopContext};
use crate::settings::Settings;
use crate::style::Style;

const PC_MARKER: &str = "=>";
const PADDING_MARKER: &str = "~";

/// Upper bound on `instructions-before` and `instructions-after`.
pub const MAX_SIDE: usize = 256;

/// The `assembly` module.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssemblyModule;

/// Which optional columns a render shows.
#[derive(Debug, Clone, Copy)]
struct Columns
{
    opcodes: bool,
    function: bool,
}

/// Annotations appended to conditional instructions.
#[derive(Debug, Clone, Copy)]
struct Markers<'a>
{
    taken: &'a str,
    not_taken: &'a str,
}

impl Markers<'_>
{
    fn for_outcome(&self, outcome: Option<bool>) -> &str
    {
        match outcome {
            Some(true) => self.taken,
            Some(false) => self.not_taken,
            None => "",
        }
    }
}

impl DisplayModule for AssemblyModule
{
    fn name(&self) -> &'static str
    {
        "assembly"
    }

    fn title(&self) -> &'static str
    {
        "Assembly"
    }

    fn settings(&self) -> Settings
    {
        Settings::new(self.name())
            .define("instructions-before", 6_i64, "Instructions shown before the pc (at most 256)")
            .define("instructions-after", 6_i64, "Instructions shown after the pc (at most 256)")
            .define("opcodes", false, "Show the raw opcode bytes")
            .define("function", true, "Show the symbol+offset of each instruction")
            .define("predict-branching", true, "Annotate conditional instructions with their predicted outcome")
            .define("branch-taken-marker", "[taken]", "Marker for a conditional instruction predicted taken")
            .define("branch-not-taken-marker", "[not taken]", "Marker for a conditional instruction predicted not taken")
    }

    fn render(
        &mut self,
        size: TerminalSize,
        stop: &mut StopContext<'_>,
        settings: &Settings,
        out: &mut dyn Write,
    ) -> Result<()>
    {
        let before = side(settings.int("instructions-before"));
        let after = side(settings.int("instructions-after"));
        let view = stop.engine.window(stop.host, &stop.execution, before, after)?;

        let mut outcomes = Vec::with_capacity(view.instructions.len());
        for instruction in &view.instructions {
            let outcome = if settings.bool("predict-branching") {
                stop.engine.predict(stop.host, &stop.execution, &instruction.mnemonic)?
            } else {
                None
            };
            outcomes.push(outcome);
        }
        let markers = Markers {
            taken: settings.str("branch-taken-marker"),
            not_taken: settings.str("branch-not-taken-marker"),
        };

        let columns = Columns {
            opcodes: settings.bool("opcodes"),
            function: settings.bool("function"),
        };
        writeln!(out, "{}", stop.style.divider(self.title(), usize::from(size.columns)))?;
        for line in lines(&view, columns, &outcomes, markers, stop.style) {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }
}

/// Clamp a side setting into `0..=MAX_SIDE`.
fn side(value: i64) -> usize
{
    usize::try_from(value).unwrap_or(0).min(MAX_SIDE)
}

fn lines(view: &WindowView, columns: Columns, outcomes: &[Option<bool>], markers: Markers<'_>, style: Style) -> Vec<String>
{
    let padding = style.low(PADDING_MARKER);
    let mut lines = Vec::new();
    lines.extend(std::iter::repeat_n(padding.clone(), view.leading_padding));
    for (index, instruction) in view.instructions.iter().enumerate() {
        let at_pc = index == view.pc_index;
        let mut text = format_instruction(instruction, &view.widths, columns, at_pc);
        let marker = markers.for_outcome(outcomes.get(index).copied().flatten());
        if !marker.is_empty() {
            text.push(' ');
            text.push_str(marker);
        }
        lines.push(if at_pc { style.selected(&text) } else { text });
    }
    lines.extend(std::iter::repeat_n(padding, view.trailing_padding));
    lines
}

fn format_instruction(instruction: &DecodedInstruction, widths: &ColumnWidths, columns: Columns, at_pc: bool) -> String
{
    let marker = if at_pc { PC_MARKER } else { "  " };
    let mut line = format!("{marker} {}", instruction.address);
    if columns.opcodes {
        line.push_str(&format!(" {:<width$}", instruction.opcode_hex(), width = widths.opcodes));
    }
    if columns.function {
        line.push_str(&format!(" {:<width$}", instruction.location(), width = widths.location));
    }
    line.push_str(&format!(" {:<width$}", instruction.mnemonic, width = widths.mnemonic));
    if !instruction.operands.is_empty() {
        line.push(' ');
        line.push_str(&instruction.operands);
    }
    if let Some(comment) = &instruction.comment {
        line.push_str(" ; ");
        line.push_str(comment);
    }
    line.trim_end().to_string()
}

#[cfg(test)]
mod tests
{
    use vantage_core::host::{ScriptedHost, ScriptedInstruction, ScriptedStop, ScriptedSymbol};
    use vantage_core::types::{Architecture, RegisterDescriptor, RegisterSet};
    use vantage_core::EngineContext;

    use super::*;

    fn host() -> ScriptedHost
    {
        let set = RegisterSet {
            name: "General Purpose Registers".into(),
            registers: vec![RegisterDescriptor::new("rax", 64), RegisterDescriptor::new("eflags", 32)],
        };
        let mut host = ScriptedHost::new(Architecture::X86_64, vec![set])
            .with_symbol(ScriptedSymbol::new(
                "main",
                0x401000,
                vec![
                    ScriptedInstruction::new(3, "cmp").operands("rax, 0x1").bytes("48 39 c0"),
                    ScriptedInstruction::new(2, "je").operands("0x401010").bytes("74 0b"),
                    ScriptedInstruction::new(1, "ret").bytes("c3"),
                ],
            ))
            .unwrap();
        host.push_stop(ScriptedStop::at(0x401003).register("eflags", 0x246_u64));
        host
    }

    fn render(host: &ScriptedHost, settings: &Settings) -> String
    {
        let mut engine = EngineContext::new();
        let mut stop = StopContext {
            host,
            engine: &mut engine,
            execution: EngineContext::execution_context(host).unwrap(),
            style: Style::PLAIN,
        };
        let mut out = Vec::new();
        AssemblyModule
            .render(TerminalSize::new(40, 24), &mut stop, settings, &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_window_with_prediction()
    {
        let host = host();
        let mut settings = AssemblyModule.settings();
        settings.set_from_str("instructions-before", "2").unwrap();
        settings.set_from_str("instructions-after", "2").unwrap();

        let text = render(&host, &settings);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[1], "~");
        assert_eq!(lines[2], "   0x0000000000401000 main+0 cmp rax, 0x1");
        assert_eq!(lines[3], "=> 0x0000000000401003 main+3 je  0x401010 [taken]");
        assert_eq!(lines[4], "   0x0000000000401005 main+5 ret");
        assert_eq!(lines[5], "~");
    }

    #[test]
    fn test_asymmetric_window()
    {
        let host = host();
        let mut settings = AssemblyModule.settings();
        settings.set_from_str("instructions-before", "0").unwrap();
        settings.set_from_str("instructions-after", "3").unwrap();

        let text = render(&host, &settings);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("=> 0x0000000000401003"));
        assert_eq!(lines[2], "   0x0000000000401005 main+5 ret");
        assert_eq!(lines[3], "~");
        assert_eq!(lines[4], "~");
    }

    #[test]
    fn test_every_conditional_instruction_is_marked()
    {
        let mut host = host();
        host.push_stop(ScriptedStop::at(0x401000));
        assert!(host.advance());

        let mut settings = AssemblyModule.settings();
        settings.set_from_str("instructions-before", "0").unwrap();
        settings.set_from_str("instructions-after", "2").unwrap();
        settings.set_from_str("branch-taken-marker", "y").unwrap();

        let text = render(&host, &settings);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "=> 0x0000000000401000 main+0 cmp rax, 0x1");
        assert_eq!(lines[2], "   0x0000000000401003 main+3 je  0x401010 y");
        assert_eq!(lines[3], "   0x0000000000401005 main+5 ret");

        settings.set_from_str("predict-branching", "off").unwrap();
        let text = render(&host, &settings);
        assert_eq!(text.lines().nth(2), Some("   0x0000000000401003 main+3 je  0x401010"));
    }

    #[test]
    fn test_oversized_sides_are_capped()
    {
        let host = host();
        let mut settings = AssemblyModule.settings();
        settings.set_from_str("instructions-before", "4611686018427387904").unwrap();
        settings.set_from_str("instructions-after", "1000000000").unwrap();

        let text = render(&host, &settings);
        assert_eq!(text.lines().count(), 1 + MAX_SIDE * 2 + 1);
        assert!(text.contains("=> 0x0000000000401003"));
    }

    #[test]
    fn test_negative_sides_show_only_the_pc()
    {
        let host = host();
        let mut settings = AssemblyModule.settings();
        settings.set_from_str("instructions-before", "-4").unwrap();
        settings.set_from_str("instructions-after", "-4").unwrap();

        let text = render(&host, &settings);
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_optional_columns()
    {
        let host = host();
        let mut settings = AssemblyModule.settings();
        settings.set_from_str("instructions-before", "0").unwrap();
        settings.set_from_str("instructions-after", "0").unwrap();
        settings.set_from_str("opcodes", "on").unwrap();
        settings.set_from_str("function", "off").unwrap();
        settings.set_from_str("predict-branching", "off").unwrap();

        let text = render(&host, &settings);
        assert_eq!(text.lines().nth(1), Some("=> 0x0000000000401003 74 0b je 0x401010"));
    }
}
