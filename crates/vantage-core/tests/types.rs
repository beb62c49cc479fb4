//! Tests for host-agnostic types

use vantage_core::host::ScriptedHost;
use vantage_core::types::{Address, Architecture, FrameIdentity, ProcessId, ThreadId};
use vantage_core::HostDebugger;

#[test]
fn test_process_id_from_u32()
{
    let pid = ProcessId::from(12345);
    let value: u32 = pid.into();
    assert_eq!(value, 12345);
}

#[test]
fn test_architecture_names()
{
    assert_eq!("aarch64".parse::<Architecture>().unwrap(), Architecture::Arm64);
    assert_eq!("i386:x86-64".parse::<Architecture>().unwrap(), Architecture::X86_64);
    assert!("mips".parse::<Architecture>().is_err());
    assert_eq!(Architecture::X86_64.to_string(), "x86_64");
}

#[test]
fn test_frame_identity_equality()
{
    let frame = FrameIdentity {
        address: Address::new(0x7ffe_0000),
        thread: ThreadId(1),
        architecture: Architecture::X86_64,
    };
    let other_thread = FrameIdentity {
        thread: ThreadId(2),
        ..frame
    };
    assert_ne!(frame, other_thread);
    assert_eq!(frame.to_string(), "x86_64@0x7ffe0000/1");
}

#[test]
fn test_session_from_json()
{
    let json = r#"{
        "architecture": "x86_64",
        "register_sets": [
            { "name": "General Purpose Registers",
              "registers": [ { "name": "rax", "bits": 64 }, { "name": "eflags", "bits": 32 } ] }
        ],
        "symbols": [
            { "name": "main", "start": "0x401000",
              "instructions": [
                  { "length": 1, "mnemonic": "push", "operands": "rbp", "bytes": "55" },
                  { "length": 2, "mnemonic": "je", "operands": "0x401010", "bytes": "74 0d" }
              ] }
        ],
        "stops": [
            { "pc": "0x401000", "frame": "0x7ffe0000", "registers": { "rax": "0x1", "eflags": 582 } },
            { "pc": "0x401001", "frame": "0x7ffe0000", "commands": [ "dashboard registers -disable" ] }
        ]
    }"#;
    let mut host = ScriptedHost::from_json(json).unwrap();
    assert_eq!(host.stop_count(), 2);

    let context = host.execution_context().unwrap().unwrap();
    assert_eq!(context.pc, Address::new(0x401000));
    assert_eq!(host.read_register(&context, "eflags").unwrap().unwrap().as_u64(), Some(0x246));

    assert!(host.advance());
    assert_eq!(host.commands(), ["dashboard registers -disable".to_string()]);
    let symbol = host.symbol_at(Address::new(0x401002)).unwrap().unwrap();
    assert_eq!(symbol.name, "main");
    assert_eq!(symbol.size(), 3);
}

#[test]
fn test_malformed_session_is_rejected()
{
    assert!(ScriptedHost::from_json("{").is_err());
    let bad_bytes = r#"{
        "architecture": "x86_64",
        "register_sets": [],
        "symbols": [ { "name": "f", "start": 16, "instructions": [ { "length": 2, "mnemonic": "nop", "bytes": "90" } ] } ]
    }"#;
    assert!(ScriptedHost::from_json(bad_bytes).is_err());
}
