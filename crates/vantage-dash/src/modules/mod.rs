//! Built-in display modules.

pub mod assembly;
pub mod registers;

pub use assembly::AssemblyModule;
pub use registers::RegistersModule;

use crate::module::DisplayModule;

/// Every built-in module, in default layout order.
pub fn builtin() -> Vec<Box<dyn DisplayModule>>
{
    vec![Box::new(RegistersModule), Box::new(AssemblyModule)]
}
