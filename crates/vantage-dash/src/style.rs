//! Highlighting of changed values, the current instruction and dividers.

use crossterm::style::{Attribute, Color, ContentStyle, Stylize};

/// ANSI styling, or plain text when disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style
{
    ansi: bool,
}

impl Style
{
    /// Plain text, no escape sequences.
    pub const PLAIN: Self = Self { ansi: false };

    /// Styling on or off.
    pub const fn new(ansi: bool) -> Self
    {
        Self { ansi }
    }

    /// Whether escape sequences are emitted.
    pub fn is_ansi(&self) -> bool
    {
        self.ansi
    }

    fn paint(&self, text: &str, style: ContentStyle) -> String
    {
        if self.ansi {
            style.apply(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// A value that changed since the baseline.
    pub fn changed(&self, text: &str) -> String
    {
        self.paint(text, ContentStyle::new().with(Color::Red).attribute(Attribute::Bold))
    }

    /// The instruction at the program counter.
    pub fn selected(&self, text: &str) -> String
    {
        self.paint(text, ContentStyle::new().with(Color::Green).attribute(Attribute::Bold))
    }

    /// Secondary text (addresses, padding, unchanged flags).
    pub fn low(&self, text: &str) -> String
    {
        self.paint(text, ContentStyle::new().with(Color::DarkGrey))
    }

    /// A module diagnostic.
    pub fn error(&self, text: &str) -> String
    {
        self.paint(text, ContentStyle::new().with(Color::Red))
    }

    /// Full-width divider line carrying `title`.
    ///
    /// ```rust
    /// use vantage_dash::style::Style;
    ///
    /// assert_eq!(Style::PLAIN.divider("Registers", 20), "─── Registers ──────");
    /// ```
    pub fn divider(&self, title: &str, width: usize) -> String
    {
        let head = format!("─── {title} ");
        let fill = width.saturating_sub(head.chars().count());
        let line = format!("{head}{}", "─".repeat(fill));
        self.paint(&line, ContentStyle::new().with(Color::Blue))
    }
}
