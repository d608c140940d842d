//! Terminal printer for extracted symbol trees
//!
//! Used by `quire tree`: the scanned files, then every symbol with its
//! declaration and location on one line and its brief description below.
//!
//! # Example
//!
//! ```no_run
//! use quire::printer::SymbolPrinter;
//! use quire::symbol::SymbolTree;
//!
//! let tree = SymbolTree::new("demo");
//! let printer = SymbolPrinter::new(&tree, false);
//! println!("{}", printer);
//! ```

use crate::symbol::{Access, Symbol, SymbolKind, SymbolTree};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Symbol tree printer
pub struct SymbolPrinter<'a> {
    tree: &'a SymbolTree,
    use_color: bool,
}

impl<'a> SymbolPrinter<'a> {
    pub fn new(tree: &'a SymbolTree, use_color: bool) -> Self {
        Self { tree, use_color }
    }

    /// Print directly to stdout
    pub fn print_to_stdout(&self) -> io::Result<()> {
        let choice = if self.use_color {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        let mut stdout = StandardStream::stdout(choice);
        self.write_colored(&mut stdout)
    }

    /// Write with colors to a `WriteColor` implementor
    pub fn write_colored<W: WriteColor>(&self, w: &mut W) -> io::Result<()> {
        w.set_color(ColorSpec::new().set_bold(true))?;
        writeln!(
            w,
            "{} ({} files, {} symbols)",
            self.tree.project,
            self.tree.files.len(),
            self.tree.symbol_count()
        )?;
        w.reset()?;

        for file in &self.tree.files {
            w.set_color(ColorSpec::new().set_fg(Some(Color::White)).set_italic(true))?;
            writeln!(w, "  file {}", file.path)?;
            w.reset()?;
        }
        writeln!(w)?;

        for symbol in &self.tree.symbols {
            self.write_symbol(w, symbol, 0)?;
        }
        Ok(())
    }

    fn write_symbol<W: WriteColor>(&self, w: &mut W, symbol: &Symbol, depth: usize) -> io::Result<()> {
        let ind = "  ".repeat(depth);
        write!(w, "{}", ind)?;
        if symbol.access != Access::Public {
            w.set_color(ColorSpec::new().set_fg(Some(Color::Black)).set_intense(true))?;
            write!(w, "{} ", symbol.access.keyword())?;
            w.reset()?;
        }
        w.set_color(
            ColorSpec::new()
                .set_fg(Some(kind_color(symbol.kind())))
                .set_bold(true),
        )?;
        write!(w, "{}", one_line(&symbol.declaration()))?;
        w.reset()?;

        w.set_color(ColorSpec::new().set_fg(Some(Color::Black)).set_intense(true))?;
        writeln!(w, "  {}:{}", symbol.location.file, symbol.location.line)?;
        w.reset()?;

        if let Some(summary) = symbol.doc.summary() {
            writeln!(w, "{}  {}", ind, summary)?;
        }
        if let Some(enum_def) = symbol.enum_def() {
            for value in &enum_def.enumerators {
                w.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
                writeln!(w, "{}  = {}", ind, value.name)?;
                w.reset()?;
            }
        }
        for child in &symbol.children {
            self.write_symbol(w, child, depth + 1)?;
        }
        Ok(())
    }

    fn format_symbol(&self, f: &mut Formatter<'_>, symbol: &Symbol, depth: usize) -> FmtResult {
        let ind = Indent(depth);
        write!(f, "{}", ind)?;
        if symbol.access != Access::Public {
            write!(f, "{} ", self.styled_gray(symbol.access.keyword()))?;
        }
        writeln!(
            f,
            "{}  {}",
            self.styled_bold(&one_line(&symbol.declaration())),
            self.styled_gray(&format!("{}:{}", symbol.location.file, symbol.location.line))
        )?;
        if let Some(summary) = symbol.doc.summary() {
            writeln!(f, "{}  {}", ind, summary)?;
        }
        if let Some(enum_def) = symbol.enum_def() {
            for value in &enum_def.enumerators {
                writeln!(f, "{}  = {}", ind, self.styled_cyan(&value.name))?;
            }
        }
        for child in &symbol.children {
            self.format_symbol(f, child, depth + 1)?;
        }
        Ok(())
    }

    fn styled_cyan(&self, s: &str) -> String {
        if self.use_color {
            format!("\x1b[36m{}\x1b[0m", s)
        } else {
            s.to_string()
        }
    }

    fn styled_bold(&self, s: &str) -> String {
        if self.use_color {
            format!("\x1b[1m{}\x1b[0m", s)
        } else {
            s.to_string()
        }
    }

    fn styled_gray(&self, s: &str) -> String {
        if self.use_color {
            format!("\x1b[90m{}\x1b[0m", s)
        } else {
            s.to_string()
        }
    }
}

impl Display for SymbolPrinter<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(
            f,
            "{} ({} files, {} symbols)",
            self.styled_bold(&self.tree.project),
            self.tree.files.len(),
            self.tree.symbol_count()
        )?;
        for file in &self.tree.files {
            writeln!(f, "  {}", self.styled_gray(&format!("file {}", file.path)))?;
        }
        writeln!(f)?;
        for symbol in &self.tree.symbols {
            self.format_symbol(f, symbol, 0)?;
        }
        Ok(())
    }
}

fn kind_color(kind: SymbolKind) -> Color {
    match kind {
        SymbolKind::Namespace => Color::Blue,
        SymbolKind::Class | SymbolKind::Struct | SymbolKind::Union => Color::Magenta,
        SymbolKind::Enum => Color::Yellow,
        SymbolKind::Function => Color::Green,
        SymbolKind::Define => Color::Red,
        SymbolKind::Variable | SymbolKind::Typedef => Color::Cyan,
    }
}

/// Template headers put the declaration on two lines
fn one_line(declaration: &str) -> String {
    declaration.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Indentation helper
struct Indent(usize);

impl Display for Indent {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for _ in 0..self.0 {
            write!(f, "  ")?;
        }
        Ok(())
    }
}
