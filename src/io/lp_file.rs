//! CPLEX LP text serialization of a [`LinearProgram`].

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::energy::lp::{LinearExpr, LinearProgram, Relation};

/// Terms per line; keeps lines well below the 255-character LP limit.
const TERMS_PER_LINE: usize = 6;

/// Writes `lp` to `path` in CPLEX LP format.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_lp(lp: &LinearProgram, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_lp(lp, BufWriter::new(file))
}

/// Writes `lp` in CPLEX LP format to any writer.
///
/// Names are reduced to `[A-Za-z0-9_]`; variables keep their assembly order.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_lp(lp: &LinearProgram, mut w: impl Write) -> io::Result<()> {
    let names: Vec<String> = lp.variables().iter().map(|v| sanitize(&v.name)).collect();

    writeln!(w, "\\ {lp}")?;
    writeln!(w, "Minimize")?;
    write!(w, " obj:")?;
    write_terms(&mut w, lp.objective(), &names)?;
    writeln!(w)?;

    writeln!(w, "Subject To")?;
    for c in lp.constraints() {
        let name = sanitize(&c.name);
        if c.expr.is_empty() {
            writeln!(w, "\\ {name}: empty row skipped")?;
            continue;
        }
        write!(w, " {name}:")?;
        write_terms(&mut w, &c.expr, &names)?;
        let op = match c.relation {
            Relation::Eq => "=",
            Relation::Le => "<=",
            Relation::Ge => ">=",
        };
        writeln!(w, " {op} {}", number(c.rhs - c.expr.constant))?;
    }

    writeln!(w, "Bounds")?;
    for (v, name) in lp.variables().iter().zip(&names) {
        match (v.lower, v.upper) {
            (lo, hi) if lo == hi => writeln!(w, " {name} = {}", number(lo))?,
            (lo, hi) if hi.is_infinite() => {
                if lo != 0.0 {
                    writeln!(w, " {name} >= {}", number(lo))?;
                }
            }
            (lo, hi) => writeln!(w, " {} <= {name} <= {}", number(lo), number(hi))?,
        }
    }
    writeln!(w, "End")?;
    w.flush()
}

fn write_terms(w: &mut impl Write, expr: &LinearExpr, names: &[String]) -> io::Result<()> {
    if expr.is_empty() {
        return write!(w, " 0 {}", names.first().map(String::as_str).unwrap_or("x"));
    }
    for (i, (var, coefficient)) in expr.terms.iter().enumerate() {
        if i > 0 && i % TERMS_PER_LINE == 0 {
            write!(w, "\n  ")?;
        }
        let sign = if *coefficient < 0.0 { '-' } else { '+' };
        write!(w, " {sign} {} {}", number(coefficient.abs()), names[var.index()])?;
    }
    Ok(())
}

fn number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

/// Replaces characters LP readers reject.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
