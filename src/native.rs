//! Built-in procedures installed into the global environment.
//!
//! Natives are plain function pointers. They return `Result<Value, String>`:
//! a native has no source location of its own, so on failure it hands back a
//! bare message and the interpreter attaches the call site's location.

use std::io::{BufRead, Write};
use std::rc::Rc;

use chrono::Utc;

use crate::environment::EnvRef;
use crate::interpreter::Interpreter;
use crate::value::Value;

pub type NativeResult = std::result::Result<Value, String>;
pub type NativeFn = fn(&mut Interpreter, &[Value]) -> NativeResult;

#[derive(Debug)]
pub struct NativeProc {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

/// Define every native in `globals`.
pub fn register(globals: &EnvRef) {
    let natives = [
        NativeProc {
            name: "print",
            arity: 1,
            func: native_print,
        },
        NativeProc {
            name: "println",
            arity: 1,
            func: native_println,
        },
        NativeProc {
            name: "clock",
            arity: 0,
            func: native_clock,
        },
        NativeProc {
            name: "readLine",
            arity: 0,
            func: native_read_line,
        },
        NativeProc {
            name: "prettyPrint",
            arity: 1,
            func: native_pretty_print,
        },
    ];

    let mut globals = globals.borrow_mut();
    for native in natives {
        globals.define(native.name, Value::Native(Rc::new(native)));
    }
}

fn native_print(interp: &mut Interpreter, args: &[Value]) -> NativeResult {
    let out = interp.out();
    let mut out = out.borrow_mut();
    write!(out, "{}", args[0]).map_err(|e| e.to_string())?;
    out.flush().map_err(|e| e.to_string())?;
    Ok(Value::Nil)
}

fn native_println(interp: &mut Interpreter, args: &[Value]) -> NativeResult {
    let out = interp.out();
    let mut out = out.borrow_mut();
    writeln!(out, "{}", args[0]).map_err(|e| e.to_string())?;
    Ok(Value::Nil)
}

/// Milliseconds since the Unix epoch, as a number.
fn native_clock(_interp: &mut Interpreter, _args: &[Value]) -> NativeResult {
    Ok(Value::Number(Utc::now().timestamp_millis() as f64))
}

/// One line from stdin without its newline, or `nil` at end of input.
fn native_read_line(_interp: &mut Interpreter, _args: &[Value]) -> NativeResult {
    let mut line = String::new();
    let read = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| e.to_string())?;

    if read == 0 {
        return Ok(Value::Nil);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Value::Str(line))
}

/// `prettyPrint(1234567.5)` writes `1,234,567.5`, with no trailing newline
/// just like `print`. Numbers get thousands separators and at most six
/// fractional digits; any other value prints in its raw form.
fn native_pretty_print(interp: &mut Interpreter, args: &[Value]) -> NativeResult {
    let rendered = match &args[0] {
        Value::Number(n) => pretty_number(*n),
        other => other.to_string(),
    };

    let out = interp.out();
    let mut out = out.borrow_mut();
    write!(out, "{rendered}").map_err(|e| e.to_string())?;
    out.flush().map_err(|e| e.to_string())?;
    Ok(Value::Nil)
}

fn pretty_number(n: f64) -> String {
    if !n.is_finite() {
        return n.to_string();
    }

    let formatted = format!("{:.6}", n.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some(parts) => parts,
        None => (formatted.as_str(), ""),
    };

    let mut grouped = String::new();
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let frac = frac_part.trim_end_matches('0');
    let mut result = String::new();
    if n < 0.0 {
        result.push('-');
    }
    result.push_str(&grouped);
    if !frac.is_empty() {
        result.push('.');
        result.push_str(frac);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_number_groups_thousands() {
        assert_eq!(pretty_number(1234567.0), "1,234,567");
        assert_eq!(pretty_number(999.0), "999");
        assert_eq!(pretty_number(1000.0), "1,000");
        assert_eq!(pretty_number(-45678.25), "-45,678.25");
    }

    #[test]
    fn pretty_number_trims_fraction() {
        assert_eq!(pretty_number(2.5), "2.5");
        assert_eq!(pretty_number(2.0), "2");
        assert_eq!(pretty_number(0.125), "0.125");
    }
}
