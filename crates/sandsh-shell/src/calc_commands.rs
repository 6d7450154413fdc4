//! Calculator and sequence commands: expr, bc, test, awk, printf, numfmt,
//! factor, seq.
//!
//! Everything that evaluates user-written expressions goes through the
//! restricted parser in [`crate::expr`]; there is no general-purpose
//! evaluation surface anywhere in the shell.

use sandsh_types::error::{Result, ShellError};

use crate::commands::{arg, read_text};
use crate::expr;
use crate::registry::{Command, CommandOutput, CommandRegistry, Environment};
use crate::textutil;

/// Register calculator commands.
pub fn register_calc_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(ExprCmd));
    reg.register(Box::new(BcCmd));
    reg.register(Box::new(TestCmd));
    reg.register(Box::new(AwkCmd));
    reg.register(Box::new(PrintfCmd));
    reg.register(Box::new(NumfmtCmd));
    reg.register(Box::new(FactorCmd));
    reg.register(Box::new(SeqCmd));
}

// ---------------------------------------------------------------------------
// expr / bc
// ---------------------------------------------------------------------------

struct ExprCmd;
impl Command for ExprCmd {
    fn name(&self) -> &str {
        "expr"
    }
    fn description(&self) -> &str {
        "Evaluate an arithmetic expression"
    }
    fn usage(&self) -> &str {
        "expr <expression>"
    }
    fn man(&self) -> &str {
        "Evaluates a fixed expression grammar: numbers, + - * / %, \
         parentheses, comparisons, and boolean connectives."
    }
    fn execute(&self, args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.is_empty() {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let value = expr::eval(&args.join(" "))?;
        Ok(CommandOutput::Text(expr::format_value(value)))
    }
}

struct BcCmd;
impl Command for BcCmd {
    fn name(&self) -> &str {
        "bc"
    }
    fn description(&self) -> &str {
        "Calculator (same grammar as expr)"
    }
    fn usage(&self) -> &str {
        "bc <expression>"
    }
    fn execute(&self, args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.is_empty() {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let value = expr::eval(&args.join(" "))?;
        Ok(CommandOutput::Text(expr::format_value(value)))
    }
}

// ---------------------------------------------------------------------------
// test
// ---------------------------------------------------------------------------

struct TestCmd;
impl Command for TestCmd {
    fn name(&self) -> &str {
        "test"
    }
    fn description(&self) -> &str {
        "Compare two integers"
    }
    fn usage(&self) -> &str {
        "test <a> <-eq|-ne|-lt|-le|-gt|-ge> <b>"
    }
    fn execute(&self, args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 3 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let a: i64 = args[0]
            .parse()
            .map_err(|_| ShellError::Expression(format!("invalid integer '{}'", args[0])))?;
        let b: i64 = args[2]
            .parse()
            .map_err(|_| ShellError::Expression(format!("invalid integer '{}'", args[2])))?;
        let truth = match args[1] {
            "-eq" => a == b,
            "-ne" => a != b,
            "-lt" => a < b,
            "-le" => a <= b,
            "-gt" => a > b,
            "-ge" => a >= b,
            other => {
                return Err(ShellError::Expression(format!(
                    "unsupported operator '{other}'"
                )));
            },
        };
        Ok(CommandOutput::Text(truth.to_string()))
    }
}

// ---------------------------------------------------------------------------
// awk
// ---------------------------------------------------------------------------

struct AwkCmd;
impl Command for AwkCmd {
    fn name(&self) -> &str {
        "awk"
    }
    fn description(&self) -> &str {
        "Print lines for which an expression holds"
    }
    fn usage(&self) -> &str {
        "awk <expression> <file>"
    }
    fn man(&self) -> &str {
        "Evaluates the expression once per line with $1..$9 replaced by the \
         line's whitespace fields ($0 is the whole line) and NF by the field \
         count; non-numeric fields count as 0. Lines where the result is \
         nonzero are printed."
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() < 2 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let (&file, expr_args) = args.split_last().expect("len checked above");
        let template = expr_args.join(" ");
        let text = read_text(env, file)?;
        let mut out = Vec::new();
        for line in text.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let substituted = substitute_fields(&template, line, &fields);
            if expr::eval(&substituted)? != 0.0 {
                out.push(line.to_string());
            }
        }
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

/// Replace `$N` and `NF` references with numeric literals for this line.
fn substitute_fields(template: &str, line: &str, fields: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '$' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit() {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            let index: usize = chars[i + 1..j]
                .iter()
                .collect::<String>()
                .parse()
                .unwrap_or(0);
            let raw = if index == 0 {
                line
            } else {
                fields.get(index - 1).copied().unwrap_or("")
            };
            out.push_str(&numeric(raw));
            i = j;
        } else if chars[i] == 'N' && chars.get(i + 1) == Some(&'F') {
            out.push_str(&fields.len().to_string());
            i += 2;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn numeric(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(v) => format!("{v}"),
        Err(_) => "0".to_string(),
    }
}

// ---------------------------------------------------------------------------
// printf
// ---------------------------------------------------------------------------

struct PrintfCmd;
impl Command for PrintfCmd {
    fn name(&self) -> &str {
        "printf"
    }
    fn description(&self) -> &str {
        "Print formatted text"
    }
    fn usage(&self) -> &str {
        "printf <format> [value...]"
    }
    fn man(&self) -> &str {
        "Supports %s, %d, %f, %x, %o, and %%, plus \\n, \\t, and \\\\ \
         escapes. Each conversion consumes one argument; running out of \
         arguments is an error."
    }
    fn execute(&self, args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        let format = arg(args, 0, self.usage())?;
        let values = &args[1..];
        Ok(CommandOutput::Text(render_format(format, values)?))
    }
}

fn render_format(format: &str, values: &[&str]) -> Result<String> {
    let mut out = String::new();
    let mut next = 0usize;
    let chars: Vec<char> = format.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '%' => {
                let Some(&spec) = chars.get(i + 1) else {
                    return Err(ShellError::Expression("dangling '%' in format".into()));
                };
                i += 2;
                if spec == '%' {
                    out.push('%');
                    continue;
                }
                let value = values.get(next).copied().ok_or_else(|| {
                    ShellError::Expression("not enough arguments for format".into())
                })?;
                next += 1;
                match spec {
                    's' => out.push_str(value),
                    'd' => out.push_str(&parse_int(value)?.to_string()),
                    'f' => {
                        let v: f64 = value.parse().map_err(|_| {
                            ShellError::Expression(format!("invalid number '{value}'"))
                        })?;
                        out.push_str(&format!("{v:.6}"));
                    },
                    'x' => out.push_str(&format!("{:x}", parse_int(value)?)),
                    'o' => out.push_str(&format!("{:o}", parse_int(value)?)),
                    other => {
                        return Err(ShellError::Expression(format!(
                            "unsupported conversion '%{other}'"
                        )));
                    },
                }
            },
            '\\' => {
                match chars.get(i + 1) {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('\\') => out.push('\\'),
                    Some(&other) => {
                        out.push('\\');
                        out.push(other);
                    },
                    None => out.push('\\'),
                }
                i += 2;
            },
            c => {
                out.push(c);
                i += 1;
            },
        }
    }
    Ok(out)
}

fn parse_int(value: &str) -> Result<i64> {
    value
        .parse::<i64>()
        .map_err(|_| ShellError::Expression(format!("invalid integer '{value}'")))
}

// ---------------------------------------------------------------------------
// numfmt
// ---------------------------------------------------------------------------

struct NumfmtCmd;
impl Command for NumfmtCmd {
    fn name(&self) -> &str {
        "numfmt"
    }
    fn description(&self) -> &str {
        "Format a number with width and precision"
    }
    fn usage(&self) -> &str {
        "numfmt <width[.precision]> <number>"
    }
    fn execute(&self, args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 2 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let number: f64 = args[1]
            .parse()
            .map_err(|_| ShellError::Expression(format!("invalid number '{}'", args[1])))?;
        let (width_str, prec) = match args[0].split_once('.') {
            Some((w, p)) => {
                let prec: usize = p.parse().map_err(|_| {
                    ShellError::Expression(format!("invalid precision '{p}'"))
                })?;
                (w, Some(prec))
            },
            None => (args[0], None),
        };
        let width: usize = if width_str.is_empty() {
            0
        } else {
            width_str.parse().map_err(|_| {
                ShellError::Expression(format!("invalid width '{width_str}'"))
            })?
        };
        let rendered = match prec {
            Some(p) => format!("{number:>width$.p$}"),
            None => format!("{number:>width$}"),
        };
        Ok(CommandOutput::Text(rendered))
    }
}

// ---------------------------------------------------------------------------
// factor
// ---------------------------------------------------------------------------

struct FactorCmd;
impl Command for FactorCmd {
    fn name(&self) -> &str {
        "factor"
    }
    fn description(&self) -> &str {
        "List all divisors of a number"
    }
    fn usage(&self) -> &str {
        "factor <number>"
    }
    fn execute(&self, args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        let raw = arg(args, 0, self.usage())?;
        let n: u64 = raw
            .parse()
            .map_err(|_| ShellError::Expression(format!("invalid number '{raw}'")))?;
        let divisors: Vec<String> = textutil::divisors(n)
            .into_iter()
            .map(|d| d.to_string())
            .collect();
        Ok(CommandOutput::Text(format!("{n}: {}", divisors.join(" "))))
    }
}

// ---------------------------------------------------------------------------
// seq
// ---------------------------------------------------------------------------

struct SeqCmd;
impl Command for SeqCmd {
    fn name(&self) -> &str {
        "seq"
    }
    fn description(&self) -> &str {
        "Print a sequence of integers"
    }
    fn usage(&self) -> &str {
        "seq <end> | seq <start> <end> | seq <start> <step> <end>"
    }
    fn execute(&self, args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        let parse = |s: &str| -> Result<i64> {
            s.parse()
                .map_err(|_| ShellError::Expression(format!("invalid integer '{s}'")))
        };
        let (start, step, end) = match args {
            [end] => (1, 1, parse(end)?),
            [start, end] => (parse(start)?, 1, parse(end)?),
            [start, step, end] => (parse(start)?, parse(step)?, parse(end)?),
            _ => return Err(ShellError::Usage(self.usage().to_string())),
        };
        if step == 0 {
            return Err(ShellError::Expression("step must not be zero".into()));
        }
        let mut out = Vec::new();
        let mut i = start;
        while (step > 0 && i <= end) || (step < 0 && i >= end) {
            out.push(i.to_string());
            i += step;
        }
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shell;
    use crate::commands::register_builtins;
    use sandsh_vfs::{MemoryVfs, Vfs};

    fn shell_with(files: &[(&str, &str)]) -> Shell {
        let mut reg = crate::CommandRegistry::new();
        register_builtins(&mut reg);
        let mut vfs = MemoryVfs::new();
        for (path, content) in files {
            vfs.write(path, content.as_bytes()).unwrap();
        }
        Shell::new(reg, Box::new(vfs))
    }

    fn run(sh: &mut Shell, line: &str) -> String {
        match sh.execute(line).unwrap() {
            CommandOutput::Text(s) => s,
            _ => String::new(),
        }
    }

    #[test]
    fn expr_and_bc_evaluate() {
        let mut sh = shell_with(&[]);
        assert_eq!(run(&mut sh, "expr 2 + 3 * 4"), "14");
        assert_eq!(run(&mut sh, "bc ( 1 + 2 ) * 3"), "9");
        assert_eq!(run(&mut sh, "expr 7 / 2"), "3.5");
    }

    #[test]
    fn expr_rejects_garbage() {
        let mut sh = shell_with(&[]);
        assert!(sh.execute("expr import os").is_err());
        assert!(sh.execute("expr 1 / 0").is_err());
    }

    #[test]
    fn test_compares_integers() {
        let mut sh = shell_with(&[]);
        assert_eq!(run(&mut sh, "test 3 -lt 5"), "true");
        assert_eq!(run(&mut sh, "test 3 -eq 5"), "false");
        assert_eq!(run(&mut sh, "test 5 -ge 5"), "true");
        assert!(sh.execute("test 1 -huh 2").is_err());
    }

    #[test]
    fn awk_filters_lines_by_field() {
        let mut sh = shell_with(&[("/f", "apple 5\nbanana 2\ncherry 9")]);
        assert_eq!(run(&mut sh, "awk $2 > 4 f"), "apple 5\ncherry 9");
    }

    #[test]
    fn awk_nf_counts_fields() {
        let mut sh = shell_with(&[("/f", "one\ntwo words\nthree word line")]);
        assert_eq!(run(&mut sh, "awk NF >= 2 f"), "two words\nthree word line");
    }

    #[test]
    fn awk_nonnumeric_fields_are_zero() {
        let mut sh = shell_with(&[("/f", "x 1\ny oops")]);
        assert_eq!(run(&mut sh, "awk $2 == 0 f"), "y oops");
    }

    #[test]
    fn printf_conversions() {
        let mut sh = shell_with(&[]);
        assert_eq!(run(&mut sh, "printf %s=%d! width 7"), "width=7!");
        assert_eq!(run(&mut sh, "printf %x|%o 255 8"), "ff|10");
        assert_eq!(run(&mut sh, "printf 100%%done"), "100%done");
        assert_eq!(run(&mut sh, "printf a\\tb"), "a\tb");
        assert!(sh.execute("printf %d").is_err());
        assert!(sh.execute("printf %q x").is_err());
    }

    #[test]
    fn printf_float_has_six_decimals() {
        let mut sh = shell_with(&[]);
        assert_eq!(run(&mut sh, "printf %f 1.5"), "1.500000");
    }

    #[test]
    fn numfmt_width_and_precision() {
        let mut sh = shell_with(&[]);
        assert_eq!(run(&mut sh, "numfmt 8.2 3.14159"), "    3.14");
        assert_eq!(run(&mut sh, "numfmt 4 7"), "   7");
        assert!(sh.execute("numfmt 8.x 1").is_err());
    }

    #[test]
    fn factor_lists_divisors() {
        let mut sh = shell_with(&[]);
        assert_eq!(run(&mut sh, "factor 12"), "12: 1 2 3 4 6 12");
        assert_eq!(run(&mut sh, "factor 7"), "7: 1 7");
    }

    #[test]
    fn seq_variants() {
        let mut sh = shell_with(&[]);
        assert_eq!(run(&mut sh, "seq 3"), "1\n2\n3");
        assert_eq!(run(&mut sh, "seq 4 6"), "4\n5\n6");
        assert_eq!(run(&mut sh, "seq 0 2 6"), "0\n2\n4\n6");
        assert_eq!(run(&mut sh, "seq 3 -1 1"), "3\n2\n1");
        assert!(sh.execute("seq 1 0 5").is_err());
    }
}
