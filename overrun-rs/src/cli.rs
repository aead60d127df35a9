//! Command-line argument parsing.
//!
//! Usage:
//!   overrun [-svqnrk] [-D name=value]... [--] TEMPLATE [ARG]...
//!
//! Options stop at the template; everything after it is a positional value,
//! even if it starts with `-`.

// ── Public types ──────────────────────────────────────────────────────────────

pub const USAGE: &str = "\
Usage: overrun [-svqnrk] [-D name=value]... [--] TEMPLATE [ARG]...

  -s            run as a shell line (default: argument vector)
  -v            print the command before running it
  -q            discard the command's output
  -n            print the rendered command instead of running it
  -r            print the command's stdout with trailing newlines removed
  -k            fail when the command exits unsuccessfully
  -D name=value set a named field
  -h, --help    show this help";

/// Parsed command-line arguments.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// Shell mode (`-s`).
    pub shell: bool,
    /// Echo the command first (`-v`).
    pub verbose: bool,
    /// Discard child output (`-q`).
    pub quiet: bool,
    /// Print instead of running (`-n`).
    pub dry_run: bool,
    /// Read mode (`-r`).
    pub read: bool,
    /// Checked mode (`-k`).
    pub check: bool,
    /// `-h` / `--help`.
    pub help: bool,
    /// Named field values (`-D name=value`), in order given.
    pub defines: Vec<(String, String)>,
    pub template: String,
    /// Positional field values.
    pub args: Vec<String>,
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        if arg == "--" {
            i += 1;
            break;
        }
        if arg == "--help" {
            args.help = true;
            return Ok(args);
        }
        if !arg.starts_with('-') || arg == "-" {
            break;
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                's' => args.shell = true,
                'v' => args.verbose = true,
                'q' => args.quiet = true,
                'n' => args.dry_run = true,
                'r' => args.read = true,
                'k' => args.check = true,
                'h' => {
                    args.help = true;
                    return Ok(args);
                }

                // -D<name=value> or -D <name=value>
                'D' => {
                    let def = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err("-D requires a name=value argument".to_owned());
                    };
                    args.defines.push(parse_define(&def)?);
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    let Some(template) = argv.get(i) else {
        return Err("missing template".to_owned());
    };
    args.template = template.clone();
    args.args = argv[i + 1..].to_vec();
    Ok(args)
}

fn parse_define(def: &str) -> Result<(String, String), String> {
    match def.split_once('=') {
        Some((name, value)) if is_name(name) => Ok((name.to_owned(), value.to_owned())),
        _ => Err(format!("invalid -D argument (expected name=value): {def}")),
    }
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

// ── Tests ─────────────────────────────────────────────────────────────────────
