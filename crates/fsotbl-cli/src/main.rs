//! `fsotbl` command-line tool
//!
//! Examples:
//!   fsotbl check armor.tbl              - report diagnostics
//!   fsotbl check mod.tbm --table armor  - pick the table explicitly
//!   fsotbl tree armor.tbl               - print the parsed attribute tree
//!   fsotbl lsp                          - start the language server (stdio)

use std::fmt::Write as _;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use fsotbl_parse::{Attributes, CancelSignal, ParseOutput, Severity, Value, parse};
use fsotbl_tables::TableKind;
use tracing::debug;

// ============================================================================
// Exit codes
// ============================================================================

const EXIT_SUCCESS: i32 = 0;
const EXIT_PARSE_ERROR: i32 = 1;
const EXIT_USAGE_ERROR: i32 = 2;
const EXIT_IO_ERROR: i32 = 3;

// ============================================================================
// CLI argument structures
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "fsotbl", version)]
#[command(about = "Checker and language server for FreeSpace table files")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report diagnostics for a table file
    Check {
        /// Input file (or "-" for stdin)
        file: PathBuf,

        /// Table to parse against; picked from the file name by default
        #[arg(long)]
        table: Option<String>,
    },

    /// Print the parsed attribute tree
    Tree {
        /// Input file (or "-" for stdin)
        file: PathBuf,

        /// Table to parse against; picked from the file name by default
        #[arg(long)]
        table: Option<String>,
    },

    /// Start language server (stdio)
    Lsp,
}

fn main() {
    let args = Args::parse();

    let result = match args.command {
        Command::Check { file, table } => run_check(&file, table.as_deref(), false),
        Command::Tree { file, table } => run_check(&file, table.as_deref(), true),
        Command::Lsp => run_lsp(),
    };

    match result {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(e) => {
            if !matches!(e, CliError::Diagnostics { .. }) {
                eprintln!("error: {e}");
            }
            std::process::exit(e.exit_code());
        }
    }
}

// ============================================================================

#[derive(Debug)]
enum CliError {
    Io(io::Error),
    Usage(String),
    /// The document has errors; they were already printed.
    Diagnostics { errors: usize },
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Io(_) => EXIT_IO_ERROR,
            CliError::Usage(_) => EXIT_USAGE_ERROR,
            CliError::Diagnostics { .. } => EXIT_PARSE_ERROR,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "{e}"),
            CliError::Usage(e) => write!(f, "{e}"),
            CliError::Diagnostics { errors } => write!(f, "{errors} error(s)"),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

// ============================================================================
// Subcommand implementations
// ============================================================================

fn run_lsp() -> Result<(), CliError> {
    let rt = tokio::runtime::Runtime::new().map_err(CliError::Io)?;
    rt.block_on(async {
        fsotbl_lsp::run()
            .await
            .map_err(|e| CliError::Io(io::Error::other(e.to_string())))
    })
}

fn run_check(file: &Path, table: Option<&str>, print_tree: bool) -> Result<(), CliError> {
    init_logging();

    let source = read_input(file)?;
    let filename = if file.as_os_str() == "-" {
        "<stdin>".to_string()
    } else {
        file.display().to_string()
    };
    let kind = select_table(file, table)?;
    debug!(%filename, table = %kind, "Checking");

    let schema = kind.schema();
    let output = parse(&schema, &source, CancelSignal::new())
        .map_err(|e| CliError::Io(io::Error::other(e)))?;

    report(&output, &filename, &source);

    if print_tree {
        print!("{}", format_tree(&output.tree(&schema)));
    }

    if output.has_errors() {
        return Err(CliError::Diagnostics {
            errors: output.errors.len(),
        });
    }
    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();
}

fn read_input(file: &Path) -> Result<String, CliError> {
    if file.as_os_str() == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        return Ok(source);
    }
    std::fs::read_to_string(file).map_err(|e| {
        CliError::Io(io::Error::new(e.kind(), format!("{}: {e}", file.display())))
    })
}

/// `--table` wins; otherwise the file name, then the configured default.
fn select_table(file: &Path, table: Option<&str>) -> Result<TableKind, CliError> {
    if let Some(name) = table {
        return TableKind::from_name(name).ok_or_else(|| {
            let known: Vec<_> = TableKind::ALL.iter().map(TableKind::name).collect();
            CliError::Usage(format!(
                "unknown table '{}', expected one of: {}",
                name,
                known.join(", ")
            ))
        });
    }

    let config = fsotbl_lsp::load_config()
        .unwrap_or_else(|e| {
            eprintln!("warning: {e}");
            None
        })
        .unwrap_or_default();
    Ok(config.table_for(&file.to_string_lossy()))
}

fn report(output: &ParseOutput, filename: &str, source: &str) {
    let stderr = io::stderr();
    for error in &output.errors {
        error.write_report(filename, source, Severity::Error, stderr.lock());
    }
    for warning in &output.warnings {
        warning.write_report(filename, source, Severity::Warning, stderr.lock());
    }
}

// ============================================================================
// Tree printing
// ============================================================================

fn format_tree(tree: &Attributes) -> String {
    let mut out = String::new();
    write_map(&mut out, tree, 0);
    out
}

fn write_map(out: &mut String, map: &Attributes, indent: usize) {
    for (key, value) in map.iter() {
        let key = if key.is_empty() { "<value>" } else { key };
        let _ = write!(out, "{:indent$}{}:", "", key, indent = indent * 2);
        write_value(out, value, indent);
    }
}

fn write_value(out: &mut String, value: &Value, indent: usize) {
    match value {
        Value::String(text) => {
            let _ = writeln!(out, " {:?}", text);
        }
        Value::Integer(n) => {
            let _ = writeln!(out, " {}", n);
        }
        Value::Float(n) => {
            let _ = writeln!(out, " {:?}", n);
        }
        Value::Boolean(b) => {
            let _ = writeln!(out, " {}", b);
        }
        Value::FloatTriple([x, y, z]) => {
            let _ = writeln!(out, " ({:?}, {:?}, {:?})", x, y, z);
        }
        Value::IntTriple([r, g, b]) => {
            let _ = writeln!(out, " ({}, {}, {})", r, g, b);
        }
        Value::Map(map) => {
            out.push('\n');
            write_map(out, map, indent + 1);
        }
        Value::List(items) => {
            out.push('\n');
            for item in items {
                let _ = write!(out, "{:indent$}-", "", indent = (indent + 1) * 2);
                write_value(out, item, indent + 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_check_args() {
        let args = Args::try_parse_from(["fsotbl", "check", "mod-amr.tbm", "--table", "armor"]).unwrap();
        match args.command {
            Command::Check { file, table } => {
                assert_eq!(file, PathBuf::from("mod-amr.tbm"));
                assert_eq!(table.as_deref(), Some("armor"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_table_is_a_usage_error() {
        let error = select_table(&PathBuf::from("armor.tbl"), Some("weapons")).unwrap_err();
        assert_eq!(error.exit_code(), EXIT_USAGE_ERROR);
        assert_eq!(error.to_string(), "unknown table 'weapons', expected one of: armor");
    }

    #[test]
    fn test_format_tree() {
        let source = "#Armor Type
$Name: Standard
$Damage Type: Laser
+Value: 1.5
#End
";
        let schema = TableKind::Armor.schema();
        let output = parse(&schema, source, CancelSignal::new()).unwrap();
        assert_eq!(
            format_tree(&output.tree(&schema)),
            "Armor Type:
  Name: \"Standard\"
  Damage Type:
    -
      <value>: \"Laser\"
      Value: 1.5
"
        );
    }
}
