use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::{LevelFilter, Log, Metadata, Record};

use miniscala::diagnostic::{ansi::AnsiRenderer, json, registry, Diagnostic};
use miniscala::vm::{self, disassembler, ArithmeticMode, Vm, VmConfig, VmError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Compile and execute
    Run,
    /// Print the parsed AST as JSON
    Ast,
    /// Print the compiled chunks
    Bytecode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DiagnosticFormat {
    Ansi,
    Json,
}

#[derive(Parser)]
#[command(name = "miniscala", version, about = "Compile and run miniscala programs on a stack VM")]
struct Cli {
    /// Source file
    #[arg(required_unless_present = "explain")]
    file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Emit::Run)]
    emit: Emit,

    /// Skip static verification
    #[arg(long)]
    no_verify: bool,

    /// Arithmetic on mismatched operands yields Undefined instead of failing
    #[arg(long)]
    permissive: bool,

    /// Operand stack capacity
    #[arg(long, value_name = "N", default_value_t = vm::STACK_MAX)]
    stack_size: usize,

    /// Maximum call depth
    #[arg(long, value_name = "N", default_value_t = vm::FRAMES_MAX)]
    max_depth: usize,

    #[arg(long, value_enum, default_value_t = DiagnosticFormat::Ansi)]
    diagnostics: DiagnosticFormat,

    #[arg(long)]
    no_color: bool,

    /// -v logs calls and returns, -vv every instruction
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log level when no -v is given (off, error, warn, info, debug, trace)
    #[arg(long, env = "MINISCALA_LOG", value_name = "LEVEL", value_parser = parse_level)]
    log: Option<LevelFilter>,

    /// Print the long explanation for an error code, e.g. MS-T006
    #[arg(long, value_name = "CODE")]
    explain: Option<String>,
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    s.parse::<LevelFilter>().map_err(|e| e.to_string())
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(cli: &Cli) {
    let level = match cli.verbose {
        0 => cli.log.unwrap_or(LevelFilter::Warn),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn report(cli: &Cli, diagnostics: &[Diagnostic]) {
    match cli.diagnostics {
        DiagnosticFormat::Json => {
            for d in diagnostics {
                eprintln!("{}", json::render(d));
            }
        }
        DiagnosticFormat::Ansi => {
            let use_color =
                !cli.no_color && std::env::var_os("NO_COLOR").is_none() && io::stderr().is_terminal();
            let renderer = AnsiRenderer { use_color };
            for d in diagnostics {
                eprint!("{}", renderer.render(d));
            }
        }
    }
}

fn explain(code: &str) -> Result<(), Vec<Diagnostic>> {
    match registry::lookup(code) {
        Some(entry) => {
            print!("{}", entry.long);
            Ok(())
        }
        None => Err(vec![Diagnostic::error(format!("unknown error code '{code}'"))
            .with_suggestion("codes look like MS-L001, MS-P004, MS-T006, MS-C006 or MS-R007")]),
    }
}

fn execute(cli: &Cli, path: &Path) -> Result<(), Vec<Diagnostic>> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| vec![Diagnostic::error(format!("cannot read {}: {e}", path.display()))])?;

    let program = miniscala::parse_source(&source)?;
    if cli.emit == Emit::Ast {
        let json = serde_json::to_string_pretty(&program)
            .map_err(|e| vec![Diagnostic::error(format!("cannot serialize AST: {e}"))])?;
        println!("{json}");
        return Ok(());
    }

    if !cli.no_verify {
        miniscala::verify_program(&program)?;
    }
    let compiled = vm::compile(&program).map_err(|e| vec![Diagnostic::from(&e).with_source(source.as_str())])?;
    if cli.emit == Emit::Bytecode {
        print!("{}", disassembler::disassemble(&compiled));
        return Ok(());
    }

    let config = VmConfig {
        stack_capacity: cli.stack_size,
        max_call_depth: cli.max_depth,
        arithmetic: if cli.permissive { ArithmeticMode::Permissive } else { ArithmeticMode::Checked },
    };
    run_program(&compiled, config, io::stdout())
}

fn run_program<W: Write>(compiled: &vm::Program, config: VmConfig, out: W) -> Result<(), Vec<Diagnostic>> {
    let mut machine = Vm::with_output(compiled, config, out).map_err(|e| vec![Diagnostic::from(&e)])?;
    let result = machine.run();
    // Program output has no trailing newline of its own; keep it ahead of any diagnostics.
    let flushed = machine.into_output().flush().map_err(VmError::from);
    result.and(flushed).map_err(|e| vec![Diagnostic::from(&e)])
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match (&cli.explain, &cli.file) {
        (Some(code), _) => explain(code),
        (None, Some(path)) => execute(&cli, path),
        (None, None) => Err(vec![Diagnostic::error("no input file")]),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(diagnostics) => {
            report(&cli, &diagnostics);
            ExitCode::FAILURE
        }
    }
}
