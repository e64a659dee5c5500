use std::fs;
use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use miette::IntoDiagnostic;
use miette::WrapErr;
use seq_shorthand::{Error, Limits, Token};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Deepest parenthesis nesting to accept
    #[arg(long, global = true, default_value_t = Limits::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Most values an expansion may produce
    #[arg(long, global = true, default_value_t = Limits::DEFAULT_MAX_OUTPUT_LEN)]
    max_len: usize,

    /// Don't print the banner
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the expanded sequence
    Expand(Source),
    /// Check that the shorthand is well-formed
    Validate(Source),
    /// Print the token stream
    Tokenize(Source),
    /// Print the parsed shorthand in canonical form
    Parse(Source),
}

#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
struct Source {
    /// Shorthand to process, e.g. "(1, 2)x2, 42x3"
    input: Option<String>,

    /// Read the shorthand from a file instead
    #[arg(short, long)]
    file: Option<PathBuf>,
}

impl Source {
    fn read(&self) -> miette::Result<(String, String)> {
        match (&self.input, &self.file) {
            (Some(input), _) => Ok(("<input>".to_string(), input.clone())),
            (None, Some(filename)) => {
                let file_contents = fs::read_to_string(filename)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("reading `{}` failed", filename.display()))?;
                Ok((filename.display().to_string(), file_contents))
            }
            (None, None) => Err(miette::miette!("no shorthand given")),
        }
    }
}

fn fail(error: Error, name: &str, source: &str) -> miette::Report {
    let syntax = error.is_syntax();
    let report = error.report(name, source);
    if syntax {
        eprintln!("{report:?}");
        std::process::exit(65);
    }
    report
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    let limits = Limits {
        max_depth: args.max_depth,
        max_output_len: args.max_len,
    };

    match args.command {
        Commands::Expand(source) => {
            let (name, text) = source.read()?;
            if !args.quiet {
                eprintln!("==========================================");
                eprintln!("Parsing number sequence shorthand: {}", text.trim());
            }
            let values = seq_shorthand::parse_and_evaluate_with(&text, limits)
                .map_err(|e| fail(e, &name, &text))?;
            let rendered: Vec<String> = values.iter().map(f64::to_string).collect();
            println!("{}", rendered.join(", "));
        }
        Commands::Validate(source) => {
            let (name, text) = source.read()?;
            seq_shorthand::validate_with(&text, limits).map_err(|e| fail(e, &name, &text))?;
            println!("ok");
        }
        Commands::Tokenize(source) => {
            let (name, text) = source.read()?;
            for token in seq_shorthand::Lexer::new(&text) {
                let token: Token<'_> = token.map_err(|e| fail(e.into(), &name, &text))?;
                println!("{token}");
            }
        }
        Commands::Parse(source) => {
            let (name, text) = source.read()?;
            let ast = seq_shorthand::Parser::new(&text)
                .with_limits(limits)
                .parse()
                .map_err(|e| fail(e, &name, &text))?;
            println!("{ast}");
        }
    }
    Ok(())
}
