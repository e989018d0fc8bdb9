//! promviz CLI - lower queries into the visual query model
//!
//! Usage:
//!   promviz '<query>'
//!   echo '<query>' | promviz
//!
//! Examples:
//!   promviz 'sum by (job) (rate(http_requests_total[5m]))'
//!   promviz --pretty 'metric_a + on(host) metric_b'

use std::io::Read;
use std::process::ExitCode;

use ariadne::{Label, Report, ReportKind, Source};
use clap::Parser;

use promviz::{build_visual_query, ParsingError};

#[derive(Parser)]
#[command(name = "promviz")]
#[command(about = "Lower a PromQL-style query into an editable visual query model")]
#[command(version)]
struct Cli {
    /// The query to lower; read from stdin when omitted.
    query: Option<String>,

    /// Pretty-print the JSON output.
    #[arg(short, long)]
    pretty: bool,

    /// Suppress rendered error reports.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let query = match cli.query {
        Some(query) => query,
        None => {
            let mut buffer = String::new();
            if let Err(error) = std::io::stdin().read_to_string(&mut buffer) {
                eprintln!("error: failed to read stdin: {error}");
                return ExitCode::FAILURE;
            }
            buffer
        }
    };
    // Only the trailing newline; leading whitespace would shift error spans.
    let query = query.trim_end().to_string();

    let result = build_visual_query(&query);

    let json = if cli.pretty {
        serde_json::to_string_pretty(&result.query)
    } else {
        serde_json::to_string(&result.query)
    };
    match json {
        Ok(out) => println!("{out}"),
        Err(error) => {
            eprintln!("error: failed to serialize query model: {error}");
            return ExitCode::FAILURE;
        }
    }

    if !cli.quiet {
        for error in &result.errors {
            render_error(&query, error);
        }
    }

    if result.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Render one diagnostic as an annotated source report.
fn render_error(query: &str, error: &ParsingError) {
    let span = match (error.from, error.to) {
        (Some(from), Some(to)) if from <= to && to <= query.len() => from..to,
        _ => 0..query.len(),
    };
    let message = if error.text.is_empty() {
        "syntax error".to_string()
    } else {
        error.text.clone()
    };
    let _ = Report::build(ReportKind::Error, ("query", span.clone()))
        .with_message(&message)
        .with_label(Label::new(("query", span)).with_message(&message))
        .finish()
        .eprint(("query", Source::from(query)));
}
