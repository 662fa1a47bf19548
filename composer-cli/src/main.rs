// Command-line interface for composer documents
//
// The composer stores posts as markdown with a few extensions (hashtags,
// mentions, emoji, bbcode quotes). This binary is a thin shell over the
// composer-babel library for converting those documents and looking inside
// the importer.
//
// Usage:
//  composer convert <input> --to <format> [--from <format>] [--output <file>]  - Convert between formats
//  composer tokens <input.md>                                                  - Dump the markdown token stream as JSON
//  composer roundtrip <input.md>                                               - Check import(export(doc)) == doc
//
// Configuration is read from the embedded defaults, then composer.toml in the
// working directory, then the file given with --config.

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use composer_babel::formats::markdown::tokenizer::tokenize;
use composer_babel::formats::{HtmlFormat, JsonFormat, MarkdownFormat};
use composer_babel::{export_markdown, import_markdown, FormatRegistry, Schema, TokenizerOptions};
use composer_config::{ComposerConfig, Loader};
use std::fs;
use std::sync::Arc;
use tracing::Level;

const FORMATS: &[&str] = &["markdown", "html", "json"];

fn build_cli() -> Command {
    Command::new("composer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for converting and checking composer documents")
        .long_about(
            "composer works with the markdown dialect composer posts are stored in.\n\n\
            Commands:\n  \
            - convert:   Transform between markdown, HTML and the JSON document tree\n  \
            - tokens:    Show the token stream the markdown importer consumes\n  \
            - roundtrip: Check that exporting and re-importing preserves the document\n\n\
            Examples:\n  \
            composer convert post.md --to html          # Render to HTML (stdout)\n  \
            composer convert post.html --to markdown    # Cooked HTML back to markdown\n  \
            composer tokens post.md                     # Token stream as JSON\n  \
            composer roundtrip post.md                  # Exit 1 on a lossy round trip",
        )
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a composer.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log import and export decisions to stderr")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert between document formats")
                .long_about(
                    "Convert documents between formats.\n\n\
                    Supported formats:\n  \
                    - markdown: composer markdown (.md)\n  \
                    - html:     on-screen DOM form (.html)\n  \
                    - json:     document tree as JSON (.json)\n\n\
                    The source format is auto-detected from the file extension.\n\
                    Output goes to stdout by default, or use -o to specify a file.",
                )
                .arg(
                    Arg::new("input")
                        .help("Input file path")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Source format (auto-detected from file extension if not specified)")
                        .value_parser(clap::builder::PossibleValuesParser::new(FORMATS))
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format (required)")
                        .required(true)
                        .value_parser(clap::builder::PossibleValuesParser::new(FORMATS))
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Output file path (defaults to stdout)")
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("tokens")
                .about("Print the markdown token stream as JSON")
                .arg(
                    Arg::new("input")
                        .help("Markdown file path")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("roundtrip")
                .about("Export and re-import a markdown file, failing when the trees differ")
                .arg(
                    Arg::new("input")
                        .help("Markdown file path")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                ),
        )
}

fn main() {
    let matches = build_cli().get_matches();

    init_logging(matches.get_flag("verbose"));
    let config = load_cli_config(matches.get_one::<String>("config").map(|s| s.as_str()));

    match matches.subcommand() {
        Some(("convert", sub_matches)) => handle_convert_command(sub_matches, &config),
        Some(("tokens", sub_matches)) => handle_tokens_command(required(sub_matches, "input"), &config),
        Some(("roundtrip", sub_matches)) => {
            handle_roundtrip_command(required(sub_matches, "input"), &config)
        }
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_cli_config(explicit_path: Option<&str>) -> ComposerConfig {
    let loader = Loader::new().with_project_file(".");
    let loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };

    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

/// Arguments marked required are always present once clap accepts the input.
fn required<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_default()
}

fn read_input(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{path}': {e}");
        std::process::exit(1);
    })
}

fn registry_from_config(schema: Arc<Schema>, config: &ComposerConfig) -> FormatRegistry {
    let mut registry = FormatRegistry::new();
    registry.register(MarkdownFormat::new(schema.clone()).with_options(tokenizer_options(config)));
    registry.register(HtmlFormat::new(schema.clone()));
    registry.register(JsonFormat::new(schema));
    registry
}

fn tokenizer_options(config: &ComposerConfig) -> TokenizerOptions {
    (&config.markdown).into()
}

fn handle_convert_command(matches: &ArgMatches, config: &ComposerConfig) {
    let input = required(matches, "input");
    let to = required(matches, "to");
    let registry = registry_from_config(Arc::new(Schema::with_defaults()), config);

    // Auto-detect --from if not provided
    let from = match matches.get_one::<String>("from") {
        Some(from) => from.clone(),
        None => match registry.detect_format_from_filename(input) {
            Some(detected) => detected,
            None => {
                eprintln!("Error: Could not detect format from filename '{input}'");
                eprintln!("Please specify --from explicitly");
                std::process::exit(1);
            }
        },
    };
    tracing::debug!(input, from = %from, to, "converting");

    let source = read_input(input);
    let doc = registry.parse(&source, &from).unwrap_or_else(|e| {
        eprintln!("Parse error: {e}");
        std::process::exit(1);
    });
    let result = registry.serialize(&doc, to).unwrap_or_else(|e| {
        eprintln!("Serialization error: {e}");
        std::process::exit(1);
    });

    match matches.get_one::<String>("output") {
        Some(path) => fs::write(path, result).unwrap_or_else(|e| {
            eprintln!("Error writing file '{path}': {e}");
            std::process::exit(1);
        }),
        None => print!("{result}"),
    }
}

fn handle_tokens_command(input: &str, config: &ComposerConfig) {
    let source = read_input(input);
    let tokens = tokenize(&source, &tokenizer_options(config));
    let json = serde_json::to_string_pretty(&tokens).unwrap_or_else(|e| {
        eprintln!("Serialization error: {e}");
        std::process::exit(1);
    });
    println!("{json}");
}

fn handle_roundtrip_command(input: &str, config: &ComposerConfig) {
    let schema = Schema::with_defaults();
    let options = tokenizer_options(config);
    let source = read_input(input);

    let first = import_markdown(&schema, &source, &options).unwrap_or_else(|e| {
        eprintln!("Parse error: {e}");
        std::process::exit(1);
    });
    let exported = export_markdown(&schema, &first).unwrap_or_else(|e| {
        eprintln!("Serialization error: {e}");
        std::process::exit(1);
    });
    let second = import_markdown(&schema, &exported, &options).unwrap_or_else(|e| {
        eprintln!("Parse error in exported markdown: {e}");
        std::process::exit(1);
    });

    print!("{exported}");
    if first != second {
        eprintln!("Round trip changed the document");
        tracing::debug!(before = ?first, after = ?second, "round trip mismatch");
        std::process::exit(1);
    }
}
