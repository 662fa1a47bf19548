use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of the formats the registry in src/main.rs offers.
// Build scripts can't reach src/ modules, so the list is repeated here.
const FORMATS: &[&str] = &["markdown", "html", "json"];

fn input_arg() -> Arg {
    Arg::new("input")
        .help("Input file path")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = Command::new("composer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for converting and checking composer documents")
        .arg_required_else_help(true)
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
                .arg(input_arg())
                .arg(
                    Arg::new("from")
                        .long("from")
                        .value_parser(clap::builder::PossibleValuesParser::new(FORMATS)),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .required(true)
                        .value_parser(clap::builder::PossibleValuesParser::new(FORMATS)),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("tokens")
                .about("Print the markdown token stream as JSON")
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("roundtrip")
                .about("Export and re-import a markdown file, failing when the trees differ")
                .arg(input_arg()),
        );

    generate_to(Bash, &mut cmd, "composer", &outdir)?;
    generate_to(Zsh, &mut cmd, "composer", &outdir)?;
    generate_to(Fish, &mut cmd, "composer", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}
