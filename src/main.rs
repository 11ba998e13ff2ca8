// ents: front end for a small C-like systems language

use std::path::PathBuf;
use std::process;

use log::debug;

use ents::parser::printer;
use ents::{Frontend, FrontendConfig};

struct Options {
    config: FrontendConfig,
    files: Vec<PathBuf>,
}

fn usage(program_name: &str) -> ! {
    eprintln!("Usage: {} [-D NAME=VALUE]... [-I DIR]... [--no-color] <file>...", program_name);
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} main.e                  # Print the syntax tree", program_name);
    eprintln!("  {} -D ARCH=x86 -I lib main.e", program_name);
    process::exit(1);
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut config = FrontendConfig::new();
    let mut files = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-D" => {
                let definition = iter.next().ok_or("-D expects NAME=VALUE")?;
                config = with_define(config, definition)?;
            }
            "-I" => {
                let dir = iter.next().ok_or("-I expects a directory")?;
                config = config.with_include_dir(dir);
            }
            "--no-color" => config = config.with_color(false),
            other if other.starts_with("-D") && other.len() > 2 => {
                config = with_define(config, &other[2..])?;
            }
            other if other.starts_with("-I") && other.len() > 2 => {
                config = config.with_include_dir(&other[2..]);
            }
            other if other.starts_with('-') => return Err(format!("Unknown option '{}'", other)),
            file => files.push(PathBuf::from(file)),
        }
    }

    if files.is_empty() {
        return Err("No input file provided".to_string());
    }
    Ok(Options { config, files })
}

fn with_define(config: FrontendConfig, definition: &str) -> Result<FrontendConfig, String> {
    match definition.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok(config.with_define(name, value)),
        None if !definition.is_empty() => Ok(config.with_define(definition, "1")),
        _ => Err(format!("Malformed definition '{}'", definition)),
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let program_name = args.first().map(|s| s.as_str()).unwrap_or("ents");

    let options = match parse_args(&args[1.min(args.len())..]) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!();
            usage(program_name);
        }
    };

    let color = options.config.color;
    let frontend = Frontend::new(options.config);
    let mut failed = false;

    for file in &options.files {
        debug!("compiling {}", file.display());
        match frontend.compile(file) {
            Ok(compilation) => print!("{}", printer::dump(&compilation.unit)),
            Err(err) => {
                eprint!("{}", err.render(color));
                failed = true;
            }
        }
    }

    if failed {
        process::exit(1);
    }
}
