extern crate clap;
#[macro_use] extern crate log;
extern crate fern;
extern crate chrono;
extern crate term_grid;

pub mod assembler;

use clap::{Arg, ArgMatches, App};
use term_grid::{Grid, GridOptions, Direction, Filling, Cell};

use std::path::{Path, PathBuf};

use assembler::{Assembler, Config, OutputFormat, Word};

const DEFAULT_INPUT: &str = "input.txt";

fn main() {
    let args = process_arguments();
    initialize_logging(args.occurrences_of("verbose"));

    let format = if args.is_present("hex") { OutputFormat::Hex } else { OutputFormat::Binary };
    let config = Config { format, error_log: args.is_present("error-log") };

    let ipath = Path::new(args.value_of("file").unwrap_or(DEFAULT_INPUT));
    let opath = match args.value_of("output") {
        Some(filename) => PathBuf::from(filename),
        None => default_output(ipath, format),
    };

    debug!("Arguments:\n\tVerbosity: {}\n\tHex: {}\n\tError log: {}\n\tOutfile: {}\n\tInfile: {}",
        match args.occurrences_of("verbose") {
            0 => log::LevelFilter::Error.to_string(),
            1 => log::LevelFilter::Warn.to_string(),
            2 => log::LevelFilter::Info.to_string(),
            3 | _ => log::LevelFilter::Debug.to_string(),
        },
        args.is_present("hex"),
        config.error_log,
        opath.display(),
        ipath.display()
    );

    let status = match Assembler::new(config).assemble(ipath, &opath) {
        Ok(words) => {
            if args.is_present("print-debug") {
                print_listing(&words, format);
            }
            0
        },
        Err(err) => {
            error!("fatal: {}", err);
            err.code()
        },
    };

    if config.error_log {
        println!("{}", status);
    }
    std::process::exit(status);
}

/// `prog.asm` becomes `prog.bin` (or `prog.hex`). Never returns the input path itself.
fn default_output(ipath: &Path, format: OutputFormat) -> PathBuf {
    let opath = ipath.with_extension(format.extension());
    if opath == ipath {
        let mut name = ipath.as_os_str().to_owned();
        name.push(".");
        name.push(format.extension());
        PathBuf::from(name)
    } else {
        opath
    }
}

fn print_listing(words: &[Word], format: OutputFormat) {
    let mut grid = Grid::new(GridOptions {
        filling:     Filling::Spaces(1),
        direction:   Direction::LeftToRight,
    });

    for word in words {
        grid.add(Cell::from(format!("x{:04X}:", word.address)));
        grid.add(Cell::from(word.source.clone().unwrap_or_default()));
        grid.add(Cell::from("=>".to_string()));
        grid.add(Cell::from(word.render(format)));
    }

    println!("{}", grid.fit_into_columns(4));
}

fn process_arguments() -> ArgMatches<'static> {
    App::new(option_env!("CARGO_PKG_NAME").unwrap_or("lc3asm"))
        .version(option_env!("CARGO_PKG_VERSION").unwrap_or("0.0.0"))
        .author(option_env!("CARGO_PKG_AUTHORS").unwrap_or(""))
        .about(option_env!("CARGO_PKG_DESCRIPTION").unwrap_or(""))
        .arg(Arg::with_name("file")
            .short("f")
            .long("file")
            .takes_value(true)
            .value_name("FILE")
            .default_value(DEFAULT_INPUT)
            .help("the path for the input file"))
        .arg(Arg::with_name("output")
            .short("o")
            .long("output")
            .takes_value(true)
            .value_name("FILE")
            .help("the path for the output file (default: input with a .bin or .hex extension)"))
        .arg(Arg::with_name("hex")
            .short("s")
            .long("hex")
            .takes_value(false)
            .help("write the machine code in hex instead of binary"))
        .arg(Arg::with_name("error-log")
            .short("e")
            .long("error-log")
            .takes_value(false)
            .help("print out error information and the numeric status"))
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .takes_value(false)
            .help("Sets the level of verbosity"))
        .arg(Arg::with_name("print-debug")
            .short("d")
            .alias("show")
            .takes_value(false)
            .help("prints the assembled listing to STDOUT"))
        .get_matches()
}

fn initialize_logging(verbosity: u64) {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(match verbosity {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Warn,
            2 => log::LevelFilter::Info,
            3 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .chain(std::io::stdout())
        .apply().ok();
}
