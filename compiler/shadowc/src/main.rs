//! Shadow compiler CLI.

use shadow_diagnostic::ExitStatus;
use shadowc::{cli::CliOptions, config::Config, front::FrontEnd, UnlinkedFrontEnd, USAGE};

fn main() {
    shadowc::tracing_setup::init();
    std::process::exit(run());
}

fn run() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match CliOptions::parse(args) {
        Ok(options) => options,
        Err(error) => {
            eprintln!("shadowc: {error}");
            eprint!("{USAGE}");
            return ExitStatus::CommandLineError.code();
        }
    };

    if options.help {
        print!("{USAGE}");
        return ExitStatus::Success.code();
    }

    let config_path = match Config::locate(options.config.as_deref()) {
        Ok(path) => path,
        Err(error) => {
            eprintln!("shadowc: {error}");
            return error.exit_status().code();
        }
    };
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("shadowc: {error}");
            return error.exit_status().code();
        }
    };

    if options.information {
        println!("shadowc {}", env!("CARGO_PKG_VERSION"));
        println!("configuration: {}", config_path.display());
        println!("llc: {}", config.llc.display());
        println!("clang: {}", config.clang.display());
        println!("minimum LLVM: {}", config.minimum_llvm);
        for import in &config.imports {
            println!("import: {}", import.display());
        }
        return ExitStatus::Success.code();
    }

    let Some(source) = options.source.clone() else {
        eprintln!("shadowc: no source file given");
        return ExitStatus::CommandLineError.code();
    };
    if !source.exists() {
        eprintln!("shadowc: source file `{}` not found", source.display());
        return ExitStatus::FileNotFound.code();
    }

    let mut front = UnlinkedFrontEnd;
    let unit = match front.load(&source) {
        Ok(unit) => unit,
        Err(error) => {
            eprintln!("shadowc: {error}");
            return error.exit_status().code();
        }
    };

    match shadowc::compile(unit, &options, &config) {
        Ok(status) => status.code(),
        Err(error) => {
            eprintln!("shadowc: {error}");
            error.exit_status().code()
        }
    }
}
