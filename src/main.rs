fn main() {
    use clap::Parser;
    use std::error::Error;
    let args = comic2epub::cli::Args::parse();
    comic2epub::cli::init_logging(&args);
    if let Err(e) = comic2epub::cli::run(&args) {
        log::error!("{}", e);
        if args.verbose {
            let mut source = e.source();
            while let Some(s) = source {
                log::error!("  cause: {}", s);
                source = s.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}
