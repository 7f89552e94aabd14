use clap::Parser;

fn main() {
    time_local::init();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let exit_code = match caliban::cli::Cli::parse().run() {
        Ok(exit_code) => exit_code,
        Err(error) => {
            const BOLD_RED: &str = "\x1b[1;31m";
            const BOLD: &str = "\x1b[1m";
            const RESET: &str = "\x1b[0m";
            eprintln!(
                "{BOLD_RED}error{RESET}{BOLD}:{RESET} {highlighted}",
                highlighted = caliban::error::Highlighted(&error)
            );
            error.exit_code()
        }
    };
    std::process::exit(exit_code);
}
