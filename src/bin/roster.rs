use std::env;

use roster_dl::cli::{self, Parsed};

fn print_usage() {
    eprintln!("Usage: roster [OPTIONS] <COMMAND>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  courses             List the courses available to your account");
    eprintln!("  extract <ID>...     Extract the roster and email list of each course");
    eprintln!("  extract-all         Export every course as one ZIP archive");
    eprintln!("  health              Check that the service is reachable");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --api <URL>         Service base URL (overrides ROSTER_API_BASE and config)");
    eprintln!("  -o, --output <DIR>  Directory for saved files (default: .)");
    eprintln!("  -f, --force         Overwrite existing files");
    eprintln!("  -h, --help          Show this help");
    eprintln!();
    eprintln!("Credentials are read from ROSTER_USERNAME and ROSTER_PASSWORD.");
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = match cli::parse_args(env::args().skip(1)) {
        Ok(Parsed::Run(args)) => args,
        Ok(Parsed::Help) => {
            print_usage();
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(e) = cli::run(args).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
