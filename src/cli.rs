use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the routine JSON file
    #[arg(short, long)]
    pub routine_file: String,

    /// Barcode or item id to leave out of the check (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "KEY")]
    pub excluded: Vec<String>,

    /// Scoring service base URL, overriding FOODSCAN_API_BASE
    #[arg(long)]
    pub api_base: Option<String>,

    /// Derive and print the additive set without calling the scoring service
    #[arg(long)]
    pub offline: bool,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
