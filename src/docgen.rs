use anyhow::Result;
use docview::fixture::{generate, GeneratorConfig};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

struct Config {
    generator: GeneratorConfig,
    output_file: Option<String>,
    use_brotli: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            generator: GeneratorConfig::default(),
            output_file: None,
            use_brotli: false,
        }
    }
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    match args.get(*i) {
        Some(value) => Ok(value),
        None => anyhow::bail!("{} requires an argument", flag),
    }
}

fn parse_args() -> Result<Config> {
    let args: Vec<String> = env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-folders" => {
                config.generator.folders = next_value(&args, &mut i, "-folders")?.parse()?;
            }
            "-files" => {
                let min: usize = next_value(&args, &mut i, "-files")?.parse()?;
                config.generator.files_min = min;
                config.generator.files_max = min;
                // An optional second number makes it a range
                if let Some(max) = args.get(i + 1).and_then(|arg| arg.parse::<usize>().ok()) {
                    i += 1;
                    config.generator.files_max = max;
                }
                if config.generator.files_max < config.generator.files_min {
                    anyhow::bail!(
                        "-files range is empty: {} > {}",
                        config.generator.files_min,
                        config.generator.files_max
                    );
                }
            }
            "-depth" => {
                config.generator.depth = next_value(&args, &mut i, "-depth")?.parse()?;
            }
            "-seed" => {
                config.generator.seed = next_value(&args, &mut i, "-seed")?.parse()?;
            }
            "-out" => {
                config.output_file = Some(next_value(&args, &mut i, "-out")?.to_string());
            }
            "-brotli" => {
                config.use_brotli = true;
            }
            "-h" | "-help" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Warning: Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    Ok(config)
}

fn print_help() {
    println!("Facility Document Listing Generator");
    println!("Usage: docview-gen [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -folders <N>           Subfolders per folder (default: 4)");
    println!("  -files <N> [M]         Files per folder (default: 20 200)");
    println!("                         If two numbers provided, each folder gets a random count in [N, M]");
    println!("  -depth <N>             Folder nesting below the root (default: 2)");
    println!("  -seed <N>              Random seed (default: 42)");
    println!("  -out <FILE>            Output file path (default: listing.json)");
    println!("  -brotli                Write compressed listing using Brotli (output: *.json.br)");
    println!("  -h, -help, --help      Show this help message");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let config = parse_args()?;

    let output_path = PathBuf::from(config.output_file.clone().unwrap_or_else(|| {
        if config.use_brotli {
            "listing.json.br".to_string()
        } else {
            "listing.json".to_string()
        }
    }));

    let fixture = generate(&config.generator);
    fixture.write(&output_path)?;

    println!(
        "Listing written to: {} ({} folders, {} entries)",
        output_path.display(),
        fixture.folders.len(),
        fixture.entry_count()
    );
    Ok(())
}
