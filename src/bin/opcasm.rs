use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use opcasm::output::{write_image, write_symbol_table, write_symbols_json, ListingWriter};
use opcasm::{AsmConfig, Assembler, Assembly, NoListing, SizingMode};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Sizing {
    Compatible,
    Exact,
}

impl From<Sizing> for SizingMode {
    fn from(s: Sizing) -> Self {
        match s {
            Sizing::Compatible => SizingMode::Compatible,
            Sizing::Exact => SizingMode::Exact,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Assemble OPC5ls source into a hex memory image")]
struct Opts {
    /// Assembly source file
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// Hex image to write
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,
    /// How pass A sizes instructions
    #[arg(long, value_enum)]
    sizing: Option<Sizing>,
    /// JSON file with an AsmConfig; flags override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Words per line in the hex image
    #[arg(long, value_name = "N")]
    words_per_line: Option<usize>,
    /// Also write user symbols as JSON (Vec<{ name, value }>)
    #[arg(long, value_name = "FILE")]
    symbols_json: Option<PathBuf>,
    /// Do not print the listing and symbol table
    #[arg(long)]
    no_listing: bool,
}

fn load_config(opts: &Opts) -> Result<AsmConfig> {
    let mut cfg = match &opts.config {
        Some(path) => {
            let txt = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&txt)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => AsmConfig::default(),
    };
    if let Some(s) = opts.sizing {
        cfg.sizing = s.into();
    }
    if let Some(n) = opts.words_per_line {
        anyhow::ensure!(n > 0, "--words-per-line must be at least 1");
        cfg.words_per_line = n;
    }
    Ok(cfg)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let opts = Opts::parse();
    let cfg = load_config(&opts)?;
    let source = std::fs::read_to_string(&opts.input)
        .with_context(|| format!("reading {}", opts.input.display()))?;

    let assembler = Assembler::new(cfg);
    let stdout = io::stdout();
    let Assembly { symbols, image } = if opts.no_listing {
        assembler.assemble(&source, &mut NoListing)?
    } else {
        let mut listing = ListingWriter::new(stdout.lock());
        let asm = assembler.assemble(&source, &mut listing)?;
        let mut out = listing.into_inner();
        write_symbol_table(&mut out, &asm.symbols)?;
        out.flush()?;
        asm
    };

    let file = File::create(&opts.output)
        .with_context(|| format!("creating {}", opts.output.display()))?;
    let mut out = BufWriter::new(file);
    write_image(&mut out, &image, cfg.words_per_line)?;
    out.flush()
        .with_context(|| format!("writing {}", opts.output.display()))?;

    if let Some(path) = &opts.symbols_json {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = BufWriter::new(file);
        write_symbols_json(&mut out, &symbols)
            .with_context(|| format!("writing {}", path.display()))?;
        out.flush()?;
    }

    info!(words = image.used(), output = %opts.output.display(), "assembled");
    Ok(())
}
