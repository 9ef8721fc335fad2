use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use cint_core::{AnalysisConfig, CintError, NumberingSystem, OutputMode, Score};
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

const EXAMPLES: &str = "\
Two-voice modules in diatonic numbers:
    cint score.krn

Three-module chains in base-40 with bracketed harmonic intervals:
    cint --40 -n 3 -q score.krn

Chains that start and stop on simultaneous attacks, rests not allowed:
    cint --attacks -R score.krn

Pitch grid with rhythmic positions:
    cint --pitches -r score.krn

Lattice rows, module text only:
    cint -l --rows --raw score.krn
";

fn main() -> cint_core::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if cli.author {
        println!("{}", env!("CARGO_PKG_AUTHORS"));
        return Ok(());
    }
    if cli.example {
        print!("{EXAMPLES}");
        return Ok(());
    }

    let config = cli.analysis_config()?;
    tracing::debug!(?config, "analysis configuration");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if cli.inputs.is_empty() {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        run(&text, &config, &mut out)?;
    } else {
        for path in &cli.inputs {
            let text = read_input(path)?;
            tracing::info!(?path, "analyzing score");
            run(&text, &config, &mut out)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn run(text: &str, config: &AnalysisConfig, out: &mut dyn Write) -> cint_core::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    let score = Score::parse(text)?;
    cint_core::analyze(&score, config, out)
}

fn read_input(path: &Path) -> cint_core::Result<String> {
    std::fs::read_to_string(path)
        .map_err(|err| CintError::msg(format!("cannot read {}: {err}", path.display())))
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Counterpoint interval modules for Humdrum scores",
    long_about = None,
    disable_help_flag = true
)]
struct Cli {
    /// Humdrum files to analyze; standard input when none are given.
    inputs: Vec<PathBuf>,

    /// JSON analysis configuration; flags are applied on top of it.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Display pitches and intervals in base-40.
    #[arg(long = "base-40", visible_aliases = ["base40", "b40", "40"])]
    base40: bool,
    /// Display pitches and intervals in base-12.
    #[arg(long = "base-12", visible_aliases = ["base12", "b12", "12"])]
    base12: bool,
    /// Display pitches and intervals in base-7 (the default).
    #[arg(short = '7', long = "base-7", visible_aliases = ["base7", "b7", "diatonic"])]
    base7: bool,

    /// Number of sequential modules in a chain.
    #[arg(short = 'n', long = "chain", value_name = "N")]
    chain: Option<usize>,

    /// Display the pitch grid the modules are calculated from.
    #[arg(long, visible_alias = "pitch")]
    pitches: bool,
    /// Add rhythmic positions to the pitch grid.
    #[arg(short, long)]
    rhythm: bool,
    /// Calculate a lattice over all voices.
    #[arg(short = 'l', long)]
    lattice: bool,
    /// Interleave lattice modules with the voices.
    #[arg(short = 'L', long = "interleaved-lattice")]
    interleaved: bool,
    /// Display lattices in row form.
    #[arg(long, visible_alias = "row")]
    rows: bool,
    /// Display only modules, one per line.
    #[arg(long)]
    raw: bool,

    /// Put square brackets around harmonic intervals.
    #[arg(short = 'q', long = "harmonic-parentheses")]
    harmonic_brackets: bool,
    /// Put curly braces around melodic intervals.
    #[arg(short = 'y', long = "melodic-parentheses")]
    melodic_braces: bool,
    /// Put parentheses around modules.
    #[arg(short = 'p', long)]
    parentheses: bool,
    /// Put an h after harmonic intervals.
    #[arg(short = 'h', long = "harmonic-marker")]
    harmonic_marker: bool,
    /// Put an m after the top voice's melodic intervals.
    #[arg(short = 'm', long = "melodic-marker")]
    melodic_marker: bool,

    /// Display attack/sustain states of notes.
    #[arg(short = 's', long)]
    sustain: bool,
    /// Display attack/sustain states on harmonic intervals only.
    #[arg(short = 'x', long = "xoption")]
    harmonic_sustain: bool,
    /// Shift modules so their smallest compound interval fits an octave.
    #[arg(short = 'o', long)]
    octave: bool,
    /// Reduce every harmonic interval to within an octave.
    #[arg(short = 'O', long = "octave-all")]
    octave_all: bool,
    /// Display intervals as names with chromatic qualities.
    #[arg(long)]
    chromatic: bool,
    /// Display diatonic intervals with a zero offset.
    #[arg(short = 'z', long)]
    zero: bool,

    /// Don't display harmonic intervals.
    #[arg(short = 'H', long = "no-harmonic")]
    no_harmonic: bool,
    /// Don't display melodic intervals.
    #[arg(short = 'M', long = "no-melodic")]
    no_melodic: bool,
    /// Display the top voice's melodic interval as well.
    #[arg(short = 't', long)]
    top: bool,
    /// Display only the top voice's melodic interval.
    #[arg(short = 'T', long = "top-only")]
    top_only: bool,
    /// Reject modules with melodic perfect unisons.
    #[arg(short = 'U', long = "no-melodic-unisons")]
    no_unisons: bool,
    /// Reject modules that contain rests.
    #[arg(
        short = 'R',
        long = "no-rests",
        visible_aliases = ["no-rest", "norest", "norests"]
    )]
    no_rests: bool,
    /// Start and stop module chains on pairs of note attacks.
    #[arg(long, visible_alias = "attack")]
    attacks: bool,

    /// Log each processed line to standard error.
    #[arg(long)]
    debug: bool,
    /// Print the program authors.
    #[arg(long)]
    author: bool,
    /// Print example usages.
    #[arg(long)]
    example: bool,
    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Cli {
    /// Configuration file (or defaults) with the command-line switches
    /// layered on top.
    fn analysis_config(&self) -> cint_core::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path)?,
            None => AnalysisConfig::default(),
        };

        if self.base40 {
            config.numbering = NumberingSystem::Base40;
        } else if self.base12 {
            config.numbering = NumberingSystem::Base12;
        } else if self.base7 {
            config.numbering = NumberingSystem::Base7;
        }
        if let Some(chain) = self.chain {
            config.chain_length = chain;
        }

        if self.pitches {
            config.mode = OutputMode::PitchGrid;
        } else if self.lattice {
            config.mode = OutputMode::Lattice;
        } else if self.interleaved {
            config.mode = OutputMode::InterleavedLattice;
        }

        let interval = &mut config.interval;
        interval.chromatic |= self.chromatic;
        interval.zero_based |= self.zero;
        interval.octave_fold |= self.octave_all;
        interval.sustain_markup |= self.sustain;
        interval.harmonic_attack_markup |= self.harmonic_sustain;

        let module = &mut config.module;
        module.attacks |= self.attacks;
        module.no_rests |= self.no_rests;
        module.no_unisons |= self.no_unisons;
        module.octave_adjust |= self.octave;
        module.no_harmonic |= self.no_harmonic;
        module.no_melodic |= self.no_melodic;
        module.top |= self.top;
        module.top_only |= self.top_only;

        let decoration = &mut config.decoration;
        decoration.parentheses |= self.parentheses;
        decoration.harmonic_brackets |= self.harmonic_brackets;
        decoration.melodic_braces |= self.melodic_braces;
        decoration.harmonic_marker |= self.harmonic_marker;
        decoration.melodic_marker |= self.melodic_marker;

        let layout = &mut config.layout;
        layout.raw |= self.raw;
        layout.rows |= self.rows;
        layout.rhythm |= self.rhythm;

        Ok(config.normalized())
    }
}
