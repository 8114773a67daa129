use anyhow::{anyhow, Context, Result};
use clap::Parser;
use num_bigint::BigUint;
use num_traits::FromPrimitive;
use serde::Deserialize;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tailcheck::envelope::{Fallback, PerQTable};
use tailcheck::harmonic::{DecimalSum, FloatSum, FractionSum, SumStrategy};
use tailcheck::margins::{
    check_baseline, compute_per_q_margin, compute_tail_margins, near_baseline,
    strict_diagnostics, Constants,
};
use tailcheck::plot::{plot_harmonic_growth, plot_term_decay};
use tailcheck::sieve::TotientTable;

const DEFAULT_N: &str = "4000000000000000000";

#[derive(Parser, Debug)]
#[command(
    name = "tailcheck",
    version,
    about = "Goldbach tail-bound replication: harmonic sums + major-arc margins"
)]
struct Args {
    /// JSON file with keys N_star_str or N_star, K, S_floor, C_W
    #[arg(long, default_value = "constants.json")]
    constants: PathBuf,

    /// Override N as an integer string or floating-point literal
    #[arg(long = "N")]
    n: Option<String>,

    /// Method to compute S(Q): float | decimal | fraction
    #[arg(long, default_value = "decimal")]
    method: String,

    /// Decimal precision (fractional digits) when method=decimal
    #[arg(long, default_value_t = 50)]
    prec: u64,

    /// Guard-space divisor K (overrides the constants file)
    #[arg(long = "K")]
    k: Option<f64>,

    /// Allowed density floor (overrides the constants file)
    #[arg(long)]
    s_floor: Option<f64>,

    /// Weight constant C_W (overrides both the file and --w-sup)
    #[arg(long)]
    c_w: Option<f64>,

    /// Supremum weight; C_W defaults to 2·W_sup when --c-w is absent
    #[arg(long, default_value_t = 1.0)]
    w_sup: f64,

    /// Exponent of the comparison scale R = N^e
    #[arg(long, default_value_t = 0.6)]
    r_exp: f64,

    /// CSV of per-q envelope constants; enables the per-q margin record
    #[arg(long)]
    per_q_table: Option<PathBuf>,

    /// Upper q limit for the per-q summation
    #[arg(long, default_value_t = 1000)]
    qcap: u64,

    /// Closed form substituted for q values missing from the table: uniform | trivial
    #[arg(long, default_value = "uniform")]
    fallback: String,

    /// Run extra diagnostics: high-precision vs fraction sums and monotone deltas around Q
    #[arg(long, action = clap::ArgAction::SetTrue)]
    strict: bool,

    /// Near N*=4e18, assert S(Q) against the recorded baseline
    #[arg(long, action = clap::ArgAction::SetTrue)]
    assert_baseline: bool,

    /// Render S(q) growth and per-term decay charts
    #[arg(long, action = clap::ArgAction::SetTrue)]
    draw: bool,

    #[arg(long, default_value = "out")]
    out_dir: String,

    #[arg(long, action = clap::ArgAction::SetTrue)]
    verbose: bool,
}

/// Optional constants file. Unknown keys are rejected so a typo cannot
/// silently leave a default in place while looking configured.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConstantsFile {
    #[serde(rename = "N_star_str")]
    n_star_str: Option<String>,
    #[serde(rename = "N_star")]
    n_star: Option<f64>,
    #[serde(rename = "K")]
    k: Option<f64>,
    #[serde(rename = "S_floor")]
    s_floor: Option<f64>,
    #[serde(rename = "C_W")]
    c_w: Option<f64>,
}

/// Missing file means defaults; malformed content warns and keeps defaults.
fn load_constants(path: &Path) -> ConstantsFile {
    if !path.exists() {
        return ConstantsFile::default();
    }
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("[warn] failed to read {}: {e}", path.display());
            return ConstantsFile::default();
        }
    };
    match serde_json::from_str(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("[warn] failed to parse {}: {e}", path.display());
            ConstantsFile::default()
        }
    }
}

/// Integer-literal strings parse exactly; float literals (e.g. "4e18") go
/// through f64 and truncate, as the published constants do.
fn parse_n(input: &str) -> Result<BigUint> {
    let t = input.trim();
    if !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()) {
        return t
            .parse::<BigUint>()
            .with_context(|| format!("unable to parse N='{t}' as an integer"));
    }
    let f: f64 = t
        .parse()
        .with_context(|| format!("unable to parse N='{t}' as an integer"))?;
    if !f.is_finite() || f < 0.0 {
        return Err(anyhow!("N must be a finite non-negative number (got {t})"));
    }
    BigUint::from_f64(f.trunc()).ok_or_else(|| anyhow!("unable to convert N='{t}' to an integer"))
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let file = load_constants(&args.constants);

    let n_input = args
        .n
        .clone()
        .or_else(|| file.n_star_str.clone())
        .or_else(|| file.n_star.map(|v| format!("{v}")))
        .unwrap_or_else(|| DEFAULT_N.to_string());
    let n = parse_n(&n_input)?;

    let constants = Constants {
        k: args.k.or(file.k).unwrap_or(10.0),
        s_floor: args.s_floor.or(file.s_floor).unwrap_or(1.2),
        c_w: args.c_w.or(file.c_w).unwrap_or(2.0 * args.w_sup),
        r_exp: args.r_exp,
    };

    let strategy: Box<dyn SumStrategy> = match args.method.as_str() {
        "float" => Box::new(FloatSum),
        "decimal" => Box::new(DecimalSum { prec: args.prec }),
        "fraction" => Box::new(FractionSum),
        m => return Err(anyhow!("unknown method: {}", m)),
    };

    let result = compute_tail_margins(&n, &constants, strategy.as_ref())?;
    if args.verbose {
        println!(
            "[{}] N={} Q={} S(Q)={:.12} ratio_trivial={:.3e} ratio_uniform={:.3e}",
            strategy.name(),
            n,
            result.q,
            result.sum_q,
            result.ratio_trivial,
            result.ratio_uniform
        );
    }
    println!("{}", serde_json::to_string_pretty(&result)?);

    if let Some(path) = &args.per_q_table {
        let fallback = match args.fallback.as_str() {
            "uniform" => Fallback::Uniform,
            "trivial" => Fallback::Trivial,
            f => return Err(anyhow!("unknown fallback: {}", f)),
        };
        let table = if path.exists() {
            PerQTable::load_csv(path)?
        } else {
            eprintln!(
                "[warn] per-q table {} not found; every q uses the {} fallback",
                path.display(),
                args.fallback
            );
            PerQTable::default()
        };
        if args.verbose {
            println!("[per-q] table rows: {}", table.len());
        }
        let per_q = compute_per_q_margin(&n, &constants, args.qcap, &table, fallback)?;
        println!("{}", serde_json::to_string_pretty(&per_q)?);
    }

    if args.strict {
        let diag = strict_diagnostics(&n, args.prec.max(50), (args.prec + 70).max(120), 5)?;
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "strict": diag }))?
        );
    }

    if args.assert_baseline && near_baseline(&n) {
        let s = check_baseline(&n)?;
        if args.verbose {
            println!("[baseline] S(Q)={s:.12} within tolerance");
        }
    }

    if args.draw {
        create_dir_all(&args.out_dir)?;
        let phi = TotientTable::up_to(result.q + 5)?;
        plot_harmonic_growth(
            &phi,
            result.q + 5,
            &format!("{}/harmonic_growth.png", &args.out_dir),
        )?;
        plot_term_decay(&phi, result.q, &format!("{}/term_decay.png", &args.out_dir))?;
    }

    Ok(if result.accepted() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}
