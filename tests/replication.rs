use approx::{assert_abs_diff_eq, assert_relative_eq};
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, BigUint};
use num_traits::{ToPrimitive, Zero};
use tailcheck::envelope::{e_uniform, Fallback, PerQRow, PerQTable};
use tailcheck::harmonic::{
    sum_decimal, sum_float, sum_fraction, DecimalSum, FloatSum, FractionSum, SumStrategy,
};
use tailcheck::margins::{
    check_baseline, compute_per_q_margin, compute_tail_margins, strict_diagnostics, Constants,
};
use tailcheck::roots::nth_root_floor;
use tailcheck::sieve::TotientTable;

fn n_star() -> BigUint {
    "4000000000000000000".parse().unwrap()
}

#[test]
fn fifth_root_at_the_reference_scale() {
    assert_eq!(
        nth_root_floor(&n_star(), 5).unwrap(),
        BigUint::from(5253u32)
    );
}

#[test]
fn root_finder_boundaries() {
    for k in 1u32..6 {
        assert_eq!(
            nth_root_floor(&BigUint::from(0u32), k).unwrap(),
            BigUint::from(0u32)
        );
        assert_eq!(
            nth_root_floor(&BigUint::from(1u32), k).unwrap(),
            BigUint::from(1u32)
        );
    }
    assert!(nth_root_floor(&BigUint::from(10u32), 0).is_err());
}

#[test]
fn totient_reference_values() {
    let phi = TotientTable::up_to(100).unwrap();
    let expected = [
        0u64, 1, 1, 2, 2, 4, 2, 6, 4, 6, 4, 10, 4, 12, 6, 8, 8, 16, 6, 18, 8,
    ];
    for (n, want) in expected.iter().enumerate() {
        assert_eq!(phi.phi(n as u64), *want, "phi({n})");
    }
    assert_eq!(phi.phi(97), 96);
    assert_eq!(phi.phi(64), 32);
    assert_eq!(phi.phi(81), 54);
    assert_eq!(phi.phi(15), phi.phi(3) * phi.phi(5));
}

#[test]
fn float_sum_matches_the_published_baseline() {
    let phi = TotientTable::up_to(5253).unwrap();
    let s = sum_float(&phi, 5253).unwrap();
    assert_abs_diff_eq!(s, 1.203486653584392, epsilon = 1e-10);
    assert!(check_baseline(&n_star()).is_ok());
}

#[test]
fn sums_vanish_below_q_two() {
    let phi = TotientTable::up_to(1).unwrap();
    for q in [0u64, 1] {
        assert_eq!(sum_float(&phi, q).unwrap(), 0.0);
        assert_eq!(sum_decimal(&phi, q, 30).unwrap().to_f64().unwrap(), 0.0);
        assert_eq!(sum_fraction(&phi, q).unwrap().to_f64().unwrap(), 0.0);
    }
}

#[test]
fn tail_margins_decimal_sanity() {
    let res =
        compute_tail_margins(&n_star(), &Constants::default(), &DecimalSum { prec: 50 }).unwrap();
    assert_eq!(res.q, 5253);
    assert_abs_diff_eq!(res.log_n, 42.832826035, epsilon = 1e-6);
    assert_abs_diff_eq!(res.sum_q, 1.203486653584392, epsilon = 1e-10);
    assert!(res.ratio_trivial < 1e-3);
    assert!(res.ratio_uniform < 1e-8);
    assert!(res.accepted());
}

#[test]
fn tail_ratios_agree_across_modes() {
    let n = n_star();
    let dec = compute_tail_margins(&n, &Constants::default(), &DecimalSum { prec: 80 }).unwrap();
    let frac = compute_tail_margins(&n, &Constants::default(), &FractionSum).unwrap();
    let fl = compute_tail_margins(&n, &Constants::default(), &FloatSum).unwrap();
    assert_eq!(dec.q, 5253);
    assert_eq!(frac.q, 5253);
    for r in [&dec, &frac, &fl] {
        assert!(r.ratio_trivial < 1e-3);
        assert!(r.ratio_uniform < 1e-8);
    }
    assert_relative_eq!(dec.ema_trivial, frac.ema_trivial, max_relative = 1e-9);
    assert_relative_eq!(fl.share, dec.share, max_relative = 1e-15);
}

#[test]
fn monotonicity_point_check_in_every_mode() {
    let phi = TotientTable::up_to(5254).unwrap();
    let strategies: [&dyn SumStrategy; 3] = [&FloatSum, &DecimalSum { prec: 50 }, &FractionSum];
    for s in strategies {
        let a = s.sum(&phi, 5252).unwrap();
        let b = s.sum(&phi, 5253).unwrap();
        let c = s.sum(&phi, 5254).unwrap();
        assert!(a < b && b < c, "{} mode not strictly increasing", s.name());
    }
}

#[test]
fn fraction_sum_is_exact_and_in_range() {
    let phi = TotientTable::up_to(5253).unwrap();
    let s = sum_fraction(&phi, 5253).unwrap();
    assert!(*s.numer() > BigInt::zero());
    assert!(*s.denom() > BigInt::zero());
    let approx = s.to_f64().unwrap();
    assert!(1.1 < approx && approx < 1.3);
}

#[test]
fn decimal_tracks_fraction_to_twenty_digits() {
    let phi = TotientTable::up_to(5253).unwrap();
    let dec = sum_decimal(&phi, 5253, 120).unwrap();
    let frac = sum_fraction(&phi, 5253).unwrap();
    let unit = BigInt::from(10u32).pow(120u32);
    let frac_dec = BigDecimal::new(frac.numer() * &unit / frac.denom(), 120);
    let diff = (dec - frac_dec).abs();
    assert!(diff < BigDecimal::new(BigInt::from(1u32), 20));
}

#[test]
fn float_and_decimal_agree_at_ten_thousand() {
    let phi = TotientTable::up_to(10_000).unwrap();
    let f = sum_float(&phi, 10_000).unwrap();
    let d = sum_decimal(&phi, 10_000, 50).unwrap().to_f64().unwrap();
    assert_abs_diff_eq!(f, d, epsilon = 1e-10);
}

#[test]
fn empty_per_q_table_counts_every_q_missing() {
    let n = n_star();
    let consts = Constants::default();
    let res = compute_per_q_margin(&n, &consts, 1000, &PerQTable::default(), Fallback::Uniform)
        .unwrap();
    assert_eq!(res.missing, 999);

    // identical to running the pure fallback formula at every q
    let phi = TotientTable::up_to(1000).unwrap();
    let n_f: f64 = 4.0e18;
    let l = n_f.ln();
    let mut acc = 0.0_f64;
    for q in 2..=1000u64 {
        acc += e_uniform(n_f, l) / ((q * phi.phi(q)) as f64);
    }
    let ema = (consts.c_w / n_f.powf(consts.r_exp)) * acc;
    assert_relative_eq!(res.ema, ema, max_relative = 1e-12);
    assert!(res.ratio > 0.0);
}

#[test]
fn per_q_rows_override_the_fallback() {
    let n = n_star();
    let mut table = PerQTable::default();
    table.insert(
        2,
        PerQRow {
            form: "cNoverlog".into(),
            c1: 0.00625,
            c2: 0.0,
        },
    );
    table.insert(
        3,
        PerQRow {
            form: "cNlog".into(),
            c1: 1.0,
            c2: 0.0,
        },
    );
    table.insert(
        4,
        PerQRow {
            form: "affine".into(),
            c1: 1.0,
            c2: 1.0,
        },
    );
    table.insert(
        5,
        PerQRow {
            form: "mystery".into(),
            c1: 2.0,
            c2: 0.0,
        },
    );
    let res = compute_per_q_margin(&n, &Constants::default(), 5, &table, Fallback::Uniform).unwrap();
    assert_eq!(res.missing, 0);

    // cNoverlog -> c1·N/L, cNlog -> c1·N·L, affine -> c1·N·L + c2·N,
    // unrecognized tags fall back to c1·N/L
    let n_f: f64 = 4.0e18;
    let l = n_f.ln();
    let terms = [
        0.00625 * n_f / l / ((2u64 * 1) as f64),
        1.0 * n_f * l / ((3u64 * 2) as f64),
        (1.0 * n_f * l + 1.0 * n_f) / ((4u64 * 2) as f64),
        2.0 * n_f / l / ((5u64 * 4) as f64),
    ];
    let ema = (2.0 / n_f.powf(0.6)) * terms.iter().sum::<f64>();
    assert_relative_eq!(res.ema, ema, max_relative = 1e-12);
}

#[test]
fn strict_diagnostics_reports_monotone_deltas() {
    let n = BigUint::from(32_000_000u64); // floor(N^(1/5)) = 31
    let d = strict_diagnostics(&n, 50, 120, 5).unwrap();
    assert_eq!(d.q, 31);
    assert_eq!(d.monotone_deltas_hi_prec.len(), 5);
    for delta in d.monotone_deltas_hi_prec.values() {
        assert!(!delta.starts_with('-'), "delta {delta} not positive");
        assert!(delta.chars().any(|c| c.is_ascii_digit() && c != '0'));
    }
    assert!(d.s_fraction.contains('/'));
}

#[test]
fn identical_inputs_yield_identical_records() {
    let n = n_star();
    let a = compute_tail_margins(&n, &Constants::default(), &DecimalSum { prec: 50 }).unwrap();
    let b = compute_tail_margins(&n, &Constants::default(), &DecimalSum { prec: 50 }).unwrap();
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}
