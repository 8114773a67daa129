//! Visualization utilities for generating charts

use crate::sieve::TotientTable;
use anyhow::Result;
use plotters::prelude::*;

/// Generates a chart of the running sum S(q) for q up to `q_max`
pub fn plot_harmonic_growth(phi: &TotientTable, q_max: u64, out_path: &str) -> Result<()> {
    let root = BitMapBackend::new(out_path, (1200, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut s = 0.0_f64;
    let mut data: Vec<(f64, f64)> = Vec::with_capacity(q_max as usize);
    for q in 2..=q_max {
        let ph = phi.phi(q);
        if ph == 0 {
            continue;
        }
        s += 1.0 / ((q * ph) as f64);
        data.push((q as f64, s));
    }
    let x_max = (q_max as f64).max(2.0);
    let y_max = data.last().map(|(_, y)| *y).unwrap_or(1.0).max(1e-12);
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption("Harmonic Totient Sum S(q)", ("sans-serif", 28))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(2.0..x_max, 0.0..(y_max * 1.05))?;
    chart.configure_mesh().draw()?;
    chart.draw_series(LineSeries::new(data, &BLACK))?;
    root.present()?;
    Ok(())
}

/// Generates a chart of the per-term weight 1/(q·φ(q)) across q
pub fn plot_term_decay(phi: &TotientTable, q_max: u64, out_path: &str) -> Result<()> {
    let root = BitMapBackend::new(out_path, (1200, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let pts: Vec<(f64, f64)> = (2..=q_max)
        .filter(|&q| phi.phi(q) != 0)
        .map(|q| (q as f64, 1.0 / ((q * phi.phi(q)) as f64)))
        .collect();
    let x_max = (q_max as f64).max(2.0);
    let y_max = pts.iter().map(|(_, y)| *y).fold(0.0, f64::max).max(1e-12);
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption("Per-term weight 1/(q·φ(q))", ("sans-serif", 28))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(2.0..x_max, 0.0..(y_max * 1.05))?;
    chart.configure_mesh().draw()?;
    chart.draw_series(LineSeries::new(pts, &BLACK))?;
    root.present()?;
    Ok(())
}
