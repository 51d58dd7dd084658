use std::io::Write;

use crate::codec::format_rated_game;
use crate::error::Result;
use crate::fit::{best_k_factor, KFactorScore};
use crate::ranking::RatedGame;

// One "<k> <mean>" line per K-factor. A K-factor with nothing scored prints NaN.
pub fn write_score_lines<W: Write>(out: &mut W, scores: &[KFactorScore]) -> Result<()> {
    for s in scores {
        writeln!(out, "{} {}", s.k_factor, s.mean_error.unwrap_or(f64::NAN))?;
    }
    Ok(())
}

pub fn write_rated_games<W: Write>(out: &mut W, rated: &[RatedGame]) -> Result<()> {
    for r in rated {
        writeln!(out, "{}", format_rated_game(r)?)?;
    }
    Ok(())
}

pub fn output_report(scores: &[KFactorScore]) {
    println!("|  K  | Mean error | Scored | Tied pred. | Tied result | Skipped");
    for s in scores {
        let mean = match s.mean_error {
            Some(m) => format!("{m:10.6}"),
            None => format!("{:>10}", "-"),
        };

        println!("| {0:3} | {1} | {2:6} | {3:10} | {4:11} | {5:7}",
            s.k_factor,
            mean,
            s.scored,
            s.tied_predictions,
            s.tied_outcomes,
            s.skipped,
        )
    }

    match best_k_factor(scores) {
        Some(best) => println!(
            "Best K-factor: {} (mean error {:.6})",
            best.k_factor,
            best.mean_error.unwrap_or(f64::NAN)
        ),
        None => println!("No K-factor scored any games"),
    }
}
