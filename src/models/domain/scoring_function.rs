//! Scoring functions map a raw answer value to the numeric score it
//! contributes toward one category's total.

use serde::{Deserialize, Serialize};

use crate::encoding::{encode_function, parse_function};
use crate::errors::FormatError;

/// Gives a separate score for each multi-choice option, indexed 1-based by
/// the answer value.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct MultiScoring {
    pub option_scores: Vec<f64>,
}

impl MultiScoring {
    /// An out-of-range answer scores 0 rather than failing, so stale stored
    /// answers keep working after options are removed from a question.
    pub fn score(&self, answer: f64) -> f64 {
        let index = answer.round() as i64;
        if index < 1 || index > self.option_scores.len() as i64 {
            return 0.0;
        }
        self.option_scores[(index - 1) as usize]
    }

    fn parse(args: &[String]) -> Result<Self, FormatError> {
        let mut option_scores = Vec::with_capacity(args.len());
        for arg in args {
            let score = arg.parse::<f64>().map_err(|_| {
                FormatError::InvalidArguments(format!(
                    "Expected option score to be a number, instead was: {}",
                    arg
                ))
            })?;
            option_scores.push(score);
        }
        Ok(MultiScoring { option_scores })
    }
}

/// Scores answers on an unnormalised bell curve: the closer the answer is to
/// `peak`, the closer the score gets to `magnitude`. `std_dev` controls how
/// quickly the score decays. There is no `1/(sigma*sqrt(2*pi))` factor; this
/// is a similarity weight, not a probability density, so `magnitude` directly
/// upper-bounds the output.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GaussianScoring {
    pub magnitude: f64,
    pub peak: f64,
    pub std_dev: f64,
}

impl GaussianScoring {
    pub fn score(&self, answer: f64) -> f64 {
        let x = (answer - self.peak) / self.std_dev;
        self.magnitude * (-x * x / 2.0).exp()
    }

    fn parse(args: &[String]) -> Result<Self, FormatError> {
        if args.len() != 3 {
            return Err(FormatError::InvalidArguments(
                "Expected three arguments: magnitude, peak, and std_dev".to_string(),
            ));
        }

        let mut values = [0.0; 3];
        for (value, (arg, field)) in values
            .iter_mut()
            .zip(args.iter().zip(["magnitude", "peak", "std_dev"]))
        {
            *value = arg.parse::<f64>().map_err(|_| {
                FormatError::InvalidArguments(format!(
                    "Expected {} to be a number, instead was: {}",
                    field, arg
                ))
            })?;
        }

        Ok(GaussianScoring {
            magnitude: values[0],
            peak: values[1],
            std_dev: values[2],
        })
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum ScoringFunction {
    Multi(MultiScoring),
    Gaussian(GaussianScoring),
}

impl ScoringFunction {
    pub fn multi(option_scores: Vec<f64>) -> Self {
        ScoringFunction::Multi(MultiScoring { option_scores })
    }

    pub fn gaussian(magnitude: f64, peak: f64, std_dev: f64) -> Self {
        ScoringFunction::Gaussian(GaussianScoring {
            magnitude,
            peak,
            std_dev,
        })
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            ScoringFunction::Multi(_) => "multi",
            ScoringFunction::Gaussian(_) => "gaussian",
        }
    }

    /// Scores the given answer using this scoring function.
    pub fn score(&self, answer: f64) -> f64 {
        match self {
            ScoringFunction::Multi(multi) => multi.score(answer),
            ScoringFunction::Gaussian(gaussian) => gaussian.score(answer),
        }
    }

    /// Encodes this scoring function into the string stored alongside its
    /// question.
    pub fn encode(&self) -> String {
        let args = match self {
            ScoringFunction::Multi(multi) => multi
                .option_scores
                .iter()
                .map(f64::to_string)
                .collect::<Vec<_>>(),
            ScoringFunction::Gaussian(gaussian) => vec![
                gaussian.magnitude.to_string(),
                gaussian.peak.to_string(),
                gaussian.std_dev.to_string(),
            ],
        };
        encode_function(self.type_tag(), &args)
    }

    /// Parses a scoring function from its encoding.
    ///
    /// Strict on purpose, unlike `Question::parse`: scoring functions are only
    /// ever written alongside a freshly validated question, so a malformed one
    /// indicates an internal invariant violation rather than user input to
    /// degrade gracefully on.
    pub fn parse(encoded: &str) -> Result<Self, FormatError> {
        let (name, args) = parse_function(encoded)?;
        match name.as_str() {
            "multi" => Ok(ScoringFunction::Multi(MultiScoring::parse(&args)?)),
            "gaussian" => Ok(ScoringFunction::Gaussian(GaussianScoring::parse(&args)?)),
            _ => Err(FormatError::UnknownScoringFunction(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn multi_scoring_looks_up_one_based_index() {
        let scoring = ScoringFunction::multi(vec![10.0, 20.0, 30.0]);
        assert_close(scoring.score(1.0), 10.0);
        assert_close(scoring.score(2.0), 20.0);
        assert_close(scoring.score(3.0), 30.0);
    }

    #[test]
    fn multi_scoring_rounds_to_nearest_option() {
        let scoring = ScoringFunction::multi(vec![10.0, 20.0, 30.0]);
        assert_close(scoring.score(1.9), 20.0);
    }

    #[test]
    fn multi_scoring_out_of_range_scores_zero() {
        let scoring = ScoringFunction::multi(vec![10.0, 20.0, 30.0]);
        assert_close(scoring.score(0.0), 0.0);
        assert_close(scoring.score(5.0), 0.0);
        assert_close(scoring.score(-2.0), 0.0);
    }

    #[test]
    fn gaussian_scoring_peaks_at_magnitude() {
        let scoring = ScoringFunction::gaussian(5.0, 50.0, 10.0);
        assert_close(scoring.score(50.0), 5.0);
    }

    #[test]
    fn gaussian_scoring_decays_with_distance() {
        let scoring = ScoringFunction::gaussian(5.0, 50.0, 10.0);
        // One standard deviation from the peak.
        assert_close(scoring.score(60.0), 5.0 * (-0.5f64).exp());
        assert_close(scoring.score(40.0), 5.0 * (-0.5f64).exp());
    }

    #[test]
    fn parse_encode_round_trip() {
        let multi = ScoringFunction::multi(vec![10.0, 0.0, 2.5]);
        assert_eq!(ScoringFunction::parse(&multi.encode()).unwrap(), multi);

        let gaussian = ScoringFunction::gaussian(5.0, 50.0, 10.0);
        assert_eq!(ScoringFunction::parse(&gaussian.encode()).unwrap(), gaussian);
    }

    #[test]
    fn parse_accepts_bracket_shorthand() {
        let scoring = ScoringFunction::parse("[10,0,2.5]").unwrap();
        assert_eq!(scoring, ScoringFunction::multi(vec![10.0, 0.0, 2.5]));
    }

    #[test]
    fn parse_rejects_unknown_function() {
        let err = ScoringFunction::parse("banana(1,2)").unwrap_err();
        assert_eq!(err, FormatError::UnknownScoringFunction("banana".into()));
    }

    #[test]
    fn parse_rejects_wrong_gaussian_arity() {
        let err = ScoringFunction::parse("gaussian(1,2)").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected three arguments: magnitude, peak, and std_dev"
        );
    }

    #[test]
    fn parse_rejects_non_numeric_arguments() {
        let err = ScoringFunction::parse("multi(1,x)").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected option score to be a number, instead was: x"
        );

        let err = ScoringFunction::parse("gaussian(1,y,3)").unwrap_err();
        assert_eq!(err.to_string(), "Expected peak to be a number, instead was: y");
    }
}
