use serde::{Deserialize, Serialize};

pub fn f_to_c(f: f64) -> f64 {
    (f - 32.0) * 5. / 9.
}

pub fn c_to_f(c: f64) -> f64 {
    (c * 9. / 5.) + 32.
}

pub fn k_to_c(k: f64) -> f64 {
    k - 273.15
}

// STATISTICS ------------------------------------------------------------------

// summing a run of equal values drifts by an ulp, so those are answered exactly
fn constant_run(values: &[f64]) -> Option<f64> {
    let first = *values.first()?;
    values.iter().all(|&x| x == first).then_some(first)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    if let Some(v) = constant_run(values) {
        return Some(v);
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (Bessel's correction, N-1 denominator).
/// Undefined for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    if constant_run(values).is_some() {
        return Some(0.0);
    }

    let m = mean(values)?;
    let diff_2_sum: f64 = values.iter().map(|x| (x - m).powi(2)).sum();

    Some((diff_2_sum / (n - 1) as f64).sqrt())
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

// linear interpolation between closest ranks, same as numpy/pandas default
fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    quantile_sorted(&sorted(values), q)
}

/// Middle value, or the mean of the two middle values for an even count.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Description {
    pub count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Summary table of a column: count, mean, std and the five-number summary.
pub fn describe(values: &[f64]) -> Option<Description> {
    let s = sorted(values);

    Some(Description {
        count: s.len(),
        mean: mean(&s)?,
        std: sample_std_dev(&s),
        min: *s.first()?,
        q25: quantile_sorted(&s, 0.25)?,
        median: quantile_sorted(&s, 0.5)?,
        q75: quantile_sorted(&s, 0.75)?,
        max: *s.last()?,
    })
}

#[cfg(test)]
pub(crate) fn close(val: f64, cmp: f64, tolerance: f64) -> bool {
    if (val - cmp).abs() <= tolerance {
        true
    } else {
        println!("{val} != {cmp} (+/- {tolerance})");
        false
    }
}
