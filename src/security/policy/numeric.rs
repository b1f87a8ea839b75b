use std::collections::HashMap;

/// Parse every maximal ASCII digit run in `text` as a non-negative integer.
///
/// Runs too large for `u64` are skipped. At most `cap` values are returned so
/// the pair scan in [`has_pythagorean_triple`] stays bounded.
pub fn extract_integers(text: &str, cap: usize) -> Vec<u64> {
    let mut values = Vec::new();
    let mut run_start: Option<usize> = None;

    for (idx, byte) in text.bytes().enumerate() {
        match (byte.is_ascii_digit(), run_start) {
            (true, None) => run_start = Some(idx),
            (false, Some(start)) => {
                if values.len() >= cap {
                    return values;
                }
                if let Ok(value) = text[start..idx].parse::<u64>() {
                    values.push(value);
                }
                run_start = None;
            }
            _ => {}
        }
    }

    if let Some(start) = run_start
        && values.len() < cap
        && let Ok(value) = text[start..].parse::<u64>()
    {
        values.push(value);
    }

    values
}

/// True when three distinct entries of `values` satisfy `a² + b² = c²`.
///
/// Squares are indexed by multiplicity so a value only pairs with itself
/// when it occurs more than once.
pub fn has_pythagorean_triple(values: &[u64]) -> bool {
    if values.len() < 3 {
        return false;
    }

    let squares: Vec<u128> = values.iter().map(|&v| u128::from(v) * u128::from(v)).collect();
    let mut counts: HashMap<u128, usize> = HashMap::with_capacity(squares.len());
    for &sq in &squares {
        *counts.entry(sq).or_insert(0) += 1;
    }

    for (i, &a) in squares.iter().enumerate() {
        for &b in &squares[i + 1..] {
            let Some(sum) = a.checked_add(b) else {
                continue;
            };
            let Some(&available) = counts.get(&sum) else {
                continue;
            };
            let used = usize::from(a == sum) + usize::from(b == sum);
            if available > used {
                return true;
            }
        }
    }

    false
}
