//! Guaraní amounts. The guaraní has no minor unit, so all amounts are
//! whole `i64` values; fields carry a `_gs` suffix by convention.

/// Round an amount to the nearest multiple of `step` (half up).
/// Fares are quoted in 100 Gs steps; a step of 1 is a no-op.
pub fn round_to_step(amount_gs: i64, step: i64) -> i64 {
    if step <= 1 {
        return amount_gs;
    }
    let remainder = amount_gs.rem_euclid(step);
    if remainder * 2 >= step {
        amount_gs + (step - remainder)
    } else {
        amount_gs - remainder
    }
}

/// Format an amount with thousands separators, e.g. `1.234.567`
pub fn format_gs(amount_gs: i64) -> String {
    let negative = amount_gs < 0;
    let digits = amount_gs.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    if negative {
        format!("-{}", out)
    } else {
        out
    }
}
