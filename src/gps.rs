//! GPS coordinate conversion
//!
//! EXIF stores coordinates as three positive rationals (degrees, minutes,
//! seconds) plus a hemisphere reference tag. This converts them to signed
//! decimal degrees.

/// Convert a degree/minute/second rational triple plus hemisphere reference
/// into signed decimal degrees (`S`/`W` negate, case-insensitive).
///
/// A malformed triple (fewer than three rationals, or a zero denominator)
/// returns exactly `0.0`. This mirrors the device-protocol convention the
/// rest of the pipeline expects, but `0.0` is indistinguishable from a real
/// equatorial/prime-meridian fix; treat it as probable-fallback, not as a
/// validated coordinate.
pub fn dms_to_decimal(dms: &[(u32, u32)], hemisphere: char) -> f64 {
    if dms.len() < 3 {
        return 0.0;
    }

    let mut parts = [0.0f64; 3];
    for (part, &(num, den)) in parts.iter_mut().zip(dms.iter()) {
        if den == 0 {
            return 0.0;
        }
        *part = f64::from(num) / f64::from(den);
    }

    let decimal = parts[0] + parts[1] / 60.0 + parts[2] / 3600.0;
    match hemisphere.to_ascii_uppercase() {
        'S' | 'W' => -decimal,
        _ => decimal,
    }
}
