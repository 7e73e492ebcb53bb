// Crossing Tests - Shared level and line crossing logic
// "Crossed up through L"  <=> previous <= L < current
// "Crossed down through L" <=> previous >= L > current

use crate::core::types::CrossDirection;

pub fn crossed_above(previous: f64, level: f64, current: f64) -> bool {
    previous <= level && level < current
}

pub fn crossed_below(previous: f64, level: f64, current: f64) -> bool {
    previous >= level && level > current
}

/// Direction in which a value crossed a fixed level; `None` when any input is absent
pub fn level_cross(previous: Option<f64>, level: Option<f64>, current: Option<f64>) -> Option<CrossDirection> {
    let (previous, level, current) = (previous?, level?, current?);
    if crossed_above(previous, level, current) {
        Some(CrossDirection::Up)
    } else if crossed_below(previous, level, current) {
        Some(CrossDirection::Down)
    } else {
        None
    }
}

/// Direction in which line `a` crossed line `b` between two ticks; all four values required
pub fn line_cross(
    prev_a: Option<f64>,
    prev_b: Option<f64>,
    cur_a: Option<f64>,
    cur_b: Option<f64>,
) -> Option<CrossDirection> {
    let (prev_a, prev_b, cur_a, cur_b) = (prev_a?, prev_b?, cur_a?, cur_b?);
    if prev_a <= prev_b && cur_a > cur_b {
        Some(CrossDirection::Up)
    } else if prev_a >= prev_b && cur_a < cur_b {
        Some(CrossDirection::Down)
    } else {
        None
    }
}
