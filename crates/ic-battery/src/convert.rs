/// Cells in series in the stock pack.
pub const DEFAULT_CELLS: u32 = 3;

pub const FULL_CELL_V: f64 = 4.2;
pub const EMPTY_CELL_V: f64 = 3.6;

// (low V, high V, % at low, % at high), highest segment first.
const SEGMENTS: [(f64, f64, f64, f64); 5] = [
    (4.1, 4.2, 87.0, 100.0),
    (4.0, 4.1, 75.0, 87.0),
    (3.9, 4.0, 55.0, 75.0),
    (3.8, 3.9, 30.0, 55.0),
    (3.6, 3.8, 0.0, 30.0),
];

/// Piecewise-linear Li-ion discharge curve for a single cell.
pub fn cell_voltage_to_percent(v: f64) -> f64 {
    if v > FULL_CELL_V {
        return 100.0;
    }
    for (lo, hi, p_lo, p_hi) in SEGMENTS {
        if v >= lo {
            return p_lo + (v - lo) / (hi - lo) * (p_hi - p_lo);
        }
    }
    // below 3.6 V, or NaN
    0.0
}

pub fn pack_voltage_to_percent(pack_v: f64, cells: u32) -> f64 {
    cell_voltage_to_percent(pack_v / cells.max(1) as f64)
}
