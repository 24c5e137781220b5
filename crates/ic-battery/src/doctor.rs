use anyhow::Result;

pub fn check_smoothing(ema_alpha: Option<f64>, window: Option<usize>, cells: u32) -> Result<()> {
    if let Some(a) = ema_alpha {
        anyhow::ensure!(a > 0.0 && a <= 1.0, "publisher.ema_alpha must be in (0, 1], got {}", a);
    }
    if let Some(w) = window {
        anyhow::ensure!((1..=10_000).contains(&w), "publisher.window should be 1..10000, got {}", w);
    }
    anyhow::ensure!((1..=12).contains(&cells), "publisher.cells should be 1..12, got {}", cells);
    Ok(())
}
