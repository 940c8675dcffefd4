use anyhow::Result;
use masktrack::prelude::*;
use masktrack::test_stuff::blob_frame;

fn main() -> Result<()> {
    env_logger::init();

    let controls = TrackingControls::new(2, WindowSize::new(24.0, 24.0));
    let mut estimator = GroupTrackingEstimator::new(controls);

    println!("{} ({:?})", estimator.name(), estimator.attributes());

    for step in 0..20i64 {
        let frame = blob_frame(160, 120, &[(30 + 2 * step, 40 + step), (110, 90 - 2 * step)], 4);
        let estimates = estimator.track(&frame, &frame)?;
        for (i, e) in estimates.iter().enumerate() {
            println!(
                "frame {:2} object {}: pos=({:6.1}, {:6.1})",
                step, i, e.position.x, e.position.y
            );
        }
    }
    Ok(())
}
