use anyhow::Result;
use masktrack::prelude::*;
use masktrack::test_stuff::blob_frame;

fn main() -> Result<()> {
    env_logger::init();

    let controls = TrackingControls::new(2, WindowSize::new(24.0, 24.0));
    let mut estimator = CorrelationTrackingEstimator::new(controls);

    println!("{} ({:?})", estimator.name(), estimator.attributes());

    for step in 0..20i64 {
        let frame = blob_frame(160, 120, &[(20 + 3 * step, 30), (120 - 2 * step, 80)], 4);
        let estimates = estimator.track(&frame, &frame)?;
        for (i, e) in estimates.iter().enumerate() {
            let rect = e.rect.unwrap();
            println!(
                "frame {:2} object {}: pos=({:6.1}, {:6.1}) rect=({:.0}, {:.0})..({:.0}, {:.0})",
                step,
                i,
                e.position.x,
                e.position.y,
                rect.top_left().x,
                rect.top_left().y,
                rect.bottom_right().x,
                rect.bottom_right().y,
            );
        }
    }
    Ok(())
}
