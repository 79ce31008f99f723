//! Simulated slider run.
//!
//! Homes a virtual carriage, primes and runs an eased keyframe profile
//! through the threaded controller handle, printing status as it goes.
//!
//! Run with `RUST_LOG`-style output by installing any `log` backend; the
//! library itself only emits through the facade.

use std::thread;
use std::time::Duration;

use slider_motion::{
    config::units::Millimeters,
    controller::{ControllerHandle, ControllerState},
    hal::Simulator,
    motion::MotionProfile,
    presets::{MemoryPresetStore, PresetStore},
    SliderConfig,
};

const PROFILE: &str = r#"{
  "length_mm": 600,
  "keyframes": [
    {"t": 0, "pos_mm": 50},
    {"t": 3, "pos_mm": 250, "ease": {"type": "cubic-bezier", "p": [0.42, 0.0, 0.58, 1.0]}},
    {"t": 5, "pos_mm": 400}
  ],
  "max_speed_mm_s": 100
}"#;

fn wait_idle(slider: &ControllerHandle, label: &str) {
    loop {
        let status = slider.status();
        println!(
            "  [{}] state={:?} pos={:.1} mm progress={:.0}%",
            label,
            status.state,
            status.pos_mm,
            status.progress * 100.0
        );
        if !status.state.is_moving() && status.state != ControllerState::Stopping {
            return;
        }
        thread::sleep(Duration::from_millis(250));
    }
}

fn main() {
    println!("=== Simulated Slider Run ===\n");

    let mut config = SliderConfig::default();
    config.mechanics.travel = Millimeters(600.0);
    config.apply_env_overrides();

    let sim = Simulator::new(&config).with_start_mm(180.0);
    let slider = ControllerHandle::spawn(sim.hal(), &config).expect("Failed to start controller");

    let mut presets = MemoryPresetStore::new();
    let profile = MotionProfile::from_json(PROFILE).expect("Invalid profile");
    presets.save("demo", &profile).expect("Failed to save preset");
    println!("Presets: {:?}\n", presets.list().unwrap_or_default());

    println!("Priming (homes first)...");
    let profile = presets.load("demo").expect("Preset missing");
    slider.prime(profile.clone()).expect("Prime rejected");
    wait_idle(&slider, "prime");

    println!("\nRunning {:.1} s profile...", profile.duration());
    slider.run(profile).expect("Run rejected");
    wait_idle(&slider, "run");

    let status = slider.status();
    println!("\nFinal: {:.1} mm (carriage at {:.1} mm), {} steps issued", status.pos_mm, sim.position_mm(), sim.steps_issued());
    println!(
        "Status JSON: {}",
        serde_json::to_string(&status).unwrap_or_default()
    );
}
