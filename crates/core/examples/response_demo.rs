//! Prints the magnitude response of the EQ at the display grid frequencies
//!
//! Run with: cargo run --package contour-core --example response_demo

use contour_core::domain::audio::{gain_to_db, MINUS_INFINITY_DB};
use contour_core::domain::coefficients::ChainCoefficients;
use contour_core::domain::config::ContourConfig;
use contour_core::domain::dsp::MonoChain;
use contour_core::domain::geometry::{frequency_label, GRID_FREQUENCIES};
use contour_core::domain::params::{ParamId, ParameterStore};
use contour_core::domain::response::ResponseCurve;
use contour_core::domain::settings::{ChainSettings, Slope};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("contour_core=debug,info")
        .init();

    println!("=== Contour Response Demo ===\n");

    // 1. Round-trip the factory configuration through a file
    let config_path = std::env::temp_dir().join("contour_demo.toml");
    ContourConfig::factory_default().save_to_file(&config_path).await?;
    let config = ContourConfig::load_from_file(&config_path).await?;
    let sample_rate = f64::from(config.audio.sample_rate);
    println!("1. Loaded {} at {} Hz", config_path.display(), config.audio.sample_rate);

    // 2. Shape the EQ through the parameter store
    let params = ParameterStore::new();
    params.set(ParamId::LowCutFreq, 100.0);
    params.set(ParamId::PeakFreq, 2500.0);
    params.set(ParamId::PeakGain, 9.0);
    params.set(ParamId::PeakQuality, 2.0);
    params.set(ParamId::HighCutFreq, 10000.0);

    println!("\n2. Response per slope:");
    print!("   {:>10}", "");
    for freq in GRID_FREQUENCIES {
        print!("{:>8}", frequency_label(freq));
    }
    println!();

    let mut chain = MonoChain::new();
    for slope in Slope::ALL {
        params.set(ParamId::LowCutSlope, slope.index() as f32);
        params.set(ParamId::HighCutSlope, slope.index() as f32);

        let settings = ChainSettings::from_store(&params);
        chain.update(&ChainCoefficients::design(&settings, sample_rate), &settings);

        print!("   {:>10}", slope.label());
        for freq in GRID_FREQUENCIES {
            let db = gain_to_db(chain.magnitude_for_frequency(freq, sample_rate), MINUS_INFINITY_DB);
            print!("{:>8.1}", db);
        }
        println!();
    }

    // 3. Lay the last curve out on the configured display
    let mut curve = ResponseCurve::new(config.display.area(), f64::from(config.display.response_range_db));
    let path = curve.update(&chain, sample_rate);
    println!("\n3. Response path has {} points", path.len());
    if let (Some(first), Some(last)) = (path.points().first(), path.points().last()) {
        println!("   from ({:.1}, {:.1}) to ({:.1}, {:.1})", first.x, first.y, last.x, last.y);
    }

    tokio::fs::remove_file(&config_path).await?;
    println!("\n=== Demo complete ===");
    Ok(())
}
