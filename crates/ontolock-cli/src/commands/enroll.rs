use ontolock_core::entropy::{compression_ratio, min_entropy, shannon_entropy};
use ontolock_core::extractor::FuzzyExtractor;
use ontolock_core::source::PufSource;
use ontolock_core::sources::SimulatedPuf;

use super::fail;

pub fn run(seed: u64, ber: f64, json: bool) {
    let extractor = FuzzyExtractor::default();
    let puf = SimulatedPuf::new(
        seed,
        ber,
        extractor.config().required_measurement_bytes(),
    );

    let measurement = puf.sample();
    let enrollment = match extractor.enroll(&measurement) {
        Ok(enrollment) => enrollment,
        Err(err) => fail(format!("enrollment failed: {err}")),
    };

    if json {
        let value = serde_json::json!({
            "source": puf.name(),
            "commitment": enrollment.commitment,
            "estimated_entropy_bits": enrollment.estimated_entropy_bits,
            "measurement": {
                "shannon_bits_per_byte": shannon_entropy(&measurement.bytes),
                "min_entropy_bits_per_byte": min_entropy(&measurement.bytes),
                "compression_ratio": compression_ratio(&measurement.bytes),
            },
            "helper": enrollment.helper,
        });
        println!("{}", serde_json::to_string_pretty(&value).expect("serializable"));
        return;
    }

    println!("Source:      {}", puf.name());
    println!("Commitment:  {}", enrollment.commitment);
    println!(
        "Entropy:     {:.1} bits extractable (floor {:.0})",
        enrollment.estimated_entropy_bits,
        extractor.config().entropy_floor_bits
    );
    println!(
        "Measurement: {:.2} bits/byte Shannon, {:.2} bits/byte min-entropy, {:.2} compression ratio",
        shannon_entropy(&measurement.bytes),
        min_entropy(&measurement.bytes),
        compression_ratio(&measurement.bytes)
    );
    println!(
        "Helper data: {} offset bytes, repetition {}",
        enrollment.helper.offset.len(),
        enrollment.helper.repetition
    );
    println!("\nKeep the helper data; the commitment is safe to publish.");
}
