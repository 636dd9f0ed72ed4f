//! Seed-to-genesis pipeline against an in-memory ledger.
//!
//! Walks the whole engine end to end: enroll a simulated PUF, reconstruct
//! the stable secret, admit a short trajectory through the gate (including
//! one deliberately impossible transition, which must be rejected), then
//! assemble and anchor the genesis artifact.

use std::sync::Arc;

use ontolock_core::algebra::{Candidate, KeyedHashScheme, OmegaGate, OmegaVerdict, PsiState, PsiTrajectory};
use ontolock_core::config::GateConfig;
use ontolock_core::entropy::sample_entropy_bits;
use ontolock_core::extractor::FuzzyExtractor;
use ontolock_core::genesis::{
    self, FileBundle, GenesisArtifact, LineagePolicy, MemoryAnchorSink, TimeAuthority,
    TripleAnchor, VerificationStamp,
};
use ontolock_core::ohash::{GENESIS_SENTINEL, Hash256, Ledger};
use ontolock_core::source::PufSource;
use ontolock_core::sources::SimulatedPuf;

use super::{fail, now_ms};

// Madrid; the successor state nudges a few hundred meters north.
const DEMO_LOCATION: (f64, f64) = (40.4168, -3.7038);

/// Network time stand-in backed by the local clock. A real deployment
/// points this at an NTP client.
struct LocalTimeAuthority;

impl TimeAuthority for LocalTimeAuthority {
    fn name(&self) -> &str {
        "local_clock_authority"
    }

    fn fetch_ms(&self) -> Option<u64> {
        Some(now_ms())
    }
}

pub struct PipelineOutcome {
    pub artifact: GenesisArtifact,
    pub verdicts: Vec<OmegaVerdict>,
    pub ledger_height: usize,
}

pub fn run(seed: u64, output: Option<&str>, allow_forks: bool) {
    match run_pipeline(seed, allow_forks) {
        Ok(outcome) => {
            let admitted = outcome.verdicts.iter().filter(|v| v.admitted).count();
            println!(
                "\nPipeline complete: {}/{} candidates admitted, ledger height {}",
                admitted,
                outcome.verdicts.len(),
                outcome.ledger_height
            );
            println!("Genesis hash: {}", outcome.artifact.artifact_hash());

            if let Some(path) = output {
                if let Err(err) = std::fs::write(path, outcome.artifact.to_json_pretty()) {
                    fail(format!("writing artifact to {path}: {err}"));
                }
                println!("Artifact written to {path}");
            }
        }
        Err(err) => fail(err),
    }
}

pub fn run_pipeline(seed: u64, allow_forks: bool) -> Result<PipelineOutcome, String> {
    println!("[1/6] Sampling physical source...");
    let extractor = FuzzyExtractor::default();
    let response_len = extractor.config().required_measurement_bytes();
    // Enrollment uses an averaged reference capture of the device; live
    // readings afterwards carry the usual per-reading drift.
    let reference = SimulatedPuf::new(seed, 0.0, response_len);
    let puf = SimulatedPuf::new(seed, 0.01, response_len);
    let enrollment = extractor
        .enroll(&reference.sample())
        .map_err(|e| format!("enrollment: {e}"))?;
    println!(
        "      {} enrolled, commitment {}",
        puf.name(),
        enrollment.commitment
    );

    println!("[2/6] Reconstructing stable secret from a fresh reading...");
    let reading = puf.sample();
    let measured_ber = reading.declared_ber;
    // The candidate states declare what the environment actually measured,
    // not what enrollment estimated.
    let environmental_entropy_bits = sample_entropy_bits(&reading.bytes);
    let secret = extractor
        .reconstruct(&reading, &enrollment.helper)
        .map_err(|e| format!("reconstruction: {e}"))?;
    println!(
        "      {environmental_entropy_bits:.0} bits environmental entropy in the reading"
    );

    println!("[3/6] Arming the admissibility gate...");
    let scheme = Arc::new(KeyedHashScheme::new());
    scheme.register(secret.clone());
    let gate = OmegaGate::new(
        GateConfig {
            allow_forks,
            ..GateConfig::default()
        },
        enrollment.commitment.clone(),
        extractor.config().max_correctable_ber(),
        Box::new(Arc::clone(&scheme)),
    );
    let ledger = Ledger::new();
    let mut trajectory = PsiTrajectory::new();

    println!("[4/6] Proposing trajectory states...");
    let mut verdicts = Vec::new();
    let t0 = now_ms();

    let sign = |state: &PsiState| Candidate {
        signature: scheme.sign(&secret, &state.state_hash()),
        commitment: enrollment.commitment.clone(),
        measured_ber,
        state: state.clone(),
    };
    let state = |timestamp_ms: u64, location: (f64, f64), prev: Hash256, tag: &str| PsiState {
        timestamp_ms,
        location,
        temperature_c: 21.5,
        environmental_entropy_bits,
        previous_state_hash: prev,
        algebraic_tag: tag.to_string(),
    };

    // Root state.
    let root = sign(&state(t0, DEMO_LOCATION, GENESIS_SENTINEL, "genesis"));
    let (verdict, receipt) = gate.admit(&root, &ledger, &mut trajectory);
    report("genesis", &verdict);
    let root_receipt = receipt.ok_or("root state was not admitted")?;
    verdicts.push(verdict);

    // Plausible successor: a short walk, one minute later.
    let next = sign(&state(
        t0 + 60_000,
        (DEMO_LOCATION.0 + 0.003, DEMO_LOCATION.1),
        root_receipt.record_id,
        "psi-1",
    ));
    let (verdict, receipt) = gate.admit(&next, &ledger, &mut trajectory);
    report("psi-1", &verdict);
    let next_receipt = receipt.ok_or("successor state was not admitted")?;
    verdicts.push(verdict);

    // Deliberately impossible: the antipode one second later. The gate must
    // reject this however valid the signature is.
    let teleport = sign(&state(
        t0 + 61_000,
        (-DEMO_LOCATION.0, 180.0 + DEMO_LOCATION.1),
        next_receipt.record_id,
        "psi-teleport",
    ));
    let (verdict, receipt) = gate.admit(&teleport, &ledger, &mut trajectory);
    report("psi-teleport", &verdict);
    if receipt.is_some() {
        return Err("impossible transition was admitted".to_string());
    }
    verdicts.push(verdict);

    println!("[5/6] Assembling genesis artifact...");
    let mut bundle = FileBundle::new();
    bundle.add_file(
        "enrollment.json",
        serde_json::to_vec(&enrollment.helper).map_err(|e| e.to_string())?,
    );
    let stamp = VerificationStamp {
        timestamp: t0.to_string(),
        source_hash: bundle.bundle_hash(),
        environment: format!("ontolock-{}", ontolock_core::VERSION),
        passed: true,
    };
    let anchors = TripleAnchor::new(
        genesis::system_anchor(now_ms()),
        genesis::network_anchor(&LocalTimeAuthority).map_err(|e| e.to_string())?,
        genesis::ledger_anchor(&root_receipt),
    );
    if !anchors.is_consistent(genesis::DEFAULT_MAX_DRIFT_MS) {
        return Err(format!(
            "anchor drift {} ms exceeds tolerance",
            anchors.max_drift_ms()
        ));
    }
    let snapshot = ledger.records();
    let artifact = genesis::assemble(
        trajectory.get(root_receipt.record_id).ok_or("root state missing")?,
        &snapshot,
        &enrollment.commitment,
        &enrollment.helper,
        &bundle,
        Some(&stamp),
        anchors,
        LineagePolicy::genesis(),
        vec![hex_sign(&scheme, &secret, &bundle)],
    )
    .map_err(|e| e.to_string())?;

    println!("[6/6] Anchoring artifact...");
    let sink = MemoryAnchorSink::new();
    let receipt = artifact.anchor(&sink).map_err(|e| e.to_string())?;
    println!("      registered as {} at position {}", receipt.identity, receipt.position);

    Ok(PipelineOutcome {
        artifact,
        verdicts,
        ledger_height: ledger.len(),
    })
}

fn hex_sign(
    scheme: &KeyedHashScheme,
    secret: &ontolock_core::extractor::StableSecret,
    bundle: &FileBundle,
) -> String {
    hex::encode(scheme.sign(secret, &bundle.bundle_hash()))
}

fn report(tag: &str, verdict: &OmegaVerdict) {
    if verdict.admitted {
        println!("      {tag}: admitted");
    } else {
        let rules: Vec<&str> = verdict.violations.iter().map(|v| v.rule).collect();
        println!(
            "      {tag}: rejected (signature_valid={}, violations: {})",
            verdict.signature_valid,
            rules.join(", ")
        );
    }
}
