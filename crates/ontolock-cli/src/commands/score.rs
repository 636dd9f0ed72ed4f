use ontolock_core::antifragility::{AttackTrial, score};

use super::fail;

pub fn run(input: &str, json: bool) {
    let text = match std::fs::read_to_string(input) {
        Ok(text) => text,
        Err(err) => fail(format!("reading {input}: {err}")),
    };
    let trials: Vec<AttackTrial> = match serde_json::from_str(&text) {
        Ok(trials) => trials,
        Err(err) => fail(format!("parsing {input}: {err}")),
    };

    let report = score(&trials);

    if json {
        println!("{}", serde_json::to_string_pretty(&report).expect("serializable"));
        return;
    }

    println!("{:>5}  {:>10}  {:>10}  {:>10}  {:>10}", "trial", "energy", "before", "after", "ratio");
    for (i, (trial, ratio)) in trials.iter().zip(&report.ratios).enumerate() {
        let ratio = match ratio {
            Ok(r) => format!("{r:+.4}"),
            Err(_) => "n/a".to_string(),
        };
        println!(
            "{:>5}  {:>10.3}  {:>10.2}  {:>10.2}  {:>10}",
            i, trial.attack_energy, trial.entropy_before, trial.entropy_after, ratio
        );
    }
    println!();
    match report.aggregate {
        Some(mean) => println!(
            "Aggregate: {mean:+.4} over {} applicable trial(s), {} excluded",
            report.applicable_trials, report.excluded_trials
        ),
        None => println!("Aggregate: undefined (no applicable trials)"),
    }
    if report.aggregate.is_some_and(|m| m < 0.0) {
        println!("Warning: negative aggregate signals a fragility regression.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_trials_parse_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"attack_energy": 2.0, "entropy_before": 128.0, "entropy_after": 132.0}},
               {{"attack_energy": 0.0, "entropy_before": 128.0, "entropy_after": 128.0}}]"#
        )
        .unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        let trials: Vec<AttackTrial> = serde_json::from_str(&text).unwrap();
        let report = score(&trials);
        assert_eq!(report.applicable_trials, 1);
        assert_eq!(report.excluded_trials, 1);
        assert_eq!(report.aggregate, Some(2.0));
    }
}
