mod support;

use std::collections::BTreeSet;

use soiling_rust::alignment::AlignmentClass;
use soiling_rust::config::{ChannelFloor, ModuleSpec, PipelineConfig};
use soiling_rust::filtering::StabilityVerdict;
use soiling_rust::models::ModuleSample;
use soiling_rust::pipeline::ModuleInput;
use soiling_rust::{PipelineInputs, RawDataset, SoilingPipeline};

use support::{at, constant_series, day, every, irradiance_day, panel, site, SyntheticSun};

fn module(name: &str, alignment: AlignmentClass) -> ModuleSpec {
    ModuleSpec {
        name: name.to_string(),
        alignment,
        timezone: None,
        channel_floors: Vec::new(),
    }
}

fn config() -> PipelineConfig {
    let mut config = PipelineConfig::new(site(), panel());
    let mut refcells = module("refcells", AlignmentClass::HighFrequency);
    refcells.channel_floors.push(ChannelFloor {
        channels: vec!["1RC411(w.m-2)".to_string(), "1RC412(w.m-2)".to_string()],
        minimum: 500.0,
    });
    config.modules = vec![
        module("dustiq", AlignmentClass::HighFrequency),
        module("pvstand", AlignmentClass::MediumFrequency),
        module("iv600", AlignmentClass::Irregular),
        refcells,
        module("temperature", AlignmentClass::HighFrequency),
    ];
    config
}

/// Day 1 is clean. Day 2 has unstable irradiance. Day 3 has a low soiled-cell current.
fn inputs() -> PipelineInputs {
    let mut irradiance = irradiance_day(1, |_| 900.0);
    irradiance.extend(irradiance_day(2, |i| if i % 2 == 0 { 850.0 } else { 1000.0 }));
    irradiance.extend(irradiance_day(3, |_| 900.0));

    let mut primary = Vec::new();
    for d in 1..=3 {
        let isc_e = if d == 3 { 0.5 } else { 5.0 };
        for t in every(at(d, 10, 0), at(d, 14, 0), 1) {
            primary.push(
                ModuleSample::new(t)
                    .with_channel("Isc(e)", isc_e)
                    .with_channel("Isc(p)", 5.2),
            );
        }
    }

    let mut dustiq = Vec::new();
    let mut pvstand = Vec::new();
    let mut iv600 = Vec::new();
    let mut refcells = Vec::new();
    for d in 1..=3 {
        dustiq.extend(constant_series(
            &every(at(d, 10, 0), at(d, 14, 0), 1),
            "SR_C11_Avg",
            98.0,
        ));
        for t in every(at(d, 10, 0), at(d, 14, 0), 5) {
            pvstand.push(ModuleSample::new(t).with_group("perc1").with_channel("Pmax", 200.0));
            pvstand.push(ModuleSample::new(t).with_group("perc2").with_channel("Pmax", 205.0));
        }
        iv600.extend(constant_series(&[at(d, 11, 20)], "Isc", 8.1));
        for t in every(at(d, 10, 0), at(d, 14, 0), 1) {
            refcells.push(
                ModuleSample::new(t)
                    .with_channel("1RC411(w.m-2)", 900.0)
                    .with_channel("1RC412(w.m-2)", 880.0),
            );
        }
    }

    PipelineInputs {
        irradiance,
        primary,
        modules: vec![
            ModuleInput {
                name: "dustiq".to_string(),
                samples: Some(dustiq),
            },
            ModuleInput {
                name: "pvstand".to_string(),
                samples: Some(pvstand),
            },
            ModuleInput {
                name: "iv600".to_string(),
                samples: Some(iv600),
            },
            ModuleInput {
                name: "refcells".to_string(),
                samples: Some(refcells),
            },
            ModuleInput {
                name: "temperature".to_string(),
                samples: None,
            },
        ],
    }
}

#[test]
fn test_day_sets_consistent_across_modules() {
    let pipeline = SoilingPipeline::new(config(), SyntheticSun::new(12, 0)).unwrap();
    let output = pipeline.run(&inputs()).unwrap();

    let expected: BTreeSet<_> = [day(1)].into_iter().collect();
    assert_eq!(output.session_days(), expected);

    for name in ["dustiq", "pvstand", "iv600", "refcells"] {
        let alignment = &output.modules[name];
        let dates: BTreeSet<_> = alignment.rows.iter().map(|r| r.date).collect();
        assert_eq!(dates, expected, "module {}", name);
    }
}

#[test]
fn test_absent_module_reported_not_fatal() {
    let pipeline = SoilingPipeline::new(config(), SyntheticSun::new(12, 0)).unwrap();
    let output = pipeline.run(&inputs()).unwrap();

    assert!(!output.modules.contains_key("temperature"));
    let skipped: Vec<&str> = output
        .report
        .skipped_modules
        .iter()
        .map(|s| s.module.as_str())
        .collect();
    assert_eq!(skipped, vec!["temperature"]);
}

#[test]
fn test_stage_counts() {
    let pipeline = SoilingPipeline::new(config(), SyntheticSun::new(12, 0)).unwrap();
    let output = pipeline.run(&inputs()).unwrap();
    let report = &output.report;

    assert_eq!(report.irradiance_rows, 3 * 240);
    assert_eq!(report.reference_rows, 3 * 240);
    assert_eq!(report.joins["soiling_kit"].kept, 3 * 240);
    assert_eq!(report.sessions_selected, 3);
    assert_eq!(report.current_filter_dropped, 1);
    assert_eq!(report.stable_days, 1);
    assert!(matches!(
        report.stability.iter().find(|d| d.date == day(2)).map(|d| d.verdict),
        Some(StabilityVerdict::Unstable { .. })
    ));

    // Distance statistics cover every day accepted by the distance gate
    assert_eq!(output.distance_stats.days, 3);
    assert_eq!(output.distance_stats.max, 2.5);
}

#[test]
fn test_module_alignment_rules() {
    let pipeline = SoilingPipeline::new(config(), SyntheticSun::new(12, 0)).unwrap();
    let output = pipeline.run(&inputs()).unwrap();
    let session = &output.sessions[0];

    // Tie between the 11:55 and 12:00 windows goes to the earlier one
    assert_eq!(session.window_start, at(1, 11, 55));

    let dustiq = &output.modules["dustiq"].rows;
    assert_eq!(dustiq.len(), 1);
    assert_eq!(dustiq[0].sample_count, 5);
    assert_eq!(dustiq[0].channels["SR_C11_Avg"], Some(98.0));

    let pvstand = &output.modules["pvstand"].rows;
    assert_eq!(pvstand.len(), 2);
    assert!(pvstand.iter().all(|r| r.distance_minutes == Some(2.5)));

    let iv600 = &output.modules["iv600"].rows;
    assert_eq!(iv600[0].timestamp, at(1, 11, 20));
    assert_eq!(iv600[0].distance_minutes, Some(37.5));
}

#[test]
fn test_refcell_floor_removes_dim_rows() {
    let mut inputs = inputs();
    if let Some(samples) = inputs.modules[3].samples.as_mut() {
        for s in samples.iter_mut() {
            s.channels
                .insert("1RC412(w.m-2)".to_string(), Some(450.0));
        }
    }
    let pipeline = SoilingPipeline::new(config(), SyntheticSun::new(12, 0)).unwrap();
    let output = pipeline.run(&inputs).unwrap();
    assert!(output.modules["refcells"].rows.is_empty());
    assert_eq!(output.report.floor_drops["refcells"], 3 * 240);
}

#[test]
fn test_absent_floor_channel_not_applied() {
    let mut inputs = inputs();
    if let Some(samples) = inputs.modules[3].samples.as_mut() {
        for s in samples.iter_mut() {
            s.channels.remove("1RC412(w.m-2)");
        }
    }
    let pipeline = SoilingPipeline::new(config(), SyntheticSun::new(12, 0)).unwrap();
    let output = pipeline.run(&inputs).unwrap();

    let refcells = &output.modules["refcells"].rows;
    assert_eq!(refcells.len(), 1);
    assert_eq!(refcells[0].channels["1RC411(w.m-2)"], Some(900.0));
    assert_eq!(output.report.floor_drops["refcells"], 0);
    assert_eq!(
        output.report.floor_skipped_channels["refcells"],
        vec!["1RC412(w.m-2)".to_string()]
    );
}

#[test]
fn test_floor_drops_reported_only_for_floored_series() {
    let pipeline = SoilingPipeline::new(config(), SyntheticSun::new(12, 0)).unwrap();
    let output = pipeline.run(&inputs()).unwrap();
    let series: Vec<&str> = output.report.floor_drops.keys().map(|k| k.as_str()).collect();
    assert_eq!(series, vec!["refcells"]);
    assert_eq!(output.report.floor_drops["refcells"], 0);
    assert!(output.report.floor_skipped_channels.is_empty());
}

#[test]
fn test_tighter_distance_gate_drops_days() {
    let mut config = config();
    config.thresholds.max_solar_noon_distance_minutes = 2.0;
    let pipeline = SoilingPipeline::new(config, SyntheticSun::new(12, 0)).unwrap();
    let output = pipeline.run(&inputs()).unwrap();
    assert!(output.sessions.is_empty());
    assert_eq!(output.report.discarded_days.len(), 3);
    assert!(output.modules.values().all(|m| m.rows.is_empty()));
}

#[test]
fn test_invalid_config_is_fatal() {
    let mut config = config();
    config.panel.tilt = 120.0;
    assert!(SoilingPipeline::new(config, SyntheticSun::new(12, 0)).is_err());
}

#[test]
fn test_raw_dataset_normalization() {
    let mut config = config();
    config.modules[2].timezone = Some("America/Santiago".to_string());
    let json = r#"{
        "irradiance": [
            {"timestamp": "2024-08-01T12:00:00Z", "channels": {"GHI": 900.0, "DHI": 80.0, "DNI": 900.0}},
            {"timestamp": "garbage", "channels": {"GHI": 900.0, "DHI": 80.0, "DNI": 900.0}}
        ],
        "primary": [
            {"timestamp": "2024-08-01 12:01:00", "channels": {"Isc(e)": 5.0, "Isc(p)": 5.2}}
        ],
        "modules": {
            "iv600": [{"timestamp": "2024-08-01 07:20:00", "channels": {"Isc": 8.1}}],
            "unknown": []
        }
    }"#;
    let raw: RawDataset = serde_json::from_str(json).unwrap();
    let (inputs, reports) = PipelineInputs::from_raw(&config, &raw).unwrap();

    assert_eq!(inputs.irradiance.len(), 1);
    assert_eq!(reports["irradiance"].malformed_timestamps, 1);
    assert_eq!(inputs.primary[0].timestamp, at(1, 12, 1));

    let iv600 = inputs.modules.iter().find(|m| m.name == "iv600").unwrap();
    // Santiago is UTC-4 in August
    assert_eq!(iv600.samples.as_ref().unwrap()[0].timestamp, at(1, 11, 20));

    let dustiq = inputs.modules.iter().find(|m| m.name == "dustiq").unwrap();
    assert!(dustiq.samples.is_none());
}

#[test]
fn test_noaa_pipeline_end_to_end() {
    // Real ephemeris: noon near 16:46 UTC at the site in early August
    let mut config = PipelineConfig::new(site(), panel());
    config.modules = vec![module("dustiq", AlignmentClass::HighFrequency)];
    config.thresholds.poa_minimum = 0.0;
    config.thresholds.clear_sky_ratio_minimum = 0.0;

    let instants = every(at(1, 16, 0), at(1, 17, 30), 1);
    let irradiance = instants
        .iter()
        .map(|t| soiling_rust::models::IrradianceSample::new(*t, 900.0, 80.0, 950.0))
        .collect();
    let inputs = PipelineInputs {
        irradiance,
        primary: constant_series(&instants, "Isc(e)", 5.0)
            .into_iter()
            .map(|s| s.with_channel("Isc(p)", 5.1))
            .collect(),
        modules: vec![ModuleInput {
            name: "dustiq".to_string(),
            samples: Some(constant_series(&instants, "SR_C11_Avg", 97.0)),
        }],
    };

    let output = SoilingPipeline::from_config(config).unwrap().run(&inputs).unwrap();
    assert_eq!(output.sessions.len(), 1);
    let session = &output.sessions[0];
    assert!(session.distance_to_solar_noon_minutes <= 2.5);
    assert_eq!(output.modules["dustiq"].rows.len(), 1);
}
