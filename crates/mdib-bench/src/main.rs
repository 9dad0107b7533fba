//! Benchmark for MDIB writes using a synthetic device.
//!
//! Builds one description batch for a configurable device layout, commits it,
//! then runs rounds of metric and context state updates and prints a JSON
//! summary.
//!
//! Usage: `mdib-bench [layout.json]`. Logs go to stderr; set `RUST_LOG=mdib=debug`
//! to see the preprocessing log.

use std::error::Error;
use std::fs;
use std::time::{Duration, Instant};

use mdib::model::{Descriptor, DescriptionModifications, DescriptorKind, Handle, State, StateKind};
use mdib::{LocalMdibAccess, MdibAccess, MdibConfig, StateModifications};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

// =============================================================================
// LAYOUT
// =============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
struct Layout {
    mds_count: usize,
    vmds_per_mds: usize,
    channels_per_vmd: usize,
    metrics_per_channel: usize,
    context_states: usize,
    state_rounds: usize,
    propagate_to_parent: bool,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            mds_count: 1,
            vmds_per_mds: 4,
            channels_per_vmd: 8,
            metrics_per_channel: 16,
            context_states: 4,
            state_rounds: 100,
            propagate_to_parent: false,
        }
    }
}

// =============================================================================
// SUMMARY
// =============================================================================

#[derive(Debug, Serialize)]
struct Summary {
    layout: Layout,
    entities: usize,
    metrics: usize,
    describe_ms: f64,
    state_rounds_ms: f64,
    state_writes_per_sec: f64,
    context_ms: f64,
    mdib_version: String,
    md_description_version: u64,
    md_state_version: u64,
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

fn handle(prefix: &str) -> Handle {
    Handle::new(format!("{prefix}.{}", Uuid::new_v4().simple()))
}

fn single(
    batch: DescriptionModifications,
    handle: &Handle,
    kind: DescriptorKind,
    parent: Option<&Handle>,
) -> DescriptionModifications {
    batch.insert(
        Descriptor::new(handle.clone(), kind),
        [State::new(kind.state_kind(), handle.clone())],
        parent.cloned(),
    )
}

/// A device description plus the handles the state rounds write to.
struct Device {
    batch: DescriptionModifications,
    metrics: Vec<Handle>,
    patient_contexts: Vec<Handle>,
}

fn build_device(layout: &Layout) -> Device {
    let mut batch = DescriptionModifications::new();
    let mut metrics = Vec::new();
    let mut patient_contexts = Vec::new();

    for _ in 0..layout.mds_count {
        let mds = handle("mds");
        batch = single(batch, &mds, DescriptorKind::Mds, None);

        let system_context = handle("sc");
        batch = single(batch, &system_context, DescriptorKind::SystemContext, Some(&mds));
        let patient = handle("pat");
        batch = batch.insert(
            Descriptor::new(patient.clone(), DescriptorKind::PatientContext),
            Vec::<State>::new(),
            Some(system_context),
        );
        patient_contexts.push(patient);

        for _ in 0..layout.vmds_per_mds {
            let vmd = handle("vmd");
            batch = single(batch, &vmd, DescriptorKind::Vmd, Some(&mds));
            for _ in 0..layout.channels_per_vmd {
                let channel = handle("ch");
                batch = single(batch, &channel, DescriptorKind::Channel, Some(&vmd));
                for _ in 0..layout.metrics_per_channel {
                    let metric = handle("nm");
                    batch = single(batch, &metric, DescriptorKind::NumericMetric, Some(&channel));
                    metrics.push(metric);
                }
            }
        }
    }

    Device {
        batch,
        metrics,
        patient_contexts,
    }
}

fn load_layout() -> Result<Layout, Box<dyn Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            info!(path = %path, "loading layout");
            let json = fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&json)?)
        }
        None => Ok(Layout::default()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mdib=warn,mdib_bench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let layout = load_layout()?;
    let mdib = LocalMdibAccess::with_config(
        MdibConfig::new().with_parent_propagation(layout.propagate_to_parent),
    );

    let device = build_device(&layout);
    let entities = device.batch.len();

    // Description insert
    let describe_start = Instant::now();
    mdib.write_description(device.batch)?;
    let describe_time = describe_start.elapsed();
    info!(entities, elapsed = ?describe_time, "description committed");

    // Metric state rounds
    let rounds_start = Instant::now();
    for round in 0..layout.state_rounds {
        let states: StateModifications = device
            .metrics
            .iter()
            .map(|metric| {
                State::new(StateKind::NumericMetric, metric.clone())
                    .with_attribute("value", round.to_string())
            })
            .collect();
        mdib.write_states(states)?;
    }
    let rounds_time = rounds_start.elapsed();

    // Context states: add, then re-associate each one
    let context_start = Instant::now();
    for patient in &device.patient_contexts {
        let handles: Vec<Handle> = (0..layout.context_states).map(|_| handle("pat.s")).collect();
        for association in ["Assoc", "Dis"] {
            let states: StateModifications = handles
                .iter()
                .map(|state| {
                    State::context(StateKind::PatientContext, state.clone(), patient.clone())
                        .with_attribute("association", association)
                })
                .collect();
            mdib.write_states(states)?;
        }
    }
    let context_time = context_start.elapsed();

    let txn = mdib.start_transaction();
    let state_writes = (device.metrics.len() * layout.state_rounds) as f64;
    let summary = Summary {
        entities,
        metrics: device.metrics.len(),
        describe_ms: millis(describe_time),
        state_rounds_ms: millis(rounds_time),
        state_writes_per_sec: state_writes / rounds_time.as_secs_f64().max(f64::EPSILON),
        context_ms: millis(context_time),
        mdib_version: txn.mdib_version().to_string(),
        md_description_version: txn.md_description_version(),
        md_state_version: txn.md_state_version(),
        layout,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
