use crate::context::{runtime, TrackerArgs};
use crate::output::{or_dash, print_json, print_table};
use anyhow::Result;
use clap::Subcommand;
use hydro_core::reconcile::ReassignOutcome;
use hydro_core::saga::StepOutcome;

// ---------------------------------------------------------------------------
// Subcommand definition
// ---------------------------------------------------------------------------

#[derive(Subcommand, Debug)]
pub enum StationSubcommand {
    /// Show the active equipment of one or more stations
    Active {
        /// Station keys
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// List the equipment a station is wired to
    Options { key: String },
    /// Make one piece of equipment the station's active one
    Reassign {
        /// Station key
        station: String,
        /// Equipment key
        equipment: String,
    },
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn run(tracker: &TrackerArgs, subcommand: StationSubcommand, json: bool) -> Result<()> {
    let engine = tracker.engine()?;
    let rt = runtime()?;

    match subcommand {
        StationSubcommand::Active { keys } => {
            let active = rt.block_on(engine.active().active_batch(&keys));
            if json {
                return print_json(&active);
            }
            let rows = active
                .iter()
                .map(|(station, eq)| vec![station.clone(), or_dash(eq.as_deref())])
                .collect();
            print_table(&["STATION", "ACTIVE"], rows);
            Ok(())
        }
        StationSubcommand::Options { key } => {
            let options = rt.block_on(engine.active().station_options(&key))?;
            if json {
                return print_json(&options);
            }
            let rows = options
                .options
                .iter()
                .map(|o| {
                    let marker = if options.active_key.as_deref() == Some(o.key.as_str()) {
                        "*"
                    } else if o.in_use_elsewhere {
                        "busy"
                    } else {
                        ""
                    };
                    vec![
                        o.key.clone(),
                        o.issue_type.clone(),
                        o.summary.clone(),
                        o.status.clone(),
                        or_dash(o.grouping_summary.as_deref()),
                        marker.to_string(),
                    ]
                })
                .collect();
            print_table(&["KEY", "TYPE", "SUMMARY", "STATUS", "GROUPING", ""], rows);
            Ok(())
        }
        StationSubcommand::Reassign { station, equipment } => {
            let outcome = rt.block_on(engine.reconciler().reassign(&station, &equipment))?;
            if json {
                return print_json(&outcome);
            }
            print_outcome(&outcome);
            Ok(())
        }
    }
}

fn print_outcome(outcome: &ReassignOutcome) {
    let verb = if outcome.created_link {
        "now active on"
    } else {
        "already active on"
    };
    println!("{} {verb} {}", outcome.equipment, outcome.station);
    println!("grouping: {}", or_dash(outcome.grouping.as_deref()));

    for record in outcome.steps.failures() {
        if let StepOutcome::Failed(reason) = &record.outcome {
            eprintln!("warning: {} on {}: {reason}", record.step.as_str(), record.subject);
        }
    }
    if !outcome.unlinked_stations.is_empty() {
        eprintln!(
            "warning: still linked to {}; remove those links by hand",
            outcome.unlinked_stations.join(", ")
        );
    }
}
