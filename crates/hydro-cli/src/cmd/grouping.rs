use crate::context::{runtime, TrackerArgs};
use crate::output::{or_dash, print_json, print_table};
use anyhow::Result;
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum GroupingSubcommand {
    /// List visible groupings by summary
    List,
    /// Put an issue in a grouping; omit the grouping to clear it
    Set {
        /// Issue key
        key: String,
        /// Grouping key
        grouping: Option<String>,
    },
}

pub fn run(tracker: &TrackerArgs, subcommand: GroupingSubcommand, json: bool) -> Result<()> {
    let engine = tracker.engine()?;
    let rt = runtime()?;

    match subcommand {
        GroupingSubcommand::List => {
            let groupings = rt.block_on(engine.groupings().list_groupings())?;
            if json {
                return print_json(&groupings);
            }
            let rows = groupings
                .into_iter()
                .map(|g| vec![g.key, g.summary])
                .collect();
            print_table(&["KEY", "SUMMARY"], rows);
            Ok(())
        }
        GroupingSubcommand::Set { key, grouping } => {
            let update =
                rt.block_on(engine.groupings().set_grouping(&key, grouping.as_deref()))?;
            if json {
                return print_json(&update);
            }
            println!("{}: grouping {}", update.key, or_dash(update.grouping.as_deref()));
            let sweep = &update.withdrawal;
            if sweep.withdrawn {
                if !sweep.removed.is_empty() {
                    println!("withdrawn; unlinked {}", sweep.removed.join(", "));
                }
                if !sweep.residue.is_empty() {
                    eprintln!(
                        "warning: blocking links to {} could not be removed",
                        sweep.residue.join(", ")
                    );
                }
            }
            Ok(())
        }
    }
}
