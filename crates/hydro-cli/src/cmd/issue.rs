use crate::context::{runtime, TrackerArgs};
use crate::output::{or_dash, print_json, print_table};
use anyhow::{bail, Result};
use clap::Subcommand;
use hydro_core::links::LinkView;

// ---------------------------------------------------------------------------
// Subcommand definition
// ---------------------------------------------------------------------------

#[derive(Subcommand, Debug)]
pub enum IssueSubcommand {
    /// List issues by key, or the configured set, or the project's recent ones
    List { keys: Vec<String> },
    /// Equipment that needs attention: ungrouped, failing, or withdrawn
    Control,
    /// Show available workflow transitions
    Transitions { key: String },
    /// Apply a workflow transition
    Transition {
        key: String,
        /// Transition id
        #[arg(long, conflicts_with = "name")]
        id: Option<String>,
        /// Transition name (case-insensitive)
        #[arg(long)]
        name: Option<String>,
    },
    /// Add a plain-text comment
    Comment { key: String, text: String },
    /// Show an issue's links as both API versions report them
    Links { key: String },
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn run(tracker: &TrackerArgs, subcommand: IssueSubcommand, json: bool) -> Result<()> {
    let engine = tracker.engine()?;
    let rt = runtime()?;

    match subcommand {
        IssueSubcommand::List { keys } => {
            let issues = rt.block_on(engine.directory().list_issues(&keys))?;
            if json {
                return print_json(&issues);
            }
            let rows = issues
                .into_iter()
                .map(|i| {
                    vec![
                        i.key,
                        i.issue_type,
                        i.status.name,
                        i.summary,
                        or_dash(i.updated.as_deref()),
                    ]
                })
                .collect();
            print_table(&["KEY", "TYPE", "STATUS", "SUMMARY", "UPDATED"], rows);
            Ok(())
        }
        IssueSubcommand::Control => {
            let items = rt.block_on(engine.control().list_for_attention())?;
            if json {
                return print_json(&items);
            }
            if items.is_empty() {
                println!("nothing needs attention");
                return Ok(());
            }
            let rows = items
                .into_iter()
                .map(|i| {
                    vec![
                        i.key,
                        i.issue_type,
                        i.status,
                        or_dash(i.grouping_summary.as_deref()),
                        or_dash(i.sector.as_deref()),
                    ]
                })
                .collect();
            print_table(&["KEY", "TYPE", "STATUS", "GROUPING", "SECTOR"], rows);
            Ok(())
        }
        IssueSubcommand::Transitions { key } => {
            let transitions = rt.block_on(engine.workflow().transitions(&key))?;
            if json {
                return print_json(&transitions);
            }
            let rows = transitions
                .into_iter()
                .map(|t| {
                    let note = if t.requires_breakdown_comment {
                        "comment"
                    } else {
                        ""
                    };
                    vec![t.id, t.name, t.to_name, note.to_string()]
                })
                .collect();
            print_table(&["ID", "NAME", "TO", ""], rows);
            Ok(())
        }
        IssueSubcommand::Transition { key, id, name } => {
            if id.is_none() && name.is_none() {
                bail!("pass --id or --name");
            }
            let applied = rt.block_on(engine.workflow().transition(
                &key,
                id.as_deref(),
                name.as_deref(),
            ))?;
            if json {
                return print_json(&applied);
            }
            println!("{key}: {} -> {}", applied.name, applied.to_name);
            Ok(())
        }
        IssueSubcommand::Comment { key, text } => {
            rt.block_on(engine.workflow().comment(&key, &text))?;
            if json {
                return print_json(&serde_json::json!({ "ok": true }));
            }
            println!("{key}: comment added");
            Ok(())
        }
        IssueSubcommand::Links { key } => {
            let diagnosis = rt.block_on(engine.reader().diagnose(&key))?;
            if json {
                return print_json(&diagnosis);
            }
            match &diagnosis.blocking_link_type {
                Some(t) => println!("blocking type: {} ({} / {})", t.name, t.inward, t.outward),
                None => println!("blocking type: not found"),
            }
            println!("\nprimary");
            print_links(&diagnosis.primary);
            println!("\nalternate");
            print_links(&diagnosis.alternate);
            Ok(())
        }
    }
}

fn print_links(links: &[LinkView]) {
    let rows = links
        .iter()
        .map(|l| {
            vec![
                or_dash(l.id.as_ref().map(|id| id.as_str())),
                l.type_name.clone(),
                l.inward_key.clone(),
                l.outward_key.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "TYPE", "INWARD", "OUTWARD"], rows);
}
