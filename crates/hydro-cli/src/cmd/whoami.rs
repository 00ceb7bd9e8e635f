use crate::context::{runtime, TrackerArgs};
use crate::output::print_json;
use anyhow::Result;

pub fn run(tracker: &TrackerArgs, json: bool) -> Result<()> {
    let engine = tracker.engine()?;
    let account = runtime()?.block_on(engine.workflow().whoami())?;

    if json {
        return print_json(&account);
    }
    println!(
        "{} <{}>",
        account.display_name.as_deref().unwrap_or("(unnamed)"),
        account.email_address.as_deref().unwrap_or("-")
    );
    if let Some(id) = &account.account_id {
        println!("account: {id}");
    }
    Ok(())
}
