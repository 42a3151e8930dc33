//! Set command - writes a value through the tree.

use crate::cli::SetArgs;
use crate::output::{OutputFormat, value_json, value_text};
use crate::session::{Session, load_settings, parse_value};

/// Run the set command
pub async fn run(
    args: &SetArgs,
    settings: Option<&std::path::Path>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open(&args.documents, load_settings(settings)?)?;
    let node = session.resolve(&args.path)?;
    let value = parse_value(&args.value)?;

    session.view.set_value(node, value)?;
    session.view.run_deferred()?;
    let current = session.view.value(node)?;

    if args.write {
        session.save()?;
    }

    match format {
        OutputFormat::Human => {
            for name in session.undo.names() {
                println!("{name}");
            }
            println!("{} = {}", args.path, value_text(&current));
            if !args.write {
                println!("{}", serde_json::to_string_pretty(&session.export()?)?);
            }
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "path": args.path,
                "value": value_json(&current),
                "transactions": session.undo.names(),
                "documents": session.export()?,
            });
            println!("{}", serde_json::to_string(&value)?);
        }
    }

    Ok(())
}
