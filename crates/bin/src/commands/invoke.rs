//! Invoke command - runs a command of a node.

use arbor::content::Value;

use crate::cli::InvokeArgs;
use crate::output::OutputFormat;
use crate::session::{Session, load_settings, parse_value};

/// Run the invoke command
pub async fn run(
    args: &InvokeArgs,
    settings: Option<&std::path::Path>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open(&args.documents, load_settings(settings)?)?;
    let node = session.resolve(&args.path)?;
    let parameter = match &args.parameter {
        Some(text) => parse_value(text)?,
        None => Value::Null,
    };

    let token = session
        .view
        .invoke_command(node, &args.command, &parameter)
        .await?;
    session.view.run_deferred()?;

    if args.write {
        session.save()?;
    }

    match format {
        OutputFormat::Human => {
            for name in session.undo.names() {
                println!("{name}");
            }
            if !args.write {
                println!("{}", serde_json::to_string_pretty(&session.export()?)?);
            }
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "path": args.path,
                "command": args.command,
                "can_undo": token.can_undo,
                "transactions": session.undo.names(),
                "documents": session.export()?,
            });
            println!("{}", serde_json::to_string(&value)?);
        }
    }

    Ok(())
}
