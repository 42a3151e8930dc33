//! Show command - prints the tree of one or more documents.

use crate::cli::ShowArgs;
use crate::output::{OutputFormat, print_tree, tree_json};
use crate::session::{Session, load_settings};

/// Run the show command
pub async fn run(
    args: &ShowArgs,
    settings: Option<&std::path::Path>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open(&args.documents, load_settings(settings)?)?;
    let root = session.root()?;

    match format {
        OutputFormat::Human => {
            if session.view.single_roots().len() > 1 {
                println!(
                    "Combined view of {} documents",
                    session.view.single_roots().len()
                );
            }
            print_tree(&session.view, root, args.all)?;
        }
        OutputFormat::Json => {
            let value = tree_json(&session.view, root, args.all)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(())
}
