//! Output formatting helpers for human-readable and JSON output.

use arbor::{GraphView, content::Value, node::NodeId};

use crate::cli::Format;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Human => OutputFormat::Human,
            Format::Json => OutputFormat::Json,
        }
    }
}

/// Renders a value for display. References show the type they point to.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Object(object) => format!("<{}>", object.type_name),
        other => other.to_string(),
    }
}

/// Converts a value to JSON. References become their type name.
pub fn value_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(value) => serde_json::Value::Bool(*value),
        Value::Int(value) => serde_json::Value::from(*value),
        Value::Float(value) => serde_json::Value::from(*value),
        Value::Text(value) => serde_json::Value::String(value.clone()),
        Value::Object(object) => serde_json::Value::String(format!("<{}>", object.type_name)),
    }
}

/// Prints the subtree of `id` as an indented list.
pub fn print_tree(view: &GraphView, id: NodeId, all: bool) -> arbor::Result<()> {
    print_node(view, id, 0, all)
}

fn print_node(view: &GraphView, id: NodeId, depth: usize, all: bool) -> arbor::Result<()> {
    let node = view.node(id)?;
    if !node.is_visible() && !all {
        return Ok(());
    }

    let mut line = format!("{:indent$}{}", "", node.display_name(), indent = depth * 2);
    if node.is_primitive() {
        line.push_str(" = ");
        if view.has_multiple_values(id)? {
            line.push_str("(multiple values)");
        } else {
            line.push_str(&value_text(&view.value(id)?));
        }
    }
    line.push_str(&format!(" [{}]", node.value_type()));
    if node.is_read_only() {
        line.push_str(" (read-only)");
    }
    if all && !node.commands().is_empty() {
        let names: Vec<&str> = node.commands().iter().map(|c| c.name()).collect();
        line.push_str(&format!(" {{{}}}", names.join(", ")));
    }
    println!("{line}");

    for child in view.children(id)? {
        print_node(view, child, depth + 1, all)?;
    }
    Ok(())
}

/// Builds the JSON description of the subtree of `id`.
pub fn tree_json(view: &GraphView, id: NodeId, all: bool) -> arbor::Result<serde_json::Value> {
    let node = view.node(id)?;
    let mut children = Vec::new();
    for child in view.children(id)? {
        if all || view.node(child)?.is_visible() {
            children.push(tree_json(view, child, all)?);
        }
    }
    let commands: Vec<&str> = node.commands().iter().map(|c| c.name()).collect();
    Ok(serde_json::json!({
        "name": node.name(),
        "display_name": node.display_name(),
        "path": node.path(),
        "type": node.value_type().to_string(),
        "value": value_json(&view.value(id)?),
        "has_multiple_values": view.has_multiple_values(id)?,
        "read_only": node.is_read_only(),
        "commands": commands,
        "children": children,
    }))
}
